use crate::models::{Favorite, ListingRow};

/// Ordered favorites, unique by row id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoriteSet {
    items: Vec<Favorite>,
}

impl FavoriteSet {
    pub fn new(items: Vec<Favorite>) -> Self {
        let mut set = Self::default();
        for item in items {
            if !set.contains(&item.id) {
                set.items.push(item);
            }
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|f| f.id == id)
    }

    /// Adds a snapshot of `row`, or removes it if already present. Returns
    /// whether the row is a favorite afterwards.
    pub fn toggle(&mut self, row: &ListingRow) -> bool {
        if let Some(pos) = self.items.iter().position(|f| f.id == row.id) {
            self.items.remove(pos);
            false
        } else {
            self.items.push(Favorite {
                id: row.id.clone(),
                row: row.cells.clone(),
            });
            true
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Favorite> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn remove_id(&mut self, id: &str) -> Option<Favorite> {
        let pos = self.items.iter().position(|f| f.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn items(&self) -> &[Favorite] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

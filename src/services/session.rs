use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::{Dataset, Row, UploadMetadata};
use crate::services::favorites::FavoriteSet;
use crate::services::listings::{CsvListingParser, ListingAnalyzer, TableView};
use crate::services::storage::ListingStore;

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    #[serde(default)]
    pub last_modified: Option<i64>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub metadata: UploadMetadata,
    pub row_count: usize,
    pub column_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteOutcome {
    pub favorited: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_warning: Option<String>,
}

#[derive(Debug)]
pub struct LoadedListings {
    pub metadata: UploadMetadata,
    pub dataset: Dataset,
}

/// What is on screen and the generation that put it there.
#[derive(Default)]
struct Installed {
    generation: u64,
    loaded: Option<Arc<LoadedListings>>,
}

/// Active dataset, favorites and the persistence behind them.
pub struct ListingSession {
    store: ListingStore,
    max_upload_bytes: usize,
    sample_rows: usize,
    current: RwLock<Installed>,
    favorites: Mutex<FavoriteSet>,
    latest_generation: AtomicU64,
    // Serializes commits and clears so the stored upload always matches the
    // installed one. Never held together with `current`'s write lock while
    // blocking on storage.
    persist_lock: tokio::sync::Mutex<()>,
}

/// Rejects before anything is read: wrong extension or over the size limit.
pub fn validate_upload(file_name: &str, size: usize, max_upload_bytes: usize) -> Result<(), AppError> {
    let is_csv = Path::new(file_name)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(AppError::InvalidInput(format!(
            "Please upload a CSV file, got {:?}",
            file_name
        )));
    }
    if size > max_upload_bytes {
        return Err(AppError::FileTooLarge {
            size,
            limit: max_upload_bytes,
        });
    }
    Ok(())
}

impl ListingSession {
    pub fn new(store: ListingStore, max_upload_bytes: usize, sample_rows: usize) -> Self {
        Self {
            store,
            max_upload_bytes,
            sample_rows,
            current: RwLock::new(Installed::default()),
            favorites: Mutex::new(FavoriteSet::default()),
            latest_generation: AtomicU64::new(0),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, AppError> {
        let UploadRequest {
            file_name,
            last_modified,
            content,
        } = request;

        if let Err(e) = validate_upload(&file_name, content.len(), self.max_upload_bytes) {
            warn!("Rejected upload {}: {}", file_name, e);
            return Err(e);
        }

        let generation = self.next_generation();
        info!(
            "Processing upload {} ({} bytes) as generation {}",
            file_name,
            content.len(),
            generation
        );

        let (content, dataset) = self.analyze(content).await?;

        let metadata = UploadMetadata {
            file_name,
            size: content.len(),
            last_modified,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        };

        let row_count = dataset.rows.len();
        let column_count = dataset.columns.len();
        let storage_warning = self
            .commit(generation, Some(content), metadata.clone(), dataset)
            .await?;

        let outcome = UploadOutcome {
            metadata,
            row_count,
            column_count,
            storage_warning,
        };
        info!(
            "Loaded {} listings from {}",
            outcome.row_count, outcome.metadata.file_name
        );
        Ok(outcome)
    }

    /// Reloads the persisted upload and favorites. Unreadable records are
    /// logged and skipped. Returns whether a dataset was restored.
    pub async fn restore(&self) -> Result<bool, AppError> {
        let store = self.store.clone();
        let (favorites, upload) =
            tokio::task::spawn_blocking(move || (store.load_favorites(), store.load_upload()))
                .await?;

        match favorites {
            Ok(items) => {
                let favorites = FavoriteSet::new(items);
                info!("Restored {} favorites", favorites.len());
                *self.favorites.lock() = favorites;
            }
            Err(e) => warn!("Ignoring unreadable favorites: {}", e),
        }

        let (content, metadata) = match upload {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!("No stored upload to restore");
                return Ok(false);
            }
            Err(e) => {
                warn!("Ignoring unreadable stored upload: {}", e);
                return Ok(false);
            }
        };

        let generation = self.next_generation();
        let dataset = match self.analyze(content).await {
            Ok((_, dataset)) => dataset,
            Err(AppError::ParseError(e)) => {
                warn!("Stored upload {} no longer parses: {}", metadata.file_name, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let file_name = metadata.file_name.clone();
        let row_count = dataset.rows.len();
        match self.commit(generation, None, metadata, dataset).await {
            Ok(_) => {
                info!("Restored {} listings from {}", row_count, file_name);
                Ok(true)
            }
            Err(AppError::Superseded(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Installs `dataset` unless a newer generation is already installed.
    /// When `content` is given it is persisted first, off the async
    /// executor; a storage failure only yields a warning.
    async fn commit(
        &self,
        generation: u64,
        content: Option<String>,
        metadata: UploadMetadata,
        dataset: Dataset,
    ) -> Result<Option<String>, AppError> {
        let _persist = self.persist_lock.lock().await;
        self.ensure_installable(generation)?;

        let storage_warning = match content {
            Some(content) => self.persist_upload(content, metadata.clone()).await,
            None => None,
        };

        // Other commits and clears wait on `persist_lock`, so nothing newer
        // can have been installed since the check above.
        *self.current.write() = Installed {
            generation,
            loaded: Some(Arc::new(LoadedListings { metadata, dataset })),
        };
        Ok(storage_warning)
    }

    fn ensure_installable(&self, generation: u64) -> Result<(), AppError> {
        let installed = self.current.read().generation;
        if generation <= installed {
            warn!(
                "Discarding dataset generation {}, generation {} is already installed",
                generation, installed
            );
            return Err(AppError::Superseded(generation));
        }
        Ok(())
    }

    async fn persist_upload(&self, content: String, metadata: UploadMetadata) -> Option<String> {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || store.save_upload(&content, &metadata))
            .await
            .map_err(AppError::from)
            .and_then(|saved| saved.map_err(AppError::from));

        match result {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist upload, keeping it in memory only: {}", e);
                Some(format!(
                    "Listings are loaded but will not survive a restart: {}",
                    e
                ))
            }
        }
    }

    /// Drops the dataset and its stored copy. Favorites stay. Uploads that
    /// started before the clear can no longer install. Returns a warning when
    /// the stored copy could not be removed.
    pub async fn clear(&self) -> Option<String> {
        let _persist = self.persist_lock.lock().await;
        let generation = self.next_generation();
        *self.current.write() = Installed {
            generation,
            loaded: None,
        };
        info!("Cleared listings");

        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || store.clear_upload())
            .await
            .map_err(AppError::from)
            .and_then(|cleared| cleared.map_err(AppError::from));

        match result {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to clear stored upload: {}", e);
                Some(format!("Stored listings could not be removed: {}", e))
            }
        }
    }

    pub fn current(&self) -> Option<Arc<LoadedListings>> {
        self.current.read().loaded.clone()
    }

    pub fn listings(&self) -> Result<(UploadMetadata, TableView), AppError> {
        let loaded = self
            .current()
            .ok_or_else(|| AppError::NotFound("No listings have been uploaded".to_string()))?;
        let dataset = &loaded.dataset;
        let table = TableView::build(
            &dataset.columns,
            dataset.rows.iter().map(|row| (row.id.as_str(), &row.cells)),
        );
        Ok((loaded.metadata.clone(), table))
    }

    pub fn toggle_favorite(&self, row_id: &str) -> Result<FavoriteOutcome, AppError> {
        let mut favorites = self.favorites.lock();
        let favorited = if favorites.contains(row_id) {
            favorites.remove_id(row_id);
            false
        } else {
            let loaded = self
                .current()
                .ok_or_else(|| AppError::NotFound("No listings have been uploaded".to_string()))?;
            let row = loaded
                .dataset
                .row(row_id)
                .ok_or_else(|| AppError::NotFound(format!("No listing with id {}", row_id)))?;
            favorites.toggle(row)
        };

        debug!("Favorite {} is now {}", row_id, favorited);
        Ok(FavoriteOutcome {
            favorited,
            count: favorites.len(),
            storage_warning: self.persist_favorites(&favorites),
        })
    }

    pub fn remove_favorite(&self, index: usize) -> Result<FavoriteOutcome, AppError> {
        let mut favorites = self.favorites.lock();
        let removed = favorites.remove(index).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "No favorite at index {} ({} favorites)",
                index,
                favorites.len()
            ))
        })?;

        debug!("Removed favorite {} at index {}", removed.id, index);
        Ok(FavoriteOutcome {
            favorited: false,
            count: favorites.len(),
            storage_warning: self.persist_favorites(&favorites),
        })
    }

    /// Favorites table over the loaded header list, typed from the favorite
    /// rows themselves.
    pub fn favorites_view(&self) -> TableView {
        let favorites = self.favorites.lock().clone();
        let rows: Vec<Row> = favorites.items().iter().map(|f| f.row.clone()).collect();

        let headers = match self.current() {
            Some(loaded) => loaded.dataset.headers.clone(),
            None => {
                let mut headers: Vec<String> = Vec::new();
                for row in &rows {
                    for key in row.keys() {
                        if !headers.contains(key) {
                            headers.push(key.clone());
                        }
                    }
                }
                headers
            }
        };

        let columns = ListingAnalyzer::new(self.sample_rows).describe_columns(&headers, &rows);
        TableView::build(
            &columns,
            favorites
                .items()
                .iter()
                .map(|f| (f.id.as_str(), &f.row)),
        )
    }

    fn persist_favorites(&self, favorites: &FavoriteSet) -> Option<String> {
        match self.store.save_favorites(favorites.items()) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist favorites: {}", e);
                Some(format!("Favorites will not survive a restart: {}", e))
            }
        }
    }

    fn next_generation(&self) -> u64 {
        self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn analyze(&self, content: String) -> Result<(String, Dataset), AppError> {
        let sample_rows = self.sample_rows;
        tokio::task::spawn_blocking(move || {
            let parsed = CsvListingParser::new().parse_content(&content)?;
            let dataset = ListingAnalyzer::new(sample_rows).analyze(parsed);
            Ok::<_, AppError>((content, dataset))
        })
        .await?
    }
}

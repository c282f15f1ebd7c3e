use crate::models::ColumnType;

pub const DEFAULT_VISIBLE: [&str; 7] = [
    "price",
    "short address",
    "beds",
    "baths",
    "footage",
    "price per sq. ft.",
    "url",
];

/// Whether a column is shown without the user asking for it.
pub fn is_visible_by_default(header: &str, column_type: ColumnType, is_derived: bool) -> bool {
    if is_derived || column_type == ColumnType::Url {
        return true;
    }
    let lower = header.to_lowercase();
    DEFAULT_VISIBLE.iter().any(|allowed| *allowed == lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_listed_headers_are_visible() {
        assert!(is_visible_by_default("Beds", ColumnType::Number, false));
        assert!(is_visible_by_default("SHORT ADDRESS", ColumnType::String, false));
        assert!(is_visible_by_default("Price Per Sq. Ft.", ColumnType::Currency, false));
    }

    #[test]
    fn other_headers_are_hidden_unless_url_or_derived() {
        assert!(!is_visible_by_default("Zestimate", ColumnType::Currency, false));
        assert!(!is_visible_by_default("Bedrooms", ColumnType::Number, false));
        assert!(is_visible_by_default("Listing Link", ColumnType::Url, false));
        assert!(is_visible_by_default("Price Per Sq. Ft.", ColumnType::Currency, true));
    }
}

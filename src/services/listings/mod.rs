pub mod analyzer;
pub mod derived;
pub mod inference;
pub mod parser;
pub mod render;
pub mod utils;
pub mod view;
pub mod visibility;

pub use analyzer::ListingAnalyzer;
pub use parser::CsvListingParser;
pub use view::TableView;

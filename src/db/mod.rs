mod association;
pub mod catalog;
pub mod core;
pub mod matches;
mod schema;

pub use self::catalog::CatalogCursor;
pub use self::core::Database;
pub use self::matches::{BrandStats, DatabaseSink};

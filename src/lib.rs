pub mod brand;
pub mod db;
pub mod environment;
pub mod logging;

pub const TARGET_BRAND: &str = "brand";
pub const TARGET_BATCH: &str = "batch";
pub const TARGET_DB: &str = "db_query";

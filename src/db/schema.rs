use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            -- Manufacturer association table, one row per source record
            CREATE TABLE IF NOT EXISTS brand_associations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                manufacturer_primary TEXT NOT NULL,
                manufacturers_secondary TEXT NOT NULL,
                imported_at TEXT NOT NULL
            );

            -- Catalog items waiting for a brand
            CREATE TABLE IF NOT EXISTS catalog_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                source_item_id TEXT NOT NULL,
                title TEXT NOT NULL,
                match_id TEXT,
                UNIQUE(source, source_item_id)
            );
            CREATE INDEX IF NOT EXISTS idx_catalog_items_source ON catalog_items (source, id);

            -- One row per processed item, keyed by the stable record id
            CREATE TABLE IF NOT EXISTS brand_matches (
                record_id TEXT PRIMARY KEY,
                item_id INTEGER NOT NULL,
                source TEXT NOT NULL,
                source_item_id TEXT NOT NULL,
                matched_brands TEXT NOT NULL, -- JSON array
                final_brand TEXT,
                matched_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_brand_matches_final_brand ON brand_matches (final_brand);
            CREATE INDEX IF NOT EXISTS idx_brand_matches_source ON brand_matches (source);
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_DB, "Tables ensured to exist");

        Ok(())
    }
}

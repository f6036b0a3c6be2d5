use anyhow::Result;
use sqlx::Row;
use tracing::{debug, info, instrument};

use crate::brand::batch::CatalogSource;
use crate::brand::types::CatalogItem;
use crate::db::core::Database;
use crate::TARGET_DB;

impl Database {
    /// Insert or refresh catalog items of one source. Returns the number of
    /// rows written.
    #[instrument(target = "db", level = "info", skip(self, items))]
    pub async fn import_catalog_items(
        &self,
        source: &str,
        items: &[CatalogItem],
    ) -> Result<usize, sqlx::Error> {
        let mut transaction = self.pool().begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO catalog_items (source, source_item_id, title, match_id)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(source, source_item_id) DO UPDATE SET
                    title = excluded.title,
                    match_id = COALESCE(excluded.match_id, catalog_items.match_id)
                "#,
            )
            .bind(source)
            .bind(&item.source_item_id)
            .bind(&item.title)
            .bind(&item.existing_match_id)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        info!(target: TARGET_DB, "Imported {} catalog items for '{}'", items.len(), source);

        Ok(items.len())
    }

    pub async fn count_catalog_items(&self, source: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catalog_items WHERE source = ?1")
            .bind(source)
            .fetch_one(self.pool())
            .await
    }

    /// One page of catalog items with an ID greater than `after_id`.
    #[instrument(target = "db", level = "debug", skip(self))]
    pub async fn fetch_catalog_page(
        &self,
        source: &str,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<CatalogItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, source_item_id, title, match_id
            FROM catalog_items
            WHERE source = ?1 AND id > ?2
            ORDER BY id
            LIMIT ?3
            "#,
        )
        .bind(source)
        .bind(after_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| CatalogItem {
                item_id: row.get("id"),
                source_item_id: row.get("source_item_id"),
                title: row.get("title"),
                existing_match_id: row.get("match_id"),
            })
            .collect())
    }

    pub async fn catalog_cursor(&self, source: &str) -> Result<CatalogCursor, sqlx::Error> {
        let total = self.count_catalog_items(source).await?;
        Ok(CatalogCursor {
            db: self.clone(),
            source: source.to_string(),
            last_id: 0,
            total: total.max(0) as usize,
        })
    }
}

/// Keyset-paginated walk over the catalog of one source.
pub struct CatalogCursor {
    db: Database,
    source: String,
    last_id: i64,
    total: usize,
}

impl CatalogSource for CatalogCursor {
    fn total(&self) -> usize {
        self.total
    }

    async fn next_chunk(&mut self, limit: usize) -> Result<Vec<CatalogItem>> {
        let page = self
            .db
            .fetch_catalog_page(&self.source, self.last_id, limit as i64)
            .await?;

        if let Some(last) = page.last() {
            self.last_id = last.item_id;
        }
        debug!(
            target: TARGET_DB,
            "Fetched {} catalog items for '{}' up to id {}",
            page.len(),
            self.source,
            self.last_id
        );

        Ok(page)
    }
}

use anyhow::Result;
use sqlx::Row;
use tracing::{info, instrument};

use crate::brand::batch::ResultSink;
use crate::brand::types::MatchResult;
use crate::db::core::Database;
use crate::TARGET_DB;

/// Counts shown by `manage_brands stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandStats {
    pub associations: i64,
    pub catalog_items: i64,
    pub matched_items: i64,
    pub unmatched_items: i64,
    pub top_brands: Vec<(String, i64)>,
}

impl Database {
    /// Write the results of one chunk in a single transaction.
    ///
    /// Items that received a final brand get `match_id` set to their record
    /// id, so later runs skip them.
    #[instrument(target = "db", level = "info", skip(self, results))]
    pub async fn store_match_results(
        &self,
        source: &str,
        results: &[MatchResult],
    ) -> Result<(), sqlx::Error> {
        let matched_at = chrono::Utc::now().to_rfc3339();
        let mut transaction = self.pool().begin().await?;

        for result in results {
            let matched_brands = serde_json::to_string(&result.matched_brands)
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

            sqlx::query(
                r#"
                INSERT INTO brand_matches (
                    record_id, item_id, source, source_item_id, matched_brands, final_brand, matched_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(record_id) DO UPDATE SET
                    item_id = excluded.item_id,
                    matched_brands = excluded.matched_brands,
                    final_brand = excluded.final_brand,
                    matched_at = excluded.matched_at
                "#,
            )
            .bind(&result.record_id)
            .bind(result.item_id)
            .bind(source)
            .bind(&result.source_item_id)
            .bind(matched_brands)
            .bind(&result.final_brand)
            .bind(&matched_at)
            .execute(&mut *transaction)
            .await?;

            if result.final_brand.is_some() {
                sqlx::query(
                    "UPDATE catalog_items SET match_id = ?1 WHERE source = ?2 AND source_item_id = ?3",
                )
                .bind(&result.record_id)
                .bind(source)
                .bind(&result.source_item_id)
                .execute(&mut *transaction)
                .await?;
            }
        }

        transaction.commit().await?;
        Ok(())
    }

    pub async fn get_match_result(&self, record_id: &str) -> Result<Option<MatchResult>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT record_id, item_id, source_item_id, matched_brands, final_brand
            FROM brand_matches
            WHERE record_id = ?1
            "#,
        )
        .bind(record_id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let matched_brands: String = row.get("matched_brands");
        let matched_brands =
            serde_json::from_str(&matched_brands).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Some(MatchResult {
            item_id: row.get("item_id"),
            source_item_id: row.get("source_item_id"),
            matched_brands,
            final_brand: row.get("final_brand"),
            record_id: row.get("record_id"),
        }))
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn brand_stats(&self, source: &str, top: i64) -> Result<BrandStats, sqlx::Error> {
        let associations =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM brand_associations")
                .fetch_one(self.pool())
                .await?;
        let catalog_items = self.count_catalog_items(source).await?;
        let matched_items = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM brand_matches WHERE source = ?1 AND final_brand IS NOT NULL",
        )
        .bind(source)
        .fetch_one(self.pool())
        .await?;
        let unmatched_items = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM brand_matches WHERE source = ?1 AND final_brand IS NULL",
        )
        .bind(source)
        .fetch_one(self.pool())
        .await?;

        let top_brands: Vec<(String, i64)> = sqlx::query(
            r#"
            SELECT final_brand, COUNT(*) AS items
            FROM brand_matches
            WHERE source = ?1 AND final_brand IS NOT NULL
            GROUP BY final_brand
            ORDER BY items DESC, final_brand ASC
            LIMIT ?2
            "#,
        )
        .bind(source)
        .bind(top)
        .fetch_all(self.pool())
        .await?
        .iter()
        .map(|row| (row.get("final_brand"), row.get("items")))
        .collect();

        Ok(BrandStats {
            associations,
            catalog_items,
            matched_items,
            unmatched_items,
            top_brands,
        })
    }
}

/// Sink writing each chunk of one source into the database.
pub struct DatabaseSink {
    db: Database,
    source: String,
}

impl DatabaseSink {
    pub fn new(db: &Database, source: &str) -> Self {
        DatabaseSink {
            db: db.clone(),
            source: source.to_string(),
        }
    }
}

impl ResultSink for DatabaseSink {
    async fn persist_chunk(&self, chunk_number: usize, results: &[MatchResult]) -> Result<()> {
        self.db.store_match_results(&self.source, results).await?;
        info!(
            target: TARGET_DB,
            "Stored chunk {} ({} results) for '{}'",
            chunk_number,
            results.len(),
            self.source
        );
        Ok(())
    }
}

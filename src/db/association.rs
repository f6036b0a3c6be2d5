use sqlx::Row;
use tracing::{info, instrument};

use crate::brand::types::BrandAssociation;
use crate::db::core::Database;
use crate::TARGET_DB;

impl Database {
    /// Store association rows as given; normalization happens when the alias
    /// graph is built.
    #[instrument(target = "db", level = "info", skip(self, associations))]
    pub async fn import_brand_associations(
        &self,
        associations: &[BrandAssociation],
    ) -> Result<usize, sqlx::Error> {
        let imported_at = chrono::Utc::now().to_rfc3339();
        let mut transaction = self.pool().begin().await?;

        for association in associations {
            sqlx::query(
                r#"
                INSERT INTO brand_associations (manufacturer_primary, manufacturers_secondary, imported_at)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(&association.primary)
            .bind(&association.secondaries)
            .bind(&imported_at)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        info!(target: TARGET_DB, "Imported {} brand associations", associations.len());

        Ok(associations.len())
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn load_brand_associations(&self) -> Result<Vec<BrandAssociation>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT manufacturer_primary, manufacturers_secondary
            FROM brand_associations
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        let associations: Vec<BrandAssociation> = rows
            .iter()
            .map(|row| BrandAssociation {
                primary: row.get("manufacturer_primary"),
                secondaries: row.get("manufacturers_secondary"),
            })
            .collect();

        info!(target: TARGET_DB, "Loaded {} brand associations", associations.len());
        Ok(associations)
    }

    pub async fn clear_brand_associations(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM brand_associations")
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

//! Part master repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::part::Part;
use crate::Result;

use super::db::Database;
use super::parse_timestamp;

/// Repository for part master records.
#[derive(Clone)]
pub struct PartRepo {
    db: Arc<Database>,
}

#[derive(sqlx::FromRow)]
struct PartRow {
    part_no: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl PartRow {
    fn into_part(self) -> Result<Part> {
        Ok(Part {
            part_no: self.part_no,
            name: self.name,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

impl PartRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create the part if absent; otherwise only fill in a missing name.
    ///
    /// An existing non-empty name is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the statement fails.
    pub async fn upsert(&self, part_no: &str, name: Option<&str>) -> Result<Part> {
        let now = Utc::now().to_rfc3339();
        let name = name.map(str::trim).unwrap_or_default();

        sqlx::query(
            "INSERT INTO part (part_no, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(part_no) DO UPDATE SET
                 name = excluded.name,
                 updated_at = excluded.updated_at
             WHERE part.name = '' AND excluded.name <> ''",
        )
        .bind(part_no)
        .bind(name)
        .bind(&now)
        .execute(self.db.as_ref())
        .await?;

        let row: PartRow = sqlx::query_as("SELECT * FROM part WHERE part_no = ?1")
            .bind(part_no)
            .fetch_one(self.db.as_ref())
            .await?;
        row.into_part()
    }

    /// Retrieve a part by number.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, part_no: &str) -> Result<Option<Part>> {
        let row: Option<PartRow> = sqlx::query_as("SELECT * FROM part WHERE part_no = ?1")
            .bind(part_no)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(PartRow::into_part).transpose()
    }

    /// List all parts ordered by number.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self) -> Result<Vec<Part>> {
        let rows: Vec<PartRow> = sqlx::query_as("SELECT * FROM part ORDER BY part_no")
            .fetch_all(self.db.as_ref())
            .await?;

        rows.into_iter().map(PartRow::into_part).collect()
    }
}

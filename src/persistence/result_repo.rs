//! Inspection result repository for `SQLite` persistence.
//!
//! Results are append-only: there is no update or delete.

use std::sync::Arc;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::models::inspection::{InspectionResult, ResultStatus, Verdict};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_timestamp;

/// Repository for inspection result records.
#[derive(Clone)]
pub struct ResultRepo {
    db: Arc<Database>,
}

/// Filter for paged history listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    /// Restrict to one task.
    pub task_id: Option<String>,
    /// Restrict to one judgment.
    pub judgment: Option<Verdict>,
    /// Rows to skip.
    pub offset: i64,
    /// Maximum rows to return.
    pub limit: i64,
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    id: String,
    task_id: String,
    invoice: String,
    part: String,
    lot_no: String,
    judgment: String,
    action: String,
    status: String,
    inspector: String,
    aql: String,
    sample_size: i64,
    qty_inspected: i64,
    qty_passed: i64,
    qty_failed: i64,
    remark: Option<String>,
    created_at: String,
}

impl ResultRow {
    fn into_result(self) -> Result<InspectionResult> {
        let judgment = Verdict::parse(&self.judgment)
            .map_err(|_| AppError::Db(format!("invalid judgment: {}", self.judgment)))?;

        Ok(InspectionResult {
            id: self.id,
            task_id: self.task_id,
            invoice: self.invoice,
            part: self.part,
            lot_no: self.lot_no,
            judgment,
            action: self.action,
            status: ResultStatus::parse(&self.status)?,
            inspector: self.inspector,
            aql: self.aql,
            sample_size: self.sample_size,
            qty_inspected: self.qty_inspected,
            qty_passed: self.qty_passed,
            qty_failed: self.qty_failed,
            remark: self.remark,
            created_at: parse_timestamp("created_at", &self.created_at)?,
        })
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ResultFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(task_id) = &filter.task_id {
        builder.push(" AND task_id = ").push_bind(task_id.clone());
    }
    if let Some(judgment) = filter.judgment {
        builder.push(" AND judgment = ").push_bind(judgment.as_str());
    }
}

impl ResultRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a result record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create(&self, result: &InspectionResult) -> Result<InspectionResult> {
        let mut conn = self.db.acquire().await?;
        Self::create_on(&mut conn, result).await
    }

    /// Insert a result on a caller-held connection or transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create_on(
        conn: &mut SqliteConnection,
        result: &InspectionResult,
    ) -> Result<InspectionResult> {
        sqlx::query(
            "INSERT INTO inspection_result (id, task_id, invoice, part, lot_no, judgment, action,
             status, inspector, aql, sample_size, qty_inspected, qty_passed, qty_failed, remark,
             created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&result.id)
        .bind(&result.task_id)
        .bind(&result.invoice)
        .bind(&result.part)
        .bind(&result.lot_no)
        .bind(result.judgment.as_str())
        .bind(&result.action)
        .bind(result.status.as_str())
        .bind(&result.inspector)
        .bind(&result.aql)
        .bind(result.sample_size)
        .bind(result.qty_inspected)
        .bind(result.qty_passed)
        .bind(result.qty_failed)
        .bind(&result.remark)
        .bind(result.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(result.clone())
    }

    /// Retrieve a result by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<InspectionResult>> {
        let row: Option<ResultRow> =
            sqlx::query_as("SELECT * FROM inspection_result WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(ResultRow::into_result).transpose()
    }

    /// All results recorded for a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_task(&self, task_id: &str) -> Result<Vec<InspectionResult>> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            "SELECT * FROM inspection_result WHERE task_id = ?1 ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(ResultRow::into_result).collect()
    }

    /// Page through history, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if either query fails.
    pub async fn list(&self, filter: &ResultFilter) -> Result<(Vec<InspectionResult>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM inspection_result");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.db.as_ref())
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM inspection_result");
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let rows: Vec<ResultRow> = select
            .build_query_as::<ResultRow>()
            .fetch_all(self.db.as_ref())
            .await?;

        let results = rows
            .into_iter()
            .map(ResultRow::into_result)
            .collect::<Result<Vec<_>>>()?;
        Ok((results, total))
    }
}

//! Inbound task repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::models::task::{InboundTask, TaskStatus};
use crate::{AppError, Result};

use super::db::Database;
use super::{parse_optional_timestamp, parse_timestamp};

/// Repository wrapper around `SQLite` for inbound task records.
#[derive(Clone)]
pub struct TaskRepo {
    db: Arc<Database>,
}

/// Filter for paged task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Exact status match.
    pub status: Option<TaskStatus>,
    /// Restrict to non-terminal statuses.
    pub active_only: bool,
    /// Substring match on invoice, part, vendor, or lot.
    pub search: Option<String>,
    /// Rows to skip.
    pub offset: i64,
    /// Maximum rows to return.
    pub limit: i64,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    invoice: String,
    po_number: Option<String>,
    vendor: String,
    part: String,
    part_name: Option<String>,
    lot_no: String,
    qty: i64,
    aql: Option<String>,
    status: String,
    received_by: Option<String>,
    received_at: String,
    assigned_to: Option<String>,
    result_id: Option<String>,
    completed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn into_task(self) -> Result<InboundTask> {
        let status = TaskStatus::parse(&self.status)
            .map_err(|_| AppError::Db(format!("invalid task status: {}", self.status)))?;

        Ok(InboundTask {
            id: self.id,
            invoice: self.invoice,
            po_number: self.po_number,
            vendor: self.vendor,
            part: self.part,
            part_name: self.part_name,
            lot_no: self.lot_no,
            qty: self.qty,
            aql: self.aql,
            status,
            received_by: self.received_by,
            received_at: parse_timestamp("received_at", &self.received_at)?,
            assigned_to: self.assigned_to,
            result_id: self.result_id,
            completed_at: parse_optional_timestamp("completed_at", self.completed_at.as_deref())?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

fn push_status_list(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[TaskStatus]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for status in statuses {
        separated.push_bind(status.as_str());
    }
    separated.push_unseparated(")");
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TaskFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if filter.active_only {
        builder.push(" AND status IN ");
        push_status_list(builder, &TaskStatus::ACTIVE);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (invoice LIKE ")
            .push_bind(pattern.clone())
            .push(" OR part LIKE ")
            .push_bind(pattern.clone())
            .push(" OR vendor LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lot_no LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl TaskRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new task record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if an active task already holds the same
    /// (invoice, part, vendor), `AppError::Db` for any other failure.
    pub async fn create(&self, task: &InboundTask) -> Result<InboundTask> {
        sqlx::query(
            "INSERT INTO inbound_task (id, invoice, po_number, vendor, part, part_name, lot_no,
             qty, aql, status, received_by, received_at, assigned_to, result_id, completed_at,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(&task.id)
        .bind(&task.invoice)
        .bind(&task.po_number)
        .bind(&task.vendor)
        .bind(&task.part)
        .bind(&task.part_name)
        .bind(&task.lot_no)
        .bind(task.qty)
        .bind(&task.aql)
        .bind(task.status.as_str())
        .bind(&task.received_by)
        .bind(task.received_at.to_rfc3339())
        .bind(&task.assigned_to)
        .bind(&task.result_id)
        .bind(task.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(task.clone())
    }

    /// Retrieve a task by identifier.
    ///
    /// Returns `Ok(None)` if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<InboundTask>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM inbound_task WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(TaskRow::into_task).transpose()
    }

    /// Find the most recent task for (invoice, part, vendor) in any status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_key(
        &self,
        invoice: &str,
        part: &str,
        vendor: &str,
    ) -> Result<Option<InboundTask>> {
        let row: Option<TaskRow> = sqlx::query_as(
            "SELECT * FROM inbound_task
             WHERE invoice = ?1 AND part = ?2 AND vendor = ?3
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(invoice)
        .bind(part)
        .bind(vendor)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(TaskRow::into_task).transpose()
    }

    /// List every task whose status is one of `statuses`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_statuses(&self, statuses: &[TaskStatus]) -> Result<Vec<InboundTask>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM inbound_task WHERE status IN ");
        push_status_list(&mut builder, statuses);
        builder.push(" ORDER BY received_at ASC");

        let rows: Vec<TaskRow> = builder
            .build_query_as::<TaskRow>()
            .fetch_all(self.db.as_ref())
            .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    /// Page through tasks matching `filter`, newest arrivals first.
    ///
    /// Returns the page together with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if either query fails.
    pub async fn list(&self, filter: &TaskFilter) -> Result<(Vec<InboundTask>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM inbound_task");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.db.as_ref())
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM inbound_task");
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY received_at DESC, created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let rows: Vec<TaskRow> = select
            .build_query_as::<TaskRow>()
            .fetch_all(self.db.as_ref())
            .await?;

        let tasks = rows
            .into_iter()
            .map(TaskRow::into_task)
            .collect::<Result<Vec<_>>>()?;
        Ok((tasks, total))
    }

    /// Move a task from `from` to `to`, guarded on the current status.
    ///
    /// `assigned_to` and `result_id` are only overwritten when `Some`.
    /// Entering a terminal status stamps `completed_at`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the task is no longer in `from`
    /// (another writer moved it first), `AppError::Db` on query failure.
    pub async fn transition(
        &self,
        id: &str,
        from: TaskStatus,
        to: TaskStatus,
        assigned_to: Option<&str>,
        result_id: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.db.acquire().await?;
        Self::transition_on(&mut conn, id, from, to, assigned_to, result_id).await
    }

    /// [`transition`](Self::transition) on a caller-held connection, so it
    /// can share a transaction with other writes.
    ///
    /// # Errors
    ///
    /// Same as [`transition`](Self::transition).
    pub async fn transition_on(
        conn: &mut SqliteConnection,
        id: &str,
        from: TaskStatus,
        to: TaskStatus,
        assigned_to: Option<&str>,
        result_id: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let completed_at = to.is_terminal().then(|| now.clone());

        let outcome = sqlx::query(
            "UPDATE inbound_task SET status = ?1,
                 assigned_to = COALESCE(?2, assigned_to),
                 result_id = COALESCE(?3, result_id),
                 completed_at = COALESCE(?4, completed_at),
                 updated_at = ?5
             WHERE id = ?6 AND status = ?7",
        )
        .bind(to.as_str())
        .bind(assigned_to)
        .bind(result_id)
        .bind(completed_at)
        .bind(&now)
        .bind(id)
        .bind(from.as_str())
        .execute(&mut *conn)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "task {id} is no longer {}",
                from.as_str()
            )));
        }
        Ok(())
    }

    /// Hard-delete a task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no row matched, `AppError::Db` on
    /// query failure.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let outcome = sqlx::query("DELETE FROM inbound_task WHERE id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;

        if outcome.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("task {id} not found")));
        }
        Ok(())
    }
}

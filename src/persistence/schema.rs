//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`, so they are safe to
//! re-run on every server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the local IQC database.
///
/// The partial unique index on `inbound_task` keeps at most one active
/// task per (invoice, part, vendor); a racing second insert fails with a
/// constraint violation instead of duplicating the task.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS part (
    part_no         TEXT PRIMARY KEY NOT NULL,
    name            TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inbound_task (
    id              TEXT PRIMARY KEY NOT NULL,
    invoice         TEXT NOT NULL,
    po_number       TEXT,
    vendor          TEXT NOT NULL DEFAULT '',
    part            TEXT NOT NULL,
    part_name       TEXT,
    lot_no          TEXT NOT NULL,
    qty             INTEGER NOT NULL DEFAULT 0 CHECK(qty >= 0),
    aql             TEXT,
    status          TEXT NOT NULL CHECK(status IN ('pending','awaiting_inspection','in_inspection','released','quarantined')),
    received_by     TEXT,
    received_at     TEXT NOT NULL,
    assigned_to     TEXT,
    result_id       TEXT,
    completed_at    TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inspection_result (
    id              TEXT PRIMARY KEY NOT NULL,
    task_id         TEXT NOT NULL,
    invoice         TEXT NOT NULL,
    part            TEXT NOT NULL,
    lot_no          TEXT NOT NULL,
    judgment        TEXT NOT NULL CHECK(judgment IN ('PASS','FAIL')),
    action          TEXT NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('Passed','Rejected')),
    inspector       TEXT NOT NULL,
    aql             TEXT NOT NULL,
    sample_size     INTEGER NOT NULL,
    qty_inspected   INTEGER NOT NULL,
    qty_passed      INTEGER NOT NULL,
    qty_failed      INTEGER NOT NULL,
    remark          TEXT,
    created_at      TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_task_active_key
    ON inbound_task(invoice, part, vendor)
    WHERE status IN ('pending','awaiting_inspection','in_inspection');
CREATE INDEX IF NOT EXISTS idx_task_status ON inbound_task(status);
CREATE INDEX IF NOT EXISTS idx_task_key ON inbound_task(invoice, part, vendor);
CREATE INDEX IF NOT EXISTS idx_result_task ON inspection_result(task_id);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}

//! Inspection verdicts and the immutable result record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Inspector's final judgment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Lot accepted.
    Pass,
    /// Lot rejected.
    Fail,
}

impl Verdict {
    /// Storage label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }

    /// Parse a storage label, case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for anything but pass/fail.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            other => Err(AppError::Validation(format!("unknown verdict: {other}"))),
        }
    }

    /// Disposition recorded alongside the judgment.
    #[must_use]
    pub fn action(self) -> &'static str {
        match self {
            Self::Pass => "Release to WH",
            Self::Fail => "Hold",
        }
    }
}

/// Status label written to the result and pushed back to the warehouse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResultStatus {
    /// Lot accepted.
    Passed,
    /// Lot rejected.
    Rejected,
}

impl ResultStatus {
    /// Label for the verdict.
    ///
    /// With `inverted` set, reproduces the legacy wiring where PASS was
    /// labelled `Rejected` and FAIL was labelled `Passed`.
    #[must_use]
    pub fn for_verdict(verdict: Verdict, inverted: bool) -> Self {
        match (verdict, inverted) {
            (Verdict::Pass, false) | (Verdict::Fail, true) => Self::Passed,
            (Verdict::Fail, false) | (Verdict::Pass, true) => Self::Rejected,
        }
    }

    /// Storage and upstream label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Rejected => "Rejected",
        }
    }

    /// Parse a storage label.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` for an unknown label.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Passed" => Ok(Self::Passed),
            "Rejected" => Ok(Self::Rejected),
            other => Err(AppError::Db(format!("invalid result status: {other}"))),
        }
    }
}

/// Outcome of a completed inspection. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InspectionResult {
    /// Unique record identifier.
    pub id: String,
    /// Originating task.
    pub task_id: String,
    /// Invoice copied from the task for history views.
    pub invoice: String,
    /// Part copied from the task.
    pub part: String,
    /// Lot copied from the task.
    pub lot_no: String,
    /// PASS or FAIL.
    pub judgment: Verdict,
    /// Disposition, e.g. `Release to WH`.
    pub action: String,
    /// Status label pushed upstream.
    pub status: ResultStatus,
    /// Who performed the inspection.
    pub inspector: String,
    /// AQL code applied.
    pub aql: String,
    /// Sample size the plan required.
    pub sample_size: i64,
    /// Units actually inspected.
    pub qty_inspected: i64,
    /// Units that passed.
    pub qty_passed: i64,
    /// Units that failed.
    pub qty_failed: i64,
    /// Free-text remark.
    pub remark: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl InspectionResult {
    /// Start a result with a fresh id and timestamp. Remaining fields are
    /// filled in by the caller before insert.
    #[must_use]
    pub fn new(task_id: String, judgment: Verdict, status: ResultStatus, inspector: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_id,
            invoice: String::new(),
            part: String::new(),
            lot_no: String::new(),
            judgment,
            action: judgment.action().to_owned(),
            status,
            inspector,
            aql: String::new(),
            sample_size: 0,
            qty_inspected: 0,
            qty_passed: 0,
            qty_failed: 0,
            remark: None,
            created_at: Utc::now(),
        }
    }
}

/// Request body for `POST /api/tasks/{id}/inspection`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SubmitInspection {
    /// Final verdict.
    pub verdict: Verdict,
    /// Inspector name.
    pub inspector: String,
    /// Units inspected; defaults to the plan's sample size capped at qty.
    #[serde(default)]
    pub qty_inspected: Option<i64>,
    /// Units failed; defaults to zero.
    #[serde(default)]
    pub qty_failed: Option<i64>,
    /// Units passed; defaults to inspected minus failed.
    #[serde(default)]
    pub qty_passed: Option<i64>,
    /// Free-text remark.
    #[serde(default)]
    pub remark: Option<String>,
}

//! Part master record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Master data for a part number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Part {
    /// Part number, the natural key.
    pub part_no: String,
    /// Descriptive name; empty until some source supplies one.
    pub name: String,
    /// First time the part was seen.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

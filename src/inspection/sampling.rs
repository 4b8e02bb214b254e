//! AQL sampling plan lookup.
//!
//! Sample size comes from an ordered threshold table evaluated top to
//! bottom with overwrite semantics: every row whose bound the quantity
//! satisfies replaces the current value, so the last satisfied row wins.
//! The table is ordered from the loosest bound to the tightest.

use serde::Serialize;

/// Sample size used when no threshold row matches.
const FALLBACK_SAMPLE_SIZE: i64 = 200;

/// `(max quantity inclusive, sample size)`, loosest bound first.
const SAMPLE_SIZE_TABLE: [(i64, i64); 3] = [(3200, 125), (1200, 80), (500, 50)];

/// AQL code with the tight defect limits.
const TIGHT_AQL: &str = "0.65";

/// General inspection level code. Fixed.
pub const INSPECTION_LEVEL: &str = "K";

/// Sampling requirement for one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SamplingPlan {
    /// Lot quantity the plan was computed for.
    pub qty: i64,
    /// AQL code applied.
    pub aql: String,
    /// Inspection level code.
    pub inspection_level: &'static str,
    /// Units to draw.
    pub sample_size: i64,
    /// Major-defect acceptance limit.
    pub accept_limit: i64,
    /// Minor-defect rejection limit.
    pub reject_limit: i64,
}

/// Sample size for `qty`.
#[must_use]
pub fn sample_size(qty: i64) -> i64 {
    let mut size = FALLBACK_SAMPLE_SIZE;
    for (bound, rows) in SAMPLE_SIZE_TABLE {
        if qty <= bound {
            size = rows;
        }
    }
    size
}

/// `(accept limit, reject limit)` for an AQL code.
#[must_use]
pub fn defect_limits(aql: &str) -> (i64, i64) {
    if aql.trim() == TIGHT_AQL {
        (2, 3)
    } else {
        (5, 7)
    }
}

/// Full plan for a lot of `qty` units under `aql`.
#[must_use]
pub fn sampling_plan(qty: i64, aql: &str) -> SamplingPlan {
    let (accept_limit, reject_limit) = defect_limits(aql);
    SamplingPlan {
        qty,
        aql: aql.trim().to_owned(),
        inspection_level: INSPECTION_LEVEL,
        sample_size: sample_size(qty),
        accept_limit,
        reject_limit,
    }
}

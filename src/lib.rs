#![forbid(unsafe_code)]

//! Incoming quality control tracker.
//!
//! Pulls pending invoices from the warehouse into local inbound tasks,
//! computes AQL sampling plans, records inspection verdicts, and pushes
//! the outcome back upstream.

pub mod api;
pub mod config;
pub mod errors;
pub mod inspection;
pub mod models;
pub mod persistence;
pub mod sync;
pub mod warehouse;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};

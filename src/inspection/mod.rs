//! Inspection state machine and sampling rules.

pub mod sampling;
pub mod workflow;

pub use sampling::{sampling_plan, SamplingPlan};
pub use workflow::{InspectionWorkflow, SubmissionOutcome};

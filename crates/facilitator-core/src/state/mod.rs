//! Per-submission state tracking.

pub mod submission;

pub use submission::{SubmissionState, SubmissionTracker};

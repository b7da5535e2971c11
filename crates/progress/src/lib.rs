//! Learning path progress (Layer 2)
//!
//! Milestone unlock gating, completion bookkeeping, effort estimates and
//! the tracker service that persists progress through the stores.

#![warn(missing_docs)]

pub mod engine;
pub mod estimator;
pub mod overview;
pub mod tracker;

pub use engine::{
    compute_unlock_state, enroll, path_state, record_course_completion, record_task_completion,
    MilestoneState, PathState, ProgressError,
};
pub use estimator::EffortEstimator;
pub use overview::{milestone_summaries, MilestoneSummary, PathOverview};
pub use tracker::{
    BasicProgressTracker, ProgressSnapshot, ProgressTracker, TrackerConfig, TrackerError,
};

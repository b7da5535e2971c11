//! Pathway core data models.
//!
//! This crate defines the catalog records (learning paths and their
//! milestones) and the per-learner progress records that the progress
//! engine derives state from.

#![warn(missing_docs)]

// Core identities
mod id;

// Catalog
mod course;
mod path;

// Enrollment
mod progress;

// Re-exports
pub use id::*;

pub use course::{Course, CourseFilter};
pub use path::{
    CourseRef, Difficulty, ExternalResource, LearningPath, Milestone, PathDuration, PathError,
    PathFilter, PracticeTask,
};
pub use progress::{LearnerProgress, MilestoneProgress};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

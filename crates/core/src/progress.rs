//! Learner progress model - one record per enrollment.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::id::{LearnerId, PathId};
use crate::Time;

/// A learner's progress through one learning path.
///
/// Aggregate fields (`overall_progress`, `is_completed` flags and
/// `current_milestone`) are derived by the progress engine after every
/// completion event and should never be edited directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProgress {
    /// Path this enrollment belongs to
    pub path_id: PathId,

    /// Enrolled learner
    pub learner_id: LearnerId,

    /// Zero-based index of the milestone being worked on
    pub current_milestone: usize,

    /// Per-milestone bookkeeping, keyed by milestone index
    #[serde(default)]
    pub milestone_progress: BTreeMap<usize, MilestoneProgress>,

    /// Percentage of completed milestones (0-100)
    pub overall_progress: u8,

    /// When the learner enrolled
    pub enrolled_at: Time,

    /// Last completion event
    pub updated_at: Time,

    /// Set once the last milestone completes
    #[serde(default)]
    pub completed_at: Option<Time>,

    /// Optimistic concurrency token, managed by the progress store
    #[serde(default)]
    pub version: u64,
}

/// Completion bookkeeping for one milestone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneProgress {
    /// Names of recorded courses
    #[serde(default)]
    pub completed_courses: BTreeSet<String>,

    /// Titles of recorded tasks
    #[serde(default)]
    pub completed_tasks: BTreeSet<String>,

    /// Whether the milestone's completion rule has been met
    #[serde(default)]
    pub is_completed: bool,
}

impl LearnerProgress {
    /// Bookkeeping for a milestone, if any exists.
    pub fn milestone(&self, index: usize) -> Option<&MilestoneProgress> {
        self.milestone_progress.get(&index)
    }

    /// Whether the milestone at `index` is marked complete.
    pub fn is_milestone_completed(&self, index: usize) -> bool {
        self.milestone(index).map(|m| m.is_completed).unwrap_or(false)
    }

    /// Whether the whole path has been completed.
    pub fn is_path_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

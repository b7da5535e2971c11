//! Progress engine - unlock gating, completion bookkeeping and overall
//! progress for one enrollment.
//!
//! Every operation takes the path and the learner's current record and
//! returns a new record (or an error). Nothing here performs I/O or keeps
//! state between calls; persisting the result is the caller's job.

use chrono::Utc;
use pathway_core::{LearnerId, LearnerProgress, LearningPath, MilestoneProgress, PathId};
use serde::{Deserialize, Serialize};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors returned by the progress engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    /// No progress record was supplied
    #[error("learner is not enrolled in this path")]
    NotEnrolled,

    /// Milestone index out of range or still locked
    #[error("milestone {0} does not exist or is locked")]
    InvalidMilestone(usize),

    /// Course name not found in the milestone
    #[error("milestone {milestone} has no course named '{name}'")]
    UnknownCourse {
        /// Milestone index
        milestone: usize,
        /// Requested course name
        name: String,
    },

    /// Task title not found in the milestone
    #[error("milestone {milestone} has no practice task titled '{title}'")]
    UnknownTask {
        /// Milestone index
        milestone: usize,
        /// Requested task title
        title: String,
    },

    /// A record already exists for this learner and path
    #[error("learner {learner} is already enrolled in path {path}")]
    AlreadyEnrolled {
        /// Learner
        learner: LearnerId,
        /// Path
        path: PathId,
    },

    /// The record could not have been produced by this engine
    #[error("progress record is inconsistent with its path: {0}")]
    InvariantViolation(String),
}

/// Derived view state for one milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneState {
    /// Position in the path
    pub milestone_index: usize,
    /// Viewable and, when enrolled, actionable
    pub unlocked: bool,
    /// Completion rule met
    pub completed: bool,
    /// The learner is working on this milestone
    pub current: bool,
}

/// Where an enrollment sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    /// No progress record
    NotEnrolled,
    /// Working on the milestone at this index
    Enrolled(usize),
    /// Every milestone completed
    PathComplete,
}

/// Compute unlock, completion and current flags for every milestone.
///
/// Without a progress record the path is in preview mode: every milestone
/// is viewable and none is current.
pub fn compute_unlock_state(
    path: &LearningPath,
    progress: Option<&LearnerProgress>,
) -> Vec<MilestoneState> {
    (0..path.milestones.len())
        .map(|idx| match progress {
            None => MilestoneState {
                milestone_index: idx,
                unlocked: true,
                completed: false,
                current: false,
            },
            Some(progress) => MilestoneState {
                milestone_index: idx,
                unlocked: is_unlocked(progress, idx),
                completed: progress.is_milestone_completed(idx),
                current: progress.current_milestone == idx,
            },
        })
        .collect()
}

/// Classify an enrollment.
pub fn path_state(path: &LearningPath, progress: Option<&LearnerProgress>) -> PathState {
    match progress {
        None => PathState::NotEnrolled,
        Some(p) if !path.milestones.is_empty() && count_completed(path, p) == path.milestones.len() => {
            PathState::PathComplete
        }
        Some(p) => PathState::Enrolled(p.current_milestone),
    }
}

/// Create the progress record for a new enrollment.
///
/// `existing` is whatever record the caller already holds for this
/// learner; enrolling twice into the same path is rejected.
pub fn enroll(
    path: &LearningPath,
    learner: LearnerId,
    existing: Option<&LearnerProgress>,
) -> Result<LearnerProgress> {
    if let Some(existing) = existing {
        if existing.path_id == path.id && existing.learner_id == learner {
            return Err(ProgressError::AlreadyEnrolled {
                learner,
                path: path.id,
            });
        }
    }

    let now = Utc::now();
    let mut progress = LearnerProgress {
        path_id: path.id,
        learner_id: learner,
        current_milestone: 0,
        milestone_progress: (0..path.milestones.len())
            .map(|idx| (idx, MilestoneProgress::default()))
            .collect(),
        overall_progress: 0,
        enrolled_at: now,
        updated_at: now,
        completed_at: None,
        version: 0,
    };

    settle(path, &mut progress);
    recompute(path, &mut progress);
    Ok(progress)
}

/// Record that the learner finished a course.
pub fn record_course_completion(
    path: &LearningPath,
    progress: Option<&LearnerProgress>,
    milestone_index: usize,
    course_name: &str,
) -> Result<LearnerProgress> {
    record(path, progress, milestone_index, Completion::Course(course_name))
}

/// Record that the learner finished a practice task.
pub fn record_task_completion(
    path: &LearningPath,
    progress: Option<&LearnerProgress>,
    milestone_index: usize,
    task_title: &str,
) -> Result<LearnerProgress> {
    record(path, progress, milestone_index, Completion::Task(task_title))
}

/// Overall progress as a rounded percentage of completed milestones.
pub fn overall_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // round half up without floats
    ((200 * completed + total) / (2 * total)).min(100) as u8
}

#[derive(Debug, Clone, Copy)]
enum Completion<'a> {
    Course(&'a str),
    Task(&'a str),
}

fn record(
    path: &LearningPath,
    progress: Option<&LearnerProgress>,
    index: usize,
    item: Completion<'_>,
) -> Result<LearnerProgress> {
    let progress = progress.ok_or(ProgressError::NotEnrolled)?;
    check_invariants(path, progress)?;

    let milestone = path
        .milestone(index)
        .ok_or(ProgressError::InvalidMilestone(index))?;
    if !is_unlocked(progress, index) {
        return Err(ProgressError::InvalidMilestone(index));
    }

    match item {
        Completion::Course(name) if milestone.course(name).is_none() => {
            return Err(ProgressError::UnknownCourse {
                milestone: index,
                name: name.to_string(),
            });
        }
        Completion::Task(title) if milestone.task(title).is_none() => {
            return Err(ProgressError::UnknownTask {
                milestone: index,
                title: title.to_string(),
            });
        }
        _ => {}
    }

    let mut next = progress.clone();
    let entry = next.milestone_progress.entry(index).or_default();
    let inserted = match item {
        Completion::Course(name) => entry.completed_courses.insert(name.to_string()),
        Completion::Task(title) => entry.completed_tasks.insert(title.to_string()),
    };
    if !inserted {
        return Ok(next);
    }

    next.updated_at = Utc::now();
    evaluate_milestone(path, &mut next, index);
    settle(path, &mut next);
    recompute(path, &mut next);
    Ok(next)
}

fn is_unlocked(progress: &LearnerProgress, index: usize) -> bool {
    index == 0 || progress.is_milestone_completed(index - 1)
}

fn check_invariants(path: &LearningPath, progress: &LearnerProgress) -> Result<()> {
    if progress.path_id != path.id {
        return Err(ProgressError::InvariantViolation(format!(
            "record belongs to path {}, not {}",
            progress.path_id, path.id
        )));
    }
    let len = path.milestones.len();
    if len > 0 && progress.current_milestone >= len {
        return Err(ProgressError::InvariantViolation(format!(
            "current milestone {} out of range for {} milestones",
            progress.current_milestone, len
        )));
    }
    Ok(())
}

/// Apply the completion rule to one milestone. Returns true on the
/// incomplete -> complete transition.
fn evaluate_milestone(path: &LearningPath, progress: &mut LearnerProgress, index: usize) -> bool {
    let Some(milestone) = path.milestone(index) else {
        return false;
    };

    {
        let entry = progress.milestone_progress.entry(index).or_default();
        if entry.is_completed {
            return false;
        }
        let courses_done = milestone
            .required_courses()
            .all(|c| entry.completed_courses.contains(&c.course_name));
        let tasks_done = milestone
            .practice_tasks
            .iter()
            .all(|t| entry.completed_tasks.contains(&t.title));
        if !(courses_done && tasks_done) {
            return false;
        }
        entry.is_completed = true;
    }

    if progress.current_milestone == index && index + 1 < path.milestones.len() {
        progress.current_milestone += 1;
    }
    true
}

/// Move past completed milestones, then complete milestones that became
/// current with nothing left to record.
fn settle(path: &LearningPath, progress: &mut LearnerProgress) {
    // milestones appended after the learner finished the old last one
    while progress.current_milestone + 1 < path.milestones.len()
        && progress.is_milestone_completed(progress.current_milestone)
    {
        progress.current_milestone += 1;
    }

    while progress.current_milestone < path.milestones.len() {
        let current = progress.current_milestone;
        if !evaluate_milestone(path, progress, current) {
            break;
        }
    }
}

fn count_completed(path: &LearningPath, progress: &LearnerProgress) -> usize {
    (0..path.milestones.len())
        .filter(|idx| progress.is_milestone_completed(*idx))
        .count()
}

fn recompute(path: &LearningPath, progress: &mut LearnerProgress) {
    let total = path.milestones.len();
    let completed = count_completed(path, progress);
    progress.overall_progress = overall_percentage(completed, total);

    if total > 0 && completed == total {
        if progress.completed_at.is_none() {
            progress.completed_at = Some(progress.updated_at);
        }
    } else {
        progress.completed_at = None;
    }
}

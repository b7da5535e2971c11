//! Remaining-effort and completion time estimation.

use chrono::{DateTime, Duration, Utc};
use pathway_core::{LearnerProgress, LearningPath};

/// Effort estimator based on the hours attached to courses and tasks.
pub struct EffortEstimator;

impl EffortEstimator {
    /// Hours of required work not yet recorded.
    ///
    /// Optional courses are left out; completed milestones contribute
    /// nothing. Without a record the whole path is outstanding.
    pub fn remaining_hours(&self, path: &LearningPath, progress: Option<&LearnerProgress>) -> f32 {
        path.milestones
            .iter()
            .enumerate()
            .map(|(idx, milestone)| {
                let entry = progress.and_then(|p| p.milestone(idx));
                if entry.map(|e| e.is_completed).unwrap_or(false) {
                    return 0.0;
                }

                let courses: f32 = milestone
                    .required_courses()
                    .filter(|c| !entry.is_some_and(|e| e.completed_courses.contains(&c.course_name)))
                    .map(|c| c.estimated_hours)
                    .sum();
                let tasks: f32 = milestone
                    .practice_tasks
                    .iter()
                    .filter(|t| !entry.is_some_and(|e| e.completed_tasks.contains(&t.title)))
                    .map(|t| t.estimated_hours)
                    .sum();
                courses + tasks
            })
            .sum()
    }

    /// Estimate when the learner finishes at a steady weekly pace.
    pub fn estimate_completion(
        &self,
        path: &LearningPath,
        progress: Option<&LearnerProgress>,
        hours_per_week: f32,
    ) -> Option<DateTime<Utc>> {
        if let Some(done) = progress.and_then(|p| p.completed_at) {
            return Some(done);
        }
        if hours_per_week <= 0.0 {
            return None;
        }

        let remaining = self.remaining_hours(path, progress);
        if remaining <= 0.0 {
            return Some(Utc::now());
        }

        let days = (remaining / hours_per_week * 7.0).ceil() as i64;
        Some(Utc::now() + Duration::days(days))
    }
}

impl Default for EffortEstimator {
    fn default() -> Self {
        Self
    }
}

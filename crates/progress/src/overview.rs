//! Display-side derivations: per-milestone counters and path summaries.

use pathway_core::{LearnerProgress, LearningPath, PathId};
use serde::Serialize;

/// Completion counters shown next to a milestone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneSummary {
    /// Recorded courses, required or not
    pub completed_courses: usize,
    /// All courses in the milestone
    pub total_courses: usize,
    /// Recorded tasks
    pub completed_tasks: usize,
    /// All tasks in the milestone
    pub total_tasks: usize,
}

/// Counters for every milestone of `path`. Without a record every
/// completed count is zero.
pub fn milestone_summaries(
    path: &LearningPath,
    progress: Option<&LearnerProgress>,
) -> Vec<MilestoneSummary> {
    path.milestones
        .iter()
        .enumerate()
        .map(|(idx, milestone)| {
            let entry = progress.and_then(|p| p.milestone(idx));
            MilestoneSummary {
                completed_courses: entry.map(|e| e.completed_courses.len()).unwrap_or(0),
                total_courses: milestone.courses.len(),
                completed_tasks: entry.map(|e| e.completed_tasks.len()).unwrap_or(0),
                total_tasks: milestone.practice_tasks.len(),
            }
        })
        .collect()
}

/// Catalog-level summary of a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOverview {
    /// Path
    pub path_id: PathId,
    /// Title
    pub title: String,
    /// Number of milestones
    pub milestones: usize,
    /// Number of courses across milestones
    pub total_courses: usize,
    /// Number of practice tasks across milestones
    pub total_tasks: usize,
    /// Estimated hours of every course and task
    pub estimated_hours: f32,
    /// Skills taught, without duplicates
    pub skills: Vec<String>,
    /// Learners enrolled, when known
    pub enrollment_count: Option<usize>,
}

impl PathOverview {
    /// Summarize a path.
    pub fn of(path: &LearningPath) -> Self {
        let estimated_hours = path
            .milestones
            .iter()
            .map(|m| {
                m.courses.iter().map(|c| c.estimated_hours).sum::<f32>()
                    + m.practice_tasks.iter().map(|t| t.estimated_hours).sum::<f32>()
            })
            .sum();

        Self {
            path_id: path.id,
            title: path.title.clone(),
            milestones: path.milestones.len(),
            total_courses: path.count_courses(),
            total_tasks: path.milestones.iter().map(|m| m.practice_tasks.len()).sum(),
            estimated_hours,
            skills: path.skills().into_iter().map(str::to_string).collect(),
            enrollment_count: None,
        }
    }

    /// Attach an enrollment count.
    pub fn with_enrollments(mut self, count: usize) -> Self {
        self.enrollment_count = Some(count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use pathway_core::{CourseRef, LearnerId, Milestone, PracticeTask};

    fn path() -> LearningPath {
        let mut path = LearningPath::new("Mobile Developer", "Mobile Development");
        let mut first = Milestone::new("Kotlin")
            .with_course(CourseRef::required("Kotlin basics", 6.0))
            .with_course(CourseRef::optional("Gradle tour", 1.5))
            .with_task(PracticeTask::new("Todo app", 4.0));
        first.skills = vec!["kotlin".into(), "gradle".into()];
        let mut second = Milestone::new("Compose").with_course(CourseRef::required("Compose", 8.0));
        second.skills = vec!["compose".into(), "kotlin".into()];
        path.push_milestone(first);
        path.push_milestone(second);
        path
    }

    #[test]
    fn test_overview_totals() {
        let overview = PathOverview::of(&path()).with_enrollments(4);
        assert_eq!(overview.milestones, 2);
        assert_eq!(overview.total_courses, 3);
        assert_eq!(overview.total_tasks, 1);
        assert!((overview.estimated_hours - 19.5).abs() < f32::EPSILON);
        assert_eq!(overview.skills, vec!["kotlin", "gradle", "compose"]);
        assert_eq!(overview.enrollment_count, Some(4));
    }

    #[test]
    fn test_summaries_count_optional_courses() {
        let path = path();
        let progress = engine::enroll(&path, LearnerId::new("lin"), None).unwrap();
        let progress =
            engine::record_course_completion(&path, Some(&progress), 0, "Gradle tour").unwrap();

        let summaries = milestone_summaries(&path, Some(&progress));
        assert_eq!(
            summaries[0],
            MilestoneSummary {
                completed_courses: 1,
                total_courses: 2,
                completed_tasks: 0,
                total_tasks: 1,
            }
        );
        assert_eq!(summaries[1].completed_courses, 0);
    }

    #[test]
    fn test_summaries_without_enrollment() {
        let summaries = milestone_summaries(&path(), None);
        assert!(summaries.iter().all(|s| s.completed_courses == 0 && s.completed_tasks == 0));
    }
}

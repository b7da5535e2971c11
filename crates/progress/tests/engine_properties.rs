use pathway_core::{CourseRef, LearnerId, LearnerProgress, LearningPath, Milestone, PracticeTask};
use pathway_progress::{
    compute_unlock_state, enroll, record_course_completion, record_task_completion,
};
use proptest::prelude::*;

/// (required courses, optional courses, tasks) per milestone
fn build_path(shape: &[(usize, usize, usize)]) -> LearningPath {
    let mut path = LearningPath::new("Generated", "Data Science");
    for (idx, (required, optional, tasks)) in shape.iter().enumerate() {
        let mut milestone = Milestone::new(format!("M{idx}"));
        for c in 0..*required {
            milestone = milestone.with_course(CourseRef::required(format!("req-{c}"), 1.0));
        }
        for c in 0..*optional {
            milestone = milestone.with_course(CourseRef::optional(format!("opt-{c}"), 1.0));
        }
        for t in 0..*tasks {
            milestone = milestone.with_task(PracticeTask::new(format!("task-{t}"), 1.0));
        }
        path.push_milestone(milestone);
    }
    path
}

#[derive(Debug, Clone)]
enum Op {
    Course { milestone: usize, item: usize },
    Task { milestone: usize, item: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6usize, 0..5usize).prop_map(|(milestone, item)| Op::Course { milestone, item }),
        (0..6usize, 0..4usize).prop_map(|(milestone, item)| Op::Task { milestone, item }),
    ]
}

fn apply(path: &LearningPath, progress: &LearnerProgress, op: &Op) -> Option<LearnerProgress> {
    match op {
        Op::Course { milestone, item } => {
            let name = path
                .milestone(*milestone)
                .and_then(|m| m.courses.get(*item))
                .map(|c| c.course_name.clone())
                .unwrap_or_else(|| "missing".to_string());
            record_course_completion(path, Some(progress), *milestone, &name).ok()
        }
        Op::Task { milestone, item } => {
            let title = path
                .milestone(*milestone)
                .and_then(|m| m.practice_tasks.get(*item))
                .map(|t| t.title.clone())
                .unwrap_or_else(|| "missing".to_string());
            record_task_completion(path, Some(progress), *milestone, &title).ok()
        }
    }
}

fn check_invariants(path: &LearningPath, progress: &LearnerProgress) {
    let states = compute_unlock_state(path, Some(progress));
    for state in &states {
        if state.unlocked {
            for earlier in 0..state.milestone_index {
                assert!(
                    progress.is_milestone_completed(earlier),
                    "milestone {} unlocked while {} incomplete",
                    state.milestone_index,
                    earlier
                );
            }
        }
    }

    assert!(progress.overall_progress <= 100);
    let all_done = !path.milestones.is_empty()
        && (0..path.milestones.len()).all(|i| progress.is_milestone_completed(i));
    assert_eq!(progress.overall_progress == 100, all_done);

    if !path.milestones.is_empty() {
        assert!(progress.current_milestone < path.milestones.len());
    }
}

proptest! {
    #[test]
    fn prop_invariants_hold_under_any_sequence(
        shape in proptest::collection::vec((0..3usize, 0..2usize, 0..3usize), 0..5),
        ops in proptest::collection::vec(op_strategy(), 0..60),
    ) {
        let path = build_path(&shape);
        let mut progress = enroll(&path, LearnerId::new("prop"), None).unwrap();
        check_invariants(&path, &progress);

        for op in &ops {
            let before = progress.clone();
            if let Some(next) = apply(&path, &progress, op) {
                prop_assert!(next.current_milestone >= before.current_milestone);
                progress = next;
            }
            check_invariants(&path, &progress);
        }
    }

    #[test]
    fn prop_recording_twice_equals_recording_once(
        shape in proptest::collection::vec((1..3usize, 0..2usize, 0..3usize), 1..4),
        ops in proptest::collection::vec(op_strategy(), 1..30),
    ) {
        let path = build_path(&shape);
        let mut progress = enroll(&path, LearnerId::new("prop"), None).unwrap();

        for op in &ops {
            if let Some(once) = apply(&path, &progress, op) {
                let twice = apply(&path, &once, op).expect("second identical call succeeds");
                prop_assert_eq!(&once, &twice);
                progress = once;
            }
        }
    }

    #[test]
    fn prop_completing_everything_reaches_one_hundred(
        shape in proptest::collection::vec((0..3usize, 0..2usize, 0..3usize), 1..5),
    ) {
        let path = build_path(&shape);
        let mut progress = enroll(&path, LearnerId::new("prop"), None).unwrap();

        for (idx, milestone) in path.milestones.iter().enumerate() {
            for course in milestone.required_courses() {
                progress = record_course_completion(&path, Some(&progress), idx, &course.course_name).unwrap();
            }
            for task in &milestone.practice_tasks {
                progress = record_task_completion(&path, Some(&progress), idx, &task.title).unwrap();
            }
        }

        prop_assert_eq!(progress.overall_progress, 100);
        prop_assert_eq!(progress.current_milestone, path.milestones.len() - 1);
        prop_assert!(progress.is_path_complete());
    }
}

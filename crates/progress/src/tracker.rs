//! Progress tracking service.
//!
//! Loads the path and the learner's record from storage, runs the engine
//! and writes the result back.

use async_trait::async_trait;
use pathway_core::{LearnerId, LearnerProgress, LearningPath, PathId};
use pathway_storage::{Storage, StorageError};
use tracing::{debug, info};

use crate::engine::{self, MilestoneState, PathState, ProgressError};
use crate::estimator::EffortEstimator;
use crate::overview::{milestone_summaries, MilestoneSummary, PathOverview};

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors returned by the progress tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// No such path in the catalog
    #[error("learning path {0} not found")]
    PathNotFound(PathId),

    /// The path is hidden from learners
    #[error("learning path {0} is not open for enrollment")]
    PathInactive(PathId),

    /// Rejected by the progress engine
    #[error(transparent)]
    Progress(#[from] ProgressError),

    /// Storage failure, including version conflicts
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Configuration for the progress tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    /// Let learners enroll into inactive paths
    pub allow_inactive_enrollment: bool,
}

/// Progress tracking service.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Enroll a learner into a path.
    async fn enroll(&mut self, learner: &LearnerId, path_id: PathId) -> Result<LearnerProgress>;

    /// Record a finished course.
    async fn complete_course(
        &mut self,
        learner: &LearnerId,
        path_id: PathId,
        milestone: usize,
        course_name: &str,
    ) -> Result<LearnerProgress>;

    /// Record a finished practice task.
    async fn complete_task(
        &mut self,
        learner: &LearnerId,
        path_id: PathId,
        milestone: usize,
        task_title: &str,
    ) -> Result<LearnerProgress>;

    /// Unlock state; preview mode without a learner or enrollment.
    async fn unlock_state(
        &self,
        learner: Option<&LearnerId>,
        path_id: PathId,
    ) -> Result<Vec<MilestoneState>>;

    /// Every path a learner is enrolled in.
    async fn enrolled_paths(&self, learner: &LearnerId) -> Result<Vec<LearnerProgress>>;

    /// Catalog summary with enrollment count.
    async fn overview(&self, path_id: PathId) -> Result<PathOverview>;

    /// Everything needed to render one path for one learner.
    async fn snapshot(&self, learner: Option<&LearnerId>, path_id: PathId)
        -> Result<ProgressSnapshot>;
}

/// A learner's view of a path at a point in time.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// The path
    pub path: LearningPath,

    /// The learner's record, if enrolled
    pub progress: Option<LearnerProgress>,

    /// Lifecycle position
    pub state: PathState,

    /// Unlock flags per milestone
    pub milestones: Vec<MilestoneState>,

    /// Completion counters per milestone
    pub summaries: Vec<MilestoneSummary>,

    /// Required hours left
    pub remaining_hours: f32,
}

/// Basic progress tracker implementation.
pub struct BasicProgressTracker<S: Storage> {
    storage: S,
    config: TrackerConfig,
}

impl<S: Storage> BasicProgressTracker<S> {
    /// Create a new progress tracker.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: TrackerConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Borrow the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably borrow the storage backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    async fn load_path(&self, path_id: PathId) -> Result<LearningPath> {
        self.storage
            .load_path(path_id)
            .await?
            .ok_or(TrackerError::PathNotFound(path_id))
    }

    /// Load both records, apply `apply`, persist the result if it changed.
    async fn apply<F>(&mut self, learner: &LearnerId, path_id: PathId, apply: F) -> Result<LearnerProgress>
    where
        F: FnOnce(&LearningPath, Option<&LearnerProgress>) -> engine::Result<LearnerProgress> + Send,
    {
        let path = self.load_path(path_id).await?;
        let current = self.storage.load_progress(learner, path_id).await?;

        let mut next = apply(&path, current.as_ref())?;
        if current.as_ref() == Some(&next) {
            debug!(learner = %learner, path = %path_id, "completion already recorded");
            return Ok(next);
        }

        next.version = self.storage.save_progress(&next).await?;

        if let Some(before) = &current {
            if next.current_milestone != before.current_milestone {
                info!(
                    learner = %learner,
                    path = %path_id,
                    milestone = next.current_milestone,
                    "advanced to next milestone"
                );
            }
            if next.is_path_complete() && !before.is_path_complete() {
                info!(learner = %learner, path = %path_id, "learning path completed");
            }
        }
        Ok(next)
    }
}

#[async_trait]
impl<S: Storage + 'static> ProgressTracker for BasicProgressTracker<S> {
    async fn enroll(&mut self, learner: &LearnerId, path_id: PathId) -> Result<LearnerProgress> {
        let path = self.load_path(path_id).await?;
        if !path.is_active && !self.config.allow_inactive_enrollment {
            return Err(TrackerError::PathInactive(path_id));
        }

        let existing = self.storage.load_progress(learner, path_id).await?;
        let mut progress = engine::enroll(&path, learner.clone(), existing.as_ref())?;
        progress.version = self.storage.save_progress(&progress).await?;

        info!(learner = %learner, path = %path_id, title = %path.title, "enrolled");
        Ok(progress)
    }

    async fn complete_course(
        &mut self,
        learner: &LearnerId,
        path_id: PathId,
        milestone: usize,
        course_name: &str,
    ) -> Result<LearnerProgress> {
        let progress = self
            .apply(learner, path_id, |path, current| {
                engine::record_course_completion(path, current, milestone, course_name)
            })
            .await?;
        info!(
            learner = %learner,
            path = %path_id,
            milestone,
            course = course_name,
            overall = progress.overall_progress,
            "course completed"
        );
        Ok(progress)
    }

    async fn complete_task(
        &mut self,
        learner: &LearnerId,
        path_id: PathId,
        milestone: usize,
        task_title: &str,
    ) -> Result<LearnerProgress> {
        let progress = self
            .apply(learner, path_id, |path, current| {
                engine::record_task_completion(path, current, milestone, task_title)
            })
            .await?;
        info!(
            learner = %learner,
            path = %path_id,
            milestone,
            task = task_title,
            overall = progress.overall_progress,
            "task completed"
        );
        Ok(progress)
    }

    async fn unlock_state(
        &self,
        learner: Option<&LearnerId>,
        path_id: PathId,
    ) -> Result<Vec<MilestoneState>> {
        let path = self.load_path(path_id).await?;
        let progress = match learner {
            Some(learner) => self.storage.load_progress(learner, path_id).await?,
            None => None,
        };
        debug!(path = %path_id, enrolled = progress.is_some(), "computing unlock state");
        Ok(engine::compute_unlock_state(&path, progress.as_ref()))
    }

    async fn enrolled_paths(&self, learner: &LearnerId) -> Result<Vec<LearnerProgress>> {
        Ok(self.storage.list_progress(learner).await?)
    }

    async fn overview(&self, path_id: PathId) -> Result<PathOverview> {
        let path = self.load_path(path_id).await?;
        let enrollments = self.storage.count_enrollments(path_id).await?;
        Ok(PathOverview::of(&path).with_enrollments(enrollments))
    }

    async fn snapshot(
        &self,
        learner: Option<&LearnerId>,
        path_id: PathId,
    ) -> Result<ProgressSnapshot> {
        let path = self.load_path(path_id).await?;
        let progress = match learner {
            Some(learner) => self.storage.load_progress(learner, path_id).await?,
            None => None,
        };

        let milestones = engine::compute_unlock_state(&path, progress.as_ref());
        let summaries = milestone_summaries(&path, progress.as_ref());
        let state = engine::path_state(&path, progress.as_ref());
        let remaining_hours = EffortEstimator.remaining_hours(&path, progress.as_ref());

        Ok(ProgressSnapshot {
            path,
            progress,
            state,
            milestones,
            summaries,
            remaining_hours,
        })
    }
}

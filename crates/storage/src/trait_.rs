//! Storage trait abstraction.

use std::collections::BTreeSet;

use async_trait::async_trait;
use pathway_core::{
    Course, CourseFilter, CourseId, LearnerId, LearnerProgress, LearningPath, PathFilter, PathId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record changed since it was loaded
    #[error("Conflict: progress of {learner} on {path} is at version {found}, caller had {expected}")]
    Conflict {
        /// Learner
        learner: LearnerId,
        /// Path
        path: PathId,
        /// Version the caller loaded
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Read/write access to learning paths and the course catalog.
///
/// Learners only read; the admin workflow writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Save a path (create or update).
    async fn save_path(&mut self, path: &LearningPath) -> Result<()>;

    /// Load a path by ID.
    async fn load_path(&self, id: PathId) -> Result<Option<LearningPath>>;

    /// Load a path, failing with [`StorageError::NotFound`] when absent.
    async fn get_path(&self, id: PathId) -> Result<LearningPath> {
        self.load_path(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("learning path {id}")))
    }

    /// List paths matching the filter, oldest first.
    async fn list_paths(&self, filter: &PathFilter) -> Result<Vec<LearningPath>>;

    /// Delete a path. Deleting a missing path is not an error.
    async fn delete_path(&mut self, id: PathId) -> Result<()>;

    /// Save an imported path.
    ///
    /// A path carrying the source id of an earlier import replaces that
    /// path, keeping its id and creation time. Returns the stored path and
    /// whether it replaced one.
    async fn import_path(&mut self, mut path: LearningPath) -> Result<(LearningPath, bool)> {
        let previous = match path.source_id.clone() {
            Some(source) => self
                .list_paths(&PathFilter::all())
                .await?
                .into_iter()
                .find(|p| p.source_id.as_deref() == Some(source.as_str())),
            None => None,
        };

        let replaced = previous.is_some();
        if let Some(previous) = previous {
            path.id = previous.id;
            path.created_at = previous.created_at;
        }
        self.save_path(&path).await?;
        Ok((path, replaced))
    }

    /// Save a course (create or update).
    async fn save_course(&mut self, course: &Course) -> Result<()>;

    /// Load a course by ID.
    async fn load_course(&self, id: CourseId) -> Result<Option<Course>>;

    /// List courses matching the filter, by name.
    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>>;

    /// Distinct platforms across all courses, sorted.
    async fn list_platforms(&self) -> Result<Vec<String>> {
        let platforms: BTreeSet<String> = self
            .list_courses(&CourseFilter::default())
            .await?
            .into_iter()
            .map(|c| c.platform)
            .filter(|p| !p.is_empty())
            .collect();
        Ok(platforms.into_iter().collect())
    }

    /// Save an imported course, replacing an earlier import of the same
    /// source record.
    async fn import_course(&mut self, mut course: Course) -> Result<(Course, bool)> {
        let previous = match course.source_id.clone() {
            Some(source) => self
                .list_courses(&CourseFilter::default())
                .await?
                .into_iter()
                .find(|c| c.source_id.as_deref() == Some(source.as_str())),
            None => None,
        };

        let replaced = previous.is_some();
        if let Some(previous) = previous {
            course.id = previous.id;
            course.created_at = previous.created_at;
        }
        self.save_course(&course).await?;
        Ok((course, replaced))
    }
}

/// Persistence for enrollment records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load a learner's record for a path.
    async fn load_progress(&self, learner: &LearnerId, path: PathId)
        -> Result<Option<LearnerProgress>>;

    /// Save a record with optimistic concurrency.
    ///
    /// `progress.version` must equal the stored version (0 when nothing is
    /// stored yet), otherwise [`StorageError::Conflict`] is returned. On
    /// success the record is stored under the next version, which is
    /// returned.
    async fn save_progress(&mut self, progress: &LearnerProgress) -> Result<u64>;

    /// All records of one learner.
    async fn list_progress(&self, learner: &LearnerId) -> Result<Vec<LearnerProgress>>;

    /// Number of learners enrolled in a path.
    async fn count_enrollments(&self, path: PathId) -> Result<usize>;
}

/// A backend that serves both the catalog and enrollment records.
pub trait Storage: CatalogStore + ProgressStore {}

impl<T: CatalogStore + ProgressStore> Storage for T {}

/// Check an incoming record against the stored version.
pub(crate) fn check_version(progress: &LearnerProgress, stored: u64) -> Result<u64> {
    if progress.version != stored {
        return Err(StorageError::Conflict {
            learner: progress.learner_id.clone(),
            path: progress.path_id,
            expected: progress.version,
            found: stored,
        });
    }
    Ok(stored + 1)
}

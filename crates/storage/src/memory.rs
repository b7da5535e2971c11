//! In-memory storage, for previews and tests.

use std::collections::HashMap;

use pathway_core::{
    Course, CourseFilter, CourseId, LearnerId, LearnerProgress, LearningPath, PathFilter, PathId,
};

use super::trait_::check_version;
use super::{CatalogStore, ProgressStore, Result};

/// Storage backend that keeps everything in hash maps.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    paths: HashMap<PathId, LearningPath>,
    courses: HashMap<CourseId, Course>,
    progress: HashMap<(LearnerId, PathId), LearnerProgress>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStorage {
    async fn save_path(&mut self, path: &LearningPath) -> Result<()> {
        self.paths.insert(path.id, path.clone());
        Ok(())
    }

    async fn load_path(&self, id: PathId) -> Result<Option<LearningPath>> {
        Ok(self.paths.get(&id).cloned())
    }

    async fn list_paths(&self, filter: &PathFilter) -> Result<Vec<LearningPath>> {
        let mut paths: Vec<_> = self
            .paths
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        paths.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(paths)
    }

    async fn delete_path(&mut self, id: PathId) -> Result<()> {
        self.paths.remove(&id);
        Ok(())
    }

    async fn save_course(&mut self, course: &Course) -> Result<()> {
        self.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn load_course(&self, id: CourseId) -> Result<Option<Course>> {
        Ok(self.courses.get(&id).cloned())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let mut courses: Vec<_> = self
            .courses
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(courses)
    }
}

#[async_trait::async_trait]
impl ProgressStore for MemoryStorage {
    async fn load_progress(
        &self,
        learner: &LearnerId,
        path: PathId,
    ) -> Result<Option<LearnerProgress>> {
        Ok(self.progress.get(&(learner.clone(), path)).cloned())
    }

    async fn save_progress(&mut self, progress: &LearnerProgress) -> Result<u64> {
        let key = (progress.learner_id.clone(), progress.path_id);
        let stored = self.progress.get(&key).map(|p| p.version).unwrap_or(0);
        let version = check_version(progress, stored)?;

        let mut record = progress.clone();
        record.version = version;
        self.progress.insert(key, record);
        Ok(version)
    }

    async fn list_progress(&self, learner: &LearnerId) -> Result<Vec<LearnerProgress>> {
        let mut records: Vec<_> = self
            .progress
            .values()
            .filter(|p| &p.learner_id == learner)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at));
        Ok(records)
    }

    async fn count_enrollments(&self, path: PathId) -> Result<usize> {
        Ok(self.progress.keys().filter(|(_, p)| *p == path).count())
    }
}

//! JSON file storage implementation.
//!
//! Stores data as JSON files under a root directory (`.pathway` by default)
//! and keeps small per-object meta markers (version + updated_at). Files are
//! written to a temporary name and renamed into place, so readers see either
//! the old or the new record.
//!
//! A progress save holds an exclusive lock on the record's `.lock` file
//! while it checks the stored `version` and writes, so writers in other
//! processes (or other `JsonStorage` handles) cannot both pass the check.
//!
//! Layout:
//! ```text
//! paths/<path_id>.json
//! courses/<course_id>.json
//! progress/<learner>/<path_id>.json
//! meta/paths/<path_id>.meta.json
//! meta/progress/<learner>/<path_id>.meta.json
//! meta/progress/<learner>/<path_id>.lock
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;
use pathway_core::{
    Course, CourseFilter, CourseId, LearnerId, LearnerProgress, LearningPath, PathFilter, PathId,
};
use tokio::fs;
use tracing::{debug, warn};

use super::trait_::check_version;
use super::{CatalogStore, ProgressStore, Result, StorageError};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage, creating the directories it needs under `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("paths")).await?;
        fs::create_dir_all(root.join("courses")).await?;
        fs::create_dir_all(root.join("progress")).await?;
        fs::create_dir_all(root.join("meta").join("paths")).await?;
        fs::create_dir_all(root.join("meta").join("progress")).await?;

        debug!(root = %root.display(), "opened JSON storage");
        Ok(Self { root })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_file(&self, id: PathId) -> PathBuf {
        self.root.join("paths").join(format!("{}.json", id))
    }

    fn course_file(&self, id: CourseId) -> PathBuf {
        self.root.join("courses").join(format!("{}.json", id))
    }

    fn learner_dir(&self, learner: &LearnerId) -> PathBuf {
        self.root.join("progress").join(file_key(learner.as_str()))
    }

    fn progress_file(&self, learner: &LearnerId, path: PathId) -> PathBuf {
        self.learner_dir(learner).join(format!("{}.json", path))
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join("meta").join(kind).join(format!("{}.meta.json", id))
    }

    fn progress_meta_id(learner: &LearnerId, path: PathId) -> String {
        format!("{}/{}", file_key(learner.as_str()), path)
    }

    /// Block (off the runtime) until this handle owns the record's lock.
    async fn lock_record(&self, meta_id: &str) -> Result<RecordLock> {
        let path = self
            .root
            .join("meta")
            .join("progress")
            .join(format!("{}.lock", meta_id));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(|e| StorageError::Other(format!("lock task failed: {e}")))??;

        Ok(RecordLock { file })
    }

    /// Read the stored version of an object, 0 when it has none.
    async fn read_version(&self, kind: &str, id: &str) -> Result<u64> {
        let path = self.meta_path(kind, id);
        match fs::read_to_string(&path).await {
            Ok(s) => {
                let json: serde_json::Value = serde_json::from_str(&s)?;
                Ok(json.get("version").and_then(|v| v.as_u64()).unwrap_or(0))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_version(&self, kind: &str, id: &str, version: u64) -> Result<()> {
        let path = self.meta_path(kind, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        write_atomic(&path, serde_json::to_string_pretty(&meta)?.as_bytes()).await
    }
}

/// Exclusive lock on one progress record, released on drop.
struct RecordLock {
    file: std::fs::File,
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        // closing the file releases the lock as well
        let _ = FileExt::unlock(&self.file);
    }
}

#[async_trait::async_trait]
impl CatalogStore for JsonStorage {
    async fn save_path(&mut self, path: &LearningPath) -> Result<()> {
        let file = self.path_file(path.id);
        let json = serde_json::to_string_pretty(path)?;
        write_atomic(&file, json.as_bytes()).await?;

        let id_str = path.id.to_string();
        let version = self.read_version("paths", &id_str).await? + 1;
        self.write_version("paths", &id_str, version).await?;

        debug!(path = %path.id, version, "saved learning path");
        Ok(())
    }

    async fn load_path(&self, id: PathId) -> Result<Option<LearningPath>> {
        read_json(&self.path_file(id)).await
    }

    async fn list_paths(&self, filter: &PathFilter) -> Result<Vec<LearningPath>> {
        let all: Vec<LearningPath> = list_dir(&self.root.join("paths")).await?;
        let mut paths: Vec<_> = all.into_iter().filter(|p| filter.matches(p)).collect();
        paths.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(paths)
    }

    async fn delete_path(&mut self, id: PathId) -> Result<()> {
        remove_if_exists(&self.path_file(id)).await?;
        remove_if_exists(&self.meta_path("paths", &id.to_string())).await?;
        Ok(())
    }

    async fn save_course(&mut self, course: &Course) -> Result<()> {
        let json = serde_json::to_string_pretty(course)?;
        write_atomic(&self.course_file(course.id), json.as_bytes()).await?;
        debug!(course = %course.id, name = %course.name, "saved course");
        Ok(())
    }

    async fn load_course(&self, id: CourseId) -> Result<Option<Course>> {
        read_json(&self.course_file(id)).await
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let all: Vec<Course> = list_dir(&self.root.join("courses")).await?;
        let mut courses: Vec<_> = all.into_iter().filter(|c| filter.matches(c)).collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(courses)
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonStorage {
    async fn load_progress(
        &self,
        learner: &LearnerId,
        path: PathId,
    ) -> Result<Option<LearnerProgress>> {
        read_json(&self.progress_file(learner, path)).await
    }

    async fn save_progress(&mut self, progress: &LearnerProgress) -> Result<u64> {
        let meta_id = Self::progress_meta_id(&progress.learner_id, progress.path_id);
        let _lock = self.lock_record(&meta_id).await?;

        // the stored record's own version is the token
        let file = self.progress_file(&progress.learner_id, progress.path_id);
        let stored = read_json::<LearnerProgress>(&file)
            .await?
            .map(|p| p.version)
            .unwrap_or(0);
        let version = check_version(progress, stored)?;

        let mut record = progress.clone();
        record.version = version;

        fs::create_dir_all(self.learner_dir(&progress.learner_id)).await?;
        let json = serde_json::to_string_pretty(&record)?;
        write_atomic(&file, json.as_bytes()).await?;

        if let Err(e) = self.write_version("progress", &meta_id, version).await {
            warn!(record = %meta_id, error = %e, "failed to update progress meta");
        }
        Ok(version)
    }

    async fn list_progress(&self, learner: &LearnerId) -> Result<Vec<LearnerProgress>> {
        let dir = self.learner_dir(learner);
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }
        let mut records: Vec<LearnerProgress> = list_dir(&dir).await?;
        records.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at));
        Ok(records)
    }

    async fn count_enrollments(&self, path: PathId) -> Result<usize> {
        let file_name = format!("{}.json", path);
        let mut count = 0;
        let mut rd = fs::read_dir(self.root.join("progress")).await?;
        while let Some(entry) = rd.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if fs::try_exists(entry.path().join(&file_name)).await? {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Turn an arbitrary identifier into a safe single path component.
fn file_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02x}", b));
        }
    }
    out
}

/// Write to a sibling temporary file, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::Other(format!("bad file name: {}", path.display())))?;
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    fs::remove_file(path).await.or_else(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Ok(())
        } else {
            Err(e)
        }
    })?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!(file = %entry.path().display(), error = %e, "skipping unreadable record"),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;
    use pathway_core::{CourseRef, MilestoneProgress, Milestone};
    use std::sync::Arc;
    use tokio::sync::Barrier;

    fn sample_path(title: &str) -> LearningPath {
        let mut path = LearningPath::new(title, "Web Development");
        path.push_milestone(Milestone::new("HTML").with_course(CourseRef::required("HTML", 3.0)));
        path
    }

    fn sample_progress(learner: &str, path: &LearningPath) -> LearnerProgress {
        let now = chrono::Utc::now();
        LearnerProgress {
            path_id: path.id,
            learner_id: LearnerId::new(learner),
            current_milestone: 0,
            milestone_progress: [(0, MilestoneProgress::default())].into_iter().collect(),
            overall_progress: 0,
            enrolled_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    #[test]
    fn test_file_key_escapes_separators() {
        assert_eq!(file_key("ada"), "ada");
        assert_eq!(file_key("a/b"), "a%2fb");
        assert!(!file_key("..").contains('.'));
    }

    #[tokio::test]
    async fn test_path_roundtrip_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let active = sample_path("Frontend");
        let mut hidden = sample_path("Legacy");
        hidden.is_active = false;
        storage.save_path(&active).await.unwrap();
        storage.save_path(&hidden).await.unwrap();

        let loaded = storage.load_path(active.id).await.unwrap().unwrap();
        assert_eq!(loaded, active);

        let listed = storage.list_paths(&PathFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Frontend");

        let all = storage.list_paths(&PathFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        // inactive paths stay addressable by id
        assert!(storage.get_path(hidden.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let err = storage.get_path(PathId::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let path = sample_path("Frontend");
        storage.save_path(&path).await.unwrap();
        storage.delete_path(path.id).await.unwrap();
        assert!(storage.load_path(path.id).await.unwrap().is_none());
        // deleting again is fine
        storage.delete_path(path.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_progress_versioning() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let path = sample_path("Frontend");
        let progress = sample_progress("user@example.com", &path);

        let v1 = storage.save_progress(&progress).await.unwrap();
        assert_eq!(v1, 1);

        let loaded = storage
            .load_progress(&progress.learner_id, path.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.version, 1);

        // a stale writer still holding version 0 loses
        let err = storage.save_progress(&progress).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { expected: 0, found: 1, .. }));

        let v2 = storage.save_progress(&loaded).await.unwrap();
        assert_eq!(v2, 2);
    }

    #[tokio::test]
    async fn test_list_and_count_enrollments() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let first = sample_path("Frontend");
        let second = sample_path("Backend");

        storage.save_progress(&sample_progress("ada", &first)).await.unwrap();
        storage.save_progress(&sample_progress("ada", &second)).await.unwrap();
        storage.save_progress(&sample_progress("grace", &first)).await.unwrap();

        let ada = storage.list_progress(&LearnerId::new("ada")).await.unwrap();
        assert_eq!(ada.len(), 2);
        let nobody = storage.list_progress(&LearnerId::new("nobody")).await.unwrap();
        assert!(nobody.is_empty());

        assert_eq!(storage.count_enrollments(first.id).await.unwrap(), 2);
        assert_eq!(storage.count_enrollments(second.id).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stale_writers_only_one_wins() {
        let dir = tempfile::tempdir().unwrap();

        for _ in 0..50 {
            let path = sample_path("Race");
            let progress = sample_progress("ada", &path);
            let barrier = Arc::new(Barrier::new(2));

            let mut handles = Vec::new();
            for _ in 0..2 {
                let root = dir.path().to_path_buf();
                let record = progress.clone();
                let barrier = barrier.clone();
                handles.push(tokio::spawn(async move {
                    // separate handles, as two processes would have
                    let mut storage = JsonStorage::new(&root).await.unwrap();
                    barrier.wait().await;
                    storage.save_progress(&record).await
                }));
            }

            let mut accepted = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(version) => {
                        assert_eq!(version, 1);
                        accepted += 1;
                    }
                    Err(StorageError::Conflict { expected: 0, found: 1, .. }) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            assert_eq!(accepted, 1);

            let storage = JsonStorage::new(dir.path()).await.unwrap();
            let stored = storage
                .load_progress(&progress.learner_id, path.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.version, 1);
        }
    }

    #[tokio::test]
    async fn test_saves_leave_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let path = sample_path("Frontend");
        storage.save_path(&path).await.unwrap();
        storage.save_progress(&sample_progress("ada", &path)).await.unwrap();

        let mut stack = vec![dir.path().to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(dir).unwrap() {
                let entry = entry.unwrap();
                if entry.file_type().unwrap().is_dir() {
                    stack.push(entry.path());
                } else {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    assert!(!name.ends_with(".tmp"), "left behind {name}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_courses_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let react = Course::new("React Complete Guide", "Udemy").with_domain("Web Development");
        let ml = Course::new("Deep Learning Specialization", "Coursera").with_domain("AI");
        let python = Course::new("Python for Data Science", "Coursera").with_domain("Data Science");
        for course in [&react, &ml, &python] {
            storage.save_course(course).await.unwrap();
        }

        assert_eq!(storage.load_course(react.id).await.unwrap().unwrap(), react);
        assert!(storage.load_course(CourseId::new()).await.unwrap().is_none());

        let all = storage.list_courses(&CourseFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Deep Learning Specialization", "Python for Data Science", "React Complete Guide"]
        );

        let coursera = CourseFilter {
            platform: Some("Coursera".into()),
            ..Default::default()
        };
        assert_eq!(storage.list_courses(&coursera).await.unwrap().len(), 2);

        assert_eq!(storage.list_platforms().await.unwrap(), vec!["Coursera", "Udemy"]);
    }

    #[tokio::test]
    async fn test_reimport_replaces_by_source_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut first = sample_path("Frontend");
        first.source_id = Some("65f0c0ffee".into());
        let (stored, replaced) = storage.import_path(first.clone()).await.unwrap();
        assert!(!replaced);

        // the same file parsed again mints a fresh id
        let mut again = sample_path("Frontend v2");
        again.source_id = Some("65f0c0ffee".into());
        let (updated, replaced) = storage.import_path(again).await.unwrap();
        assert!(replaced);
        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.created_at, stored.created_at);

        let all = storage.list_paths(&PathFilter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Frontend v2");

        let mut course = Course::new("Cloud Computing Basics", "Google");
        course.source_id = Some("6".into());
        storage.import_course(course.clone()).await.unwrap();
        let (_, replaced) = storage.import_course(Course { id: CourseId::new(), ..course }).await.unwrap();
        assert!(replaced);
        assert_eq!(storage.list_courses(&CourseFilter::default()).await.unwrap().len(), 1);
    }
}

//! Learning path model - an ordered curriculum of milestones.
//!
//! Paths are owned by the catalog. Learners only ever read them; the
//! admin workflow builds and edits them through [`LearningPath::push_milestone`],
//! [`LearningPath::remove_milestone`] and [`LearningPath::normalize`], then
//! checks them with [`LearningPath::validate`] before they are stored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::id::PathId;
use crate::Time;

/// A learning path: ordered milestones leading to a career outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    /// Unique identifier
    #[serde(default)]
    pub id: PathId,

    /// Identifier in the system the record was imported from
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Path title
    pub title: String,

    /// Subject domain, e.g. "Web Development"
    #[serde(default)]
    pub domain: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Overall difficulty
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Expected duration
    #[serde(default)]
    pub duration: PathDuration,

    /// What a learner should know before starting
    #[serde(default)]
    pub prerequisites: Vec<String>,

    /// Roles the path prepares for
    #[serde(default)]
    pub career_outcomes: Vec<String>,

    /// Ordered milestones
    #[serde(default)]
    pub milestones: Vec<Milestone>,

    /// Sum of course counts across milestones
    #[serde(default)]
    pub total_courses: usize,

    /// Whether learners can see the path in listings
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Created at
    #[serde(default = "chrono::Utc::now")]
    pub created_at: Time,

    /// Last edited
    #[serde(default = "chrono::Utc::now")]
    pub updated_at: Time,
}

fn default_active() -> bool {
    true
}

/// Difficulty label used by paths and practice tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    AllLevels,
}

impl Difficulty {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::AllLevels => "all-levels",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "all-levels" | "all" => Ok(Difficulty::AllLevels),
            other => Err(PathError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// Expected duration of a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PathDuration {
    /// Calendar weeks
    #[serde(default)]
    pub weeks: u32,

    /// Total study hours
    #[serde(default)]
    pub hours: u32,
}

/// A stage of a path bundling courses, practice tasks and resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// One-based position within the path
    #[serde(default)]
    pub order: u32,

    /// Milestone title
    pub title: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Human-readable completion criteria (not evaluated)
    #[serde(default)]
    pub completion_criteria: String,

    /// Courses, unique by name
    #[serde(default)]
    pub courses: Vec<CourseRef>,

    /// Practice tasks, unique by title
    #[serde(default)]
    pub practice_tasks: Vec<PracticeTask>,

    /// Links shown alongside the milestone
    #[serde(default)]
    pub external_resources: Vec<ExternalResource>,

    /// Skill labels
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Milestone {
    /// Create an empty milestone. The order is assigned when it is pushed
    /// onto a path.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            order: 0,
            title: title.into(),
            description: String::new(),
            completion_criteria: String::new(),
            courses: Vec::new(),
            practice_tasks: Vec::new(),
            external_resources: Vec::new(),
            skills: Vec::new(),
        }
    }

    /// Add a course.
    pub fn with_course(mut self, course: CourseRef) -> Self {
        self.courses.push(course);
        self
    }

    /// Add a practice task.
    pub fn with_task(mut self, task: PracticeTask) -> Self {
        self.practice_tasks.push(task);
        self
    }

    /// Look up a course by name.
    pub fn course(&self, name: &str) -> Option<&CourseRef> {
        self.courses.iter().find(|c| c.course_name == name)
    }

    /// Look up a practice task by title.
    pub fn task(&self, title: &str) -> Option<&PracticeTask> {
        self.practice_tasks.iter().find(|t| t.title == title)
    }

    /// Courses that gate completion.
    pub fn required_courses(&self) -> impl Iterator<Item = &CourseRef> {
        self.courses.iter().filter(|c| c.is_required)
    }
}

/// A course referenced by a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    /// Display name, also the completion key
    pub course_name: String,

    /// Where the course lives
    #[serde(default)]
    pub course_link: String,

    /// Estimated effort
    #[serde(default)]
    pub estimated_hours: f32,

    /// Optional courses count for display but never block completion
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_required() -> bool {
    true
}

impl CourseRef {
    /// Create a required course.
    pub fn required(name: impl Into<String>, estimated_hours: f32) -> Self {
        Self {
            course_name: name.into(),
            course_link: String::new(),
            estimated_hours,
            is_required: true,
        }
    }

    /// Create an optional course.
    pub fn optional(name: impl Into<String>, estimated_hours: f32) -> Self {
        Self {
            is_required: false,
            ..Self::required(name, estimated_hours)
        }
    }
}

/// A hands-on exercise. Identity is the title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeTask {
    /// Title, also the completion key
    pub title: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Difficulty
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Estimated effort
    #[serde(default)]
    pub estimated_hours: f32,
}

impl PracticeTask {
    /// Create a task with the given title and effort.
    pub fn new(title: impl Into<String>, estimated_hours: f32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            difficulty: Difficulty::default(),
            estimated_hours,
        }
    }
}

/// A display-only link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResource {
    /// Title
    pub title: String,

    /// Target URL
    pub url: String,

    /// Free-form kind such as "article" or "video"
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Errors found while validating a path definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A milestone's order field does not match its position
    #[error("milestone at index {index} has order {found}, expected {expected}")]
    OrderMismatch {
        /// Position in the milestone list
        index: usize,
        /// Stored order
        found: u32,
        /// Order implied by the position
        expected: u32,
    },

    /// Two tasks in one milestone share a title
    #[error("milestone {milestone} has duplicate task title '{title}'")]
    DuplicateTask {
        /// Milestone index
        milestone: usize,
        /// Offending title
        title: String,
    },

    /// Two courses in one milestone share a name
    #[error("milestone {milestone} has duplicate course name '{name}'")]
    DuplicateCourse {
        /// Milestone index
        milestone: usize,
        /// Offending name
        name: String,
    },

    /// The stored course total is stale
    #[error("totalCourses is {found} but milestones hold {expected} courses")]
    TotalCoursesMismatch {
        /// Stored value
        found: usize,
        /// Recounted value
        expected: usize,
    },

    /// Unrecognized difficulty label
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
}

impl LearningPath {
    /// Create an empty, active path.
    pub fn new(title: impl Into<String>, domain: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: PathId::new(),
            source_id: None,
            title: title.into(),
            domain: domain.into(),
            description: String::new(),
            thumbnail: None,
            difficulty: Difficulty::default(),
            duration: PathDuration::default(),
            prerequisites: Vec::new(),
            career_outcomes: Vec::new(),
            milestones: Vec::new(),
            total_courses: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get a milestone by index.
    pub fn milestone(&self, index: usize) -> Option<&Milestone> {
        self.milestones.get(index)
    }

    /// Count courses across all milestones.
    pub fn count_courses(&self) -> usize {
        self.milestones.iter().map(|m| m.courses.len()).sum()
    }

    /// Append a milestone, assigning its order.
    pub fn push_milestone(&mut self, mut milestone: Milestone) {
        milestone.order = self.milestones.len() as u32 + 1;
        self.milestones.push(milestone);
        self.touch();
    }

    /// Remove a milestone and renumber the ones after it.
    pub fn remove_milestone(&mut self, index: usize) -> Option<Milestone> {
        if index >= self.milestones.len() {
            return None;
        }
        let removed = self.milestones.remove(index);
        self.touch();
        Some(removed)
    }

    /// Renumber milestone orders and recount courses.
    pub fn normalize(&mut self) {
        for (idx, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.order = idx as u32 + 1;
        }
        self.total_courses = self.count_courses();
    }

    /// Check the structural invariants the progress engine relies on.
    pub fn validate(&self) -> Result<(), PathError> {
        for (idx, milestone) in self.milestones.iter().enumerate() {
            let expected = idx as u32 + 1;
            if milestone.order != expected {
                return Err(PathError::OrderMismatch {
                    index: idx,
                    found: milestone.order,
                    expected,
                });
            }

            let mut seen = HashSet::new();
            for course in &milestone.courses {
                if !seen.insert(course.course_name.as_str()) {
                    return Err(PathError::DuplicateCourse {
                        milestone: idx,
                        name: course.course_name.clone(),
                    });
                }
            }

            let mut seen = HashSet::new();
            for task in &milestone.practice_tasks {
                if !seen.insert(task.title.as_str()) {
                    return Err(PathError::DuplicateTask {
                        milestone: idx,
                        title: task.title.clone(),
                    });
                }
            }
        }

        let expected = self.count_courses();
        if self.total_courses != expected {
            return Err(PathError::TotalCoursesMismatch {
                found: self.total_courses,
                expected,
            });
        }

        Ok(())
    }

    /// Skills across all milestones, first occurrence wins.
    pub fn skills(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.milestones
            .iter()
            .flat_map(|m| m.skills.iter())
            .map(String::as_str)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    fn touch(&mut self) {
        self.normalize();
        self.updated_at = chrono::Utc::now();
    }
}

/// Filter for querying the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathFilter {
    /// Exact domain match
    pub domain: Option<String>,

    /// Exact difficulty match
    pub difficulty: Option<Difficulty>,

    /// Case-insensitive substring of title or description
    pub search: Option<String>,

    /// Include paths hidden from learners
    pub include_inactive: bool,
}

impl PathFilter {
    /// Filter used by administrators: everything, active or not.
    pub fn all() -> Self {
        Self {
            include_inactive: true,
            ..Default::default()
        }
    }

    /// Whether a path passes this filter.
    pub fn matches(&self, path: &LearningPath) -> bool {
        if !self.include_inactive && !path.is_active {
            return false;
        }
        if let Some(domain) = &self.domain {
            if &path.domain != domain {
                return false;
            }
        }
        if let Some(difficulty) = self.difficulty {
            if path.difficulty != difficulty {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !path.title.to_lowercase().contains(&needle)
                && !path.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

//! Course catalog - external courses learners can browse on their own.

use serde::{Deserialize, Serialize};

use crate::id::CourseId;
use crate::Time;

/// A course hosted on an external platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Unique identifier
    #[serde(default)]
    pub id: CourseId,

    /// Identifier in the system the record was imported from
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Course name
    pub name: String,

    /// Hosting platform, e.g. "Coursera"
    #[serde(default)]
    pub platform: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Subject domains
    #[serde(default)]
    pub domain: Vec<String>,

    /// Where the course lives
    #[serde(default)]
    pub link: String,

    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Created at
    #[serde(default = "chrono::Utc::now")]
    pub created_at: Time,
}

impl Course {
    /// Create a course on a platform.
    pub fn new(name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            id: CourseId::new(),
            source_id: None,
            name: name.into(),
            platform: platform.into(),
            description: String::new(),
            domain: Vec::new(),
            link: String::new(),
            thumbnail: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Add a domain tag.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain.push(domain.into());
        self
    }
}

/// Filter for browsing courses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseFilter {
    /// Case-insensitive substring of name, description or any domain
    pub search: Option<String>,

    /// Exact platform match
    pub platform: Option<String>,

    /// Exact domain tag
    pub domain: Option<String>,
}

impl CourseFilter {
    /// Whether a course passes this filter.
    pub fn matches(&self, course: &Course) -> bool {
        if let Some(platform) = &self.platform {
            if &course.platform != platform {
                return false;
            }
        }
        if let Some(domain) = &self.domain {
            if !course.domain.iter().any(|d| d == domain) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = course.name.to_lowercase().contains(&needle)
                || course.description.to_lowercase().contains(&needle)
                || course.domain.iter().any(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ml_course() -> Course {
        let mut course = Course::new("Machine Learning Crash Course", "Google")
            .with_domain("Machine Learning")
            .with_domain("AI");
        course.description = "Learn ML fundamentals with TensorFlow APIs".to_string();
        course
    }

    #[test]
    fn test_search_covers_name_description_and_domain() {
        let course = ml_course();
        for needle in ["crash", "tensorflow", "machine learn"] {
            let filter = CourseFilter {
                search: Some(needle.to_string()),
                ..Default::default()
            };
            assert!(filter.matches(&course), "{needle}");
        }
        let filter = CourseFilter {
            search: Some("react".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&course));
    }

    #[test]
    fn test_platform_and_domain_are_exact() {
        let course = ml_course();
        assert!(CourseFilter::default().matches(&course));

        let filter = CourseFilter {
            platform: Some("Google".into()),
            domain: Some("AI".into()),
            ..Default::default()
        };
        assert!(filter.matches(&course));

        let filter = CourseFilter {
            platform: Some("google".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&course));

        let filter = CourseFilter {
            domain: Some("Machine".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&course));
    }

    #[test]
    fn test_deserialize_catalog_record() {
        let json = r#"{
            "_id": "3",
            "name": "Cybersecurity Fundamentals",
            "platform": "Google",
            "description": "Essential cybersecurity concepts and practices",
            "domain": ["Cybersecurity", "Security"],
            "link": "https://www.coursera.org/google-certificates/cybersecurity-certificate"
        }"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.source_id.as_deref(), Some("3"));
        assert_eq!(course.domain, vec!["Cybersecurity", "Security"]);
        assert!(course.thumbnail.is_none());

        let back = serde_json::to_value(&course).unwrap();
        assert_eq!(back["_id"], "3");
    }
}

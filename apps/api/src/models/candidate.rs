use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::extraction::{FieldKind, FieldSchema, FieldSpec, StructuredRecord};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Path of the original resume. At most one profile per path.
    pub source_path: String,
    pub extracted_profile: Option<Json<ExtractedProfile>>,
    pub created_at: DateTime<Utc>,
}

impl CandidateProfile {
    pub fn profile(&self) -> Option<&ExtractedProfile> {
        self.extracted_profile.as_ref().map(|p| &p.0)
    }
}

/// Structured resume content returned by extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
}

static EXPERIENCE_FIELDS: [FieldSpec; 4] = [
    FieldSpec::required("title", FieldKind::Text),
    FieldSpec::optional("company", FieldKind::Text),
    FieldSpec::optional("duration", FieldKind::Text),
    FieldSpec::optional("description", FieldKind::Text),
];

static EDUCATION_FIELDS: [FieldSpec; 3] = [
    FieldSpec::required("degree", FieldKind::Text),
    FieldSpec::optional("institution", FieldKind::Text),
    FieldSpec::optional("year", FieldKind::Text),
];

static PROJECT_FIELDS: [FieldSpec; 3] = [
    FieldSpec::required("name", FieldKind::Text),
    FieldSpec::optional("description", FieldKind::Text),
    FieldSpec::optional("technologies", FieldKind::TextList),
];

static CANDIDATE_PROFILE_SCHEMA: FieldSchema = FieldSchema {
    name: "candidate_profile",
    fields: &[
        FieldSpec::optional("name", FieldKind::Text),
        FieldSpec::optional("email", FieldKind::Text),
        FieldSpec::optional("phone", FieldKind::Text),
        FieldSpec::required("skills", FieldKind::TextList),
        FieldSpec::required("experience", FieldKind::ObjectList(&EXPERIENCE_FIELDS)),
        FieldSpec::required("education", FieldKind::ObjectList(&EDUCATION_FIELDS)),
        FieldSpec::optional("certifications", FieldKind::TextList),
        FieldSpec::optional("projects", FieldKind::ObjectList(&PROJECT_FIELDS)),
    ],
};

impl StructuredRecord for ExtractedProfile {
    fn schema() -> &'static FieldSchema {
        &CANDIDATE_PROFILE_SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::parse_record;

    #[test]
    fn test_profile_coerces_numeric_year() {
        let profile: ExtractedProfile = parse_record(
            r#"{
                "name": "Ada Lovelace",
                "skills": ["Go", "SQL", "Python"],
                "experience": [{"title": "Engineer", "company": "Acme", "duration": "2y"}],
                "education": [{"degree": "BSc", "institution": "UCL", "year": 2015}]
            }"#,
        )
        .unwrap();
        assert_eq!(profile.education[0].year, "2015");
        assert_eq!(profile.experience[0].description, "");
        assert!(profile.projects.is_empty());
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_profile_requires_skills() {
        let result =
            parse_record::<ExtractedProfile>(r#"{"experience": [], "education": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_project_technologies_accept_single_string() {
        let profile: ExtractedProfile = parse_record(
            r#"{
                "skills": [],
                "experience": [],
                "education": [],
                "projects": [{"name": "Crawler", "technologies": "Rust"}]
            }"#,
        )
        .unwrap();
        assert_eq!(profile.projects[0].technologies, vec!["Rust"]);
    }
}

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;
use uuid::Uuid;

use crate::{
    search_matches,
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

pub const STAFF_ID_MAX_LENGTH: usize = 10;
const DEFAULT_EMAIL: &str = "default@email.com";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum LecturerType {
    #[default]
    #[serde(rename = "FT")]
    FullTime,
    #[serde(rename = "PT")]
    PartTime,
    #[serde(rename = "VS")]
    Visiting,
    #[serde(rename = "AJ")]
    Adjunct,
}

impl LecturerType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FullTime => "FT",
            Self::PartTime => "PT",
            Self::Visiting => "VS",
            Self::Adjunct => "AJ",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FullTime => "Full-Time",
            Self::PartTime => "Part-Time",
            Self::Visiting => "Visiting",
            Self::Adjunct => "Adjunct",
        }
    }
}

impl FromStr for LecturerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FT" => Ok(Self::FullTime),
            "PT" => Ok(Self::PartTime),
            "VS" => Ok(Self::Visiting),
            "AJ" => Ok(Self::Adjunct),
            other => Err(format!("unknown lecturer type '{}'", other)),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lecturer {
    pub display_name: String,
    #[serde(default)]
    pub lecturer_type: LecturerType,
    pub department_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Generated on creation, never changed afterwards.
    #[serde(skip_deserializing)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub specialization: String,
    pub joined_date: NaiveDate,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

fn default_email() -> String {
    DEFAULT_EMAIL.to_owned()
}

impl HasId for Lecturer {
    type IdType = i64;
}

impl Lecturer {
    /// `DEPT-XXXX`: the first three letters of the department followed by four
    /// random hex digits.
    pub fn generate_staff_id(department_name: &str) -> String {
        let department_code = department_name
            .to_uppercase()
            .chars()
            .filter(|c| c.is_alphabetic())
            .take(3)
            .collect::<String>();
        let unique_part = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
        format!("{}-{}", department_code, unique_part)
            .chars()
            .take(STAFF_ID_MAX_LENGTH)
            .collect()
    }
}

impl Validate for Lecturer {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_min_length("displayName", self.display_name.trim(), 3);
        errors.require_max_length("displayName", &self.display_name, 100);
        errors.require_min_length("departmentName", self.department_name.trim(), 2);
        errors.require_max_length("departmentName", &self.department_name, 100);
        errors.require_max_length("specialization", &self.specialization, 100);
        errors.require_max_length("email", &self.email, 100);
        errors.into_result()
    }
}

impl ExampleData for Lecturer {
    fn example_data() -> Self {
        Self {
            display_name: "Dr. Nimal Perera".to_owned(),
            lecturer_type: LecturerType::FullTime,
            department_name: "Computer Science".to_owned(),
            is_active: true,
            staff_id: Some("COM-3F9A".to_owned()),
            specialization: "Distributed Systems".to_owned(),
            joined_date: NaiveDate::from_ymd_opt(2019, 9, 1).unwrap_or_default(),
            email: "nimal.perera@campus.example".to_owned(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LecturerFilter {
    pub lecturer_type: Option<LecturerType>,
    pub department_name: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl LecturerFilter {
    pub fn matches(&self, lecturer: &Lecturer) -> bool {
        self.lecturer_type.map_or(true, |t| lecturer.lecturer_type == t)
            && self
                .department_name
                .as_deref()
                .map_or(true, |name| lecturer.department_name == name)
            && self.is_active.map_or(true, |a| lecturer.is_active == a)
            && self.search.as_deref().map_or(true, |needle| {
                search_matches(
                    needle,
                    &[
                        Some(lecturer.display_name.as_str()),
                        lecturer.staff_id.as_deref(),
                        Some(lecturer.specialization.as_str()),
                    ],
                )
            })
    }
}

/// Most recently joined first.
pub fn sort_by_joined_date(lecturers: &mut [WithId<Lecturer>]) {
    lecturers.sort_by(|a, b| {
        b.content
            .joined_date
            .cmp(&a.content.joined_date)
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_id_uses_department_letters() {
        let staff_id = Lecturer::generate_staff_id("Computer Science");
        assert!(staff_id.starts_with("COM-"));
        assert_eq!(staff_id.len(), 8);
        assert!(staff_id[4..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn staff_id_skips_non_letters() {
        let staff_id = Lecturer::generate_staff_id("3D Art & Design");
        assert!(staff_id.starts_with("DAR-"));
    }

    #[test]
    fn staff_id_is_read_only_on_input() {
        let lecturer: Lecturer = serde_json::from_str(
            r#"{"displayName":"Ann Smith","departmentName":"Physics","joinedDate":"2020-01-15","staffId":"HACK-0000"}"#,
        )
        .unwrap();
        assert!(lecturer.staff_id.is_none());
        assert_eq!(lecturer.email, "default@email.com");
        assert_eq!(lecturer.lecturer_type, LecturerType::FullTime);
    }

    #[test]
    fn short_names_are_rejected() {
        let lecturer = Lecturer {
            display_name: "Al".to_owned(),
            department_name: "X".to_owned(),
            ..Lecturer::example_data()
        };
        let errors = lecturer.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["departmentName", "displayName"]
        );
    }

    #[test]
    fn filter_by_department_and_search() {
        let lecturer = Lecturer::example_data();
        let filter = LecturerFilter {
            department_name: Some("Computer Science".to_owned()),
            search: Some("distributed".to_owned()),
            ..Default::default()
        };
        assert!(filter.matches(&lecturer));
        let filter = LecturerFilter {
            lecturer_type: Some(LecturerType::Visiting),
            ..Default::default()
        };
        assert!(!filter.matches(&lecturer));
    }
}

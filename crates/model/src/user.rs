use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::{
    search_matches,
    validation::{Validate, ValidationErrors},
    ExampleData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum UserType {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "DRIVER")]
    Driver,
    #[serde(rename = "STUDENT")]
    Student,
    #[serde(rename = "STAFF")]
    Staff,
}

impl UserType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Driver => "DRIVER",
            Self::Student => "STUDENT",
            Self::Staff => "STAFF",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Driver => "Driver",
            Self::Student => "Student",
            Self::Staff => "Staff",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "DRIVER" => Ok(Self::Driver),
            "STUDENT" => Ok(Self::Student),
            "STAFF" => Ok(Self::Staff),
            other => Err(format!("unknown user type '{}'", other)),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_type: UserType,
    #[serde(default)]
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    /// Reference to an already stored picture, e.g. `profile_pics/jane.png`.
    pub profile_picture: Option<String>,
    #[serde(skip_deserializing, default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last_name) if !last_name.is_empty() => {
                format!("{} {}", self.first_name, last_name)
            }
            _ => self.first_name.clone(),
        }
    }
}

impl HasId for User {
    type IdType = i64;
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("firstName", &self.first_name);
        errors.require_max_length("firstName", &self.first_name, 100);
        if let Some(last_name) = &self.last_name {
            errors.require_max_length("lastName", last_name, 100);
        }
        errors.require_not_blank("phone", &self.phone);
        errors.require_max_length("phone", &self.phone, 15);
        if let Some(email) = &self.email {
            errors.require_max_length("email", email, 100);
            if !email.is_empty() && !email.contains('@') {
                errors.add("email", "Enter a valid email address.");
            }
        }
        errors.into_result()
    }
}

impl ExampleData for User {
    fn example_data() -> Self {
        Self {
            user_type: UserType::Driver,
            username: "jdoe".to_owned(),
            first_name: "Jane".to_owned(),
            last_name: Some("Doe".to_owned()),
            email: Some("jane.doe@campus.example".to_owned()),
            phone: "+94771234567".to_owned(),
            address: None,
            profile_picture: Some("profile_pics/jdoe.png".to_owned()),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub user_type: Option<UserType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.user_type.map_or(true, |t| user.user_type == t)
            && self.is_active.map_or(true, |a| user.is_active == a)
            && self.search.as_deref().map_or(true, |needle| {
                search_matches(
                    needle,
                    &[
                        Some(user.username.as_str()),
                        Some(user.first_name.as_str()),
                        user.last_name.as_deref(),
                        user.email.as_deref(),
                    ],
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_without_last_name() {
        let mut user = User::example_data();
        assert_eq!(user.full_name(), "Jane Doe");
        user.last_name = None;
        assert_eq!(user.full_name(), "Jane");
    }

    #[test]
    fn rejects_invalid_email_and_blank_phone() {
        let mut user = User::example_data();
        user.email = Some("not-an-address".to_owned());
        user.phone = "".to_owned();
        let errors = user.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "phone"]);
    }

    #[test]
    fn is_active_is_read_only() {
        let user: User = serde_json::from_str(
            r#"{"userType":"STAFF","firstName":"Ann","phone":"123","isActive":false}"#,
        )
        .unwrap();
        assert!(user.is_active);
        assert_eq!(user.user_type, UserType::Staff);
    }

    #[test]
    fn filter_by_type_and_search() {
        let user = User::example_data();
        let filter = UserFilter {
            user_type: Some(UserType::Driver),
            search: Some("DOE".to_owned()),
            ..Default::default()
        };
        assert!(filter.matches(&user));
        let filter = UserFilter {
            user_type: Some(UserType::Admin),
            ..Default::default()
        };
        assert!(!filter.matches(&user));
    }
}

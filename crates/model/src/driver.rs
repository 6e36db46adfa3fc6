use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    bus::Bus,
    search_matches,
    user::User,
    validation::{Validate, ValidationErrors},
    ExampleData,
};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub user: Id<User>,
    pub license_number: String,
    #[serde(default)]
    pub years_of_experience: i32,
    /// A bus has at most one driver.
    #[serde(default)]
    pub assigned_bus: Option<Id<Bus>>,
}

impl HasId for Driver {
    type IdType = i64;
}

impl Validate for Driver {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("licenseNumber", &self.license_number);
        errors.require_max_length("licenseNumber", &self.license_number, 20);
        errors.require_non_negative("yearsOfExperience", self.years_of_experience);
        errors.into_result()
    }
}

impl ExampleData for Driver {
    fn example_data() -> Self {
        Self {
            user: Id::new(1),
            license_number: "B1234567".to_owned(),
            years_of_experience: 8,
            assigned_bus: Some(Id::new(1)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverFilter {
    pub search: Option<String>,
}

impl DriverFilter {
    /// `user` is the profile referenced by the driver, if it could be loaded.
    pub fn matches(&self, driver: &Driver, user: Option<&User>) -> bool {
        self.search.as_deref().map_or(true, |needle| {
            search_matches(
                needle,
                &[
                    user.map(|user| user.first_name.as_str()),
                    user.and_then(|user| user.last_name.as_deref()),
                    Some(driver.license_number.as_str()),
                ],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_covers_user_names_and_license() {
        let driver = Driver::example_data();
        let user = User::example_data();
        let by_name = DriverFilter {
            search: Some("jane".to_owned()),
        };
        let by_license = DriverFilter {
            search: Some("b12".to_owned()),
        };
        assert!(by_name.matches(&driver, Some(&user)));
        assert!(!by_name.matches(&driver, None));
        assert!(by_license.matches(&driver, None));
    }

    #[test]
    fn negative_experience_is_rejected() {
        let mut driver = Driver::example_data();
        driver.years_of_experience = -1;
        let errors = driver.validate().unwrap_err();
        assert_eq!(errors.messages("yearsOfExperience").len(), 1);
    }
}

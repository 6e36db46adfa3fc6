use std::{collections::BTreeMap, error, fmt};

use schemars::JsonSchema;
use serde::Serialize;
use utility::geo;

/// Per-field validation messages, keyed by the wire (camelCase) field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add<F, M>(&mut self, field: F, message: M)
    where
        F: Into<String>,
        M: Into<String>,
    {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Adds all messages of `other`, prefixing its field names with
    /// `prefix.`. Used for nested records like stop times.
    pub fn merge_nested(&mut self, prefix: &str, other: ValidationErrors) {
        for (field, messages) in other.0 {
            for message in messages {
                self.add(format!("{}.{}", prefix, field), message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    // - common checks -

    pub fn require_not_blank(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field may not be blank.");
        }
    }

    pub fn require_max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
        }
    }

    pub fn require_min_length(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.add(
                field,
                format!("Ensure this field has at least {} characters.", min),
            );
        }
    }

    pub fn require_non_negative<N>(&mut self, field: &str, value: N)
    where
        N: PartialOrd + Default,
    {
        if value < N::default() {
            self.add(field, "Ensure this value is greater than or equal to 0.");
        }
    }

    pub fn require_latitude(&mut self, field: &str, latitude: f64) {
        if !geo::is_valid_latitude(latitude) {
            self.add(field, "Latitude must be between -90 and 90.");
        }
    }

    pub fn require_longitude(&mut self, field: &str, longitude: f64) {
        if !geo::is_valid_longitude(longitude) {
            self.add(field, "Longitude must be between -180 and 180.");
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.0.iter() {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl error::Error for ValidationErrors {}

/// Checks which can be done on a record alone, before it reaches the store.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.require_latitude("latitude", 91.0);
        errors.require_longitude("longitude", 10.0);
        errors.require_not_blank("busNumber", " ");
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["busNumber", "latitude"]);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let mut errors = ValidationErrors::new();
        errors.merge_nested(
            "stopTimes[1]",
            ValidationErrors::single("stopName", "This field may not be blank."),
        );
        assert_eq!(errors.messages("stopTimes[1].stopName").len(), 1);
    }

    #[test]
    fn display_joins_messages() {
        let errors = ValidationErrors::single("capacity", "too small");
        assert_eq!(errors.to_string(), "capacity: too small");
    }
}

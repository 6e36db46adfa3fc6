use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utility::id::HasId;

use crate::{
    search_matches,
    validation::{Validate, ValidationErrors},
    ExampleData,
};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    pub origin: String,
    pub destination: String,
    /// Free form list of stops; only required to be a JSON array.
    pub stops: Value,
    /// Kilometres.
    pub distance: f64,
    #[serde(with = "utility::serde::duration")]
    #[schemars(schema_with = "utility::serde::duration::schema")]
    pub estimated_duration: Duration,
}

impl HasId for Route {
    type IdType = i64;
}

impl Validate for Route {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("name", &self.name);
        errors.require_max_length("name", &self.name, 100);
        errors.require_not_blank("origin", &self.origin);
        errors.require_max_length("origin", &self.origin, 100);
        errors.require_not_blank("destination", &self.destination);
        errors.require_max_length("destination", &self.destination, 100);
        if !self.stops.is_array() {
            errors.add("stops", "Expected a list of stops.");
        }
        if !self.distance.is_finite() || self.distance < 0.0 {
            errors.add("distance", "Ensure this value is greater than or equal to 0.");
        }
        if self.estimated_duration < Duration::zero() {
            errors.add("estimatedDuration", "Duration must not be negative.");
        }
        errors.into_result()
    }
}

impl ExampleData for Route {
    fn example_data() -> Self {
        Self {
            name: "Campus Express".to_owned(),
            origin: "Main Gate".to_owned(),
            destination: "Faculty of Engineering".to_owned(),
            stops: json!(["Main Gate", "Library", "Hostel B", "Faculty of Engineering"]),
            distance: 4.2,
            estimated_duration: Duration::minutes(18),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFilter {
    pub search: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        self.search.as_deref().map_or(true, |needle| {
            search_matches(
                needle,
                &[
                    Some(route.name.as_str()),
                    Some(route.origin.as_str()),
                    Some(route.destination.as_str()),
                ],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_must_be_a_list() {
        let mut route = Route::example_data();
        route.stops = json!({"first": "Main Gate"});
        route.distance = -1.0;
        let errors = route.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["distance", "stops"]);
    }

    #[test]
    fn duration_round_trips_through_json() {
        let json = serde_json::to_value(Route::example_data()).unwrap();
        assert_eq!(json["estimatedDuration"], "00:18:00");
    }

    #[test]
    fn search_matches_destination() {
        let filter = RouteFilter {
            search: Some("engineering".to_owned()),
        };
        assert!(filter.matches(&Route::example_data()));
    }
}

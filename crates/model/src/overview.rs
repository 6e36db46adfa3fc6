//! Read-only compositions of several entities, as returned by the bus
//! overview endpoints.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use utility::id::Id;

use crate::{
    bus::Bus,
    driver::Driver,
    location::LocationRecord,
    route::Route,
    schedule::{Schedule, StopTime},
    user::User,
    WithId,
};

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: Id<Driver>,
    pub name: String,
    pub license_number: String,
    pub years_of_experience: i32,
}

impl DriverSummary {
    /// `user` is the profile of the driver; without it the name is empty.
    pub fn new(driver: &WithId<Driver>, user: Option<&User>) -> Self {
        Self {
            id: driver.id,
            name: user.map(User::full_name).unwrap_or_default(),
            license_number: driver.content.license_number.clone(),
            years_of_experience: driver.content.years_of_experience,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub id: Id<Schedule>,
    pub route: Id<Route>,
    pub route_name: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub is_active: bool,
    pub stop_times: Vec<StopTime>,
}

impl ScheduleSummary {
    pub fn new(schedule: WithId<Schedule>, route: Option<&Route>) -> Self {
        Self {
            id: schedule.id,
            route: schedule.content.route,
            route_name: route.map(|route| route.name.clone()),
            origin: route.map(|route| route.origin.clone()),
            destination: route.map(|route| route.destination.clone()),
            departure_time: schedule.content.departure_time,
            arrival_time: schedule.content.arrival_time,
            is_active: schedule.content.is_active,
            stop_times: schedule.content.stop_times,
        }
    }
}

/// A bus with everything currently known about it.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusOverview {
    #[serde(flatten)]
    pub bus: WithId<Bus>,
    pub driver: Option<DriverSummary>,
    /// Ordered by departure.
    pub schedules: Vec<ScheduleSummary>,
    /// Most recent first.
    pub locations: Vec<WithId<LocationRecord>>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusOverviewDetail {
    #[serde(flatten)]
    pub overview: BusOverview,
    pub last_trip: Option<ScheduleSummary>,
    pub next_trip: Option<ScheduleSummary>,
}

/// A bus with its driver and its trips relative to the time of the request.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusWithTrips {
    #[serde(flatten)]
    pub bus: WithId<Bus>,
    pub driver: Option<WithId<Driver>>,
    pub last_trip: Option<WithId<Schedule>>,
    pub next_trip: Option<WithId<Schedule>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExampleData;

    #[test]
    fn driver_summary_uses_full_name() {
        let driver = WithId::<Driver>::example_data();
        let summary = DriverSummary::new(&driver, Some(&User::example_data()));
        assert_eq!(summary.name, "Jane Doe");
        assert_eq!(summary.license_number, "B1234567");
    }

    #[test]
    fn missing_trips_serialize_as_null() {
        let detail = BusOverviewDetail {
            overview: BusOverview {
                bus: WithId::example_data(),
                driver: None,
                schedules: vec![],
                locations: vec![],
            },
            last_trip: None,
            next_trip: None,
        };
        let value = serde_json::to_value(detail).unwrap();
        assert_eq!(value["busNumber"], "CB-12");
        assert!(value["lastTrip"].is_null());
        assert!(value["driver"].is_null());
        assert_eq!(value["locations"], serde_json::json!([]));
    }

    #[test]
    fn schedule_summary_copies_route() {
        let summary = ScheduleSummary::new(
            WithId::example_data(),
            Some(&Route::example_data()),
        );
        assert_eq!(summary.route_name.as_deref(), Some(Route::example_data().name.as_str()));
        assert_eq!(summary.stop_times.len(), 2);
    }
}

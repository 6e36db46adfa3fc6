use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    bus::Bus,
    top_n::top_n_per_group,
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;
/// Locations per bus in the bus overview.
pub const DEFAULT_RECENT_LOCATIONS: usize = 10;
pub const MAX_RECENT_LOCATIONS: usize = 100;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    #[default]
    OnCampus,
    Scheduled,
    Departed,
}

impl LocationStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OnCampus => "on_campus",
            Self::Scheduled => "scheduled",
            Self::Departed => "departed",
        }
    }
}

impl FromStr for LocationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_campus" => Ok(Self::OnCampus),
            "scheduled" => Ok(Self::Scheduled),
            "departed" => Ok(Self::Departed),
            other => Err(format!("unknown location status '{}'", other)),
        }
    }
}

/// A single GPS ping of a bus. Location history is append only.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub bus: Id<Bus>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub status: LocationStatus,
    /// Defaults to the time of insertion.
    pub timestamp: Option<DateTime<Utc>>,
    /// km/h
    pub speed: Option<f64>,
}

impl HasId for LocationRecord {
    type IdType = i64;
}

impl Validate for LocationRecord {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_latitude("latitude", self.latitude);
        errors.require_longitude("longitude", self.longitude);
        if let Some(speed) = self.speed {
            if !speed.is_finite() || speed < 0.0 {
                errors.add("speed", "Ensure this value is greater than or equal to 0.");
            }
        }
        errors.into_result()
    }
}

impl ExampleData for LocationRecord {
    fn example_data() -> Self {
        Self {
            bus: Id::new(1),
            latitude: 6.9147,
            longitude: 79.9733,
            status: LocationStatus::Departed,
            timestamp: Utc.with_ymd_and_hms(2025, 4, 14, 7, 42, 10).single(),
            speed: Some(32.5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilter {
    pub bus_id: Option<Id<Bus>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

impl Default for LocationFilter {
    fn default() -> Self {
        Self {
            bus_id: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl LocationFilter {
    pub fn for_bus(bus: Id<Bus>) -> Self {
        Self {
            bus_id: Some(bus),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &LocationRecord) -> bool {
        self.bus_id.map_or(true, |bus| record.bus == bus)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.limit == 0 || self.limit > MAX_LIST_LIMIT {
            errors.add(
                "limit",
                format!("Ensure this value is between 1 and {}.", MAX_LIST_LIMIT),
            );
        }
        errors.into_result()
    }
}

/// Recency key of a stored record: newest timestamp first, later insertions
/// first on equal timestamps.
pub fn recency(record: &WithId<LocationRecord>) -> (Option<DateTime<Utc>>, Id<LocationRecord>) {
    (record.content.timestamp, record.id)
}

/// Sorts records most recent first.
pub fn sort_most_recent_first(records: &mut [WithId<LocationRecord>]) {
    records.sort_by(|a, b| recency(b).cmp(&recency(a)));
}

/// The `n` most recent records of each of the given buses.
pub fn latest_per_bus(
    buses: &[Id<Bus>],
    records: impl IntoIterator<Item = WithId<LocationRecord>>,
    n: usize,
) -> IndexMap<Id<Bus>, Vec<WithId<LocationRecord>>> {
    top_n_per_group(buses, records, n, |record| record.content.bus, recency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: i64, bus: i64, seconds: i64) -> WithId<LocationRecord> {
        let base = LocationRecord::example_data();
        WithId::new(
            Id::new(id),
            LocationRecord {
                bus: Id::new(bus),
                timestamp: base.timestamp.map(|t| t + Duration::seconds(seconds)),
                ..base
            },
        )
    }

    #[test]
    fn latest_per_bus_limits_and_orders() {
        let records = vec![record(1, 1, 0), record(2, 1, 10), record(3, 2, 5), record(4, 1, 5)];
        let latest = latest_per_bus(&[Id::new(1), Id::new(2), Id::new(3)], records, 2);
        let ids = |bus: i64| {
            latest[&Id::<Bus>::new(bus)]
                .iter()
                .map(|r| r.id.raw())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(1), vec![2, 4]);
        assert_eq!(ids(2), vec![3]);
        assert!(ids(3).is_empty());
    }

    #[test]
    fn rejects_invalid_coordinates_and_speed() {
        let record = LocationRecord {
            latitude: 95.0,
            longitude: -200.0,
            speed: Some(-3.0),
            ..LocationRecord::example_data()
        };
        let errors = record.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["latitude", "longitude", "speed"]
        );
    }

    #[test]
    fn status_uses_snake_case() {
        let json = serde_json::to_value(LocationStatus::OnCampus).unwrap();
        assert_eq!(json, "on_campus");
        assert_eq!("departed".parse::<LocationStatus>(), Ok(LocationStatus::Departed));
    }

    #[test]
    fn filter_limit_bounds() {
        assert!(LocationFilter::default().validate().is_ok());
        let filter = LocationFilter {
            limit: 0,
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }
}

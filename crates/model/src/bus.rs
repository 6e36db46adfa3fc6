use std::{fmt, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::{
    search_matches,
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum BusType {
    #[default]
    #[serde(rename = "REG")]
    Regular,
    #[serde(rename = "EXP")]
    Express,
    #[serde(rename = "VIP")]
    Vip,
}

impl BusType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Regular => "REG",
            Self::Express => "EXP",
            Self::Vip => "VIP",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Express => "Express",
            Self::Vip => "VIP",
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REG" => Ok(Self::Regular),
            "EXP" => Ok(Self::Express),
            "VIP" => Ok(Self::Vip),
            other => Err(format!("unknown bus type '{}'", other)),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub bus_number: String,
    #[serde(default)]
    pub bus_type: BusType,
    pub capacity: i32,
    pub license_plate: String,
    /// Last known position, maintained by whoever updates the bus.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Set by the store on insert.
    #[serde(skip_deserializing)]
    pub added_on: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl HasId for Bus {
    type IdType = i64;
}

impl Validate for Bus {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("busNumber", &self.bus_number);
        errors.require_max_length("busNumber", &self.bus_number, 20);
        errors.require_not_blank("licensePlate", &self.license_plate);
        errors.require_max_length("licensePlate", &self.license_plate, 15);
        errors.require_non_negative("capacity", self.capacity);
        if let Some(latitude) = self.latitude {
            errors.require_latitude("latitude", latitude);
        }
        if let Some(longitude) = self.longitude {
            errors.require_longitude("longitude", longitude);
        }
        if self.latitude.is_some() != self.longitude.is_some() {
            errors.add(
                "latitude",
                "Latitude and longitude must be given together.",
            );
        }
        errors.into_result()
    }
}

impl ExampleData for Bus {
    fn example_data() -> Self {
        Self {
            bus_number: "CB-12".to_owned(),
            bus_type: BusType::Express,
            capacity: 54,
            license_plate: "NB-4521".to_owned(),
            latitude: Some(6.9147),
            longitude: Some(79.9733),
            is_active: true,
            added_on: Utc.with_ymd_and_hms(2025, 4, 12, 8, 0, 0).single(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum BusOrdering {
    #[default]
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "bus_number")]
    BusNumber,
    #[serde(rename = "-bus_number")]
    BusNumberDesc,
    #[serde(rename = "added_on")]
    AddedOn,
    #[serde(rename = "-added_on")]
    AddedOnDesc,
}

impl BusOrdering {
    /// Sorts buses in place. Ties are broken by id to keep pages stable.
    pub fn sort(&self, buses: &mut [WithId<Bus>]) {
        match self {
            Self::Id => buses.sort_by_key(|bus| bus.id),
            Self::BusNumber => buses.sort_by(|a, b| {
                a.content
                    .bus_number
                    .cmp(&b.content.bus_number)
                    .then(a.id.cmp(&b.id))
            }),
            Self::BusNumberDesc => buses.sort_by(|a, b| {
                b.content
                    .bus_number
                    .cmp(&a.content.bus_number)
                    .then(a.id.cmp(&b.id))
            }),
            Self::AddedOn => buses.sort_by(|a, b| {
                a.content
                    .added_on
                    .cmp(&b.content.added_on)
                    .then(a.id.cmp(&b.id))
            }),
            Self::AddedOnDesc => buses.sort_by(|a, b| {
                b.content
                    .added_on
                    .cmp(&a.content.added_on)
                    .then(a.id.cmp(&b.id))
            }),
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Id => "id ASC",
            Self::BusNumber => "bus_number ASC, id ASC",
            Self::BusNumberDesc => "bus_number DESC, id ASC",
            Self::AddedOn => "added_on ASC, id ASC",
            Self::AddedOnDesc => "added_on DESC, id ASC",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusFilter {
    pub bus_type: Option<BusType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    #[serde(default)]
    pub ordering: BusOrdering,
}

impl BusFilter {
    pub fn matches(&self, bus: &Bus) -> bool {
        self.bus_type.map_or(true, |t| bus.bus_type == t)
            && self.is_active.map_or(true, |a| bus.is_active == a)
            && self.search.as_deref().map_or(true, |needle| {
                search_matches(
                    needle,
                    &[
                        Some(bus.bus_number.as_str()),
                        Some(bus.license_plate.as_str()),
                    ],
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use utility::id::Id;

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut bus = Bus::example_data();
        bus.latitude = Some(-90.5);
        bus.longitude = Some(181.0);
        let errors = bus.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["latitude", "longitude"]
        );
    }

    #[test]
    fn rejects_half_a_position() {
        let mut bus = Bus::example_data();
        bus.longitude = None;
        assert!(bus.validate().is_err());
    }

    #[test]
    fn defaults_when_deserializing() {
        let bus: Bus = serde_json::from_str(
            r#"{"busNumber":"7","capacity":30,"licensePlate":"AB-1","addedOn":"2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(bus.bus_type, BusType::Regular);
        assert!(bus.is_active);
        assert!(bus.added_on.is_none());
    }

    #[test]
    fn ordering_by_added_on_descending() {
        let base = Bus::example_data();
        let older = base.added_on.unwrap() - Duration::days(1);
        let mut buses = vec![
            WithId::new(Id::new(1), Bus { added_on: Some(older), ..base.clone() }),
            WithId::new(Id::new(2), base.clone()),
        ];
        BusOrdering::AddedOnDesc.sort(&mut buses);
        assert_eq!(buses[0].id, Id::new(2));
    }

    #[test]
    fn ordering_parses_drf_style_keys() {
        #[derive(Deserialize)]
        struct Params {
            ordering: BusOrdering,
        }
        let params: Params = serde_json::from_str(r#"{"ordering":"-bus_number"}"#).unwrap();
        assert_eq!(params.ordering, BusOrdering::BusNumberDesc);
    }

    #[test]
    fn filter_by_search_and_type() {
        let bus = Bus::example_data();
        let filter = BusFilter {
            bus_type: Some(BusType::Express),
            search: Some("nb-45".to_owned()),
            ..Default::default()
        };
        assert!(filter.matches(&bus));
        let filter = BusFilter {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(!filter.matches(&bus));
    }
}

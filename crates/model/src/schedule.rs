use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use utility::id::{HasId, Id};

use crate::{
    bus::Bus,
    route::Route,
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub bus: Id<Bus>,
    pub route: Id<Route>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Stops in travel order. Replaced as a whole when a schedule is updated.
    #[serde(default)]
    pub stop_times: Vec<StopTime>,
}

fn default_true() -> bool {
    true
}

impl HasId for Schedule {
    type IdType = i64;
}

impl Validate for Schedule {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.arrival_time < self.departure_time {
            errors.add("arrivalTime", "Arrival must not be before departure.");
        }
        for (index, stop_time) in self.stop_times.iter().enumerate() {
            if let Err(nested) = stop_time.validate() {
                errors.merge_nested(&format!("stopTimes[{}]", index), nested);
            }
        }
        errors.into_result()
    }
}

impl ExampleData for Schedule {
    fn example_data() -> Self {
        let departure = Utc
            .with_ymd_and_hms(2025, 4, 14, 7, 30, 0)
            .single()
            .unwrap_or_default();
        Self {
            bus: Id::new(1),
            route: Id::new(1),
            departure_time: departure,
            arrival_time: departure + Duration::minutes(18),
            is_active: true,
            stop_times: vec![
                StopTime {
                    stop_name: "Library".to_owned(),
                    arrival_time: departure + Duration::minutes(6),
                    actual_arrival_time: Some(departure + Duration::minutes(8)),
                    stop_status: StopStatus::Departed,
                },
                StopTime {
                    stop_name: "Hostel B".to_owned(),
                    arrival_time: departure + Duration::minutes(11),
                    actual_arrival_time: None,
                    stop_status: StopStatus::Scheduled,
                },
            ],
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    #[default]
    Scheduled,
    Arrived,
    Departed,
    Skipped,
}

impl StopStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Arrived => "ARRIVED",
            Self::Departed => "DEPARTED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl FromStr for StopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "ARRIVED" => Ok(Self::Arrived),
            "DEPARTED" => Ok(Self::Departed),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(format!("unknown stop status '{}'", other)),
        }
    }
}

/// Serialized together with its `lateBy`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", into = "StopTimeOutput")]
pub struct StopTime {
    pub stop_name: String,
    /// Scheduled arrival.
    pub arrival_time: DateTime<Utc>,
    #[serde(default)]
    pub actual_arrival_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stop_status: StopStatus,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StopTimeOutput {
    stop_name: String,
    arrival_time: DateTime<Utc>,
    actual_arrival_time: Option<DateTime<Utc>>,
    stop_status: StopStatus,
    late_by: Lateness,
}

impl From<StopTime> for StopTimeOutput {
    fn from(stop_time: StopTime) -> Self {
        let late_by = stop_time.late_by();
        Self {
            stop_name: stop_time.stop_name,
            arrival_time: stop_time.arrival_time,
            actual_arrival_time: stop_time.actual_arrival_time,
            stop_status: stop_time.stop_status,
            late_by,
        }
    }
}

impl StopTime {
    pub fn late_by(&self) -> Lateness {
        Lateness::classify(self.arrival_time, self.actual_arrival_time)
    }
}

impl Validate for StopTime {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("stopName", &self.stop_name);
        errors.require_max_length("stopName", &self.stop_name, 100);
        errors.into_result()
    }
}

/// Difference between the actual and the scheduled arrival at a stop, in whole
/// minutes truncated toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lateness {
    Late(i64),
    Early(i64),
    OnTime,
    /// The stop has not been reached yet.
    Unknown,
}

impl Lateness {
    pub fn classify(scheduled: DateTime<Utc>, actual: Option<DateTime<Utc>>) -> Self {
        let Some(actual) = actual else {
            return Self::Unknown;
        };
        let minutes = (actual - scheduled).num_minutes();
        if minutes > 0 {
            Self::Late(minutes)
        } else if minutes < 0 {
            Self::Early(-minutes)
        } else {
            Self::OnTime
        }
    }

    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Late(minutes) => Some(format!("{} min late", minutes)),
            Self::Early(minutes) => Some(format!("{} min early", minutes)),
            Self::OnTime => Some("on time".to_owned()),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Lateness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            Some(description) => f.write_str(&description),
            None => f.write_str("unknown"),
        }
    }
}

/// Serialized as the description, `null` when unknown.
impl Serialize for Lateness {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.describe().serialize(serializer)
    }
}

impl JsonSchema for Lateness {
    fn schema_name() -> String {
        "Lateness".to_owned()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <Option<String>>::json_schema(gen)
    }
}

/// The schedule with the latest departure strictly before `now`.
pub fn last_trip<'a, I>(schedules: I, now: DateTime<Utc>) -> Option<&'a WithId<Schedule>>
where
    I: IntoIterator<Item = &'a WithId<Schedule>>,
{
    schedules
        .into_iter()
        .filter(|schedule| schedule.content.departure_time < now)
        .max_by(|a, b| {
            a.content
                .departure_time
                .cmp(&b.content.departure_time)
                .then(a.id.cmp(&b.id))
        })
}

/// The schedule with the earliest departure at or after `now`.
pub fn next_trip<'a, I>(schedules: I, now: DateTime<Utc>) -> Option<&'a WithId<Schedule>>
where
    I: IntoIterator<Item = &'a WithId<Schedule>>,
{
    schedules
        .into_iter()
        .filter(|schedule| schedule.content.departure_time >= now)
        .min_by(|a, b| {
            a.content
                .departure_time
                .cmp(&b.content.departure_time)
                .then(a.id.cmp(&b.id))
        })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    pub bus: Option<Id<Bus>>,
    pub route: Option<Id<Route>>,
    pub is_active: Option<bool>,
}

impl ScheduleFilter {
    pub fn for_bus(bus: Id<Bus>) -> Self {
        Self {
            bus: Some(bus),
            ..Default::default()
        }
    }

    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.bus.map_or(true, |bus| schedule.bus == bus)
            && self.route.map_or(true, |route| schedule.route == route)
            && self.is_active.map_or(true, |a| schedule.is_active == a)
    }
}

/// Orders schedules by departure, then id.
pub fn sort_by_departure(schedules: &mut [WithId<Schedule>]) {
    schedules.sort_by(|a, b| {
        a.content
            .departure_time
            .cmp(&b.content.departure_time)
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 14, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn schedule(id: i64, departure: DateTime<Utc>) -> WithId<Schedule> {
        WithId::new(
            Id::new(id),
            Schedule {
                departure_time: departure,
                arrival_time: departure + Duration::minutes(20),
                ..Schedule::example_data()
            },
        )
    }

    #[test]
    fn lateness_classification() {
        let scheduled = at(0);
        assert_eq!(
            Lateness::classify(scheduled, Some(at(5))).describe().unwrap(),
            "5 min late"
        );
        assert_eq!(
            Lateness::classify(scheduled, Some(at(-3))).describe().unwrap(),
            "3 min early"
        );
        assert_eq!(
            Lateness::classify(scheduled, Some(scheduled)).describe().unwrap(),
            "on time"
        );
        assert_eq!(Lateness::classify(scheduled, None), Lateness::Unknown);
    }

    #[test]
    fn lateness_truncates_toward_zero() {
        let scheduled = at(0);
        let slightly_early = scheduled - Duration::seconds(210);
        assert_eq!(
            Lateness::classify(scheduled, Some(slightly_early)),
            Lateness::Early(3)
        );
        let under_a_minute = scheduled + Duration::seconds(59);
        assert_eq!(
            Lateness::classify(scheduled, Some(under_a_minute)),
            Lateness::OnTime
        );
    }

    #[test]
    fn lateness_serializes_as_text_or_null() {
        assert_eq!(serde_json::to_value(Lateness::Late(2)).unwrap(), "2 min late");
        assert!(serde_json::to_value(Lateness::Unknown).unwrap().is_null());
    }

    #[test]
    fn last_and_next_trip_around_now() {
        let now = at(0);
        let schedules = vec![
            schedule(1, at(-60)),
            schedule(2, at(60)),
            schedule(3, at(-120)),
            schedule(4, at(180)),
        ];
        assert_eq!(last_trip(&schedules, now).unwrap().id, Id::new(1));
        assert_eq!(next_trip(&schedules, now).unwrap().id, Id::new(2));
    }

    #[test]
    fn departure_at_now_is_next_not_last() {
        let now = at(0);
        let schedules = vec![schedule(1, now)];
        assert!(last_trip(&schedules, now).is_none());
        assert_eq!(next_trip(&schedules, now).unwrap().id, Id::new(1));
    }

    #[test]
    fn no_schedules_no_trips() {
        let schedules: Vec<WithId<Schedule>> = vec![];
        assert!(last_trip(&schedules, at(0)).is_none());
        assert!(next_trip(&schedules, at(0)).is_none());
    }

    #[test]
    fn stop_times_carry_lateness() {
        let value = serde_json::to_value(Schedule::example_data()).unwrap();
        assert_eq!(value["stopTimes"][0]["lateBy"], "2 min late");
        assert!(value["stopTimes"][1]["lateBy"].is_null());
        assert!(value["stopTimes"][1].get("actualArrivalTime").is_none());
    }

    #[test]
    fn arrival_before_departure_is_invalid() {
        let mut schedule = Schedule::example_data();
        schedule.arrival_time = schedule.departure_time - Duration::minutes(1);
        schedule.stop_times[0].stop_name = String::new();
        let errors = schedule.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["arrivalTime", "stopTimes[0].stopName"]
        );
    }
}

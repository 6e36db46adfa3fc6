use async_trait::async_trait;
use campus::database::{Repo, Result, ScheduleRepo};
use chrono::{DateTime, Utc};
use model::{
    bus::Bus,
    route::Route,
    schedule::{Schedule, ScheduleFilter, StopTime},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::{parse_code, schedule},
    PgDatabaseTransaction,
};

#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub bus_id: i64,
    pub route_id: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub is_active: bool,
}

impl ScheduleRow {
    pub fn with_stop_times(self, stop_times: Vec<StopTime>) -> WithId<Schedule> {
        WithId::new(
            Id::new(self.id),
            Schedule {
                bus: Id::new(self.bus_id),
                route: Id::new(self.route_id),
                departure_time: self.departure_time,
                arrival_time: self.arrival_time,
                is_active: self.is_active,
                stop_times,
            },
        )
    }
}

/// Table: `stop_times`, ordered by `position` within a schedule.
#[derive(Debug, Clone, FromRow)]
pub struct StopTimeRow {
    pub schedule_id: i64,
    pub position: i32,
    pub stop_name: String,
    pub arrival_time: DateTime<Utc>,
    pub actual_arrival_time: Option<DateTime<Utc>>,
    pub stop_status: String,
}

impl StopTimeRow {
    pub fn to_stop_time(self) -> Result<StopTime> {
        Ok(StopTime {
            stop_name: self.stop_name,
            arrival_time: self.arrival_time,
            actual_arrival_time: self.actual_arrival_time,
            stop_status: parse_code(&self.stop_status)?,
        })
    }
}

#[async_trait]
impl<'a> Repo<Schedule> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<Schedule>) -> Result<WithId<Schedule>> {
        schedule::get(&mut self.tx, id).await
    }

    async fn insert(&mut self, element: Schedule) -> Result<WithId<Schedule>> {
        schedule::insert(&mut self.tx, element).await
    }

    async fn update(&mut self, element: WithId<Schedule>) -> Result<WithId<Schedule>> {
        schedule::update(&mut self.tx, element).await
    }

    async fn delete(&mut self, id: Id<Schedule>) -> Result<()> {
        schedule::delete(&mut self.tx, id).await
    }
}

#[async_trait]
impl<'a> ScheduleRepo for PgDatabaseTransaction<'a> {
    async fn schedules(
        &mut self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<WithId<Schedule>>> {
        schedule::get_filtered(&mut self.tx, filter).await
    }

    async fn last_trip(
        &mut self,
        bus: Id<Bus>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithId<Schedule>>> {
        schedule::last_trip(&mut self.tx, bus, now).await
    }

    async fn next_trip(
        &mut self,
        bus: Id<Bus>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithId<Schedule>>> {
        schedule::next_trip(&mut self.tx, bus, now).await
    }

    async fn delete_schedules_of_bus(&mut self, bus: Id<Bus>) -> Result<u64> {
        schedule::delete_by_bus(&mut self.tx, bus).await
    }

    async fn delete_schedules_of_route(&mut self, route: Id<Route>) -> Result<u64> {
        schedule::delete_by_route(&mut self.tx, route).await
    }
}

use async_trait::async_trait;
use campus::database::{LocationRepo, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    bus::Bus,
    location::{LocationFilter, LocationRecord},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::{location, parse_code},
    PgDatabaseTransaction,
};

use super::DatabaseRow;

/// Table: `locations`
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    pub id: i64,
    pub bus_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
    pub speed: Option<f64>,
}

impl DatabaseRow for LocationRow {
    type Model = LocationRecord;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(LocationRecord {
            bus: Id::new(self.bus_id),
            latitude: self.latitude,
            longitude: self.longitude,
            status: parse_code(&self.status)?,
            timestamp: Some(self.recorded_at),
            speed: self.speed,
        })
    }
}

#[async_trait]
impl<'a> LocationRepo for PgDatabaseTransaction<'a> {
    async fn location(
        &mut self,
        id: Id<LocationRecord>,
    ) -> Result<WithId<LocationRecord>> {
        location::get(&mut *self.tx, id).await
    }

    async fn append_location(
        &mut self,
        record: LocationRecord,
    ) -> Result<WithId<LocationRecord>> {
        location::insert(&mut *self.tx, record).await
    }

    async fn locations(
        &mut self,
        filter: &LocationFilter,
    ) -> Result<Vec<WithId<LocationRecord>>> {
        location::get_filtered(&mut *self.tx, filter).await
    }

    async fn latest_locations(
        &mut self,
        buses: &[Id<Bus>],
        n: usize,
    ) -> Result<IndexMap<Id<Bus>, Vec<WithId<LocationRecord>>>> {
        location::latest_per_bus(&mut *self.tx, buses, n).await
    }

    async fn delete_locations_of_bus(&mut self, bus: Id<Bus>) -> Result<u64> {
        location::delete_by_bus(&mut *self.tx, bus).await
    }
}

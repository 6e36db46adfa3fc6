use async_trait::async_trait;
use campus::database::{BusRepo, Repo, Result};
use chrono::{DateTime, Utc};
use model::{
    bus::{Bus, BusFilter},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::{bus, parse_code},
    PgDatabaseTransaction,
};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct BusRow {
    pub id: i64,
    pub bus_number: String,
    pub bus_type: String,
    pub capacity: i32,
    pub license_plate: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub added_on: DateTime<Utc>,
}

impl DatabaseRow for BusRow {
    type Model = Bus;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Bus {
            bus_number: self.bus_number,
            bus_type: parse_code(&self.bus_type)?,
            capacity: self.capacity,
            license_plate: self.license_plate,
            latitude: self.latitude,
            longitude: self.longitude,
            is_active: self.is_active,
            added_on: Some(self.added_on),
        })
    }
}

#[async_trait]
impl<'a> Repo<Bus> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<Bus>) -> Result<WithId<Bus>> {
        bus::get(&mut *self.tx, id).await
    }

    async fn insert(&mut self, element: Bus) -> Result<WithId<Bus>> {
        bus::insert(&mut *self.tx, element).await
    }

    async fn update(&mut self, element: WithId<Bus>) -> Result<WithId<Bus>> {
        bus::update(&mut *self.tx, element).await
    }

    async fn delete(&mut self, id: Id<Bus>) -> Result<()> {
        bus::delete(&mut *self.tx, id).await
    }
}

#[async_trait]
impl<'a> BusRepo for PgDatabaseTransaction<'a> {
    async fn buses(&mut self, filter: &BusFilter) -> Result<Vec<WithId<Bus>>> {
        bus::get_filtered(&mut *self.tx, filter).await
    }
}

use async_trait::async_trait;
use campus::database::{DriverRepo, Repo, Result};
use model::{
    bus::Bus,
    driver::{Driver, DriverFilter},
    user::User,
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::driver, PgDatabaseTransaction};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct DriverRow {
    pub id: i64,
    pub user_id: i64,
    pub license_number: String,
    pub years_of_experience: i32,
    pub assigned_bus_id: Option<i64>,
}

impl DatabaseRow for DriverRow {
    type Model = Driver;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Driver {
            user: Id::new(self.user_id),
            license_number: self.license_number,
            years_of_experience: self.years_of_experience,
            assigned_bus: self.assigned_bus_id.map(Id::new),
        })
    }
}

#[async_trait]
impl<'a> Repo<Driver> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<Driver>) -> Result<WithId<Driver>> {
        driver::get(&mut *self.tx, id).await
    }

    async fn insert(&mut self, element: Driver) -> Result<WithId<Driver>> {
        driver::insert(&mut *self.tx, element).await
    }

    async fn update(&mut self, element: WithId<Driver>) -> Result<WithId<Driver>> {
        driver::update(&mut *self.tx, element).await
    }

    async fn delete(&mut self, id: Id<Driver>) -> Result<()> {
        driver::delete(&mut *self.tx, id).await
    }
}

#[async_trait]
impl<'a> DriverRepo for PgDatabaseTransaction<'a> {
    async fn drivers(&mut self, filter: &DriverFilter) -> Result<Vec<WithId<Driver>>> {
        driver::get_filtered(&mut *self.tx, filter).await
    }

    async fn driver_of_bus(&mut self, bus: Id<Bus>) -> Result<Option<WithId<Driver>>> {
        driver::get_by_bus(&mut *self.tx, bus).await
    }

    async fn unassign_bus(&mut self, bus: Id<Bus>) -> Result<()> {
        driver::unassign_bus(&mut *self.tx, bus).await
    }

    async fn delete_drivers_of_user(&mut self, user: Id<User>) -> Result<u64> {
        driver::delete_by_user(&mut *self.tx, user).await
    }
}

use async_trait::async_trait;
use campus::database::{Repo, Result, RouteRepo};
use chrono::Duration;
use model::{
    route::{Route, RouteFilter},
    WithId,
};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};
use utility::id::Id;

use crate::{queries::route, PgDatabaseTransaction};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub id: i64,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub stops: Json<Value>,
    pub distance: f64,
    pub estimated_duration_seconds: i64,
}

impl DatabaseRow for RouteRow {
    type Model = Route;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Route {
            name: self.name,
            origin: self.origin,
            destination: self.destination,
            stops: self.stops.0,
            distance: self.distance,
            estimated_duration: Duration::seconds(self.estimated_duration_seconds),
        })
    }
}

#[async_trait]
impl<'a> Repo<Route> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<Route>) -> Result<WithId<Route>> {
        route::get(&mut *self.tx, id).await
    }

    async fn insert(&mut self, element: Route) -> Result<WithId<Route>> {
        route::insert(&mut *self.tx, element).await
    }

    async fn update(&mut self, element: WithId<Route>) -> Result<WithId<Route>> {
        route::update(&mut *self.tx, element).await
    }

    async fn delete(&mut self, id: Id<Route>) -> Result<()> {
        route::delete(&mut *self.tx, id).await
    }
}

#[async_trait]
impl<'a> RouteRepo for PgDatabaseTransaction<'a> {
    async fn routes(&mut self, filter: &RouteFilter) -> Result<Vec<WithId<Route>>> {
        route::get_filtered(&mut *self.tx, filter).await
    }
}

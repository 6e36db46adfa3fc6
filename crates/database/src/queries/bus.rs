use campus::database::Result;
use model::{
    bus::{Bus, BusFilter},
    WithId,
};
use sqlx::{Executor, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{bus::BusRow, with_id, with_ids};

use super::{convert_error, deleted, search_needle};

const COLUMNS: &str = "
    id, bus_number, bus_type, capacity, license_plate, latitude, longitude,
    is_active, added_on
";

pub async fn get<'c, E>(executor: E, id: Id<Bus>) -> Result<WithId<Bus>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, BusRow>(&format!("SELECT {} FROM buses WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_id)
}

pub async fn get_filtered<'c, E>(executor: E, filter: &BusFilter) -> Result<Vec<WithId<Bus>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM buses WHERE TRUE",
        COLUMNS
    ));
    if let Some(bus_type) = filter.bus_type {
        query.push(" AND bus_type = ").push_bind(bus_type.code());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(needle) = search_needle(filter.search.as_deref()) {
        query
            .push(" AND (bus_number ILIKE ")
            .push_bind(needle.clone())
            .push(" OR license_plate ILIKE ")
            .push_bind(needle)
            .push(")");
    }
    query.push(" ORDER BY ").push(filter.ordering.sql()).push(";");
    query
        .build_query_as::<BusRow>()
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_ids)
}

pub async fn insert<'c, E>(executor: E, bus: Bus) -> Result<WithId<Bus>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, BusRow>(&format!(
        "
        INSERT INTO buses(
            bus_number,
            bus_type,
            capacity,
            license_plate,
            latitude,
            longitude,
            is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&bus.bus_number)
    .bind(bus.bus_type.code())
    .bind(bus.capacity)
    .bind(&bus.license_plate)
    .bind(bus.latitude)
    .bind(bus.longitude)
    .bind(bus.is_active)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

/// `added_on` is not changed.
pub async fn update<'c, E>(executor: E, bus: WithId<Bus>) -> Result<WithId<Bus>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, BusRow>(&format!(
        "
        UPDATE buses
        SET bus_number = $1,
            bus_type = $2,
            capacity = $3,
            license_plate = $4,
            latitude = $5,
            longitude = $6,
            is_active = $7
        WHERE id = $8
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&bus.content.bus_number)
    .bind(bus.content.bus_type.code())
    .bind(bus.content.capacity)
    .bind(&bus.content.license_plate)
    .bind(bus.content.latitude)
    .bind(bus.content.longitude)
    .bind(bus.content.is_active)
    .bind(bus.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn delete<'c, E>(executor: E, id: Id<Bus>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM buses WHERE id = $1;")
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

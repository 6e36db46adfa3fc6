use campus::database::Result;
use model::{
    bus::Bus,
    driver::{Driver, DriverFilter},
    user::User,
    WithId,
};
use sqlx::{Executor, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{driver::DriverRow, with_id, with_ids};

use super::{convert_error, deleted, search_needle};

const COLUMNS: &str = "id, user_id, license_number, years_of_experience, assigned_bus_id";

pub async fn get<'c, E>(executor: E, id: Id<Driver>) -> Result<WithId<Driver>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, DriverRow>(&format!("SELECT {} FROM drivers WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_id)
}

/// Searches the name of the user behind a driver as well.
pub async fn get_filtered<'c, E>(
    executor: E,
    filter: &DriverFilter,
) -> Result<Vec<WithId<Driver>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = QueryBuilder::<Postgres>::new(
        "
        SELECT
            d.id, d.user_id, d.license_number, d.years_of_experience,
            d.assigned_bus_id
        FROM drivers d
        LEFT JOIN users u ON u.id = d.user_id
        WHERE TRUE
        ",
    );
    if let Some(needle) = search_needle(filter.search.as_deref()) {
        query
            .push(" AND (u.first_name ILIKE ")
            .push_bind(needle.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(needle.clone())
            .push(" OR d.license_number ILIKE ")
            .push_bind(needle)
            .push(")");
    }
    query.push(" ORDER BY d.id;");
    query
        .build_query_as::<DriverRow>()
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_ids)
}

pub async fn get_by_bus<'c, E>(executor: E, bus: Id<Bus>) -> Result<Option<WithId<Driver>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, DriverRow>(&format!(
        "SELECT {} FROM drivers WHERE assigned_bus_id = $1;",
        COLUMNS
    ))
    .bind(bus.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?
    .map(with_id)
    .transpose()
}

pub async fn insert<'c, E>(executor: E, driver: Driver) -> Result<WithId<Driver>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, DriverRow>(&format!(
        "
        INSERT INTO drivers(
            user_id,
            license_number,
            years_of_experience,
            assigned_bus_id
        )
        VALUES ($1, $2, $3, $4)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(driver.user.raw())
    .bind(&driver.license_number)
    .bind(driver.years_of_experience)
    .bind(driver.assigned_bus.map(|bus| bus.raw()))
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn update<'c, E>(executor: E, driver: WithId<Driver>) -> Result<WithId<Driver>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, DriverRow>(&format!(
        "
        UPDATE drivers
        SET user_id = $1,
            license_number = $2,
            years_of_experience = $3,
            assigned_bus_id = $4
        WHERE id = $5
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(driver.content.user.raw())
    .bind(&driver.content.license_number)
    .bind(driver.content.years_of_experience)
    .bind(driver.content.assigned_bus.map(|bus| bus.raw()))
    .bind(driver.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn unassign_bus<'c, E>(executor: E, bus: Id<Bus>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE drivers SET assigned_bus_id = NULL WHERE assigned_bus_id = $1;")
        .bind(bus.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .map(|_| ())
}

pub async fn delete<'c, E>(executor: E, id: Id<Driver>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM drivers WHERE id = $1;")
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

pub async fn delete_by_user<'c, E>(executor: E, user: Id<User>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM drivers WHERE user_id = $1;")
        .bind(user.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .map(|result| result.rows_affected())
}

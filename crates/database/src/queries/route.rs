use campus::database::Result;
use model::{
    route::{Route, RouteFilter},
    WithId,
};
use sqlx::{types::Json, Executor, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{route::RouteRow, with_id, with_ids};

use super::{convert_error, deleted, search_needle};

const COLUMNS: &str =
    "id, name, origin, destination, stops, distance, estimated_duration_seconds";

pub async fn get<'c, E>(executor: E, id: Id<Route>) -> Result<WithId<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RouteRow>(&format!("SELECT {} FROM routes WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_id)
}

pub async fn get_filtered<'c, E>(executor: E, filter: &RouteFilter) -> Result<Vec<WithId<Route>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM routes WHERE TRUE",
        COLUMNS
    ));
    if let Some(needle) = search_needle(filter.search.as_deref()) {
        query
            .push(" AND (name ILIKE ")
            .push_bind(needle.clone())
            .push(" OR origin ILIKE ")
            .push_bind(needle.clone())
            .push(" OR destination ILIKE ")
            .push_bind(needle)
            .push(")");
    }
    query.push(" ORDER BY id;");
    query
        .build_query_as::<RouteRow>()
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_ids)
}

pub async fn insert<'c, E>(executor: E, route: Route) -> Result<WithId<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RouteRow>(&format!(
        "
        INSERT INTO routes(
            name,
            origin,
            destination,
            stops,
            distance,
            estimated_duration_seconds
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&route.name)
    .bind(&route.origin)
    .bind(&route.destination)
    .bind(Json(&route.stops))
    .bind(route.distance)
    .bind(route.estimated_duration.num_seconds())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn update<'c, E>(executor: E, route: WithId<Route>) -> Result<WithId<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RouteRow>(&format!(
        "
        UPDATE routes
        SET name = $1,
            origin = $2,
            destination = $3,
            stops = $4,
            distance = $5,
            estimated_duration_seconds = $6
        WHERE id = $7
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&route.content.name)
    .bind(&route.content.origin)
    .bind(&route.content.destination)
    .bind(Json(&route.content.stops))
    .bind(route.content.distance)
    .bind(route.content.estimated_duration.num_seconds())
    .bind(route.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn delete<'c, E>(executor: E, id: Id<Route>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM routes WHERE id = $1;")
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

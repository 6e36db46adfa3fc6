use campus::database::Result;
use indexmap::IndexMap;
use model::{
    bus::Bus,
    location::{self, LocationFilter, LocationRecord},
    WithId,
};
use sqlx::{Executor, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{location::LocationRow, with_id, with_ids};

use super::convert_error;

const COLUMNS: &str = "id, bus_id, latitude, longitude, status, recorded_at, speed";

/// Same order as the in-memory top-N selection: newest first, ties by id.
const RECENT_FIRST: &str = "recorded_at DESC, id DESC";

pub async fn get<'c, E>(executor: E, id: Id<LocationRecord>) -> Result<WithId<LocationRecord>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, LocationRow>(&format!("SELECT {} FROM locations WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_id)
}

/// Most recent first.
pub async fn get_filtered<'c, E>(
    executor: E,
    filter: &LocationFilter,
) -> Result<Vec<WithId<LocationRecord>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM locations WHERE TRUE",
        COLUMNS
    ));
    if let Some(bus) = filter.bus_id {
        query.push(" AND bus_id = ").push_bind(bus.raw());
    }
    query
        .push(" ORDER BY ")
        .push(RECENT_FIRST)
        .push(" LIMIT ")
        .push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX))
        .push(";");
    query
        .build_query_as::<LocationRow>()
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_ids)
}

/// Ranks the records of every bus in `$1` by recency and keeps ranks `<= $2`.
fn latest_per_bus_query() -> String {
    format!(
        "
        SELECT {}
        FROM (
            SELECT
                {},
                ROW_NUMBER() OVER (
                    PARTITION BY bus_id
                    ORDER BY {}
                ) AS rank
            FROM locations
            WHERE bus_id = ANY($1)
        ) ranked
        WHERE rank <= $2
        ORDER BY bus_id, {};
        ",
        COLUMNS, COLUMNS, RECENT_FIRST, RECENT_FIRST
    )
}

/// The `n` most recent records per bus, selected in a single query. The rows
/// are grouped by bus afterwards, with every requested bus present.
pub async fn latest_per_bus<'c, E>(
    executor: E,
    buses: &[Id<Bus>],
    n: usize,
) -> Result<IndexMap<Id<Bus>, Vec<WithId<LocationRecord>>>>
where
    E: Executor<'c, Database = Postgres>,
{
    if buses.is_empty() {
        return Ok(IndexMap::new());
    }
    let bus_ids = Id::raw_all(buses);
    let rows: Vec<LocationRow> = sqlx::query_as(&latest_per_bus_query())
        .bind(&bus_ids)
        .bind(i64::try_from(n).unwrap_or(i64::MAX))
        .fetch_all(executor)
        .await
        .map_err(convert_error)?;
    log::debug!(
        "selected {} location record(s) for {} bus(es)",
        rows.len(),
        buses.len()
    );
    Ok(location::latest_per_bus(buses, with_ids(rows)?, n))
}

/// Without a timestamp the record is stamped by the database.
pub async fn insert<'c, E>(executor: E, record: LocationRecord) -> Result<WithId<LocationRecord>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, LocationRow>(&format!(
        "
        INSERT INTO locations(
            bus_id,
            latitude,
            longitude,
            status,
            recorded_at,
            speed
        )
        VALUES ($1, $2, $3, $4, COALESCE($5, now()), $6)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(record.bus.raw())
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.status.code())
    .bind(record.timestamp)
    .bind(record.speed)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn delete_by_bus<'c, E>(executor: E, bus: Id<Bus>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM locations WHERE bus_id = $1;")
        .bind(bus.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .map(|result| result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squashed(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn latest_per_bus_ranks_within_each_bus_newest_first() {
        let sql = squashed(&latest_per_bus_query());
        assert!(sql.contains(
            "ROW_NUMBER() OVER ( PARTITION BY bus_id ORDER BY recorded_at DESC, id DESC ) AS rank"
        ));
        assert!(sql.contains("WHERE bus_id = ANY($1)"));
        assert!(sql.contains("WHERE rank <= $2"));
        assert!(sql.ends_with("ORDER BY bus_id, recorded_at DESC, id DESC;"));
    }

    #[test]
    fn latest_per_bus_selects_every_row_column() {
        let sql = squashed(&latest_per_bus_query());
        assert!(sql.starts_with(&format!("SELECT {} FROM (", squashed(COLUMNS))));
    }
}

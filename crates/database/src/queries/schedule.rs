use std::collections::HashMap;

use campus::database::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use model::{
    bus::Bus,
    route::Route,
    schedule::{Schedule, ScheduleFilter, StopTime},
    WithId,
};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use utility::id::Id;

use crate::data_model::schedule::{ScheduleRow, StopTimeRow};

use super::{convert_error, deleted};

const COLUMNS: &str = "id, bus_id, route_id, departure_time, arrival_time, is_active";

/// Loads the stop times of `rows` and assembles the schedules, keeping the
/// order of `rows`.
async fn with_stop_times(
    conn: &mut PgConnection,
    rows: Vec<ScheduleRow>,
) -> Result<Vec<WithId<Schedule>>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids = rows.iter().map(|row| row.id).collect::<Vec<_>>();
    let stop_rows: Vec<StopTimeRow> = sqlx::query_as(
        "
        SELECT
            schedule_id, position, stop_name, arrival_time, actual_arrival_time,
            stop_status
        FROM stop_times
        WHERE schedule_id = ANY($1)
        ORDER BY schedule_id, position;
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(convert_error)?;

    let mut by_schedule: HashMap<i64, Vec<StopTime>> = HashMap::new();
    for stop_row in stop_rows {
        let schedule_id = stop_row.schedule_id;
        by_schedule
            .entry(schedule_id)
            .or_default()
            .push(stop_row.to_stop_time()?);
    }
    Ok(rows
        .into_iter()
        .map(|row| {
            let stop_times = by_schedule.remove(&row.id).unwrap_or_default();
            row.with_stop_times(stop_times)
        })
        .collect())
}

async fn insert_stop_times(
    conn: &mut PgConnection,
    schedule_id: i64,
    stop_times: &[StopTime],
) -> Result<()> {
    if stop_times.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<Postgres>::new(
        "
        INSERT INTO stop_times(
            schedule_id,
            position,
            stop_name,
            arrival_time,
            actual_arrival_time,
            stop_status
        )
        ",
    );
    query.push_values(
        stop_times.iter().enumerate(),
        |mut values, (position, stop_time)| {
            values
                .push_bind(schedule_id)
                .push_bind(position as i32)
                .push_bind(stop_time.stop_name.clone())
                .push_bind(stop_time.arrival_time)
                .push_bind(stop_time.actual_arrival_time)
                .push_bind(stop_time.stop_status.code());
        },
    );
    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(convert_error)
        .map(|_| ())
}

pub async fn get(conn: &mut PgConnection, id: Id<Schedule>) -> Result<WithId<Schedule>> {
    let row: ScheduleRow =
        sqlx::query_as(&format!("SELECT {} FROM schedules WHERE id = $1;", COLUMNS))
            .bind(id.raw())
            .fetch_one(&mut *conn)
            .await
            .map_err(convert_error)?;
    with_stop_times(conn, vec![row])
        .await?
        .pop()
        .ok_or(DatabaseError::NotFound)
}

pub async fn get_filtered(
    conn: &mut PgConnection,
    filter: &ScheduleFilter,
) -> Result<Vec<WithId<Schedule>>> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM schedules WHERE TRUE",
        COLUMNS
    ));
    if let Some(bus) = filter.bus {
        query.push(" AND bus_id = ").push_bind(bus.raw());
    }
    if let Some(route) = filter.route {
        query.push(" AND route_id = ").push_bind(route.raw());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    query.push(" ORDER BY departure_time, id;");
    let rows = query
        .build_query_as::<ScheduleRow>()
        .fetch_all(&mut *conn)
        .await
        .map_err(convert_error)?;
    with_stop_times(conn, rows).await
}

/// Latest departure strictly before `now`.
pub async fn last_trip(
    conn: &mut PgConnection,
    bus: Id<Bus>,
    now: DateTime<Utc>,
) -> Result<Option<WithId<Schedule>>> {
    let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
        "
        SELECT {} FROM schedules
        WHERE bus_id = $1 AND departure_time < $2
        ORDER BY departure_time DESC, id DESC
        LIMIT 1;
        ",
        COLUMNS
    ))
    .bind(bus.raw())
    .bind(now)
    .fetch_all(&mut *conn)
    .await
    .map_err(convert_error)?;
    Ok(with_stop_times(conn, rows).await?.pop())
}

/// Earliest departure at or after `now`.
pub async fn next_trip(
    conn: &mut PgConnection,
    bus: Id<Bus>,
    now: DateTime<Utc>,
) -> Result<Option<WithId<Schedule>>> {
    let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
        "
        SELECT {} FROM schedules
        WHERE bus_id = $1 AND departure_time >= $2
        ORDER BY departure_time ASC, id ASC
        LIMIT 1;
        ",
        COLUMNS
    ))
    .bind(bus.raw())
    .bind(now)
    .fetch_all(&mut *conn)
    .await
    .map_err(convert_error)?;
    Ok(with_stop_times(conn, rows).await?.pop())
}

pub async fn insert(conn: &mut PgConnection, schedule: Schedule) -> Result<WithId<Schedule>> {
    let row: ScheduleRow = sqlx::query_as(&format!(
        "
        INSERT INTO schedules(
            bus_id,
            route_id,
            departure_time,
            arrival_time,
            is_active
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(schedule.bus.raw())
    .bind(schedule.route.raw())
    .bind(schedule.departure_time)
    .bind(schedule.arrival_time)
    .bind(schedule.is_active)
    .fetch_one(&mut *conn)
    .await
    .map_err(convert_error)?;
    insert_stop_times(conn, row.id, &schedule.stop_times).await?;
    Ok(row.with_stop_times(schedule.stop_times))
}

/// Replaces the schedule and all of its stop times.
pub async fn update(
    conn: &mut PgConnection,
    schedule: WithId<Schedule>,
) -> Result<WithId<Schedule>> {
    let row: ScheduleRow = sqlx::query_as(&format!(
        "
        UPDATE schedules
        SET bus_id = $1,
            route_id = $2,
            departure_time = $3,
            arrival_time = $4,
            is_active = $5
        WHERE id = $6
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(schedule.content.bus.raw())
    .bind(schedule.content.route.raw())
    .bind(schedule.content.departure_time)
    .bind(schedule.content.arrival_time)
    .bind(schedule.content.is_active)
    .bind(schedule.id.raw())
    .fetch_one(&mut *conn)
    .await
    .map_err(convert_error)?;
    sqlx::query("DELETE FROM stop_times WHERE schedule_id = $1;")
        .bind(row.id)
        .execute(&mut *conn)
        .await
        .map_err(convert_error)?;
    insert_stop_times(conn, row.id, &schedule.content.stop_times).await?;
    Ok(row.with_stop_times(schedule.content.stop_times))
}

/// Stop times are removed by the schema.
pub async fn delete(conn: &mut PgConnection, id: Id<Schedule>) -> Result<()> {
    sqlx::query("DELETE FROM schedules WHERE id = $1;")
        .bind(id.raw())
        .execute(conn)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

pub async fn delete_by_bus(conn: &mut PgConnection, bus: Id<Bus>) -> Result<u64> {
    sqlx::query("DELETE FROM schedules WHERE bus_id = $1;")
        .bind(bus.raw())
        .execute(conn)
        .await
        .map_err(convert_error)
        .map(|result| result.rows_affected())
}

pub async fn delete_by_route(conn: &mut PgConnection, route: Id<Route>) -> Result<u64> {
    sqlx::query("DELETE FROM schedules WHERE route_id = $1;")
        .bind(route.raw())
        .execute(conn)
        .await
        .map_err(convert_error)
        .map(|result| result.rows_affected())
}

use campus::database::Result;
use model::{
    lecturer::{Lecturer, LecturerFilter},
    WithId,
};
use sqlx::{Executor, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{lecturer::LecturerRow, with_id, with_ids};

use super::{convert_error, deleted, search_needle};

const COLUMNS: &str = "
    id, display_name, lecturer_type, department_name, is_active, staff_id,
    specialization, joined_date, email, created_at, updated_at
";

pub async fn get<'c, E>(executor: E, id: Id<Lecturer>) -> Result<WithId<Lecturer>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, LecturerRow>(&format!("SELECT {} FROM lecturers WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_id)
}

/// Most recently joined first.
pub async fn get_filtered<'c, E>(
    executor: E,
    filter: &LecturerFilter,
) -> Result<Vec<WithId<Lecturer>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM lecturers WHERE TRUE",
        COLUMNS
    ));
    if let Some(lecturer_type) = filter.lecturer_type {
        query
            .push(" AND lecturer_type = ")
            .push_bind(lecturer_type.code());
    }
    if let Some(department_name) = &filter.department_name {
        query
            .push(" AND department_name = ")
            .push_bind(department_name.clone());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(needle) = search_needle(filter.search.as_deref()) {
        query
            .push(" AND (display_name ILIKE ")
            .push_bind(needle.clone())
            .push(" OR staff_id ILIKE ")
            .push_bind(needle.clone())
            .push(" OR specialization ILIKE ")
            .push_bind(needle)
            .push(")");
    }
    query.push(" ORDER BY joined_date DESC, id;");
    query
        .build_query_as::<LecturerRow>()
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_ids)
}

/// `lecturer.staff_id` has to be set.
pub async fn insert<'c, E>(executor: E, lecturer: Lecturer) -> Result<WithId<Lecturer>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, LecturerRow>(&format!(
        "
        INSERT INTO lecturers(
            display_name,
            lecturer_type,
            department_name,
            is_active,
            staff_id,
            specialization,
            joined_date,
            email
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&lecturer.display_name)
    .bind(lecturer.lecturer_type.code())
    .bind(&lecturer.department_name)
    .bind(lecturer.is_active)
    .bind(&lecturer.staff_id)
    .bind(&lecturer.specialization)
    .bind(lecturer.joined_date)
    .bind(&lecturer.email)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

/// The staff id is never changed.
pub async fn update<'c, E>(executor: E, lecturer: WithId<Lecturer>) -> Result<WithId<Lecturer>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, LecturerRow>(&format!(
        "
        UPDATE lecturers
        SET display_name = $1,
            lecturer_type = $2,
            department_name = $3,
            is_active = $4,
            specialization = $5,
            joined_date = $6,
            email = $7,
            updated_at = now()
        WHERE id = $8
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(&lecturer.content.display_name)
    .bind(lecturer.content.lecturer_type.code())
    .bind(&lecturer.content.department_name)
    .bind(lecturer.content.is_active)
    .bind(&lecturer.content.specialization)
    .bind(lecturer.content.joined_date)
    .bind(&lecturer.content.email)
    .bind(lecturer.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn delete<'c, E>(executor: E, id: Id<Lecturer>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM lecturers WHERE id = $1;")
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

use campus::database::Result;
use model::{
    user::{User, UserFilter},
    WithId,
};
use sqlx::{Executor, Postgres, QueryBuilder};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{user::UserRow, with_id, with_ids};

use super::{convert_error, deleted, search_needle};

const COLUMNS: &str = "
    id, user_type, username, first_name, last_name, email, phone, address,
    profile_picture, is_active
";

pub async fn get<'c, E>(executor: E, id: Id<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_id)
}

pub async fn get_filtered<'c, E>(executor: E, filter: &UserFilter) -> Result<Vec<WithId<User>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM users WHERE TRUE",
        COLUMNS
    ));
    if let Some(user_type) = filter.user_type {
        query.push(" AND user_type = ").push_bind(user_type.code());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(needle) = search_needle(filter.search.as_deref()) {
        query
            .push(" AND (username ILIKE ")
            .push_bind(needle.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(needle.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(needle.clone())
            .push(" OR email ILIKE ")
            .push_bind(needle)
            .push(")");
    }
    query.push(" ORDER BY id;");
    query
        .build_query_as::<UserRow>()
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .let_owned(with_ids)
}

pub async fn insert<'c, E>(executor: E, user: User) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!(
        "
        INSERT INTO users(
            user_type,
            username,
            first_name,
            last_name,
            email,
            phone,
            address,
            profile_picture
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(user.user_type.code())
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(&user.profile_picture)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

/// `is_active` is not changed.
pub async fn update<'c, E>(executor: E, user: WithId<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!(
        "
        UPDATE users
        SET user_type = $1,
            username = $2,
            first_name = $3,
            last_name = $4,
            email = $5,
            phone = $6,
            address = $7,
            profile_picture = $8
        WHERE id = $9
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(user.content.user_type.code())
    .bind(&user.content.username)
    .bind(&user.content.first_name)
    .bind(&user.content.last_name)
    .bind(&user.content.email)
    .bind(&user.content.phone)
    .bind(&user.content.address)
    .bind(&user.content.profile_picture)
    .bind(user.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn delete<'c, E>(executor: E, id: Id<User>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM users WHERE id = $1;")
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

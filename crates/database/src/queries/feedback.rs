use std::collections::HashMap;

use campus::database::{DatabaseError, Result};
use model::{
    feedback::{Feedback, Reply},
    WithId,
};
use sqlx::PgConnection;
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    feedback::{FeedbackRow, ReplyRow},
    with_id,
};

use super::{convert_error, deleted};

/// Loads the replies of `rows`, oldest first, and assembles the feedbacks in
/// the order of `rows`.
async fn with_replies(
    conn: &mut PgConnection,
    rows: Vec<FeedbackRow>,
) -> Result<Vec<WithId<Feedback>>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids = rows.iter().map(|row| row.id).collect::<Vec<_>>();
    let reply_rows: Vec<ReplyRow> = sqlx::query_as(
        "
        SELECT id, feedback_id, author_name, message, created_at
        FROM replies
        WHERE feedback_id = ANY($1)
        ORDER BY created_at, id;
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(convert_error)?;

    let mut by_feedback: HashMap<i64, Vec<WithId<Reply>>> = HashMap::new();
    for reply_row in reply_rows {
        let feedback_id = reply_row.feedback_id;
        by_feedback
            .entry(feedback_id)
            .or_default()
            .push(with_id(reply_row)?);
    }
    rows.into_iter()
        .map(|row| {
            let replies = by_feedback.remove(&row.id).unwrap_or_default();
            with_id(row).map(|feedback| {
                feedback.map(|mut content| {
                    content.replies = replies;
                    content
                })
            })
        })
        .collect()
}

pub async fn get(conn: &mut PgConnection, id: Id<Feedback>) -> Result<WithId<Feedback>> {
    let row: FeedbackRow = sqlx::query_as(
        "
        SELECT id, author_name, message, created_at
        FROM feedbacks
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(&mut *conn)
    .await
    .map_err(convert_error)?;
    with_replies(conn, vec![row])
        .await?
        .pop()
        .ok_or(DatabaseError::NotFound)
}

/// Newest first.
pub async fn get_all(conn: &mut PgConnection) -> Result<Vec<WithId<Feedback>>> {
    let rows: Vec<FeedbackRow> = sqlx::query_as(
        "
        SELECT id, author_name, message, created_at
        FROM feedbacks
        ORDER BY created_at DESC, id DESC;
        ",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(convert_error)?;
    with_replies(conn, rows).await
}

/// A new feedback has no replies.
pub async fn insert(conn: &mut PgConnection, feedback: Feedback) -> Result<WithId<Feedback>> {
    sqlx::query_as::<_, FeedbackRow>(
        "
        INSERT INTO feedbacks(author_name, message)
        VALUES ($1, $2)
        RETURNING id, author_name, message, created_at;
        ",
    )
    .bind(&feedback.author_name)
    .bind(&feedback.message)
    .fetch_one(conn)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn update(
    conn: &mut PgConnection,
    feedback: WithId<Feedback>,
) -> Result<WithId<Feedback>> {
    let row: FeedbackRow = sqlx::query_as(
        "
        UPDATE feedbacks
        SET author_name = $1,
            message = $2
        WHERE id = $3
        RETURNING id, author_name, message, created_at;
        ",
    )
    .bind(&feedback.content.author_name)
    .bind(&feedback.content.message)
    .bind(feedback.id.raw())
    .fetch_one(&mut *conn)
    .await
    .map_err(convert_error)?;
    with_replies(conn, vec![row])
        .await?
        .pop()
        .ok_or(DatabaseError::NotFound)
}

/// Replies are removed by the schema.
pub async fn delete(conn: &mut PgConnection, id: Id<Feedback>) -> Result<()> {
    sqlx::query("DELETE FROM feedbacks WHERE id = $1;")
        .bind(id.raw())
        .execute(conn)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}

pub async fn insert_reply(conn: &mut PgConnection, reply: Reply) -> Result<WithId<Reply>> {
    sqlx::query_as::<_, ReplyRow>(
        "
        INSERT INTO replies(feedback_id, author_name, message)
        VALUES ($1, $2, $3)
        RETURNING id, feedback_id, author_name, message, created_at;
        ",
    )
    .bind(reply.feedback.raw())
    .bind(&reply.author_name)
    .bind(&reply.message)
    .fetch_one(conn)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

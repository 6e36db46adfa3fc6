use async_trait::async_trait;
use campus::database::{FeedbackRepo, Repo, Result};
use chrono::{DateTime, Utc};
use model::{
    feedback::{Feedback, Reply},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::feedback, PgDatabaseTransaction};

use super::DatabaseRow;

/// Table: `feedbacks`. Replies are loaded separately.
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackRow {
    pub id: i64,
    pub author_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for FeedbackRow {
    type Model = Feedback;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Feedback {
            author_name: self.author_name,
            message: self.message,
            created_at: Some(self.created_at),
            replies: Vec::new(),
        })
    }
}

/// Table: `replies`
#[derive(Debug, Clone, FromRow)]
pub struct ReplyRow {
    pub id: i64,
    pub feedback_id: i64,
    pub author_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for ReplyRow {
    type Model = Reply;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Reply {
            feedback: Id::new(self.feedback_id),
            author_name: self.author_name,
            message: self.message,
            created_at: Some(self.created_at),
        })
    }
}

#[async_trait]
impl<'a> Repo<Feedback> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<Feedback>) -> Result<WithId<Feedback>> {
        feedback::get(&mut self.tx, id).await
    }

    async fn insert(&mut self, element: Feedback) -> Result<WithId<Feedback>> {
        feedback::insert(&mut self.tx, element).await
    }

    async fn update(&mut self, element: WithId<Feedback>) -> Result<WithId<Feedback>> {
        feedback::update(&mut self.tx, element).await
    }

    async fn delete(&mut self, id: Id<Feedback>) -> Result<()> {
        feedback::delete(&mut self.tx, id).await
    }
}

#[async_trait]
impl<'a> FeedbackRepo for PgDatabaseTransaction<'a> {
    async fn feedbacks(&mut self) -> Result<Vec<WithId<Feedback>>> {
        feedback::get_all(&mut self.tx).await
    }

    async fn insert_reply(&mut self, reply: Reply) -> Result<WithId<Reply>> {
        feedback::insert_reply(&mut self.tx, reply).await
    }
}

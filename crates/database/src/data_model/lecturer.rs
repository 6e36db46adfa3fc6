use async_trait::async_trait;
use campus::database::{LecturerRepo, Repo, Result};
use chrono::{DateTime, NaiveDate, Utc};
use model::{
    lecturer::{Lecturer, LecturerFilter},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::{lecturer, parse_code},
    PgDatabaseTransaction,
};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct LecturerRow {
    pub id: i64,
    pub display_name: String,
    pub lecturer_type: String,
    pub department_name: String,
    pub is_active: bool,
    pub staff_id: String,
    pub specialization: String,
    pub joined_date: NaiveDate,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DatabaseRow for LecturerRow {
    type Model = Lecturer;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Lecturer {
            display_name: self.display_name,
            lecturer_type: parse_code(&self.lecturer_type)?,
            department_name: self.department_name,
            is_active: self.is_active,
            staff_id: Some(self.staff_id),
            specialization: self.specialization,
            joined_date: self.joined_date,
            email: self.email,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

#[async_trait]
impl<'a> Repo<Lecturer> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<Lecturer>) -> Result<WithId<Lecturer>> {
        lecturer::get(&mut *self.tx, id).await
    }

    async fn insert(&mut self, element: Lecturer) -> Result<WithId<Lecturer>> {
        lecturer::insert(&mut *self.tx, element).await
    }

    async fn update(&mut self, element: WithId<Lecturer>) -> Result<WithId<Lecturer>> {
        lecturer::update(&mut *self.tx, element).await
    }

    async fn delete(&mut self, id: Id<Lecturer>) -> Result<()> {
        lecturer::delete(&mut *self.tx, id).await
    }
}

#[async_trait]
impl<'a> LecturerRepo for PgDatabaseTransaction<'a> {
    async fn lecturers(
        &mut self,
        filter: &LecturerFilter,
    ) -> Result<Vec<WithId<Lecturer>>> {
        lecturer::get_filtered(&mut *self.tx, filter).await
    }
}

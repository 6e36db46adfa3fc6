use async_trait::async_trait;
use campus::database::{Repo, Result, UserRepo};
use model::{
    user::{User, UserFilter},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::{parse_code, user},
    PgDatabaseTransaction,
};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub user_type: String,
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: bool,
}

impl DatabaseRow for UserRow {
    type Model = User;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(User {
            user_type: parse_code(&self.user_type)?,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            profile_picture: self.profile_picture,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl<'a> Repo<User> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<User>) -> Result<WithId<User>> {
        user::get(&mut *self.tx, id).await
    }

    async fn insert(&mut self, element: User) -> Result<WithId<User>> {
        user::insert(&mut *self.tx, element).await
    }

    async fn update(&mut self, element: WithId<User>) -> Result<WithId<User>> {
        user::update(&mut *self.tx, element).await
    }

    async fn delete(&mut self, id: Id<User>) -> Result<()> {
        user::delete(&mut *self.tx, id).await
    }
}

#[async_trait]
impl<'a> UserRepo for PgDatabaseTransaction<'a> {
    async fn users(&mut self, filter: &UserFilter) -> Result<Vec<WithId<User>>> {
        user::get_filtered(&mut *self.tx, filter).await
    }
}

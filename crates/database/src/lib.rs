use std::{env, error::Error};

use async_trait::async_trait;
use campus::database::{Database, DatabaseTransaction, Result};
use queries::convert_error;
use sqlx::{
    postgres::{PgConnectOptions, PgPool},
    Transaction,
};

pub mod data_model;
pub mod queries;

/// Where the PostgreSQL server lives, read from `DATABASE_*` variables.
#[derive(Debug, Clone)]
pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    /// `None` if a variable is missing or the port is not a number.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            username: env::var("DATABASE_USER").ok()?,
            password: env::var("DATABASE_PASSWORD").ok()?,
            hostname: env::var("DATABASE_HOST").ok()?,
            port: env::var("DATABASE_PORT").ok()?.parse().ok()?,
            database: env::var("DATABASE_NAME").ok()?,
        })
    }

    /// Passed as separate options, so credentials need no url escaping.
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.hostname)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: PgPool,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }
}

impl PgDatabase {
    /// Connects and brings the schema up to date.
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let options = database_connection_info.connect_options();
        let pool = PgPool::connect_with(options).await?;
        log::info!(
            "connected to database {} on {}:{}",
            database_connection_info.database,
            database_connection_info.hostname,
            database_connection_info.port
        );

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("database schema is up to date");

        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx: Transaction<'_, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction { tx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_options_keep_special_characters() {
        let info = DatabaseConnectionInfo {
            username: "campus".to_owned(),
            password: "p@ss/word:1".to_owned(),
            hostname: "db.internal".to_owned(),
            port: 5433,
            database: "campus_guardian".to_owned(),
        };
        let options = info.connect_options();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("campus_guardian"));
    }
}

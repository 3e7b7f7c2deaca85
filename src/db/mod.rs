use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::QueryIdentity;
use crate::models::search::NormalizedResult;
use crate::services::search_service::ResultCache;

pub mod migrator;
pub mod repositories;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored result could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone())
    }

    pub async fn get_cached_result(
        &self,
        identity: &QueryIdentity,
    ) -> Result<Option<NormalizedResult>, StoreError> {
        self.cache_repo().get(identity).await
    }

    pub async fn cache_result(
        &self,
        identity: &QueryIdentity,
        result: &NormalizedResult,
    ) -> Result<bool, StoreError> {
        self.cache_repo().put(identity, result).await
    }

    pub async fn count_cached_results(&self) -> Result<u64, StoreError> {
        self.cache_repo().count().await
    }
}

#[async_trait]
impl ResultCache for Store {
    async fn get(&self, identity: &QueryIdentity) -> Result<Option<NormalizedResult>, StoreError> {
        self.get_cached_result(identity).await
    }

    async fn put(
        &self,
        identity: &QueryIdentity,
        result: &NormalizedResult,
    ) -> Result<bool, StoreError> {
        self.cache_result(identity, result).await
    }
}

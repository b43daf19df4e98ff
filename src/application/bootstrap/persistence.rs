use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::domain::repositories::DecisionRepository;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::repositories::SqliteDecisionRepository;

pub struct PersistenceHandle {
    pub db: Database,
    pub decision_repository: Arc<dyn DecisionRepository>,
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(config: &Config) -> Result<PersistenceHandle> {
        info!("Initializing Database at {}", config.database_url);

        let db = Database::new(&config.database_url)
            .await
            .context("Failed to initialize database")?;

        let decision_repository = Arc::new(SqliteDecisionRepository::new(db.pool.clone()));

        Ok(PersistenceHandle {
            db,
            decision_repository,
        })
    }
}

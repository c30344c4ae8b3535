/*!
 * The store module holds the data access objects for questions and choices
 *
 * Handlers never talk to a database directly, they are handed a `PollStore`
 * through the tide application state.
 */
use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::models::*;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/**
 * `DATABASE_URL` value which selects the in-process store
 */
pub const MEMORY_URL: &str = "memory:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to migrate the database: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait PollStore: Send + Sync {
    /**
     * Every question ordered by id, each with its choices
     */
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError>;

    async fn get_poll(&self, id: i64) -> Result<Option<Poll>, StoreError>;

    /**
     * Insert the question and all of its choices together, or nothing at all
     */
    async fn create_poll(&self, question: NewQuestion) -> Result<Poll, StoreError>;

    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> Result<Option<Poll>, StoreError>;

    /**
     * Delete the question and its choices, returning whether it existed
     */
    async fn delete_question(&self, id: i64) -> Result<bool, StoreError>;

    async fn list_choices(&self) -> Result<Vec<Choice>, StoreError>;

    async fn get_choice(&self, id: i64) -> Result<Option<Choice>, StoreError>;

    /**
     * Insert a choice with zero votes
     *
     * Returns `None` when the parent question does not exist
     */
    async fn create_choice(&self, choice: NewChoice) -> Result<Option<Choice>, StoreError>;

    async fn update_choice(
        &self,
        id: i64,
        changes: ChoiceChanges,
    ) -> Result<Option<Choice>, StoreError>;

    async fn delete_choice(&self, id: i64) -> Result<bool, StoreError>;

    /**
     * Add exactly one vote to the choice as a single atomic operation and
     * return the updated row, or `None` if there is no such choice
     */
    async fn increment_votes(&self, id: i64) -> Result<Option<Choice>, StoreError>;
}

/**
 * Open the store named by the configuration's database URL
 */
pub async fn open(config: &Config) -> Result<Arc<dyn PollStore>, StoreError> {
    if config.database_url == MEMORY_URL {
        warn!("Using the in-memory store, nothing will be persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&config.database_url, config.max_connections).await?;
    store.migrate().await?;
    Ok(Arc::new(store))
}

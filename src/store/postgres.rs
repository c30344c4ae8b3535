/*!
 * PostgreSQL implementation of the PollStore
 */
use async_trait::async_trait;
use log::*;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::BTreeMap;

use super::{PollStore, StoreError};
use crate::models::*;

static MIGRATOR: Migrator = sqlx::migrate!();

const QUESTION_COLUMNS: &str = "id, question_text, pub_date";
const CHOICE_COLUMNS: &str = "id, question_id, choice_text, votes";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /**
     * Create the sqlx connection pool for postgresql
     */
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /**
     * Apply the embedded migrations from `migrations/`
     */
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations are up to date");
        Ok(())
    }

    /**
     * Load the choices of every given question in one query and attach them
     */
    async fn with_choices(&self, questions: Vec<Question>) -> Result<Vec<Poll>, StoreError> {
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let sql = format!(
            "SELECT {} FROM choices WHERE question_id = ANY($1) ORDER BY id ASC",
            CHOICE_COLUMNS
        );
        let choices = sqlx::query_as::<_, Choice>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_question: BTreeMap<i64, Vec<Choice>> = BTreeMap::new();
        for choice in choices {
            by_question.entry(choice.question_id).or_default().push(choice);
        }

        Ok(questions
            .into_iter()
            .map(|question| Poll {
                choices: by_question.remove(&question.id).unwrap_or_default(),
                question,
            })
            .collect())
    }

    async fn poll_for(&self, question: Option<Question>) -> Result<Option<Poll>, StoreError> {
        match question {
            Some(question) => Ok(self.with_choices(vec![question]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let sql = format!("SELECT {} FROM questions ORDER BY id ASC", QUESTION_COLUMNS);
        let questions = sqlx::query_as::<_, Question>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.with_choices(questions).await
    }

    async fn get_poll(&self, id: i64) -> Result<Option<Poll>, StoreError> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.poll_for(question).await
    }

    async fn create_poll(&self, new: NewQuestion) -> Result<Poll, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO questions (question_text, pub_date) VALUES ($1, $2) RETURNING {}",
            QUESTION_COLUMNS
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(new.question_text.as_str())
            .bind(new.pub_date)
            .fetch_one(&mut *tx)
            .await?;

        // unnest keeps the order the choices were given in
        let sql = format!(
            "INSERT INTO choices (question_id, choice_text) \
             SELECT $1, t.choice_text FROM unnest($2::text[]) WITH ORDINALITY AS t(choice_text, n) \
             ORDER BY t.n RETURNING {}",
            CHOICE_COLUMNS
        );
        let mut choices = sqlx::query_as::<_, Choice>(&sql)
            .bind(question.id)
            .bind(&new.choices)
            .fetch_all(&mut *tx)
            .await?;
        choices.sort_by_key(|c| c.id);

        tx.commit().await?;
        debug!("Created question {} with {} choices", question.id, choices.len());
        Ok(Poll { question, choices })
    }

    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> Result<Option<Poll>, StoreError> {
        let sql = format!(
            "UPDATE questions SET question_text = COALESCE($2, question_text), \
             pub_date = COALESCE($3, pub_date) WHERE id = $1 RETURNING {}",
            QUESTION_COLUMNS
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .bind(changes.question_text)
            .bind(changes.pub_date)
            .fetch_optional(&self.pool)
            .await?;
        self.poll_for(question).await
    }

    async fn delete_question(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_choices(&self) -> Result<Vec<Choice>, StoreError> {
        let sql = format!("SELECT {} FROM choices ORDER BY id ASC", CHOICE_COLUMNS);
        Ok(sqlx::query_as::<_, Choice>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_choice(&self, id: i64) -> Result<Option<Choice>, StoreError> {
        let sql = format!("SELECT {} FROM choices WHERE id = $1", CHOICE_COLUMNS);
        Ok(sqlx::query_as::<_, Choice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_choice(&self, new: NewChoice) -> Result<Option<Choice>, StoreError> {
        let sql = format!(
            "INSERT INTO choices (question_id, choice_text) VALUES ($1, $2) RETURNING {}",
            CHOICE_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Choice>(&sql)
            .bind(new.question_id)
            .bind(new.choice_text)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(choice) => Ok(Some(choice)),
            // The parent question is missing, or was deleted while inserting
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
                debug!("No question {} for new choice", new.question_id);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_choice(
        &self,
        id: i64,
        changes: ChoiceChanges,
    ) -> Result<Option<Choice>, StoreError> {
        let sql = format!(
            "UPDATE choices SET choice_text = COALESCE($2, choice_text) WHERE id = $1 RETURNING {}",
            CHOICE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Choice>(&sql)
            .bind(id)
            .bind(changes.choice_text)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_choice(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM choices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_votes(&self, id: i64) -> Result<Option<Choice>, StoreError> {
        // The increment is computed by postgres against the committed value
        let sql = format!(
            "UPDATE choices SET votes = votes + 1 WHERE id = $1 RETURNING {}",
            CHOICE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Choice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

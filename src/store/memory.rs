/*!
 * An in-process PollStore, handy for local development and the test suite
 */
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::{PollStore, StoreError};
use crate::models::*;

#[derive(Default)]
struct Tables {
    questions: BTreeMap<i64, Question>,
    choices: BTreeMap<i64, Choice>,
    question_seq: i64,
    choice_seq: i64,
}

impl Tables {
    fn poll(&self, question: &Question) -> Poll {
        Poll {
            question: question.clone(),
            choices: self
                .choices
                .values()
                .filter(|c| c.question_id == question.id)
                .cloned()
                .collect(),
        }
    }

    fn insert_choice(&mut self, question_id: i64, choice_text: String) -> Choice {
        self.choice_seq += 1;
        let choice = Choice {
            id: self.choice_seq,
            question_id,
            choice_text,
            votes: 0,
        };
        self.choices.insert(choice.id, choice.clone());
        choice
    }
}

/**
 * Every operation takes the single lock exactly once, which makes each of
 * them atomic with respect to the others
 */
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.questions.values().map(|q| tables.poll(q)).collect())
    }

    async fn get_poll(&self, id: i64) -> Result<Option<Poll>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.questions.get(&id).map(|q| tables.poll(q)))
    }

    async fn create_poll(&self, question: NewQuestion) -> Result<Poll, StoreError> {
        let mut tables = self.tables.lock();
        tables.question_seq += 1;
        let created = Question {
            id: tables.question_seq,
            question_text: question.question_text,
            pub_date: question.pub_date,
        };
        tables.questions.insert(created.id, created.clone());

        let choices = question
            .choices
            .into_iter()
            .map(|text| tables.insert_choice(created.id, text))
            .collect();

        Ok(Poll {
            question: created,
            choices,
        })
    }

    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> Result<Option<Poll>, StoreError> {
        let mut tables = self.tables.lock();
        let updated = match tables.questions.get_mut(&id) {
            Some(question) => {
                if let Some(text) = changes.question_text {
                    question.question_text = text;
                }
                if let Some(pub_date) = changes.pub_date {
                    question.pub_date = pub_date;
                }
                question.clone()
            }
            None => return Ok(None),
        };
        Ok(Some(tables.poll(&updated)))
    }

    async fn delete_question(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock();
        if tables.questions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|_, c| c.question_id != id);
        Ok(true)
    }

    async fn list_choices(&self) -> Result<Vec<Choice>, StoreError> {
        Ok(self.tables.lock().choices.values().cloned().collect())
    }

    async fn get_choice(&self, id: i64) -> Result<Option<Choice>, StoreError> {
        Ok(self.tables.lock().choices.get(&id).cloned())
    }

    async fn create_choice(&self, choice: NewChoice) -> Result<Option<Choice>, StoreError> {
        let mut tables = self.tables.lock();
        if !tables.questions.contains_key(&choice.question_id) {
            return Ok(None);
        }
        Ok(Some(
            tables.insert_choice(choice.question_id, choice.choice_text),
        ))
    }

    async fn update_choice(
        &self,
        id: i64,
        changes: ChoiceChanges,
    ) -> Result<Option<Choice>, StoreError> {
        let mut tables = self.tables.lock();
        Ok(tables.choices.get_mut(&id).map(|choice| {
            if let Some(text) = changes.choice_text {
                choice.choice_text = text;
            }
            choice.clone()
        }))
    }

    async fn delete_choice(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.lock().choices.remove(&id).is_some())
    }

    async fn increment_votes(&self, id: i64) -> Result<Option<Choice>, StoreError> {
        let mut tables = self.tables.lock();
        Ok(tables.choices.get_mut(&id).map(|choice| {
            choice.votes += 1;
            choice.clone()
        }))
    }
}

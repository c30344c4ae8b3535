/*!
 * Casting votes
 *
 * A vote is a single atomic increment of one choice's counter. Votes cannot
 * be retracted or moved to another choice.
 */
use log::*;
use serde_json::Value;
use thiserror::Error;

use crate::models::Choice;
use crate::store::{PollStore, StoreError};
use crate::validation::{self, FieldErrors};

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("choice {0} does not exist")]
    NotFound(i64),
    #[error("invalid vote: {0:?}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/**
 * Add one vote to the given choice and return the choice as it is afterwards
 */
pub async fn cast_vote(store: &dyn PollStore, choice_id: i64) -> Result<Choice, VoteError> {
    match store.increment_votes(choice_id).await? {
        Some(choice) => {
            debug!("Vote recorded for choice {}, now {}", choice.id, choice.votes);
            Ok(choice)
        }
        None => Err(VoteError::NotFound(choice_id)),
    }
}

/**
 * Validate a user-provided vote payload and cast it
 *
 * Nothing is written unless the payload names a choice
 */
pub async fn vote_from_payload(store: &dyn PollStore, payload: &Value) -> Result<Choice, VoteError> {
    let choice_id = validation::vote_choice(payload).map_err(VoteError::Invalid)?;
    cast_vote(store, choice_id).await
}

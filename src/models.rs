use chrono::{DateTime, Utc};
use serde::Serialize;

/**
 * A poll prompt, as stored in the `questions` table
 */
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

/**
 * A selectable option belonging to exactly one Question
 *
 * `votes` is only ever changed by the vote increment, never by the catalog
 */
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Choice {
    pub id: i64,
    #[serde(skip_serializing)]
    pub question_id: i64,
    pub choice_text: String,
    pub votes: i64,
}

/**
 * A Question together with its Choices, ordered by id
 *
 * This is the shape every question endpoint serializes
 */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Poll {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

impl Poll {
    pub fn total_votes(&self) -> i64 {
        self.choices.iter().map(|c| c.votes).sum()
    }
}

/**
 * User-provided details to create a Question
 */
#[derive(Clone, Debug, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    /**
     * Just the text of each choice, every choice starts with zero votes
     */
    pub choices: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuestionChanges {
    pub question_text: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewChoice {
    pub question_id: i64,
    pub choice_text: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChoiceChanges {
    pub choice_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> Poll {
        Poll {
            question: Question {
                id: 1,
                question_text: "Favorite color?".to_string(),
                pub_date: "2020-10-18T12:00:00Z".parse().unwrap(),
            },
            choices: vec![
                Choice {
                    id: 1,
                    question_id: 1,
                    choice_text: "Red".to_string(),
                    votes: 5,
                },
                Choice {
                    id: 2,
                    question_id: 1,
                    choice_text: "Blue".to_string(),
                    votes: 2,
                },
            ],
        }
    }

    #[test]
    fn test_poll_serializes_flat_with_choices() {
        let value = serde_json::to_value(&poll()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 1,
                "question_text": "Favorite color?",
                "pub_date": "2020-10-18T12:00:00Z",
                "choices": [
                    {"id": 1, "choice_text": "Red", "votes": 5},
                    {"id": 2, "choice_text": "Blue", "votes": 2},
                ],
            })
        );
    }

    #[test]
    fn test_total_votes() {
        assert_eq!(7, poll().total_votes());
    }
}

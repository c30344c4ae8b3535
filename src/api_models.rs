use serde::Serialize;

use crate::models::Poll;

/**
 * Everything the HTML poll page renders
 */
#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub polls: Vec<PollView>,
}

#[derive(Debug, Serialize)]
pub struct PollView {
    pub id: i64,
    pub question_text: String,
    pub total_votes: i64,
    pub choices: Vec<ChoiceView>,
}

/**
 * A choice along with its share of the poll's votes
 */
#[derive(Debug, Serialize)]
pub struct ChoiceView {
    pub id: i64,
    pub choice_text: String,
    pub votes: i64,
    /**
     * Percentage of the poll's votes, formatted for a CSS width
     */
    pub share: String,
}

fn share(votes: i64, total: i64) -> String {
    if total == 0 {
        return "0".to_string();
    }
    format!("{:.1}", votes as f64 * 100.0 / total as f64)
}

impl From<Poll> for PollView {
    fn from(poll: Poll) -> Self {
        let total_votes = poll.total_votes();
        Self {
            id: poll.question.id,
            question_text: poll.question.question_text,
            total_votes,
            choices: poll
                .choices
                .into_iter()
                .map(|c| ChoiceView {
                    share: share(c.votes, total_votes),
                    id: c.id,
                    choice_text: c.choice_text,
                    votes: c.votes,
                })
                .collect(),
        }
    }
}

impl From<Vec<Poll>> for IndexPage {
    fn from(polls: Vec<Poll>) -> Self {
        Self {
            polls: polls.into_iter().map(PollView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, Question};

    fn choice(id: i64, votes: i64) -> Choice {
        Choice {
            id,
            question_id: 1,
            choice_text: format!("choice {}", id),
            votes,
        }
    }

    #[test]
    fn test_shares() {
        let view = PollView::from(Poll {
            question: Question {
                id: 1,
                question_text: "Best number?".to_string(),
                pub_date: chrono::Utc::now(),
            },
            choices: vec![choice(1, 1), choice(2, 2)],
        });

        assert_eq!(3, view.total_votes);
        assert_eq!("33.3", view.choices[0].share);
        assert_eq!("66.7", view.choices[1].share);
    }

    #[test]
    fn test_shares_without_votes() {
        assert_eq!("0", share(0, 0));
    }
}

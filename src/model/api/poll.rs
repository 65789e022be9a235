use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::poll::{Poll, PollStatus};

pub const MIN_POLL_OPTIONS: usize = 2;

/// A poll as submitted by an admin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSpec {
    pub question: String,
    pub options: Vec<String>,
    pub group_id: String,
}

impl PollSpec {
    /// Trim the question and options, dropping blank options.
    /// Returns `None` if the question is blank or fewer than two options remain.
    pub fn normalised(&self) -> Option<(String, Vec<String>)> {
        let question = self.question.trim();
        let options: Vec<String> = self
            .options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();
        (!question.is_empty() && options.len() >= MIN_POLL_OPTIONS)
            .then(|| (question.to_string(), options))
    }
}

/// An API-friendly poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDescription {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub group_id: String,
    pub status: PollStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Poll> for PollDescription {
    fn from(poll: Poll) -> Self {
        Self {
            id: poll.id.to_string(),
            question: poll.question,
            options: poll.options,
            group_id: poll.group_id.to_string(),
            status: poll.status,
            created_at: poll.created_at.to_chrono(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(question: &str, options: &[&str]) -> PollSpec {
        PollSpec {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            group_id: String::new(),
        }
    }

    #[test]
    fn blank_options_are_dropped() {
        let (question, options) = spec("  ¿Sí o no? ", &["Sí", "  ", " No "])
            .normalised()
            .unwrap();
        assert_eq!(question, "¿Sí o no?");
        assert_eq!(options, vec!["Sí", "No"]);
    }

    #[test]
    fn needs_question_and_two_options() {
        assert!(spec(" ", &["a", "b"]).normalised().is_none());
        assert!(spec("Pregunta", &["a", ""]).normalised().is_none());
    }
}

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Whether voters can still answer a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    #[default]
    Active,
    Closed,
}

/// A poll without an ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPoll {
    pub admin_id: Id,
    pub question: String,
    pub options: Vec<String>,
    /// The voter group this poll is addressed to.
    pub group_id: Id,
    pub status: PollStatus,
    pub created_at: DateTime,
}

impl NewPoll {
    /// An active poll, stamped with the current server time.
    pub fn new(admin_id: Id, question: String, options: Vec<String>, group_id: Id) -> Self {
        Self {
            admin_id,
            question,
            options,
            group_id,
            status: PollStatus::Active,
            created_at: DateTime::now(),
        }
    }

    pub fn with_id(self, id: Id) -> Poll {
        Poll {
            id,
            admin_id: self.admin_id,
            question: self.question,
            options: self.options,
            group_id: self.group_id,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// A poll from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    pub admin_id: Id,
    pub question: String,
    pub options: Vec<String>,
    pub group_id: Id,
    #[serde(default)]
    pub status: PollStatus,
    pub created_at: DateTime,
}

/// Denormalised `poll ID -> owner` entry, kept in step with [`Poll`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollLookup {
    #[serde(rename = "_id")]
    pub poll_id: Id,
    pub admin_id: Id,
}

impl PollLookup {
    pub fn for_poll(poll: &Poll) -> Self {
        Self {
            poll_id: poll.id,
            admin_id: poll.admin_id,
        }
    }
}

/// Logical path of a single poll, as reported in permission errors.
pub fn poll_path(admin_id: &Id, poll_id: &Id) -> String {
    format!("admins/{admin_id}/polls/{poll_id}")
}

/// Logical path of an admin's polls.
pub fn polls_path(admin_id: &Id) -> String {
    format!("admins/{admin_id}/polls")
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl NewPoll {
        pub fn example(admin_id: Id, group_id: Id) -> Self {
            Self::new(
                admin_id,
                "¿Cambiamos el horario de la asamblea?".to_string(),
                vec!["Sí".to_string(), "No".to_string()],
                group_id,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, from_document, to_document};

    use super::*;

    #[test]
    fn status_is_stored_lowercase() {
        let poll = NewPoll::example(Id::new(), Id::new()).with_id(Id::new());
        let document = to_document(&poll).unwrap();
        assert_eq!(document.get_str("status").unwrap(), "active");
    }

    #[test]
    fn polls_without_status_read_as_active() {
        let poll = NewPoll::example(Id::new(), Id::new()).with_id(Id::new());
        let mut document = to_document(&poll).unwrap();
        document.remove("status");
        assert_eq!(from_document::<Poll>(document).unwrap().status, PollStatus::Active);
    }

    #[test]
    fn lookup_mirrors_poll() {
        let poll = NewPoll::example(Id::new(), Id::new()).with_id(Id::new());
        let lookup = to_document(&PollLookup::for_poll(&poll)).unwrap();
        assert_eq!(
            lookup,
            doc! { "_id": poll.id, "admin_id": poll.admin_id }
        );
    }
}

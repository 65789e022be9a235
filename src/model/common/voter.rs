use serde::{Deserialize, Serialize};

/// A voter as listed in a group, produced by either import path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterRecord {
    /// The voter's external identifier. Not unique within a batch.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Always true at creation.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl VoterRecord {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            enabled: true,
        }
    }

    /// Whether this record may be stored in a group: both the identifier and
    /// the first name must be present.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.first_name.is_empty()
    }
}

/// Example test data.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterRecord {
        pub fn example1() -> Self {
            Self::new("1", "Ana", "Ruiz")
        }

        pub fn example2() -> Self {
            Self::new("2", "Luis", "Gomez")
        }
    }
}

use serde::{Deserialize, Serialize};

/// A voter asking for the polls addressed to them in a room.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxRequest {
    /// The room's admin ID, as shown in the room directory.
    pub sala_id: String,
    pub voter_id: String,
}

impl InboxRequest {
    /// Both fields trimmed, or `None` if either is blank.
    pub fn trimmed(&self) -> Option<(&str, &str)> {
        let sala_id = self.sala_id.trim();
        let voter_id = self.voter_id.trim();
        (!sala_id.is_empty() && !voter_id.is_empty()).then_some((sala_id, voter_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        let request = InboxRequest {
            sala_id: " 64b7f0c2a1e4d93f5c2b8a10 ".to_string(),
            voter_id: "  ".to_string(),
        };
        assert_eq!(request.trimmed(), None);

        let request = InboxRequest {
            voter_id: " 1001".to_string(),
            ..request
        };
        assert_eq!(
            request.trimmed(),
            Some(("64b7f0c2a1e4d93f5c2b8a10", "1001"))
        );
    }
}

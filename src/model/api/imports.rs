use serde::Serialize;

use crate::import::{ParsedSheet, RosterEvent};
use crate::model::common::VoterRecord;

/// Voters produced by either import path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedVoters {
    pub voters: Vec<VoterRecord>,
    /// Spreadsheet rows dropped for lacking an ID or first name.
    pub skipped: usize,
    /// Set when there was nothing to import.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl ImportedVoters {
    pub fn from_roster(voters: Vec<VoterRecord>) -> Self {
        Self {
            voters,
            skipped: 0,
            notice: None,
        }
    }

    pub fn empty(notice: impl ToString) -> Self {
        Self {
            voters: Vec::new(),
            skipped: 0,
            notice: Some(notice.to_string()),
        }
    }
}

impl From<ParsedSheet> for ImportedVoters {
    fn from(sheet: ParsedSheet) -> Self {
        Self {
            voters: sheet.voters,
            skipped: sheet.skipped,
            notice: None,
        }
    }
}

/// Call-out events offered for import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEvents {
    pub events: Vec<RosterEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

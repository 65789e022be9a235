use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    common::{GroupName, GroupNameError, VoterRecord},
    db::group::NewGroup,
    mongodb::Id,
};

/// Where a draft's voter list came from. Sources replace each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoterSource {
    #[default]
    Manual,
    Spreadsheet,
    Roster,
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    InvalidName(#[from] GroupNameError),
    #[error("An import is still running")]
    ImportInFlight,
    #[error("A group needs at least one voter")]
    NoVoters,
}

/// A voter group being put together before it is saved.
#[derive(Debug, Default)]
pub struct GroupDraft {
    name: String,
    voters: Vec<VoterRecord>,
    source: VoterSource,
    importing: bool,
}

impl GroupDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn voters(&self) -> &[VoterRecord] {
        &self.voters
    }

    pub fn source(&self) -> VoterSource {
        self.source
    }

    pub fn is_importing(&self) -> bool {
        self.importing
    }

    /// Mark an import as started. Submitting is refused until it finishes.
    pub fn begin_import(&mut self) {
        self.importing = true;
    }

    /// Mark an import as finished without changing the voters, e.g. because
    /// it failed.
    pub fn abandon_import(&mut self) {
        self.importing = false;
    }

    /// Replace the voter list with the result of an import.
    ///
    /// Records missing an identifier or first name are dropped. Returns the
    /// number dropped.
    pub fn finish_import(&mut self, source: VoterSource, voters: Vec<VoterRecord>) -> usize {
        self.importing = false;
        self.set_voters(source, voters)
    }

    /// Replace the voter list. Records missing an identifier or first name
    /// are dropped and counted.
    pub fn set_voters(&mut self, source: VoterSource, voters: Vec<VoterRecord>) -> usize {
        let total = voters.len();
        self.voters = voters
            .into_iter()
            .filter(VoterRecord::is_complete)
            .collect();
        self.source = source;
        total - self.voters.len()
    }

    /// Validate the draft and turn it into a group owned by `admin_id`.
    pub fn submit(&self, admin_id: Id) -> Result<NewGroup, DraftError> {
        if self.importing {
            return Err(DraftError::ImportInFlight);
        }
        let name = GroupName::parse(&self.name)?;
        if self.voters.is_empty() {
            return Err(DraftError::NoVoters);
        }
        Ok(NewGroup::new(name, admin_id, self.voters.clone()))
    }
}

use chrono::{DateTime, Utc};
use rocket::serde::json::{json, Value};
use serde::{Deserialize, Serialize};

use crate::{
    import::VoterSource,
    model::{common::VoterRecord, db::group::Group},
};

/// A group as submitted from the create-group dialog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupRequest {
    pub name: String,
    #[serde(default)]
    pub voters: Vec<VoterRecord>,
    /// Where the voters came from; typed in by hand unless stated.
    #[serde(default)]
    pub source: VoterSource,
}

impl GroupRequest {
    /// What gets reported if the write is refused. Voters are summarised
    /// by count.
    pub fn attempted_data(&self) -> Value {
        json!({
            "name": self.name,
            "voters": self.voters.len(),
        })
    }
}

/// An API-friendly voter group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDescription {
    pub id: String,
    pub name: String,
    pub admin_id: String,
    pub voters: Vec<VoterRecord>,
    pub created_at: DateTime<Utc>,
}

impl From<Group> for GroupDescription {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.to_string(),
            name: group.name.into_inner(),
            admin_id: group.admin_id.to_string(),
            voters: group.voters,
            created_at: group.created_at.to_chrono(),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::model::db::sala::Sala;

/// A voting room as listed in the public directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaDescription {
    pub id: String,
    pub name: String,
    /// Voters quote this when opening their inbox.
    pub admin_id: String,
}

impl From<Sala> for SalaDescription {
    fn from(sala: Sala) -> Self {
        Self {
            id: sala.id.to_string(),
            name: sala.name,
            admin_id: sala.admin_id.to_string(),
        }
    }
}

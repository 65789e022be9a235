use serde::{Deserialize, Serialize};

use crate::model::{db::admin::Admin, mongodb::Id};

/// An entry in the voting-room directory. Voters pick a room to select which
/// admin's polls they are looking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sala {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub admin_id: Id,
}

impl Sala {
    pub fn for_admin(admin: &Admin) -> Self {
        Self {
            id: Id::new(),
            name: format!("Sala de {}", admin.username),
            admin_id: admin.id,
        }
    }
}

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{GroupName, VoterRecord},
    mongodb::Id,
};

/// A voter group that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: GroupName,
    pub admin_id: Id,
    pub voters: Vec<VoterRecord>,
    pub created_at: DateTime,
}

impl NewGroup {
    /// Stamp a new group with the current server time.
    pub fn new(name: GroupName, admin_id: Id, voters: Vec<VoterRecord>) -> Self {
        Self {
            name,
            admin_id,
            voters,
            created_at: DateTime::now(),
        }
    }

    /// Attach the ID assigned on insertion.
    pub fn with_id(self, id: Id) -> Group {
        Group {
            id,
            name: self.name,
            admin_id: self.admin_id,
            voters: self.voters,
            created_at: self.created_at,
        }
    }
}

/// A voter group from the database. Owned by exactly one admin and never
/// modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: GroupName,
    pub admin_id: Id,
    pub voters: Vec<VoterRecord>,
    pub created_at: DateTime,
}

/// Logical path of an admin's groups, as reported in permission errors.
pub fn groups_path(admin_id: &Id) -> String {
    format!("admins/{admin_id}/groups")
}


#[cfg(test)]
mod tests {
    use mongodb::bson::{from_document, to_document};

    use super::*;

    #[test]
    fn document_roundtrip_keeps_voter_order() {
        let group = NewGroup::example(Id::new()).with_id(Id::new());
        let document = to_document(&group).unwrap();
        assert!(document.get_object_id("_id").is_ok());
        assert_eq!(from_document::<Group>(document).unwrap(), group);
    }

    #[test]
    fn path_names_the_owner() {
        let admin_id = Id::new();
        assert_eq!(groups_path(&admin_id), format!("admins/{}/groups", admin_id.to_hex()));
    }
}

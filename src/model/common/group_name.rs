use std::fmt::{Display, Formatter};
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_GROUP_NAME_LENGTH: usize = 3;
pub const MAX_GROUP_NAME_LENGTH: usize = 50;

/// A group name whose length (in characters) has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupNameError {
    #[error("Group name must be at least 3 characters, got {0}")]
    TooShort(usize),
    #[error("Group name must be at most 50 characters, got {0}")]
    TooLong(usize),
}

impl GroupName {
    pub fn parse(name: impl Into<String>) -> Result<Self, GroupNameError> {
        let name = name.into();
        let length = name.chars().count();
        if length < MIN_GROUP_NAME_LENGTH {
            Err(GroupNameError::TooShort(length))
        } else if length > MAX_GROUP_NAME_LENGTH {
            Err(GroupNameError::TooLong(length))
        } else {
            Ok(Self(name))
        }
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for GroupName {
    type Error = GroupNameError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(name)
    }
}

impl From<GroupName> for String {
    fn from(name: GroupName) -> Self {
        name.0
    }
}

impl Deref for GroupName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for GroupName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_boundaries() {
        assert_eq!(GroupName::parse("ab"), Err(GroupNameError::TooShort(2)));
        assert_eq!(
            GroupName::parse("x".repeat(51)),
            Err(GroupNameError::TooLong(51))
        );
        assert!(GroupName::parse("abc").is_ok());
        assert!(GroupName::parse("x".repeat(50)).is_ok());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 25 two-byte characters.
        assert!(GroupName::parse("ñ".repeat(25)).is_ok());
        assert!(GroupName::parse("ñá").is_err());
    }

    #[test]
    fn rejected_on_deserialisation() {
        let result: Result<GroupName, _> = rocket::serde::json::from_str("\"ab\"");
        assert!(result.is_err());
        let name: GroupName = rocket::serde::json::from_str("\"Equipo\"").unwrap();
        assert_eq!(&*name, "Equipo");
    }
}

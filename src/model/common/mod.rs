//! Types shared between the database and API representations.

pub mod group_name;
pub mod voter;

pub use group_name::{GroupName, GroupNameError, MAX_GROUP_NAME_LENGTH, MIN_GROUP_NAME_LENGTH};
pub use voter::VoterRecord;

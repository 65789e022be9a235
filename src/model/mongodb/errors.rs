//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const UNAUTHORIZED: i32 = 13;

/// Return true if the given error means the server refused the operation
/// for lack of privileges.
pub fn is_permission_denied(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Command(ref e) => e.code == UNAUTHORIZED,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == UNAUTHORIZED,
        _ => false,
    }
}

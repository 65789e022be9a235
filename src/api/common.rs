use mongodb::error::Error as DbError;

use crate::bridge::{PermissionError, PermissionErrorBridge};
use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    mongodb::{is_permission_denied, Id},
};

/// Publish `denied` on the bridge and turn it into an error response.
pub fn deny(bridge: &PermissionErrorBridge, denied: PermissionError) -> Error {
    bridge.publish(&denied);
    Error::PermissionDenied(denied)
}

/// Refuse, via the bridge, a token acting on another admin's resources.
pub fn ensure_owner(
    token: &AuthToken,
    admin_id: &Id,
    bridge: &PermissionErrorBridge,
    denied: impl FnOnce() -> PermissionError,
) -> Result<()> {
    if token.is_for(admin_id) {
        Ok(())
    } else {
        Err(deny(bridge, denied()))
    }
}

/// Convert a failed write, routing authorization failures through the bridge.
pub fn write_failure(
    err: DbError,
    bridge: &PermissionErrorBridge,
    denied: impl FnOnce() -> PermissionError,
) -> Error {
    if is_permission_denied(&err) {
        deny(bridge, denied())
    } else {
        err.into()
    }
}

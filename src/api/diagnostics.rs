use std::sync::Arc;

use rocket::{serde::json::Json, Route, State};

use crate::bridge::{PermissionDiagnostics, RecordedPermissionError};
use crate::model::api::auth::AuthToken;

pub fn routes() -> Vec<Route> {
    routes![permission_errors]
}

/// Recent permission errors, newest first.
#[get("/diagnostics/permission-errors")]
fn permission_errors(
    _token: AuthToken,
    diagnostics: &State<Arc<PermissionDiagnostics>>,
) -> Json<Vec<RecordedPermissionError>> {
    Json(diagnostics.recent())
}

use std::fmt::Display;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::{bson::oid::Error as OidError, error::Error as DbError};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::bridge::PermissionError;
use crate::import::{DraftError, RosterError, SpreadsheetError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    OidParse(#[from] OidError),
    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    /// Only constructed once the error has been published on the bridge.
    #[error("Permission denied: {0}")]
    PermissionDenied(PermissionError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::OidParse(_) => Status::BadRequest,
            Self::Spreadsheet(_) => Status::UnprocessableEntity,
            Self::Roster(err) => match err {
                RosterError::Configuration(_) => Status::ServiceUnavailable,
                RosterError::NotConnected | RosterError::Busy(_) => Status::Conflict,
                // The import routes answer empty results with a notice instead.
                RosterError::NotFound(_)
                | RosterError::EmptyResult
                | RosterError::EmptyRoster(_) => Status::NotFound,
                RosterError::Db(_) | RosterError::Fetch(_) => Status::BadGateway,
            },
            Self::Draft(_) => Status::BadRequest,
            Self::PermissionDenied(_) => Status::Forbidden,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Operation;

    #[test]
    fn import_failures_map_to_statuses() {
        let missing: Error = SpreadsheetError::MissingColumns {
            missing: vec!["nombre"],
        }
        .into();
        assert_eq!(missing.status(), Status::UnprocessableEntity);

        let unconfigured: Error = RosterError::Configuration("no uri".to_string()).into();
        assert_eq!(unconfigured.status(), Status::ServiceUnavailable);

        let fetch: Error = RosterError::Fetch("timeout".to_string()).into();
        assert_eq!(fetch.status(), Status::BadGateway);

        let gone: Error = RosterError::NotFound("ev1".to_string()).into();
        assert_eq!(gone.status(), Status::NotFound);

        // Empty results are still errors once they reach a responder.
        let empty: Error = RosterError::EmptyRoster("ev2".to_string()).into();
        assert!(empty.status().class().is_client_error());
        let none: Error = RosterError::EmptyResult.into();
        assert_eq!(none.status(), Status::NotFound);
    }

    #[test]
    fn permission_denied_is_forbidden() {
        let err = Error::PermissionDenied(PermissionError::new(
            "admins/x/groups",
            Operation::Create,
        ));
        assert_eq!(err.status(), Status::Forbidden);
        assert_eq!(Error::not_found("Poll 1").status(), Status::NotFound);
    }
}

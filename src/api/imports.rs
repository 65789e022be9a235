use std::sync::Arc;

use rocket::{data::Data, http::Status, serde::json::Json, tokio::task, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    import::{
        import_volunteers, list_events, spreadsheet::parse_sheet, RosterRegistry,
        SpreadsheetFormat,
    },
    model::api::{
        auth::AuthToken,
        imports::{ImportedVoters, RosterEvents},
    },
};

pub fn routes() -> Vec<Route> {
    routes![import_spreadsheet, connect_roster, roster_events, import_roster_event]
}

/// Parse an uploaded spreadsheet into voters. The body is the raw file;
/// `filename` picks the decoder.
#[post("/imports/spreadsheet?<filename>", data = "<upload>")]
async fn import_spreadsheet(
    _token: AuthToken,
    filename: &str,
    upload: Data<'_>,
    config: &State<Config>,
) -> Result<Json<ImportedVoters>> {
    let format = SpreadsheetFormat::from_file_name(filename)?;
    let bytes = upload
        .open(config.max_upload_size())
        .into_bytes()
        .await
        .map_err(|e| Error::Status(Status::BadRequest, format!("Failed to read upload: {e}")))?;
    if !bytes.is_complete() {
        return Err(Error::Status(
            Status::PayloadTooLarge,
            format!("{filename} exceeds {}", config.max_upload_size()),
        ));
    }

    // Decoding is CPU-bound.
    let bytes = bytes.into_inner();
    let sheet = task::spawn_blocking(move || parse_sheet(&bytes, format))
        .await
        .map_err(|e| Error::Status(Status::InternalServerError, e.to_string()))?
        .map_err(|e| {
            warn!("Spreadsheet {filename} rejected: {e}");
            e
        })?;
    info!(
        "Parsed {} voter(s) from {filename}, skipped {}",
        sheet.voters.len(),
        sheet.skipped
    );
    Ok(Json(sheet.into()))
}

#[post("/imports/roster/connect")]
async fn connect_roster(_token: AuthToken, registry: &State<Arc<RosterRegistry>>) -> Result<()> {
    registry.connect_configured().await?;
    Ok(())
}

#[get("/imports/roster/events")]
async fn roster_events(
    _token: AuthToken,
    registry: &State<Arc<RosterRegistry>>,
) -> Result<Json<RosterEvents>> {
    let roster = registry.connected()?;
    match list_events(&*roster).await {
        Ok(events) => Ok(Json(RosterEvents {
            events,
            notice: None,
        })),
        Err(e) if e.is_informational() => {
            info!("{e}");
            Ok(Json(RosterEvents {
                events: Vec::new(),
                notice: Some(e.to_string()),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

#[post("/imports/roster/events/<event_id>")]
async fn import_roster_event(
    _token: AuthToken,
    event_id: &str,
    registry: &State<Arc<RosterRegistry>>,
) -> Result<Json<ImportedVoters>> {
    let roster = registry.connected()?;
    match import_volunteers(&*roster, event_id).await {
        Ok(voters) => {
            info!("Imported {} voter(s) from call-out event {event_id}", voters.len());
            Ok(Json(ImportedVoters::from_roster(voters)))
        }
        Err(e) if e.is_informational() => {
            info!("{e}");
            Ok(Json(ImportedVoters::empty(e)))
        }
        Err(e) => Err(e.into()),
    }
}

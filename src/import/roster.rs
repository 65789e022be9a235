//! Import voters from the roster app: a separately deployed MongoDB that
//! holds call-out events (`llamados`) and the volunteers they reference.
//!
//! The roster app is read-only from here. Connections are cached per logical
//! instance name, so a changed configuration only takes effect after restart.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use mongodb::{
    bson::{doc, Bson, Document},
    error::Error as DbError,
    options::FindOptions,
    Client, Collection,
};
use rocket::futures::{future::try_join_all, TryStreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    common::VoterRecord,
    mongodb::{id_to_string, string_id_filter},
};

/// Logical name under which the roster connection is cached.
pub const ROSTER_INSTANCE: &str = "roster";

const EVENTS: &str = "llamados";
const VOLUNTEERS: &str = "voluntarios";

const EVENT_NAME: &str = "nombre";
const EVENT_DATE: &str = "fecha";
const EVENT_VOLUNTEERS: &str = "voluntarios";
const VOLUNTEER_FIRST_NAME: &str = "nombre";
const VOLUNTEER_LAST_NAME: &str = "apellido";

const URI_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

const SPANISH_MONTHS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Roster app is not configured: {0}")]
    Configuration(String),
    #[error("Not connected to the roster app")]
    NotConnected,
    #[error("The roster app has no call-out events")]
    EmptyResult,
    #[error("Call-out event {0} does not exist")]
    NotFound(String),
    #[error("Call-out event {0} has no volunteers")]
    EmptyRoster(String),
    #[error("Roster import is busy: {0}")]
    Busy(&'static str),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Failed to fetch from roster app: {0}")]
    Fetch(String),
}

impl RosterError {
    /// Whether this merely means there was nothing to import.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::EmptyResult | Self::EmptyRoster(_))
    }
}

/// Connection settings for the roster app, from the `[roster]` config table.
#[derive(Clone, Deserialize)]
pub struct RosterConfig {
    pub roster_db_uri: String,
    pub roster_db_name: String,
}

impl RosterConfig {
    /// Reject configs that are obviously unfilled templates. This does not
    /// contact the server.
    pub fn check_shape(&self) -> Result<(), RosterError> {
        let uri = self.roster_db_uri.trim();
        if !URI_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            return Err(RosterError::Configuration(
                "`roster_db_uri` must start with mongodb:// or mongodb+srv://".to_string(),
            ));
        }
        if uri.contains('<') || uri.contains('>') {
            return Err(RosterError::Configuration(
                "`roster_db_uri` still contains template placeholders".to_string(),
            ));
        }
        if self.roster_db_name.trim().is_empty() {
            return Err(RosterError::Configuration(
                "`roster_db_name` is empty".to_string(),
            ));
        }
        Ok(())
    }
}

// The URI may embed credentials.
impl Debug for RosterConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterConfig")
            .field("roster_db_uri", &"<redacted>")
            .field("roster_db_name", &self.roster_db_name)
            .finish()
    }
}

/// Read access to the roster app's documents.
#[rocket::async_trait]
pub trait RosterSource: Send + Sync {
    /// Every call-out event, newest first.
    async fn events(&self) -> Result<Vec<Document>, RosterError>;

    async fn event(&self, id: &str) -> Result<Option<Document>, RosterError>;

    async fn volunteer(&self, id: &str) -> Result<Option<Document>, RosterError>;
}

pub type RosterHandle = Arc<dyn RosterSource>;

/// [`RosterSource`] backed by the roster app's MongoDB deployment.
pub struct MongoRoster {
    events: Collection<Document>,
    volunteers: Collection<Document>,
}

impl MongoRoster {
    /// Build a client. The driver connects lazily, so this does not fail for
    /// an unreachable server.
    pub async fn connect(config: &RosterConfig) -> Result<Self, RosterError> {
        let client = Client::with_uri_str(config.roster_db_uri.trim()).await?;
        let db = client.database(config.roster_db_name.trim());
        Ok(Self {
            events: db.collection(EVENTS),
            volunteers: db.collection(VOLUNTEERS),
        })
    }
}

#[rocket::async_trait]
impl RosterSource for MongoRoster {
    async fn events(&self) -> Result<Vec<Document>, RosterError> {
        let options = FindOptions::builder().sort(doc! { EVENT_DATE: -1 }).build();
        let events: Vec<Document> = self.events.find(None, options).await?.try_collect().await?;
        Ok(events)
    }

    async fn event(&self, id: &str) -> Result<Option<Document>, RosterError> {
        Ok(self.events.find_one(string_id_filter(id), None).await?)
    }

    async fn volunteer(&self, id: &str) -> Result<Option<Document>, RosterError> {
        Ok(self.volunteers.find_one(string_id_filter(id), None).await?)
    }
}

/// Process-wide cache of roster connections, keyed by logical instance name.
pub struct RosterRegistry {
    config: Option<RosterConfig>,
    handles: Mutex<HashMap<String, RosterHandle>>,
}

impl RosterRegistry {
    pub fn new(config: Option<RosterConfig>) -> Self {
        Self {
            config,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Connect using the configuration loaded at launch.
    pub async fn connect_configured(&self) -> Result<RosterHandle, RosterError> {
        let config = self.config.as_ref().ok_or_else(|| {
            RosterError::Configuration("no `roster` section was configured".to_string())
        })?;
        self.connect(config).await
    }

    /// Return the cached connection, creating it on first use.
    ///
    /// A shape-invalid config is rejected even if a connection is cached.
    pub async fn connect(&self, config: &RosterConfig) -> Result<RosterHandle, RosterError> {
        config.check_shape()?;
        if let Some(handle) = self.get(ROSTER_INSTANCE) {
            debug!("Reusing roster connection");
            return Ok(handle);
        }
        let roster = MongoRoster::connect(config).await?;
        info!("Connected to roster app database {}", config.roster_db_name);
        Ok(self.register(ROSTER_INSTANCE, Arc::new(roster)))
    }

    /// Cache `handle` under `name` unless one is already cached, returning
    /// whichever ends up registered.
    pub fn register(&self, name: &str, handle: RosterHandle) -> RosterHandle {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.entry(name.to_string()).or_insert(handle).clone()
    }

    pub fn get(&self, name: &str) -> Option<RosterHandle> {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.get(name).cloned()
    }

    /// The roster connection, if [`connect`](Self::connect) has completed.
    pub fn connected(&self) -> Result<RosterHandle, RosterError> {
        self.get(ROSTER_INSTANCE).ok_or(RosterError::NotConnected)
    }
}

/// A call-out event as offered for import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEvent {
    pub id: String,
    pub display_name: String,
    pub event_date: Option<DateTime<Utc>>,
}

impl RosterEvent {
    pub fn from_document(document: &Document) -> Self {
        let id = document.get("_id").map(id_to_string).unwrap_or_default();
        let event_date = document.get(EVENT_DATE).and_then(parse_event_date);
        let display_name = match document.get_str(EVENT_NAME) {
            Ok(name) if !name.is_empty() => name.to_string(),
            _ => match event_date {
                Some(date) => format!("Llamado del {}", spanish_date(&date)),
                None => format!("Llamado ID: {id}"),
            },
        };
        Self {
            id,
            display_name,
            event_date,
        }
    }
}

/// List the roster app's call-out events, newest first.
pub async fn list_events(roster: &dyn RosterSource) -> Result<Vec<RosterEvent>, RosterError> {
    let documents = roster.events().await?;
    if documents.is_empty() {
        return Err(RosterError::EmptyResult);
    }
    Ok(documents.iter().map(RosterEvent::from_document).collect())
}

/// Resolve the volunteers referenced by one call-out event.
///
/// All lookups are issued together. References to volunteers that do not
/// exist are dropped; any other lookup failure fails the whole import.
pub async fn import_volunteers(
    roster: &dyn RosterSource,
    event_id: &str,
) -> Result<Vec<VoterRecord>, RosterError> {
    let event = roster
        .event(event_id)
        .await?
        .ok_or_else(|| RosterError::NotFound(event_id.to_string()))?;
    let ids = volunteer_ids(&event).ok_or_else(|| RosterError::EmptyRoster(event_id.to_string()))?;

    let lookups = ids.iter().map(|id| async move {
        let found = roster.volunteer(id).await?;
        Ok::<_, RosterError>(found.map(|document| volunteer_record(id, &document)))
    });
    let resolved = try_join_all(lookups).await?;

    let voters: Vec<VoterRecord> = resolved.into_iter().flatten().collect();
    let dangling = ids.len() - voters.len();
    if dangling > 0 {
        warn!("{dangling} volunteer reference(s) in event {event_id} do not exist");
    }
    Ok(voters)
}

/// The event's volunteer references, or `None` if there are none.
fn volunteer_ids(event: &Document) -> Option<Vec<String>> {
    match event.get(EVENT_VOLUNTEERS) {
        Some(Bson::Array(ids)) if !ids.is_empty() => Some(ids.iter().map(id_to_string).collect()),
        _ => None,
    }
}

fn volunteer_record(requested_id: &str, document: &Document) -> VoterRecord {
    let id = document
        .get("_id")
        .map(id_to_string)
        .unwrap_or_else(|| requested_id.to_string());
    VoterRecord::new(
        id,
        document.get_str(VOLUNTEER_FIRST_NAME).unwrap_or_default(),
        document.get_str(VOLUNTEER_LAST_NAME).unwrap_or_default(),
    )
}

/// Interpret an event date stored as a BSON datetime, an RFC 3339 or
/// `YYYY-MM-DD` string, epoch milliseconds, or an exported Firestore
/// timestamp (`{ seconds, nanoseconds }`).
pub fn parse_event_date(value: &Bson) -> Option<DateTime<Utc>> {
    match value {
        Bson::DateTime(date) => Some(date.to_chrono()),
        Bson::Timestamp(ts) => Utc.timestamp_opt(ts.time.into(), 0).single(),
        Bson::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|date| Utc.from_utc_datetime(&date))
            }),
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
            Utc.timestamp_millis_opt(as_i64(value)?).single()
        }
        Bson::Document(ts) => {
            let seconds = ts.get("seconds").or_else(|| ts.get("_seconds"))?;
            let nanos = ts
                .get("nanoseconds")
                .or_else(|| ts.get("_nanoseconds"))
                .and_then(as_i64)
                .unwrap_or(0);
            Utc.timestamp_opt(as_i64(seconds)?, u32::try_from(nanos).ok()?)
                .single()
        }
        _ => None,
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some((*n).into()),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.is_finite() => Some(*f as i64),
        _ => None,
    }
}

/// `d MMM yyyy` with Spanish month abbreviations.
fn spanish_date(date: &DateTime<Utc>) -> String {
    format!(
        "{} {} {}",
        date.day(),
        SPANISH_MONTHS[date.month0() as usize],
        date.year()
    )
}

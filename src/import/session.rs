use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::roster::{
    import_volunteers, list_events, RosterConfig, RosterError, RosterEvent, RosterHandle,
    RosterRegistry,
};
use crate::model::common::VoterRecord;

/// Where a roster import currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportPhase {
    Disconnected,
    Connecting,
    Connected,
    Listing,
    EventsLoaded,
    Importing,
    Imported,
    Failed,
}

impl ImportPhase {
    fn is_busy(self) -> bool {
        matches!(self, Self::Connecting | Self::Listing | Self::Importing)
    }
}

struct SessionState {
    phase: ImportPhase,
    handle: Option<RosterHandle>,
    events: Vec<RosterEvent>,
}

/// One walk through connect, list events, pick an event and import.
///
/// The session can be shared. While a connection, listing or import is in
/// flight, other steps are refused with [`RosterError::Busy`]. No lock is held
/// across a roster call.
pub struct ImportSession {
    registry: Arc<RosterRegistry>,
    state: Mutex<SessionState>,
}

impl ImportSession {
    pub fn new(registry: Arc<RosterRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(SessionState {
                phase: ImportPhase::Disconnected,
                handle: None,
                events: Vec::new(),
            }),
        }
    }

    pub fn phase(&self) -> ImportPhase {
        self.lock().phase
    }

    /// Events from the most recent successful listing.
    pub fn events(&self) -> Vec<RosterEvent> {
        self.lock().events.clone()
    }

    /// Connect with the configuration the registry was launched with.
    pub async fn connect(&self) -> Result<(), RosterError> {
        self.enter(ImportPhase::Connecting)?;
        let result = self.registry.connect_configured().await;
        self.finish_connect(result)
    }

    /// Connect with an explicit configuration.
    pub async fn connect_with(&self, config: &RosterConfig) -> Result<(), RosterError> {
        self.enter(ImportPhase::Connecting)?;
        let result = self.registry.connect(config).await;
        self.finish_connect(result)
    }

    fn finish_connect(&self, result: Result<RosterHandle, RosterError>) -> Result<(), RosterError> {
        let mut state = self.lock();
        match result {
            Ok(handle) => {
                state.handle = Some(handle);
                state.phase = ImportPhase::Connected;
                Ok(())
            }
            Err(err) => {
                state.phase = ImportPhase::Failed;
                Err(err)
            }
        }
    }

    /// Fetch the list of call-out events.
    pub async fn load_events(&self) -> Result<Vec<RosterEvent>, RosterError> {
        let handle = {
            let mut state = self.lock();
            if state.phase.is_busy() {
                return Err(RosterError::Busy("another roster operation is in progress"));
            }
            let handle = state.handle.clone().ok_or(RosterError::NotConnected)?;
            state.phase = ImportPhase::Listing;
            handle
        };
        let result = list_events(&*handle).await;

        let mut state = self.lock();
        match result {
            Ok(events) => {
                state.events = events.clone();
                state.phase = ImportPhase::EventsLoaded;
                Ok(events)
            }
            Err(err) => {
                state.events.clear();
                state.phase = if err.is_informational() {
                    ImportPhase::Connected
                } else {
                    ImportPhase::Failed
                };
                Err(err)
            }
        }
    }

    /// Import the volunteers of one of the listed events.
    pub async fn import(&self, event_id: &str) -> Result<Vec<VoterRecord>, RosterError> {
        let handle = {
            let mut state = self.lock();
            if state.phase.is_busy() {
                return Err(RosterError::Busy("another roster operation is in progress"));
            }
            if !state.events.iter().any(|event| event.id == event_id) {
                return Err(RosterError::NotFound(event_id.to_string()));
            }
            let handle = state.handle.clone().ok_or(RosterError::NotConnected)?;
            state.phase = ImportPhase::Importing;
            handle
        };

        let result = import_volunteers(&*handle, event_id).await;

        let mut state = self.lock();
        state.phase = match &result {
            Ok(_) => ImportPhase::Imported,
            Err(err) if err.is_informational() => ImportPhase::EventsLoaded,
            Err(_) => ImportPhase::Failed,
        };
        result
    }

    /// Move into `phase` unless the session is busy.
    fn enter(&self, phase: ImportPhase) -> Result<(), RosterError> {
        let mut state = self.lock();
        if state.phase.is_busy() {
            return Err(RosterError::Busy("another roster operation is in progress"));
        }
        state.phase = phase;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use mongodb::bson::{doc, Document};
    use rocket::tokio::sync::Notify;

    use super::*;
    use crate::import::roster::{memory::MemoryRoster, RosterSource, ROSTER_INSTANCE};

    fn registry_with(roster: impl RosterSource + 'static) -> Arc<RosterRegistry> {
        let registry = RosterRegistry::new(Some(RosterConfig {
            roster_db_uri: "mongodb://localhost:27017".to_string(),
            roster_db_name: "listas".to_string(),
        }));
        registry.register(ROSTER_INSTANCE, Arc::new(roster));
        Arc::new(registry)
    }

    fn roster() -> MemoryRoster {
        MemoryRoster::default()
            .with_event(doc! { "_id": "ev1", "nombre": "Llamado 1", "voluntarios": ["a", "b"] })
            .with_event(doc! { "_id": "ev2", "nombre": "Sin gente" })
            .with_volunteer("a", "Ana", "Ruiz")
    }

    #[rocket::async_test]
    async fn full_walk() {
        let session = ImportSession::new(registry_with(roster()));
        assert_eq!(session.phase(), ImportPhase::Disconnected);

        session.connect().await.unwrap();
        assert_eq!(session.phase(), ImportPhase::Connected);

        let events = session.load_events().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(session.phase(), ImportPhase::EventsLoaded);

        let voters = session.import("ev1").await.unwrap();
        assert_eq!(voters, vec![VoterRecord::new("a", "Ana", "Ruiz")]);
        assert_eq!(session.phase(), ImportPhase::Imported);
    }

    #[rocket::async_test]
    async fn steps_require_earlier_steps() {
        let session = ImportSession::new(registry_with(roster()));
        assert!(matches!(
            session.load_events().await,
            Err(RosterError::NotConnected)
        ));

        session.connect().await.unwrap();
        // The event exists in the roster but was never listed.
        assert!(matches!(
            session.import("ev1").await,
            Err(RosterError::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn empty_roster_returns_to_event_list() {
        let session = ImportSession::new(registry_with(roster()));
        session.connect().await.unwrap();
        session.load_events().await.unwrap();

        let err = session.import("ev2").await.unwrap_err();
        assert!(matches!(err, RosterError::EmptyRoster(_)));
        assert_eq!(session.phase(), ImportPhase::EventsLoaded);

        // Picking another event still works.
        assert_eq!(session.import("ev1").await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn failed_connection_can_be_retried() {
        let registry = Arc::new(RosterRegistry::new(None));
        let session = ImportSession::new(registry.clone());

        assert!(session.connect().await.is_err());
        assert_eq!(session.phase(), ImportPhase::Failed);

        registry.register(ROSTER_INSTANCE, Arc::new(roster()));
        session
            .connect_with(&RosterConfig {
                roster_db_uri: "mongodb://localhost:27017".to_string(),
                roster_db_name: "listas".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.phase(), ImportPhase::Connected);
    }

    /// Blocks event listings and volunteer lookups, when switched on, until
    /// released.
    struct StalledRoster {
        inner: MemoryRoster,
        stall_events: AtomicBool,
        stall_volunteers: AtomicBool,
        release: Notify,
    }

    impl StalledRoster {
        fn new(inner: MemoryRoster) -> Self {
            Self {
                inner,
                stall_events: AtomicBool::new(false),
                stall_volunteers: AtomicBool::new(false),
                release: Notify::new(),
            }
        }
    }

    #[rocket::async_trait]
    impl RosterSource for StalledRoster {
        async fn events(&self) -> Result<Vec<Document>, RosterError> {
            if self.stall_events.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            self.inner.events().await
        }

        async fn event(&self, id: &str) -> Result<Option<Document>, RosterError> {
            self.inner.event(id).await
        }

        async fn volunteer(&self, id: &str) -> Result<Option<Document>, RosterError> {
            if self.stall_volunteers.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            self.inner.volunteer(id).await
        }
    }

    async fn connected_session(roster: Arc<StalledRoster>) -> Arc<ImportSession> {
        let registry = Arc::new(RosterRegistry::new(None));
        registry.register(ROSTER_INSTANCE, roster);
        let session = Arc::new(ImportSession::new(registry));
        session
            .connect_with(&RosterConfig {
                roster_db_uri: "mongodb://localhost:27017".to_string(),
                roster_db_name: "listas".to_string(),
            })
            .await
            .unwrap();
        session
    }

    #[rocket::async_test]
    async fn refuses_work_while_importing() {
        let stalled = Arc::new(StalledRoster::new(roster()));
        stalled.stall_volunteers.store(true, Ordering::SeqCst);
        let session = connected_session(stalled.clone()).await;
        session.load_events().await.unwrap();

        let running = rocket::tokio::spawn({
            let session = session.clone();
            async move { session.import("ev1").await }
        });
        while session.phase() != ImportPhase::Importing {
            rocket::tokio::task::yield_now().await;
        }

        assert!(matches!(session.import("ev1").await, Err(RosterError::Busy(_))));
        assert!(matches!(session.load_events().await, Err(RosterError::Busy(_))));

        // Two lookups are waiting on the release.
        stalled.release.notify_waiters();
        while !running.is_finished() {
            stalled.release.notify_waiters();
            rocket::tokio::task::yield_now().await;
        }
        assert_eq!(running.await.unwrap().unwrap().len(), 1);
        assert_eq!(session.phase(), ImportPhase::Imported);
    }

    #[rocket::async_test]
    async fn refuses_work_while_listing() {
        let stalled = Arc::new(StalledRoster::new(roster()));
        let session = connected_session(stalled.clone()).await;
        session.load_events().await.unwrap();

        // A second listing stalls in flight.
        stalled.stall_events.store(true, Ordering::SeqCst);
        let listing = rocket::tokio::spawn({
            let session = session.clone();
            async move { session.load_events().await }
        });
        while session.phase() != ImportPhase::Listing {
            rocket::tokio::task::yield_now().await;
        }

        assert!(matches!(session.import("ev1").await, Err(RosterError::Busy(_))));
        assert!(matches!(session.load_events().await, Err(RosterError::Busy(_))));
        assert!(matches!(session.connect().await, Err(RosterError::Busy(_))));
        assert_eq!(session.phase(), ImportPhase::Listing);

        while !listing.is_finished() {
            stalled.release.notify_waiters();
            rocket::tokio::task::yield_now().await;
        }
        assert_eq!(listing.await.unwrap().unwrap().len(), 2);
        assert_eq!(session.phase(), ImportPhase::EventsLoaded);

        // Only now can an import start, and it runs alone.
        stalled.stall_volunteers.store(true, Ordering::SeqCst);
        let running = rocket::tokio::spawn({
            let session = session.clone();
            async move { session.import("ev1").await }
        });
        while session.phase() != ImportPhase::Importing {
            rocket::tokio::task::yield_now().await;
        }
        assert!(matches!(session.import("ev1").await, Err(RosterError::Busy(_))));
        while !running.is_finished() {
            stalled.release.notify_waiters();
            rocket::tokio::task::yield_now().await;
        }
        assert_eq!(running.await.unwrap().unwrap().len(), 1);
        assert_eq!(session.phase(), ImportPhase::Imported);
    }
}

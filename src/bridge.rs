//! Permission-error bridge.
//!
//! Data-access code that hits an authorization failure publishes a
//! [`PermissionError`] here instead of deciding how to present it. Whoever
//! owns presentation (request logging, the diagnostics feed) subscribes once
//! at startup.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

/// The kind of operation that was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
    Update,
    Read,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Read => "read",
        };
        write!(f, "{name}")
    }
}

/// An authorization failure on a specific resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionError {
    /// Logical path of the resource, e.g. `admins/{adminId}/groups`.
    pub resource_path: String,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_data: Option<Value>,
}

impl PermissionError {
    pub fn new(resource_path: impl Into<String>, operation: Operation) -> Self {
        Self {
            resource_path: resource_path.into(),
            operation,
            attempted_data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.attempted_data = Some(data);
        self
    }
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Missing permission to {} {}",
            self.operation, self.resource_path
        )
    }
}

impl std::error::Error for PermissionError {}

/// Identifies a registered handler so it can later be removed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Handler = Arc<dyn Fn(&PermissionError) + Send + Sync>;

/// Publish/subscribe channel for [`PermissionError`]s.
///
/// Constructed once at launch and placed into managed state.
#[derive(Default)]
pub struct PermissionErrorBridge {
    handlers: RwLock<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicUsize,
}

impl PermissionErrorBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run in registration order.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&PermissionError) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push((id, Arc::new(handler))),
            Err(poisoned) => poisoned.into_inner().push((id, Arc::new(handler))),
        }
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = match self.handlers.write() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        match self.handlers.read() {
            Ok(handlers) => handlers.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Invoke every registered handler with `event`.
    ///
    /// A panicking handler is logged and skipped; the remaining handlers still
    /// run and this method never panics.
    pub fn publish(&self, event: &PermissionError) {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let snapshot: Vec<(SubscriptionId, Handler)> = match self.handlers.read() {
            Ok(handlers) => handlers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        debug!(
            "Publishing permission error on {} to {} handler(s)",
            event.resource_path,
            snapshot.len()
        );
        for (id, handler) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!("Permission error handler {id:?} panicked; continuing");
            }
        }
    }
}

/// A permission error as recorded by [`PermissionDiagnostics`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedPermissionError {
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub error: PermissionError,
}

/// Bounded in-memory feed of the most recent permission errors, so that rule
/// denials can be inspected together with the payload that was refused.
pub struct PermissionDiagnostics {
    capacity: usize,
    recent: Mutex<VecDeque<RecordedPermissionError>>,
}

impl PermissionDiagnostics {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, error: &PermissionError) {
        let mut recent = match self.recent.lock() {
            Ok(recent) => recent,
            Err(poisoned) => poisoned.into_inner(),
        };
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(RecordedPermissionError {
            received_at: Utc::now(),
            error: error.clone(),
        });
    }

    /// Most recent first.
    pub fn recent(&self) -> Vec<RecordedPermissionError> {
        let recent = match self.recent.lock() {
            Ok(recent) => recent,
            Err(poisoned) => poisoned.into_inner(),
        };
        recent.iter().rev().cloned().collect()
    }
}

impl Default for PermissionDiagnostics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Log a permission error with its attempted payload.
pub fn log_permission_error(error: &PermissionError) {
    match &error.attempted_data {
        Some(data) => error!("{error} (attempted: {data})"),
        None => error!("{error}"),
    }
}

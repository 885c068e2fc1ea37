//! External fault-reporting boundary.
//!
//! The engine talks to an embedder-supplied [`Notifier`] in exactly two
//! ways: a [`Breadcrumb`] before each command body runs, and at most one
//! [`notify`](Notifier::notify) per top-level invocation when a failure is
//! judged reportable. Both calls are fire-and-forget; the engine never
//! inspects their outcome.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use uuid::Uuid;

use crate::core::error::CommandError;

/// Diagnostic trail record emitted once per invocation, before `call` runs.
#[derive(Debug, Clone, Serialize)]
pub struct Breadcrumb {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub label: String,
    pub data: String,
}

impl Breadcrumb {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Fault-reporting sink. Implementations must tolerate being called from
/// arbitrary call depths.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &CommandError);

    fn breadcrumb(&self, crumb: Breadcrumb);
}

/// Default sink: swallows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _error: &CommandError) {}

    fn breadcrumb(&self, _crumb: Breadcrumb) {}
}

static NOTIFIER: Lazy<RwLock<Arc<dyn Notifier>>> =
    Lazy::new(|| RwLock::new(Arc::new(NoopNotifier)));

/// Installs the process-wide notifier used by invocations that do not carry
/// their own.
pub fn install_notifier(notifier: Arc<dyn Notifier>) {
    let mut slot = NOTIFIER.write().unwrap_or_else(|e| e.into_inner());
    *slot = notifier;
}

/// The currently installed process-wide notifier.
pub fn installed_notifier() -> Arc<dyn Notifier> {
    NOTIFIER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

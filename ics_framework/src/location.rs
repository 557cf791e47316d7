//! In-process location service.
//!
//! Registry of live component endpoints plus tracking-event fan-out. The
//! components only consume this collaborator: they resolve peers and
//! subscribe to availability changes. Event delivery goes through the
//! subscribers' unbounded queues, so emitting never blocks the caller.

use crate::component::{ComponentMessage, ComponentRef};
use ics_common::prelude::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

struct Watcher {
    watched: ComponentId,
    watcher: ComponentId,
    tx: mpsc::UnboundedSender<ComponentMessage>,
}

#[derive(Default)]
struct Inner {
    registry: HashMap<ComponentId, ComponentRef>,
    watchers: Vec<Watcher>,
}

/// Shared handle to the location registry.
#[derive(Clone, Default)]
pub struct LocationService {
    inner: Arc<Mutex<Inner>>,
}

impl LocationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live component endpoint and notify its watchers.
    pub fn register(&self, reference: ComponentRef) {
        let id = reference.id().clone();
        let mut inner = self.inner.lock();
        inner.registry.insert(id.clone(), reference);
        info!(component = %id, "location registered");
        Self::notify(&mut inner, &id, TrackingStatus::LocationUpdated);
    }

    /// Remove a component endpoint and notify its watchers.
    pub fn unregister(&self, id: &ComponentId) {
        let mut inner = self.inner.lock();
        if inner.registry.remove(id).is_some() {
            info!(component = %id, "location removed");
            Self::notify(&mut inner, id, TrackingStatus::LocationRemoved);
        }
    }

    /// Resolve a component id to its live endpoint, if registered.
    pub fn resolve(&self, id: &ComponentId) -> Option<ComponentRef> {
        self.inner.lock().registry.get(id).cloned()
    }

    /// Subscribe `watcher` to availability changes of `watched`.
    ///
    /// The current availability is delivered immediately as a first
    /// event, so late subscribers converge on the registry state.
    pub(crate) fn subscribe(
        &self,
        watched: ComponentId,
        watcher: ComponentId,
        tx: mpsc::UnboundedSender<ComponentMessage>,
    ) {
        let mut inner = self.inner.lock();
        let status = if inner.registry.contains_key(&watched) {
            TrackingStatus::LocationUpdated
        } else {
            TrackingStatus::LocationRemoved
        };
        let _ = tx.send(ComponentMessage::Track(TrackingEvent {
            id: watched.clone(),
            status,
        }));
        debug!(watched = %watched, watcher = %watcher, "tracking subscription");
        inner.watchers.push(Watcher {
            watched,
            watcher,
            tx,
        });
    }

    fn notify(inner: &mut Inner, id: &ComponentId, status: TrackingStatus) {
        // Dead subscriber queues are pruned as they are discovered.
        inner.watchers.retain(|w| {
            if &w.watched != id {
                return !w.tx.is_closed();
            }
            let event = TrackingEvent {
                id: id.clone(),
                status,
            };
            match w.tx.send(ComponentMessage::Track(event)) {
                Ok(()) => true,
                Err(_) => {
                    debug!(watcher = %w.watcher, "dropping dead tracking subscriber");
                    false
                }
            }
        });
    }
}

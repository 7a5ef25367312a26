//! Coordinator: wires the bus, read model, workers and watchers together.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::bus::{BusError, SignalBus, Subscription};
use super::state::SessionState;
use super::watcher::Watcher;
use super::workers::Workers;
use crate::adapters::{Gateway, SessionStore};
use crate::domain::{Intent, IntentKind};

/// Running set of watchers, one per intent kind
pub struct Coordinator {
    bus: SignalBus,
    state: Arc<SessionState>,
    watchers: Vec<Watcher>,
}

impl Coordinator {
    /// Start a watcher for every intent kind. Must be called inside a tokio
    /// runtime.
    pub fn start(gateway: Arc<dyn Gateway>, session: Arc<dyn SessionStore>) -> Result<Self, BusError> {
        let bus = SignalBus::new();
        let state = Arc::new(SessionState::new());
        let workers = Arc::new(Workers::new(gateway.clone(), session, state.clone(), bus.clone()));

        let mut watchers = Vec::with_capacity(IntentKind::ALL.len());
        for kind in IntentKind::ALL {
            let queue = bus.register_watcher(kind)?;
            watchers.push(Watcher::spawn(queue, workers.clone()));
        }

        info!(gateway = gateway.name(), watchers = watchers.len(), "Coordinator started");

        Ok(Self {
            bus,
            state,
            watchers,
        })
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Raise an intent
    pub fn dispatch(&self, intent: Intent) {
        self.bus.emit(intent);
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Wait until every dispatched intent, and whatever it triggered, is done
    pub async fn settle(&self) {
        self.bus.settle().await;
    }

    /// Let running work finish, then stop accepting intents and wait for
    /// the watchers to exit.
    ///
    /// Registration raises intents from inside its worker, so intake stays
    /// open until nothing is in flight.
    pub async fn shutdown(self) -> Result<()> {
        self.bus.settle().await;
        self.bus.close_intake();
        for watcher in self.watchers {
            watcher.join().await?;
        }
        info!("Coordinator stopped");
        Ok(())
    }
}

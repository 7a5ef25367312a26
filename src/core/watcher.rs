//! Watchers: one long-lived task per intent kind.
//!
//! A watcher takes one intent off its queue, runs the handler to completion
//! and only then takes the next. Intents of the same kind are therefore
//! handled strictly in sequence, while different kinds run independently.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::bus::IntentQueue;
use super::workers::IntentHandler;
use crate::domain::IntentKind;

/// Handle to a running watcher task
pub struct Watcher {
    kind: IntentKind,
    task: JoinHandle<()>,
}

impl Watcher {
    /// Start draining `queue` into `handler`
    pub fn spawn(mut queue: IntentQueue, handler: Arc<dyn IntentHandler>) -> Self {
        let kind = queue.kind();

        let task = tokio::spawn(async move {
            debug!(%kind, "Watcher started");
            while let Some(dispatch) = queue.next().await {
                handler.handle(dispatch.intent()).await;
                // Dropping the dispatch marks the intent finished
            }
            info!(%kind, "Watcher stopped");
        });

        Self { kind, task }
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// Wait for the watcher to exit (after intake is closed)
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .with_context(|| format!("Watcher for {} panicked", self.kind))
    }
}

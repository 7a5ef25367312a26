//! The signal bus: one ordered stream shared by every routine.
//!
//! Intents are routed to a single FIFO queue per kind, owned by that kind's
//! watcher. Every signal (intents included) is also fanned out to all live
//! subscribers, which is how outcome waiters observe results. Delivery order
//! to each queue and subscriber is emission order.
//!
//! ```text
//! emit ──► journal
//!      ├─► intake[kind] ──► watcher (one at a time)
//!      └─► subscribers  ──► outcome waiters, observers
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::journal::SignalJournal;
use crate::domain::{Intent, IntentKind, Outcome, Polarity, Signal};

/// Errors from bus operations
#[derive(Debug, Error)]
pub enum BusError {
    #[error("A watcher is already registered for {0}")]
    WatcherAlreadyRegistered(IntentKind),

    #[error("Signal bus closed while waiting for a {0} outcome")]
    Closed(IntentKind),

    #[error("No watcher accepts {0} intents")]
    NotRouted(IntentKind),
}

/// Routing tables, guarded together so journal order equals delivery order
#[derive(Default)]
struct Routes {
    intake: HashMap<IntentKind, mpsc::UnboundedSender<Intent>>,
    subscribers: Vec<mpsc::UnboundedSender<Signal>>,
}

struct BusInner {
    routes: Mutex<Routes>,
    journal: SignalJournal,
    /// Intents routed to a watcher and not yet finished
    in_flight: watch::Sender<usize>,
}

/// Cloneable handle to the shared bus
#[derive(Clone)]
pub struct SignalBus {
    inner: Arc<BusInner>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(BusInner {
                routes: Mutex::new(Routes::default()),
                journal: SignalJournal::new(),
                in_flight,
            }),
        }
    }

    fn routes(&self) -> MutexGuard<'_, Routes> {
        self.inner.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit a signal. Never fails and never blocks.
    pub fn emit(&self, signal: impl Into<Signal>) {
        self.publish(signal.into());
    }

    /// Emit an intent that something will wait on.
    ///
    /// The intent is journaled and broadcast either way, but fails with
    /// [`BusError::NotRouted`] when no watcher took it, since its outcome
    /// would never arrive.
    pub fn emit_intent(&self, intent: Intent) -> Result<(), BusError> {
        let kind = intent.kind();
        if self.publish(Signal::Intent(intent)) {
            Ok(())
        } else {
            Err(BusError::NotRouted(kind))
        }
    }

    /// Journal, route and fan out; true if an intent reached a watcher
    fn publish(&self, signal: Signal) -> bool {
        let mut routes = self.routes();
        let mut routed = false;

        let sequence = self.inner.journal.record(&signal);

        if let Signal::Intent(intent) = &signal {
            let kind = intent.kind();
            match routes.intake.get(&kind) {
                Some(tx) => {
                    self.inner.in_flight.send_modify(|n| *n += 1);
                    if tx.send(intent.clone()).is_ok() {
                        routed = true;
                    } else {
                        self.finish_one();
                        routes.intake.remove(&kind);
                        warn!(%kind, "Watcher for intent kind is gone, intent dropped");
                    }
                }
                None => debug!(%kind, "No watcher registered, intent not dispatched"),
            }
        }

        routes
            .subscribers
            .retain(|subscriber| subscriber.send(signal.clone()).is_ok());

        debug!(sequence, ?signal, "Signal emitted");
        routed
    }

    /// Claim the intake queue for one intent kind
    pub fn register_watcher(&self, kind: IntentKind) -> Result<IntentQueue, BusError> {
        let mut routes = self.routes();
        if routes.intake.contains_key(&kind) {
            return Err(BusError::WatcherAlreadyRegistered(kind));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        routes.intake.insert(kind, tx);

        Ok(IntentQueue {
            kind,
            rx,
            bus: self.clone(),
        })
    }

    /// Observe every signal emitted from now on
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes().subscribers.push(tx);
        Subscription { rx }
    }

    /// Prepare to wait for the outcome of `kind`.
    ///
    /// Create the waiter before emitting the intent it belongs to, otherwise
    /// a fast worker's outcome can be missed.
    pub fn outcome_waiter(&self, kind: IntentKind) -> OutcomeWaiter {
        OutcomeWaiter {
            kind,
            subscription: self.subscribe(),
        }
    }

    /// Resolve once no dispatched intent is still being worked on
    pub async fn settle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // The sender lives as long as the bus, so this cannot fail
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Number of intents currently queued or running
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Stop routing intents; watchers drain what they hold and exit
    pub fn close_intake(&self) {
        self.routes().intake.clear();
    }

    pub fn journal(&self) -> &SignalJournal {
        &self.inner.journal
    }

    fn finish_one(&self) {
        self.inner
            .in_flight
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// A watcher's private FIFO of intents for one kind
pub struct IntentQueue {
    kind: IntentKind,
    rx: mpsc::UnboundedReceiver<Intent>,
    bus: SignalBus,
}

impl IntentQueue {
    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// Wait for the next intent. `None` once intake is closed and drained.
    pub async fn next(&mut self) -> Option<Dispatch> {
        let intent = self.rx.recv().await?;
        Some(Dispatch {
            intent,
            bus: self.bus.clone(),
        })
    }
}

impl Drop for IntentQueue {
    fn drop(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {
            self.bus.finish_one();
        }
    }
}

/// An intent taken off a queue; counts as in flight until dropped
pub struct Dispatch {
    intent: Intent,
    bus: SignalBus,
}

impl Dispatch {
    pub fn intent(&self) -> &Intent {
        &self.intent
    }
}

impl Drop for Dispatch {
    fn drop(&mut self) {
        self.bus.finish_one();
    }
}

/// Receives every signal emitted after it was created
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    /// Next already-delivered signal, without waiting
    pub fn try_recv(&mut self) -> Option<Signal> {
        self.rx.try_recv().ok()
    }
}

/// Result of a success-or-error race
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Whichever outcome for the kind arrived first
    pub outcome: Outcome,

    /// The opposite polarity was already queued behind the winner
    pub contested: bool,
}

/// Waits for the first success or error outcome of one kind
pub struct OutcomeWaiter {
    kind: IntentKind,
    subscription: Subscription,
}

impl OutcomeWaiter {
    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// Take the first outcome of the kind, whichever polarity it has.
    ///
    /// Other subscribers still observe the same emission. A second, opposite
    /// outcome already queued is a worker contract violation: it is logged
    /// and reported through [`Resolution::contested`], the first one wins.
    pub async fn resolve(mut self) -> Result<Resolution, BusError> {
        loop {
            let signal = self
                .subscription
                .recv()
                .await
                .ok_or(BusError::Closed(self.kind))?;

            let Signal::Outcome(outcome) = signal else {
                continue;
            };
            if outcome.kind() != self.kind {
                continue;
            }

            let contested = self.opposite_queued(outcome.polarity());
            if contested {
                warn!(
                    kind = %self.kind,
                    winner = ?outcome.polarity(),
                    "Both success and error outcomes observed, first one wins"
                );
            }

            return Ok(Resolution { outcome, contested });
        }
    }

    fn opposite_queued(&mut self, winner: Polarity) -> bool {
        let loser = winner.opposite();
        while let Some(signal) = self.subscription.try_recv() {
            if let Signal::Outcome(outcome) = signal {
                if outcome.kind() == self.kind && outcome.polarity() == loser {
                    return true;
                }
            }
        }
        false
    }
}

//! Core coordination logic.
//!
//! This module contains:
//! - SignalBus: ordered intent/outcome stream with per-kind intake queues
//! - SignalJournal: append-only record of every emission
//! - SessionState: the shared read model workers write and the orchestrator reads
//! - Watchers and Workers: serialized dispatch of intents to remote calls
//! - RegistrationOrchestrator: the multi-step post-registration workflow
//! - Coordinator: wires everything together

pub mod bus;
pub mod coordinator;
pub mod journal;
pub mod orchestrator;
pub mod population;
pub mod state;
pub mod watcher;
pub mod workers;

// Re-export commonly used types
pub use bus::{BusError, Dispatch, IntentQueue, OutcomeWaiter, Resolution, SignalBus, Subscription};
pub use coordinator::Coordinator;
pub use journal::{JournalEntry, SignalJournal};
pub use orchestrator::{RegistrationOrchestrator, WorkflowError};
pub use population::ProfilePopulator;
pub use state::{ReadModel, SessionState};
pub use watcher::Watcher;
pub use workers::{IntentHandler, Workers};

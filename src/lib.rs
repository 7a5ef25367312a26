//! onboard - signal-driven sign-in and registration coordinator
//!
//! A client-side coordinator that sequences dependent remote operations
//! (authentication, company creation, file upload, profile creation) in
//! response to intents, and reports each result as an outcome signal.
//!
//! # Architecture
//!
//! Everything talks through one ordered signal bus:
//! - An intent is queued for the single watcher of its kind
//! - The watcher runs the matching worker to completion before taking the next
//! - The worker makes one remote call and emits one success or error outcome
//! - After registration, the orchestrator raises further intents and waits
//!   on their outcomes, aborting on the first error
//!
//! # Modules
//!
//! - `adapters`: Remote gateway (HTTP) and session credential storage
//! - `core`: Bus, journal, read model, watchers, workers, orchestrator
//! - `domain`: Signals, records and request payloads
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Sign in, then fetch the profile bundle
//! onboard login --email ada@example.com --password secret
//!
//! # Register and create a new company with a profile photo
//! onboard register -u ada -e ada@example.com -p secret -c "Acme:acme" -i me.png
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{Gateway, GatewayError, SessionStore};
pub use core::{Coordinator, RegistrationOrchestrator, SignalBus};
pub use domain::{Intent, IntentKind, Notice, Outcome, Polarity, Signal};

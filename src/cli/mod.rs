//! Command-line interface for onboard.
//!
//! Each command starts a coordinator against the configured API, raises one
//! intent, waits for everything it triggered to settle and prints the
//! resulting outcome signals.

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{FileSessionStore, HttpGateway, SessionStore};
use crate::config;
use crate::core::{Coordinator, SignalJournal};
use crate::domain::{
    AssetUpload, CompanyRef, Credentials, Intent, IntentKind, Notice, Outcome, RegisterRequest,
    Signal,
};

/// A password taken from the command line or `ONBOARD_PASSWORD`
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for Password {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// onboard - sign-in and registration workflow client
#[derive(Parser, Debug)]
#[command(name = "onboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "ONBOARD_PASSWORD", hide_env_values = true)]
        password: Password,
    },

    /// Sign in again with the stored session credential
    Resume,

    /// End the current session
    Logout,

    /// Register an account, then create its company, photo and profile
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "ONBOARD_PASSWORD", hide_env_values = true)]
        password: Password,

        /// Role recorded on the profile
        #[arg(short, long, default_value = "member")]
        role: String,

        /// Existing company id, or `Name[:slug]` to create one
        #[arg(short, long)]
        company: CompanyRef,

        /// Profile photo to upload
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Upload a file
    Upload {
        file: PathBuf,
    },

    /// Show signals recorded in the journal
    History {
        /// Maximum number of entries to show (most recent)
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Login { email, password } => {
                run_intent(Intent::SignIn(Credentials::new(email, password.into_inner()))).await
            }
            Commands::Resume => run_intent(Intent::SignInByToken).await,
            Commands::Logout => run_intent(Intent::SignOut).await,
            Commands::Register {
                username,
                email,
                password,
                role,
                company,
                image,
            } => {
                let request = RegisterRequest {
                    username,
                    email,
                    password: password.into_inner(),
                    user_role: role,
                    company,
                    image: image.map(AssetUpload::new),
                };
                run_intent(Intent::Register(request)).await
            }
            Commands::Upload { file } => {
                if !file.is_file() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                run_intent(Intent::UploadAsset(AssetUpload::new(file))).await
            }
            Commands::History { limit } => show_history(limit).await,
            Commands::Config => show_config(),
        }
    }
}

/// Raise one intent against the configured backend and report what happened
async fn run_intent(intent: Intent) -> Result<()> {
    let cfg = config::config()?;
    let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::open_default()?);
    let gateway = Arc::new(HttpGateway::from_settings(&cfg.api, session.clone()));

    let coordinator = Coordinator::start(gateway, session)?;
    let requested = intent.kind();

    if let Some(path) = &cfg.journal_path {
        let next = SignalJournal::next_sequence_in(path).await?;
        coordinator.bus().journal().continue_from(next);
    }

    coordinator.dispatch(intent);
    coordinator.settle().await;

    let signals = coordinator.bus().journal().signals();
    if let Some(path) = &cfg.journal_path {
        let written = coordinator
            .bus()
            .journal()
            .persist(path)
            .await
            .with_context(|| format!("Failed to write journal: {}", path.display()))?;
        tracing::debug!(written, path = %path.display(), "Journal persisted");
    }
    coordinator.shutdown().await?;

    let mut failed: Vec<IntentKind> = Vec::new();
    for signal in &signals {
        if let Some(line) = describe(signal) {
            println!("{}", line);
        }
        if let Signal::Outcome(Outcome::Error { kind, .. }) = signal {
            failed.push(*kind);
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} did not complete ({} failed)", requested, join_kinds(&failed));
    }

    Ok(())
}

fn join_kinds(kinds: &[IntentKind]) -> String {
    kinds
        .iter()
        .map(IntentKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per signal worth showing to a user
fn describe(signal: &Signal) -> Option<String> {
    match signal {
        Signal::Intent(intent) => Some(format!("→ {}", intent.kind())),
        Signal::Outcome(Outcome::Success { kind, payload }) => {
            if payload.is_null() {
                Some(format!("✓ {}", kind))
            } else {
                Some(format!("✓ {} {}", kind, payload))
            }
        }
        Signal::Outcome(Outcome::Error { kind, message }) => Some(format!("✗ {}: {}", kind, message)),
        Signal::Notice(Notice::ProfileFetched(profile)) => Some(format!("  profile {}", profile)),
        Signal::Notice(Notice::ParentResourceRemoved) => Some("  company cleared".to_string()),
        Signal::Notice(_) => None,
    }
}

/// Print the most recent journal entries
async fn show_history(limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let Some(path) = &cfg.journal_path else {
        println!("No journal configured (set journal.path in .onboard/config.yaml)");
        return Ok(());
    };

    let entries = SignalJournal::load(path).await?;
    if entries.is_empty() {
        println!("No signals recorded");
        return Ok(());
    }

    let skip = entries.len().saturating_sub(limit);
    println!("{:<26} {:<6} {}", "TIMESTAMP", "SEQ", "SIGNAL");
    println!("{}", "-".repeat(75));
    for entry in entries.iter().skip(skip) {
        let text = describe(&entry.signal)
            .unwrap_or_else(|| serde_json::to_string(&entry.signal).unwrap_or_default());
        println!(
            "{:<26} {:<6} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.sequence,
            text
        );
    }

    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("onboard configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:          {}", cfg.home.display());
    println!("  Session token: {}", cfg.session_token_file.display());
    println!(
        "  Journal:       {}",
        cfg.journal_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(disabled)".to_string())
    );
    println!();
    println!("API:");
    println!("  Base URL: {}", cfg.api.base_url);
    println!("  Timeout:  {}s", cfg.api.timeout_seconds);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_register_command() {
        let cli = Cli::try_parse_from([
            "onboard", "register", "-u", "ada", "-e", "ada@example.com", "-p", "pw", "-c",
            "Acme:acme",
        ])
        .unwrap();

        match cli.command {
            Commands::Register { company, role, image, .. } => {
                assert!(matches!(company, CompanyRef::NewResource(_)));
                assert_eq!(role, "member");
                assert!(image.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_debug_hides_password() {
        let cli = Cli::try_parse_from([
            "onboard", "login", "-e", "ada@example.com", "-p", "hunter2",
        ])
        .unwrap();

        let printed = format!("{:?}", cli);
        assert!(printed.contains("ada@example.com"));
        assert!(!printed.contains("hunter2"));

        match cli.command {
            Commands::Login { password, .. } => assert_eq!(password.into_inner(), "hunter2"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_describe_signals() {
        assert_eq!(
            describe(&Signal::from(Outcome::error(IntentKind::SignIn, "nope"))),
            Some("✗ sign-in: nope".to_string())
        );
        assert_eq!(
            describe(&Signal::from(Outcome::success(IntentKind::SignOut, json!(null)))),
            Some("✓ sign-out".to_string())
        );
        assert_eq!(describe(&Signal::from(Notice::AssetFetched(None))), None);
    }
}

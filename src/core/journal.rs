//! Ordered log of every signal emitted on the bus.
//!
//! Entries are kept in memory in emission order and can be written out as
//! newline-delimited JSON (JSONL) for later inspection with `onboard history`.
//! Each `persist` appends only what earlier calls have not written yet.
//! Memory is bounded: past `capacity` entries the oldest are dropped.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;
use uuid::Uuid;

use crate::domain::Signal;

/// Entries kept in memory by default
pub const DEFAULT_CAPACITY: usize = 10_000;

/// One journaled emission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for this emission
    pub id: Uuid,

    /// Position in emission order, continuing across persisted runs
    pub sequence: u64,

    /// When the signal was emitted (ISO 8601)
    pub timestamp: DateTime<Utc>,

    pub signal: Signal,
}

#[derive(Debug)]
struct Log {
    entries: VecDeque<JournalEntry>,
    /// Sequence number of the next recorded entry
    next_sequence: u64,
    /// First sequence number not yet written by `persist`
    persisted_to: u64,
    capacity: usize,
}

/// In-memory, append-only signal log
#[derive(Debug)]
pub struct SignalJournal {
    log: Mutex<Log>,
    /// Serializes writers so no entry is appended twice
    writer: tokio::sync::Mutex<()>,
}

impl Default for SignalJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SignalJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            log: Mutex::new(Log {
                entries: VecDeque::new(),
                next_sequence: 0,
                persisted_to: 0,
                capacity: capacity.max(1),
            }),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number further entries from `next_sequence`, treating everything
    /// before it as already on disk. Call before the first emission.
    pub fn continue_from(&self, next_sequence: u64) {
        let mut log = self.lock();
        if !log.entries.is_empty() {
            warn!("Journal already has entries, sequence not moved");
            return;
        }
        log.next_sequence = next_sequence;
        log.persisted_to = next_sequence;
    }

    /// Record an emission and return its sequence number
    pub fn record(&self, signal: &Signal) -> u64 {
        let mut log = self.lock();
        let sequence = log.next_sequence;
        log.next_sequence += 1;
        log.entries.push_back(JournalEntry {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            signal: signal.clone(),
        });

        if log.entries.len() > log.capacity {
            if let Some(dropped) = log.entries.pop_front() {
                if dropped.sequence >= log.persisted_to {
                    warn!(sequence = dropped.sequence, "Journal full, unpersisted entry dropped");
                    log.persisted_to = dropped.sequence + 1;
                }
            }
        }
        sequence
    }

    /// Snapshot of the retained entries, oldest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Snapshot of the retained signals only, oldest first
    pub fn signals(&self) -> Vec<Signal> {
        self.lock().entries.iter().map(|e| e.signal.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Entries not yet written by `persist`
    fn unpersisted(&self) -> Vec<JournalEntry> {
        let log = self.lock();
        let from = log.persisted_to;
        log.entries
            .iter()
            .filter(|e| e.sequence >= from)
            .cloned()
            .collect()
    }

    fn mark_persisted(&self, through: u64) {
        let mut log = self.lock();
        log.persisted_to = log.persisted_to.max(through + 1);
    }

    /// Append entries recorded since the last call to a JSONL file.
    /// Returns how many were written.
    pub async fn persist(&self, path: &Path) -> Result<usize> {
        let _writer = self.writer.lock().await;
        let entries = self.unpersisted();
        let Some(last) = entries.last().map(|e| e.sequence) else {
            return Ok(0);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create journal directory: {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open journal file: {}", path.display()))?;

        let mut buffer = String::new();
        for entry in &entries {
            let json = serde_json::to_string(entry).context("Failed to serialize journal entry")?;
            buffer.push_str(&json);
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes())
            .await
            .context("Failed to write journal entries")?;
        file.flush().await.context("Failed to flush journal")?;

        self.mark_persisted(last);
        Ok(entries.len())
    }

    /// Replay entries from a JSONL file, in file order
    pub async fn load(path: &Path) -> Result<Vec<JournalEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open journal file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut entries = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let entry: JournalEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse journal entry: {}", line))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Sequence number that follows the last entry in a JSONL file
    pub async fn next_sequence_in(path: &Path) -> Result<u64> {
        let entries = Self::load(path).await?;
        Ok(entries.last().map_or(0, |entry| entry.sequence + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, Intent, IntentKind, Outcome};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_record_keeps_order() {
        let journal = SignalJournal::new();
        assert!(journal.is_empty());

        journal.record(&Signal::from(Intent::SignOut));
        journal.record(&Signal::from(Outcome::success(IntentKind::SignOut, json!(null))));

        let entries = journal.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 0);
        assert_eq!(entries[1].sequence, 1);
        assert_eq!(entries[0].signal, Signal::from(Intent::SignOut));
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("journal").join("signals.jsonl");

        let journal = SignalJournal::new();
        journal.record(&Signal::from(Intent::SignInByToken));
        journal.record(&Signal::from(Outcome::error(
            IntentKind::SignInByToken,
            "Login data parse failure",
        )));

        assert_eq!(journal.persist(&path).await.unwrap(), 2);

        let loaded = SignalJournal::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].signal, journal.signals()[1]);
    }

    #[tokio::test]
    async fn test_persist_appends_only_new_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("signals.jsonl");

        let journal = SignalJournal::new();
        journal.record(&Signal::from(Intent::SignOut));
        assert_eq!(journal.persist(&path).await.unwrap(), 1);
        assert_eq!(journal.persist(&path).await.unwrap(), 0);

        journal.record(&Signal::from(Outcome::success(IntentKind::SignOut, json!(null))));
        assert_eq!(journal.persist(&path).await.unwrap(), 1);

        let loaded = SignalJournal::load(&path).await.unwrap();
        let sequences: Vec<u64> = loaded.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_sequence_continues_across_runs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("signals.jsonl");

        let first = SignalJournal::new();
        first.record(&Signal::from(Intent::SignOut));
        first.record(&Signal::from(Intent::SignOut));
        first.persist(&path).await.unwrap();

        let second = SignalJournal::new();
        second.continue_from(SignalJournal::next_sequence_in(&path).await.unwrap());
        assert_eq!(second.record(&Signal::from(Intent::SignInByToken)), 2);
        assert_eq!(second.persist(&path).await.unwrap(), 1);

        let loaded = SignalJournal::load(&path).await.unwrap();
        let sequences: Vec<u64> = loaded.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let journal = SignalJournal::with_capacity(2);
        for _ in 0..3 {
            journal.record(&Signal::from(Intent::SignOut));
        }

        let sequences: Vec<u64> = journal.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_persisted_sign_in_has_no_password() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("signals.jsonl");

        let journal = SignalJournal::new();
        journal.record(&Signal::from(Intent::SignIn(Credentials::new(
            "ada@example.com",
            "hunter2",
        ))));
        journal.persist(&path).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("ada@example.com"));
        assert!(!text.contains("hunter2"));

        // Still replayable
        let loaded = SignalJournal::load(&path).await.unwrap();
        assert_eq!(loaded[0].signal.as_intent().map(Intent::kind), Some(IntentKind::SignIn));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let loaded = SignalJournal::load(&temp.path().join("none.jsonl")).await.unwrap();
        assert!(loaded.is_empty());
    }
}

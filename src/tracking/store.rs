//! Execution State Store
//!
//! Tracks in-flight task start times keyed by [`TaskId`]. Entries expire
//! after a fixed TTL so tasks that never report completion cannot grow
//! the map without bound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::debug;

use super::identity::TaskId;

/// Default lifetime of a start record.
pub const DEFAULT_START_TTL: Duration = Duration::from_secs(3600);

/// Expired records are swept once every this many inserts.
const PURGE_INTERVAL: u64 = 128;

#[derive(Debug, Clone, Copy)]
struct StartRecord {
    started_at: Instant,
    expires_at: Instant,
}

/// Concurrent, TTL-bounded map of task start timestamps.
///
/// Per-key operations are atomic. Keys live in separate shards, so
/// signals for unrelated tasks do not contend on a single lock.
#[derive(Debug)]
pub struct ExecutionStore {
    records: DashMap<TaskId, StartRecord>,
    ttl: Duration,
    inserts: AtomicU64,
}

impl ExecutionStore {
    /// Creates a store with the default one-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_START_TTL)
    }

    /// Creates a store whose records expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
            inserts: AtomicU64::new(0),
        }
    }

    /// Returns the configured record lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records the start of an execution, replacing any earlier record.
    pub fn record_start(&self, id: &TaskId, started_at: Instant) {
        let record = StartRecord {
            started_at,
            expires_at: started_at + self.ttl,
        };

        if self.records.insert(id.clone(), record).is_some() {
            debug!("Start record for task {} overwritten", id);
        }

        if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_expired();
        }
    }

    /// Removes and returns the start time recorded for `id`.
    ///
    /// Returns `None` if the task never started, was already consumed,
    /// or its record expired.
    pub fn take_start(&self, id: &TaskId) -> Option<Instant> {
        let (_, record) = self.records.remove(id)?;

        if Instant::now() >= record.expires_at {
            debug!("Start record for task {} had expired", id);
            return None;
        }

        Some(record.started_at)
    }

    /// Returns true if a live record exists for `id`.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.records
            .get(id)
            .map(|record| Instant::now() < record.expires_at)
            .unwrap_or(false)
    }

    /// Drops every expired record and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| now < record.expires_at);
        let removed = before.saturating_sub(self.records.len());

        if removed > 0 {
            debug!("Purged {} expired start records", removed);
        }
        removed
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

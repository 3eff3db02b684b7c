//! Task Identity
//!
//! Derives a stable fingerprint for a task execution from its label
//! (command text or description) and the owning application name.

use std::fmt;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

/// Separator placed between label and application name before hashing.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Opaque, fixed-width identifier of a task execution.
///
/// Always 32 lowercase hex characters (a 128-bit XXH3 digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the identity of a task from its label and application name.
///
/// The result is deterministic for identical inputs. An empty label is
/// accepted; all unlabeled tasks of one application share an identity.
pub fn identify(label: &str, application: &str) -> TaskId {
    let mut key = String::with_capacity(label.len() + application.len() + 1);
    key.push_str(label);
    key.push(FIELD_SEPARATOR);
    key.push_str(application);

    TaskId(format!("{:032x}", xxh3_128(key.as_bytes())))
}

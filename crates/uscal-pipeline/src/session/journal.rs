//! Checkpoint identity and the per-session operation journal.

use std::time::SystemTime;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use super::status::{CalibrationStatus, RecomputeOutcome};

/// Which calibration method wrote a session, and in which layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// `"imageless"` or `"pointer"`.
    pub method: String,
    pub schema_version: u32,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    /// Seconds since the Unix epoch; bumped by every journaled operation.
    pub last_modified: u64,
    /// Operator note, e.g. the probe model.
    pub description: Option<String>,
}

impl SessionMetadata {
    pub(crate) fn new(method: &str, schema_version: u32, description: Option<String>) -> Self {
        let now = unix_seconds();
        Self {
            method: method.to_string(),
            schema_version,
            created_at: now,
            last_modified: now,
            description,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = unix_seconds();
    }

    /// Refuse a checkpoint written by another method or a newer schema.
    pub(crate) fn ensure_compatible(&self, method: &str, schema_version: u32) -> Result<()> {
        if self.method != method {
            bail!("session method '{}' is not '{}'", self.method, method);
        }
        if self.schema_version > schema_version {
            bail!(
                "session schema version {} is newer than supported version {}",
                self.schema_version,
                schema_version
            );
        }
        Ok(())
    }
}

/// One state-changing operation and what it left the session in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Session method name, e.g. `"append_marked_point"`.
    pub operation: String,
    /// Status after the recomputation; `None` when the operation was refused
    /// before anything changed.
    pub status: Option<CalibrationStatus>,
    pub note: Option<String>,
}

impl LogEntry {
    pub(crate) fn recorded(operation: &str, outcome: &RecomputeOutcome) -> Self {
        Self {
            timestamp: unix_seconds(),
            operation: operation.to_string(),
            status: Some(outcome.status.clone()),
            note: None,
        }
    }

    pub(crate) fn refused(operation: &str, reason: impl Into<String>) -> Self {
        Self {
            timestamp: unix_seconds(),
            operation: operation.to_string(),
            status: None,
            note: Some(reason.into()),
        }
    }

    pub(crate) fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether the operation produced a new transform.
    pub fn succeeded(&self) -> bool {
        self.status.as_ref().is_some_and(CalibrationStatus::is_success)
    }
}

// A clock set before the epoch reads as 0.
fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

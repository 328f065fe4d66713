//! Destinations for access and audit records.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace, warn};

/// Tracing target for access records
pub const ACCESS_TARGET: &str = "sapi.access";
/// Tracing target for audit records
pub const AUDIT_TARGET: &str = "sapi.audit";

/// Which stream a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// One per completed request
    Access,
    /// One per domain event
    Audit,
}

impl RecordKind {
    /// Value of the record's `type` field
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Audit => "audit",
        }
    }
}

/// Receives finished records
///
/// Implementations must not panic or block for long; records are emitted on
/// the request path.
pub trait RecordSink: Send + Sync + std::fmt::Debug {
    /// Accept one record
    fn emit(&self, kind: RecordKind, record: &Map<String, Value>);
}

/// Writes each record as one JSON line through `tracing`
///
/// Audit records go out at the level named in their `level` field, info when
/// absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn emit(&self, kind: RecordKind, record: &Map<String, Value>) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(_) => return,
        };
        match kind {
            RecordKind::Access => info!(target: ACCESS_TARGET, "{line}"),
            RecordKind::Audit => match record.get("level").and_then(Value::as_str) {
                Some("error") => error!(target: AUDIT_TARGET, "{line}"),
                Some("warn") => warn!(target: AUDIT_TARGET, "{line}"),
                Some("debug") => debug!(target: AUDIT_TARGET, "{line}"),
                Some("trace") => trace!(target: AUDIT_TARGET, "{line}"),
                _ => info!(target: AUDIT_TARGET, "{line}"),
            },
        }
    }
}

/// Keeps records in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<(RecordKind, Map<String, Value>)>>>,
}

impl MemorySink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in emission order
    #[must_use]
    pub fn records(&self) -> Vec<(RecordKind, Map<String, Value>)> {
        self.records.lock().clone()
    }

    /// Records of one kind
    #[must_use]
    pub fn of_kind(&self, kind: RecordKind) -> Vec<Map<String, Value>> {
        self.records
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Number of records held
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was emitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all records
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, kind: RecordKind, record: &Map<String, Value>) {
        self.records.lock().push((kind, record.clone()));
    }
}

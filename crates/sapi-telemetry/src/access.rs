//! Access records, one per completed request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sapi_core::RequestContext;
use serde_json::{Map, Value};

use crate::config::{AccessLogConfig, DEFAULT_MAX_BODY_BYTES, LoggingConfig};
use crate::redact::Redactor;
use crate::sink::{RecordKind, RecordSink, TracingSink};
use crate::truncate::{self, TRUNCATED_KEY};

/// Longest user agent kept, in characters
pub const MAX_USER_AGENT_CHARS: usize = 200;
/// Route recorded when nothing resolved one
pub const UNKNOWN_ROUTE: &str = "unknown";

/// What the access layer observed about one request
#[derive(Debug, Clone, Copy)]
pub struct AccessEntry<'a> {
    /// Context of the request
    pub ctx: &'a RequestContext,
    /// HTTP method
    pub method: &'a str,
    /// Request path
    pub path: &'a str,
    /// Raw query string
    pub query: Option<&'a str>,
    /// Response status
    pub status: u16,
    /// Time spent handling the request
    pub duration: Duration,
    /// `User-Agent` header
    pub user_agent: Option<&'a str>,
    /// `Content-Type` of the request
    pub content_type: Option<&'a str>,
    /// Buffered request body, when captured
    pub body: Option<&'a [u8]>,
}

/// Emits access records
#[derive(Debug, Clone)]
pub struct AccessLogger {
    enabled: bool,
    exclude_paths: Arc<HashSet<String>>,
    capture_body: bool,
    max_body_bytes: usize,
    redactor: Arc<Redactor>,
    sink: Arc<dyn RecordSink>,
}

impl AccessLogger {
    /// Build from logging configuration
    pub fn new(config: &LoggingConfig, sink: Arc<dyn RecordSink>) -> Self {
        let access: &AccessLogConfig = &config.access;
        Self {
            enabled: config.enabled && access.enabled,
            exclude_paths: Arc::new(
                access
                    .exclude_paths
                    .iter()
                    .filter(|p| !p.is_empty())
                    .cloned()
                    .collect(),
            ),
            capture_body: access.log_body_on_error,
            max_body_bytes: access.body_cap(),
            redactor: Arc::new(Redactor::new(&config.redact.body_keys)),
            sink,
        }
    }

    /// Logger with default settings writing through `tracing`
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(&LoggingConfig::default(), Arc::new(TracingSink))
    }

    /// Whether records are emitted at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `path` is excluded
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.contains(normalize_path(path))
    }

    /// Whether a request to `path` produces a record
    #[must_use]
    pub fn should_log(&self, path: &str) -> bool {
        self.enabled && !self.is_excluded(path)
    }

    /// Whether request bodies should be buffered for error snapshots
    #[must_use]
    pub fn captures_body(&self) -> bool {
        self.capture_body
    }

    /// Byte cap for body snapshots
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Build the record for `entry` without emitting it
    #[must_use]
    pub fn record(&self, entry: &AccessEntry<'_>) -> Option<Map<String, Value>> {
        if !self.should_log(entry.path) {
            return None;
        }
        let ctx = entry.ctx;

        let mut record = Map::new();
        record.insert("ts".into(), Value::String(chrono::Utc::now().to_rfc3339()));
        record.insert("type".into(), Value::String(RecordKind::Access.as_str().into()));
        record.insert(
            "request_id".into(),
            Value::String(ctx.request_id().unwrap_or_default()),
        );
        record.insert("method".into(), Value::String(entry.method.to_uppercase()));
        record.insert("path".into(), Value::String(normalize_path(entry.path).to_string()));
        record.insert("status".into(), Value::from(entry.status));
        record.insert("duration_ms".into(), Value::from(duration_ms(entry.duration)));
        record.insert("ip".into(), Value::String(ctx.ip().unwrap_or_default()));
        record.insert(
            "ua".into(),
            Value::String(
                entry
                    .user_agent
                    .map(|ua| ua.chars().take(MAX_USER_AGENT_CHARS).collect())
                    .unwrap_or_default(),
            ),
        );
        record.insert(
            "route".into(),
            Value::String(ctx.route().unwrap_or_else(|| UNKNOWN_ROUTE.to_string())),
        );

        if let Some(query) = entry.query.map(parse_query).filter(|q| !q.is_empty()) {
            record.insert("query".into(), self.redactor.redact(&Value::Object(query)));
        }

        if let Some(sub) = ctx.sub() {
            record.insert("sub".into(), Value::String(sub));
        }

        if entry.status >= 400 && self.capture_body {
            let body = self.body_snapshot(entry.body.unwrap_or_default(), entry.content_type);
            record.insert("body".into(), body);
        }

        Some(record)
    }

    /// Emit a record for `entry`
    pub fn log(&self, entry: &AccessEntry<'_>) {
        if let Some(record) = self.record(entry) {
            self.sink.emit(RecordKind::Access, &record);
        }
    }

    /// Redacted, size-capped view of a request body
    ///
    /// JSON objects and arrays are redacted structurally; anything else is
    /// treated as text and redacted by pattern, with `…` marking a cut.
    #[must_use]
    pub fn body_snapshot(&self, body: &[u8], content_type: Option<&str>) -> Value {
        if body.is_empty() {
            return Value::Object(Map::new());
        }

        let cap = if self.max_body_bytes == 0 {
            DEFAULT_MAX_BODY_BYTES
        } else {
            self.max_body_bytes
        };
        let was_cut = body.len() > cap;
        let slice = &body[..body.len().min(cap)];

        let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        if is_json
            && let Ok(mut value) = serde_json::from_slice::<Value>(slice)
            && (value.is_object() || value.is_array())
        {
            self.redactor.redact_in_place(&mut value);
            if was_cut && let Value::Object(map) = &mut value {
                map.insert(TRUNCATED_KEY.into(), Value::Bool(true));
            }
            return truncate::bound(value, cap);
        }

        let text = String::from_utf8_lossy(slice);
        let mut text = self.redactor.redact_raw(&text);
        if was_cut {
            text.push('…');
        }
        Value::String(text)
    }
}

/// Decode a query string into a flat map (last value wins)
#[must_use]
pub fn parse_query(query: &str) -> Map<String, Value> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

fn normalize_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

fn duration_ms(duration: Duration) -> u64 {
    (duration.as_secs_f64() * 1000.0).round() as u64
}

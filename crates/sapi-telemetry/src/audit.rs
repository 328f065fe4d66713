//! Audit records for domain events.
//!
//! Each call to [`AuditLogger::log`] produces at most one record carrying the
//! event name and level, correlation fields from the [`RequestContext`], and a
//! redacted, size-bounded context object.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use regex::Regex;
use sapi_core::RequestContext;
use sapi_core::context::keys;
use serde_json::{Map, Value};
use tracing::{Level, warn};

use crate::config::LoggingConfig;
use crate::error::{TelemetryError, TelemetryResult};
use crate::redact::Redactor;
use crate::sink::{RecordKind, RecordSink, TracingSink};
use crate::truncate;

/// Emits audit records
#[derive(Debug, Clone)]
pub struct AuditLogger {
    enabled: bool,
    exclude: Arc<[EventPattern]>,
    redactor: Arc<Redactor>,
    max_bytes: usize,
    sink: Arc<dyn RecordSink>,
}

impl AuditLogger {
    /// Build from logging configuration
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidPattern`] if an exclusion glob cannot be
    /// compiled.
    pub fn new(config: &LoggingConfig, sink: Arc<dyn RecordSink>) -> TelemetryResult<Self> {
        let exclude = config
            .audit
            .exclude_events
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(EventPattern::new)
            .collect::<TelemetryResult<Vec<_>>>()?;

        Ok(Self {
            enabled: config.enabled && config.audit.enabled,
            exclude: exclude.into(),
            redactor: Arc::new(Redactor::new(&config.redact.body_keys)),
            max_bytes: config.audit.context_cap(),
            sink,
        })
    }

    /// Logger with default settings writing through `tracing`
    #[must_use]
    pub fn tracing() -> Self {
        Self {
            enabled: true,
            exclude: Arc::from(Vec::new()),
            redactor: Arc::new(Redactor::new(&LoggingConfig::default().redact.body_keys)),
            max_bytes: crate::config::DEFAULT_MAX_CONTEXT_BYTES,
            sink: Arc::new(TracingSink),
        }
    }

    /// Whether records are emitted at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `event` matches an exclusion pattern
    #[must_use]
    pub fn is_excluded(&self, event: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(event))
    }

    /// Build the record for `event` without emitting it
    ///
    /// Returns `None` when disabled, for a blank event name, or when the event
    /// is excluded.
    #[must_use]
    pub fn record(
        &self,
        ctx: &RequestContext,
        event: &str,
        context: Value,
        level: Level,
    ) -> Option<Map<String, Value>> {
        let event = event.trim();
        if !self.enabled || event.is_empty() || self.is_excluded(event) {
            return None;
        }

        let mut context = match context {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Value::Object(map)
            }
        };
        self.redactor.redact_in_place(&mut context);
        let context = truncate::bound(context, self.max_bytes);

        let mut record = Map::new();
        record.insert("ts".into(), Value::String(chrono::Utc::now().to_rfc3339()));
        record.insert("type".into(), Value::String(RecordKind::Audit.as_str().into()));
        record.insert("event".into(), Value::String(event.to_string()));
        record.insert("level".into(), Value::String(level.as_str().to_ascii_lowercase()));
        let correlation = [
            ("request_id", ctx.request_id()),
            ("sub", ctx.sub()),
            ("route", ctx.route()),
        ];
        for (key, value) in correlation {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                record.insert(key.into(), Value::String(value));
            }
        }
        if let Some(user_id) = ctx.get(keys::USER_ID).and_then(user_id_value) {
            record.insert("user_id".into(), user_id);
        }
        record.insert("context".into(), context);
        Some(record)
    }

    /// Emit an informational record for `event`
    pub fn log(&self, ctx: &RequestContext, event: &str, context: Value) {
        self.log_with_level(ctx, event, context, Level::INFO);
    }

    /// Emit a record for `event` at `level`
    ///
    /// A panicking sink is logged and swallowed; the caller's request carries
    /// on.
    pub fn log_with_level(&self, ctx: &RequestContext, event: &str, context: Value, level: Level) {
        let Some(record) = self.record(ctx, event, context, level) else {
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| self.sink.emit(RecordKind::Audit, &record)))
            .is_err()
        {
            warn!(event = %record["event"], "audit sink panicked");
        }
    }
}

/// Numeric ids stay numbers, anything else becomes a non-empty string
fn user_id_value(value: Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else if let Ok(id) = s.parse::<i64>() {
                Some(Value::from(id))
            } else {
                Some(Value::String(s.to_string()))
            }
        }
        Value::Null => None,
        other => Some(Value::String(other.to_string())),
    }
}

/// A compiled exclusion glob
#[derive(Debug, Clone)]
struct EventPattern {
    raw: String,
    regex: Regex,
}

impl EventPattern {
    fn new(raw: &str) -> TelemetryResult<Self> {
        let regex = Regex::new(&glob_to_regex(raw)).map_err(|e| TelemetryError::InvalidPattern {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    fn matches(&self, event: &str) -> bool {
        if event == self.raw || self.regex.is_match(event) {
            return true;
        }
        // `auth.*` also covers the bare `auth` event
        self.raw
            .strip_suffix(".*")
            .is_some_and(|prefix| !prefix.is_empty() && event == prefix)
    }
}

/// Translate a shell glob into an anchored regex
///
/// `*` matches any run, `?` one character, `[...]` a class (`[!...]` negated).
/// An unterminated `[`, or one whose class would be empty, is taken literally.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let negated = matches!(chars.get(i + 1), Some('!' | '^'));
                let start = if negated { i + 2 } else { i + 1 };
                // The first class character may itself be `]`
                let close = chars
                    .get(start + 1..)
                    .and_then(|rest| rest.iter().position(|&c| c == ']'))
                    .map(|offset| start + 1 + offset);
                match close {
                    Some(end) => {
                        out.push('[');
                        if negated {
                            out.push('^');
                        }
                        for &c in &chars[start..end] {
                            if matches!(c, '\\' | '[' | ']' | '&' | '~') {
                                out.push('\\');
                            }
                            out.push(c);
                        }
                        out.push(']');
                        i = end;
                    }
                    None => out.push_str(r"\["),
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn logger(exclude: &[&str]) -> (AuditLogger, MemorySink) {
        let sink = MemorySink::new();
        let mut config = LoggingConfig::default();
        config.audit.exclude_events = exclude.iter().map(|s| s.to_string()).collect();
        let logger = AuditLogger::new(&config, Arc::new(sink.clone())).unwrap();
        (logger, sink)
    }

    #[test]
    fn test_glob_translation() {
        assert_eq!(glob_to_regex("auth.*"), r"^auth\..*$");
        assert_eq!(glob_to_regex("a?c"), "^a.c$");
        assert_eq!(glob_to_regex("v[12]"), "^v[12]$");
        assert_eq!(glob_to_regex("v[!12]"), "^v[^12]$");
        assert_eq!(glob_to_regex("x[y"), r"^x\[y$");
        assert_eq!(glob_to_regex("x[!]"), r"^x\[!\]$");
        assert_eq!(glob_to_regex("x[^]"), r"^x\[\^\]$");
        assert_eq!(glob_to_regex("[!]]"), r"^[^\]]$");
        assert_eq!(glob_to_regex("[]]"), r"^[\]]$");
    }

    #[test]
    fn test_empty_negated_class_is_literal() {
        let (logger, _) = logger(&["x[!]"]);
        assert!(logger.is_excluded("x[!]"));
        assert!(!logger.is_excluded("xa"));
    }

    #[test]
    fn test_exclusion_patterns() {
        let (logger, _) = logger(&["debug.*", "token.?ssued", "exact"]);
        assert!(logger.is_excluded("debug.anything.deep"));
        assert!(logger.is_excluded("debug"));
        assert!(!logger.is_excluded("debugger"));
        assert!(logger.is_excluded("token.issued"));
        assert!(logger.is_excluded("exact"));
        assert!(!logger.is_excluded("exactly"));
    }

    #[test]
    fn test_record_fields() {
        let (logger, sink) = logger(&[]);
        let ctx = RequestContext::with_request_id("r-1");
        ctx.set_sub("alice");
        ctx.set_user_id(7);

        logger.log(&ctx, "token.issued", json!({"username": "alice", "password": "pw"}));

        let records = sink.of_kind(RecordKind::Audit);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["type"], "audit");
        assert_eq!(record["event"], "token.issued");
        assert_eq!(record["request_id"], "r-1");
        assert_eq!(record["sub"], "alice");
        assert_eq!(record["user_id"], 7);
        assert_eq!(record["level"], "info");
        assert!(!record.contains_key("route"));
        assert_eq!(record["context"], json!({"username": "alice", "password": "***"}));
        assert!(record["ts"].as_str().is_some());
    }

    #[test]
    fn test_level_and_user_id_forms() {
        let (logger, sink) = logger(&[]);
        let ctx = RequestContext::new();
        ctx.set_user_id("15");
        logger.log_with_level(&ctx, "login.failed", json!({}), Level::WARN);

        ctx.set_user_id("svc-bot");
        logger.log_with_level(&ctx, "login.failed", json!({}), Level::ERROR);

        ctx.set_user_id("");
        logger.log(&ctx, "login.failed", json!({}));

        let records = sink.of_kind(RecordKind::Audit);
        assert_eq!(records[0]["level"], "warn");
        assert_eq!(records[0]["user_id"], 15);
        assert_eq!(records[1]["level"], "error");
        assert_eq!(records[1]["user_id"], "svc-bot");
        assert_eq!(records[2]["level"], "info");
        assert!(!records[2].contains_key("user_id"));
    }

    #[test]
    fn test_blank_and_excluded_events_skipped() {
        let (logger, sink) = logger(&["noise.*"]);
        let ctx = RequestContext::new();
        logger.log(&ctx, "  ", json!({}));
        logger.log(&ctx, "noise.tick", json!({}));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_disabled_logger_emits_nothing() {
        let sink = MemorySink::new();
        let mut config = LoggingConfig::default();
        config.enabled = false;
        let logger = AuditLogger::new(&config, Arc::new(sink.clone())).unwrap();
        logger.log(&RequestContext::new(), "token.issued", Value::Null);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_oversized_context_is_bounded() {
        let sink = MemorySink::new();
        let mut config = LoggingConfig::default();
        config.audit.max_context_bytes = 64;
        let logger = AuditLogger::new(&config, Arc::new(sink.clone())).unwrap();

        logger.log(&RequestContext::new(), "big", json!({"blob": "x".repeat(1000)}));

        let records = sink.of_kind(RecordKind::Audit);
        assert_eq!(records[0]["context"], json!({"_truncated": true}));
    }
}

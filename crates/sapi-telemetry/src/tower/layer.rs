//! Tower Layer implementation for access logging

use super::AccessLogService;
use crate::AccessLogger;
use tower::Layer;

/// Tower Layer that wraps services with [`AccessLogService`]
#[derive(Debug, Clone)]
pub struct AccessLogLayer {
    logger: AccessLogger,
    max_request_bytes: Option<usize>,
}

impl AccessLogLayer {
    /// Create a layer emitting through `logger`
    #[must_use]
    pub fn new(logger: AccessLogger) -> Self {
        Self {
            logger,
            max_request_bytes: None,
        }
    }

    /// Refuse with 413 any request body larger than `limit` that would be buffered
    #[must_use]
    pub fn max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = Some(limit);
        self
    }

    /// Get the logger
    #[must_use]
    pub fn logger(&self) -> &AccessLogger {
        &self.logger
    }
}

impl Default for AccessLogLayer {
    fn default() -> Self {
        Self::new(AccessLogger::tracing())
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService::new(inner, self.logger.clone()).with_max_request_bytes(self.max_request_bytes)
    }
}

//! Failure taxonomy shared by the query and chat clients.

/// Why an outbound request did not produce a usable body.
///
/// The orchestrator and session treat every variant the same way (an
/// `Error` status plus a logged message); the split exists for logging
/// and for tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The service was never reached.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-2xx status.
    #[error("HTTP error: status {0}")]
    Http(u16),
    /// 2xx status but the body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unsupported page size {0} (expected 10, 20 or 50)")]
    UnsupportedLimit(u32),
}

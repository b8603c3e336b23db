//! Transfer error type and its mapping onto retry error kinds.

use super::policy::ErrorKind;
use thiserror::Error;

/// Error from one listing or archive request. Carried through the retry loop
/// so the policy can classify before the error is converted to anyhow.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Local file write/create failed (e.g. disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// Listing response was not a parseable ListBucketResult document. Not retried.
    #[error("listing parse: {0}")]
    Parse(String),
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transfer error into an ErrorKind.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http(code) => classify_http_status(*code),
        TransferError::Storage(_) | TransferError::Parse(_) => ErrorKind::Other,
    }
}

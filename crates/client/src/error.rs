/// Errors from a single call to the metrics/alerting backend.
///
/// Every variant is treated the same way by the retry policy: the call is
/// retried until the attempt budget runs out.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("Malformed response ({reason}): {body}")]
    Decode { reason: String, body: String },
}

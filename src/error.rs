use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Errors that abort `ServerHandle::start`. The handle always lands back in
/// `Stopped` when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// Every candidate port in the probe budget was taken.
    #[error("no free loopback port within {attempts} attempts starting at {start}")]
    PortExhausted { start: u16, attempts: u32 },
    /// Bind failed for a reason other than the port being in use.
    #[error("failed to bind loopback socket: {0}")]
    Bind(#[source] std::io::Error),
}

/// Per-request errors from the static file resolver. Each maps to exactly
/// one response; none of them affect the listener or other in-flight
/// requests.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The resolved path escapes the content root.
    #[error("path escapes the content root")]
    Forbidden,
    /// The target does not exist or is not a regular file.
    #[error("file not found")]
    NotFound,
    /// The target resolved but reading it failed.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServeError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ServeError::NotFound => (StatusCode::NOT_FOUND, "File not found"),
            ServeError::Read(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
    }
}

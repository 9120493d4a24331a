//! Error taxonomy for the relay.
//!
//! Malformed-but-present input (a manifest without `#EXTM3U`, a script with
//! no packed payload) is represented as a value ([`Playlist::Invalid`], an
//! empty candidate list), never as an error. Only request validation,
//! upstream failure and genuine internal defects flow through [`RelayError`].
//!
//! [`Playlist::Invalid`]: crate::hls::parser::Playlist::Invalid

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The `url` query parameter is missing.
    #[error("Missing 'url' parameter")]
    MissingUrl,

    /// The `url` query parameter is present but unusable as a fetch target.
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    /// Network-level failure talking to the upstream, after retries.
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(#[from] reqwest::Error),

    /// Upstream answered with a terminal error status after retries.
    #[error("Upstream returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),

    /// Manifest rewriting failed in a way that is not a malformed manifest
    /// (e.g. truncated gzip stream, non-UTF-8 text).
    #[error("Manifest rewrite failed: {0}")]
    Rewrite(String),

    /// Catch-all for unexpected conditions at the server boundary.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RelayError::MissingUrl => (StatusCode::BAD_REQUEST, self.to_string()),
            RelayError::InvalidTarget(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            RelayError::UpstreamFetch(_) | RelayError::UpstreamStatus(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            RelayError::Rewrite(_) | RelayError::Internal(_) => {
                // Log the detail server-side; the client gets a generic line,
                // never a stack trace.
                error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_maps_to_400() {
        let resp = RelayError::MissingUrl.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_target_maps_to_400() {
        let resp = RelayError::InvalidTarget("ftp scheme".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_status_maps_to_502() {
        let resp = RelayError::UpstreamStatus(reqwest::StatusCode::FORBIDDEN).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_maps_to_500_without_detail() {
        let resp = RelayError::Internal("secret detail".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rewrite_maps_to_500() {
        let resp = RelayError::Rewrite("bad gzip".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! The `/proxy` endpoint: fetch upstream, rewrite manifests, stream the rest.
//!
//! Per-request flow: validate the query → fetch with spoofed headers →
//! branch on manifest vs. binary content → respond. Nothing survives the
//! request; the only shared pieces are the read-only config and the pooled
//! HTTP client inside the fetcher.

use crate::{
    error::{RelayError, Result},
    hls::rewrite::{RewriteContext, rewrite},
    server::{state::AppState, validate::validate_target_url},
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

/// Fallback Content-Type when the upstream does not send one; players treat
/// `/proxy` responses as HLS unless told otherwise.
const DEFAULT_MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Query parameters of one proxied fetch. Derived per request, never stored.
#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
    pub referer: Option<String>,
}

/// Serve `GET /proxy?url=<target>&referer=<referer>`.
pub async fn serve_proxy(
    Query(params): Query<ProxyParams>,
    State(state): State<AppState>,
) -> Result<Response> {
    // Validated
    let target_url = params.url.ok_or(RelayError::MissingUrl)?;
    validate_target_url(&target_url, state.config.is_dev)?;

    let referer = params
        .referer
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| state.config.default_referer.clone());

    info!("Proxying {} (referer: {})", target_url, referer);

    // Fetching
    let response = state.fetcher.fetch(&target_url, Some(&referer)).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::UpstreamStatus(status));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_MANIFEST_CONTENT_TYPE)
        .to_string();

    if is_manifest(&target_url, &content_type) {
        // Rewriting
        let bytes = response.bytes().await.map_err(RelayError::UpstreamFetch)?;
        let ctx = RewriteContext {
            base_url: target_url,
            referer,
            proxy_endpoint: state.config.proxy_endpoint(),
        };
        let rewritten = rewrite(&bytes, &ctx)?;

        info!("Rewrote manifest ({} bytes out)", rewritten.len());

        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_LENGTH, rewritten.len().to_string()),
            ],
            rewritten,
        )
            .into_response())
    } else {
        // Passthrough: stream the body unchanged
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(len) = response.content_length() {
            builder = builder.header(header::CONTENT_LENGTH, len);
        }

        builder
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| RelayError::Internal(format!("response build failed: {e}")))
    }
}

/// A response is treated as a manifest when the upstream says so or the
/// target URL carries the manifest suffix.
fn is_manifest(target_url: &str, content_type: &str) -> bool {
    content_type.to_lowercase().contains("mpegurl")
        || target_url.split('?').next().unwrap_or("").ends_with(".m3u8")
}

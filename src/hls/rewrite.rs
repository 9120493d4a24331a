//! Line-level manifest rewriting.
//!
//! Operates on raw text rather than the parsed model so that comment and
//! metadata lines survive byte-for-byte. Only URI lines are touched: each
//! is resolved to an absolute URL and replaced with a proxy endpoint URL
//! carrying the original target and the referer as query parameters.

use crate::error::{RelayError, Result};
use crate::hls::classify::{LineKind, classify_line, resolve_line_url};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

/// Everything one rewrite call needs. Built per request, never shared.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// URL the manifest was fetched from; relative lines resolve against it.
    pub base_url: String,
    /// Referer forwarded in each rewritten line.
    pub referer: String,
    /// Absolute proxy endpoint, e.g. `http://localhost:8001/proxy`.
    pub proxy_endpoint: String,
}

impl RewriteContext {
    /// The rewritten form of one absolute target URL.
    fn proxied(&self, absolute_url: &str) -> String {
        format!(
            "{}?url={}&referer={}",
            self.proxy_endpoint,
            urlencoding::encode(absolute_url),
            urlencoding::encode(&self.referer),
        )
    }
}

/// Gzip magic bytes; upstreams occasionally serve compressed manifests even
/// when the client did not ask for them.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Rewrite every URI line of a manifest to route through the proxy.
///
/// Gzip input is transparently decompressed; the output is always plain
/// text. Lines already pointing at the proxy endpoint are left untouched,
/// which makes the operation idempotent on segment count.
pub fn rewrite(manifest_bytes: &[u8], ctx: &RewriteContext) -> Result<String> {
    let text = decode_text(manifest_bytes)?;

    let mut rewritten = String::with_capacity(text.len() + 256);
    let mut rewritten_count = 0usize;

    for line in text.lines() {
        match classify_line(line) {
            LineKind::Uri => {
                let trimmed = line.trim();

                // Already routed through us; do not nest proxies
                if trimmed.starts_with(&ctx.proxy_endpoint) {
                    rewritten.push_str(trimmed);
                } else {
                    let absolute = resolve_line_url(&ctx.base_url, trimmed)
                        .unwrap_or_else(|| trimmed.to_string());
                    rewritten.push_str(&ctx.proxied(&absolute));
                    rewritten_count += 1;
                }
            }
            // Header, tags, comments and blank lines pass through untouched
            _ => rewritten.push_str(line),
        }
        rewritten.push('\n');
    }

    debug!(
        "Rewrote {} URI line(s) against {}",
        rewritten_count, ctx.base_url
    );
    Ok(rewritten)
}

/// Decompress if gzip, then require UTF-8.
fn decode_text(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes);
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|e| RelayError::Rewrite(format!("gzip decompression failed: {e}")))?;
        return Ok(text);
    }

    String::from_utf8(bytes.to_vec())
        .map_err(|e| RelayError::Rewrite(format!("manifest is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn ctx() -> RewriteContext {
        RewriteContext {
            base_url: "https://cdn.example.com/x/y/index.m3u8".to_string(),
            referer: "https://example.com/".to_string(),
            proxy_endpoint: "http://localhost:8001/proxy".to_string(),
        }
    }

    fn proxied_lines(text: &str) -> Vec<&str> {
        text.lines()
            .filter(|l| l.starts_with("http://localhost:8001/proxy"))
            .collect()
    }

    #[test]
    fn uri_lines_are_rewritten_with_encoded_params() {
        let manifest = "#EXTM3U\n#EXTINF:10.0,\nseg1.ts\n";
        let out = rewrite(manifest.as_bytes(), &ctx()).unwrap();

        let lines = proxied_lines(&out);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            format!(
                "http://localhost:8001/proxy?url={}&referer={}",
                urlencoding::encode("https://cdn.example.com/x/y/seg1.ts"),
                urlencoding::encode("https://example.com/"),
            )
        );
    }

    #[test]
    fn url_param_decodes_back_to_original_segment_url() {
        let manifest = "#EXTM3U\n#EXTINF:10.0,\nseg1.ts\n";
        let out = rewrite(manifest.as_bytes(), &ctx()).unwrap();
        let line = proxied_lines(&out)[0];

        let url = url::Url::parse(line).unwrap();
        let target = url
            .query_pairs()
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(target, "https://cdn.example.com/x/y/seg1.ts");
    }

    #[test]
    fn comment_and_metadata_lines_preserved_verbatim() {
        let manifest = "#EXTM3U\n\
                        #EXT-X-VERSION:3\n\
                        #EXT-X-TARGETDURATION:10\n\
                        #EXTINF:10.0,\n\
                        seg1.ts\n\
                        #EXT-X-ENDLIST\n";
        let out = rewrite(manifest.as_bytes(), &ctx()).unwrap();

        assert!(out.contains("#EXTM3U\n"));
        assert!(out.contains("#EXT-X-VERSION:3\n"));
        assert!(out.contains("#EXT-X-TARGETDURATION:10\n"));
        assert!(out.contains("#EXTINF:10.0,\n"));
        assert!(out.contains("#EXT-X-ENDLIST\n"));
    }

    #[test]
    fn line_order_is_preserved() {
        let manifest = "#EXTM3U\n#EXTINF:1.0,\na.ts\n#EXTINF:2.0,\nb.ts\n";
        let out = rewrite(manifest.as_bytes(), &ctx()).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXTINF:1.0,");
        assert!(lines[2].contains(urlencoding::encode("a.ts").as_ref()));
        assert_eq!(lines[3], "#EXTINF:2.0,");
        assert!(lines[4].contains(urlencoding::encode("b.ts").as_ref()));
    }

    #[test]
    fn relative_forms_resolve_before_rewriting() {
        let manifest = "#EXTM3U\n#EXTINF:1,\nseg1.ts\n#EXTINF:1,\n/z/seg2.ts\n#EXTINF:1,\n//other.host/seg3.ts\n";
        let out = rewrite(manifest.as_bytes(), &ctx()).unwrap();

        assert!(out.contains(urlencoding::encode("https://cdn.example.com/x/y/seg1.ts").as_ref()));
        assert!(out.contains(urlencoding::encode("https://cdn.example.com/z/seg2.ts").as_ref()));
        assert!(out.contains(urlencoding::encode("https://other.host/seg3.ts").as_ref()));
    }

    #[test]
    fn rewriting_is_idempotent_on_proxied_line_count() {
        let manifest = "#EXTM3U\n#EXTINF:1.0,\na.ts\n#EXTINF:2.0,\nb.ts\n";
        let once = rewrite(manifest.as_bytes(), &ctx()).unwrap();
        let twice = rewrite(once.as_bytes(), &ctx()).unwrap();

        assert_eq!(proxied_lines(&once).len(), proxied_lines(&twice).len());
        // And no nested proxy parameters appear
        assert!(!twice.contains(urlencoding::encode("http://localhost:8001/proxy").as_ref()));
    }

    #[test]
    fn gzip_input_is_transparently_decompressed() {
        let manifest = "#EXTM3U\n#EXTINF:10.0,\nseg1.ts\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(manifest.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let out = rewrite(&compressed, &ctx()).unwrap();
        assert!(out.starts_with("#EXTM3U"));
        assert_eq!(proxied_lines(&out).len(), 1);
    }

    #[test]
    fn truncated_gzip_is_an_error() {
        let manifest = "#EXTM3U\n#EXTINF:10.0,\nseg1.ts\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(manifest.as_bytes()).unwrap();
        let mut compressed = encoder.finish().unwrap();
        compressed.truncate(compressed.len() / 2);

        assert!(rewrite(&compressed, &ctx()).is_err());
    }

    #[test]
    fn non_utf8_input_is_an_error() {
        assert!(rewrite(&[0xff, 0xfe, 0x00, 0x01], &ctx()).is_err());
    }

    #[test]
    fn master_variant_lines_are_rewritten_too() {
        let manifest = "#EXTM3U\n\
                        #EXT-X-STREAM-INF:BANDWIDTH=1000000\n\
                        low.m3u8\n\
                        #EXT-X-STREAM-INF:BANDWIDTH=3000000\n\
                        high.m3u8\n";
        let out = rewrite(manifest.as_bytes(), &ctx()).unwrap();
        assert_eq!(proxied_lines(&out).len(), 2);
        assert!(out.contains("#EXT-X-STREAM-INF:BANDWIDTH=1000000\n"));
    }

    #[test]
    fn empty_manifest_stays_empty() {
        let out = rewrite(b"", &ctx()).unwrap();
        assert!(out.is_empty());
    }
}

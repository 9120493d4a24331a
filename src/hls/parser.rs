//! Manifest model and classification.
//!
//! A playlist is either a master (variant list), a media (segment list) or
//! invalid (missing the `#EXTM3U` header). Malformed-but-present manifests
//! never error: truncated entries are skipped, unknown tags ignored.

use crate::hls::classify::{LineKind, PLAYLIST_HEADER, classify_line, resolve_line_url};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

static BANDWIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BANDWIDTH=(\d+)").expect("valid regex"));
static RESOLUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RESOLUTION=(\d+x\d+)").expect("valid regex"));
static CODECS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"CODECS="([^"]+)""#).expect("valid regex"));
static EXTINF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#EXTINF:([\d.]+)").expect("valid regex"));

/// One alternate-bitrate stream referenced by a master playlist.
///
/// Every attribute capture is independent: a stream-info line missing one
/// of them still yields a variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamVariant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_bps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codecs: Option<String>,
    /// Absolute URL, resolved against the manifest's own URL.
    pub url: String,
}

/// One time-bounded media chunk referenced by a media playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub duration_seconds: f64,
    /// Absolute URL, resolved against the manifest's own URL.
    pub url: String,
}

/// Playlist-level tags parsed regardless of playlist kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaylistMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_type: Option<String>,
    pub end_list: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterPlaylist {
    pub variants: Vec<StreamVariant>,
    pub metadata: PlaylistMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
    pub total_duration: f64,
    pub metadata: PlaylistMetadata,
}

/// A classified manifest. Never both master and media.
#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
    /// Text that does not start with `#EXTM3U`.
    Invalid,
}

impl Playlist {
    pub fn is_master(&self) -> bool {
        matches!(self, Playlist::Master(_))
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Playlist::Media(_))
    }
}

/// Classify manifest text and extract its structured content.
///
/// URIs are materialized as absolute URLs against `base_url`; a line that
/// cannot be resolved (unparseable base) is kept verbatim so callers still
/// see the entry.
pub fn classify_and_parse(manifest_text: &str, base_url: &str) -> Playlist {
    let mut lines = manifest_text.lines();

    // First non-empty line must be the header
    let header_ok = lines
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim() == PLAYLIST_HEADER);
    if !header_ok {
        debug!("Manifest does not start with {}", PLAYLIST_HEADER);
        return Playlist::Invalid;
    }

    let all_lines: Vec<&str> = manifest_text.lines().collect();
    let metadata = parse_metadata(&all_lines);

    let has_stream_inf = all_lines
        .iter()
        .any(|l| classify_line(l) == LineKind::StreamInf);

    if has_stream_inf {
        let variants = parse_variants(&all_lines, base_url);
        return Playlist::Master(MasterPlaylist { variants, metadata });
    }

    let (segments, total_duration) = parse_segments(&all_lines, base_url);
    Playlist::Media(MediaPlaylist {
        segments,
        total_duration,
        metadata,
    })
}

/// Find the URI belonging to the tag at `tag_index`.
///
/// Blank lines between the tag and its URI are tolerated; a comment line in
/// that position means the entry is truncated and is skipped.
fn following_uri(lines: &[&str], tag_index: usize) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(tag_index + 1)
        .find(|(_, l)| classify_line(l) != LineKind::Blank)
        .and_then(|(i, l)| (classify_line(l) == LineKind::Uri).then_some(i))
}

fn resolve_or_keep(base_url: &str, line: &str) -> String {
    resolve_line_url(base_url, line).unwrap_or_else(|| line.trim().to_string())
}

fn parse_variants(lines: &[&str], base_url: &str) -> Vec<StreamVariant> {
    let mut variants = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if classify_line(line) != LineKind::StreamInf {
            continue;
        }

        let Some(uri_index) = following_uri(lines, i) else {
            debug!("Stream-info line without URL at line {}", i + 1);
            continue;
        };

        variants.push(StreamVariant {
            bandwidth_bps: BANDWIDTH_RE
                .captures(line)
                .and_then(|c| c[1].parse().ok()),
            resolution: RESOLUTION_RE.captures(line).map(|c| c[1].to_string()),
            codecs: CODECS_RE.captures(line).map(|c| c[1].to_string()),
            url: resolve_or_keep(base_url, lines[uri_index]),
        });
    }

    variants
}

fn parse_segments(lines: &[&str], base_url: &str) -> (Vec<Segment>, f64) {
    let mut segments = Vec::new();
    let mut total_duration = 0.0;

    for (i, line) in lines.iter().enumerate() {
        if classify_line(line) != LineKind::SegmentInf {
            continue;
        }

        let Some(uri_index) = following_uri(lines, i) else {
            debug!("Duration line without URL at line {}", i + 1);
            continue;
        };

        let duration = EXTINF_RE
            .captures(line)
            .and_then(|c| c[1].parse::<f64>().ok())
            .unwrap_or(0.0);

        total_duration += duration;
        segments.push(Segment {
            duration_seconds: duration,
            url: resolve_or_keep(base_url, lines[uri_index]),
        });
    }

    (segments, total_duration)
}

fn parse_metadata(lines: &[&str]) -> PlaylistMetadata {
    let mut metadata = PlaylistMetadata::default();

    for line in lines {
        let line = line.trim();
        if let Some(v) = line.strip_prefix("#EXT-X-VERSION:") {
            metadata.version = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            metadata.target_duration = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            metadata.media_sequence = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("#EXT-X-PLAYLIST-TYPE:") {
            metadata.playlist_type = Some(v.trim().to_string());
        } else if line == "#EXT-X-ENDLIST" {
            metadata.end_list = true;
        }
    }

    metadata
}

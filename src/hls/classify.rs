//! Tagged-line classification shared by the parser and the rewriter.
//!
//! Both consumers walk manifest text line-by-line; keeping the tag dispatch
//! in one place keeps their notion of "what is a URL line" identical.

use url::Url;

/// The literal header every playlist must start with.
pub const PLAYLIST_HEADER: &str = "#EXTM3U";

/// Marker introducing one variant stream in a master playlist.
pub const STREAM_INF: &str = "#EXT-X-STREAM-INF:";

/// Marker introducing one segment's duration in a media playlist.
pub const SEGMENT_INF: &str = "#EXTINF:";

/// What a single manifest line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// The `#EXTM3U` header itself.
    Header,
    /// `#EXT-X-STREAM-INF:`; a variant URL follows.
    StreamInf,
    /// `#EXTINF:`; a segment URL follows.
    SegmentInf,
    /// Any other `#`-prefixed tag or comment line.
    Comment,
    /// A non-comment, non-blank line: a variant/segment URI.
    Uri,
}

/// Classify a single (untrimmed) manifest line.
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed == PLAYLIST_HEADER {
        LineKind::Header
    } else if trimmed.starts_with(STREAM_INF) {
        LineKind::StreamInf
    } else if trimmed.starts_with(SEGMENT_INF) {
        LineKind::SegmentInf
    } else if trimmed.starts_with('#') {
        LineKind::Comment
    } else {
        LineKind::Uri
    }
}

/// Resolve a URI line to an absolute URL against the manifest's own URL.
///
/// Handles absolute (`https://…`), scheme-relative (`//host/…`),
/// absolute-path (`/…`) and relative-path forms through [`Url::join`].
/// Returns `None` when the base itself is not an absolute URL or the line
/// cannot be joined to it.
pub fn resolve_line_url(base_url: &str, line: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(line.trim()).ok().map(|u| u.to_string())
}

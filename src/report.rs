//! Offline manifest analysis records.
//!
//! Classifies saved manifest files and serializes the results as a flat
//! JSON array, written once per run. The record shape
//! `{filename, type, streams|segments, metadata, ...}` is what downstream
//! tooling consumes; no schema versioning.

use crate::error::{RelayError, Result};
use crate::hls::parser::{Playlist, PlaylistMetadata, Segment, StreamVariant, classify_and_parse};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One analyzed manifest file.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestReport {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<StreamVariant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    pub metadata: PlaylistMetadata,
    pub total_duration: f64,
    pub segment_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    MasterPlaylist,
    MediaPlaylist,
    Invalid,
}

/// Classify one manifest into a report record.
pub fn analyze_manifest(filename: &str, manifest_text: &str, base_url: &str) -> ManifestReport {
    match classify_and_parse(manifest_text, base_url) {
        Playlist::Master(master) => ManifestReport {
            filename: filename.to_string(),
            kind: ReportKind::MasterPlaylist,
            streams: master.variants,
            segments: Vec::new(),
            metadata: master.metadata,
            total_duration: 0.0,
            segment_count: 0,
        },
        Playlist::Media(media) => ManifestReport {
            filename: filename.to_string(),
            kind: ReportKind::MediaPlaylist,
            streams: Vec::new(),
            segment_count: media.segments.len(),
            total_duration: media.total_duration,
            segments: media.segments,
            metadata: media.metadata,
        },
        Playlist::Invalid => ManifestReport {
            filename: filename.to_string(),
            kind: ReportKind::Invalid,
            streams: Vec::new(),
            segments: Vec::new(),
            metadata: PlaylistMetadata::default(),
            total_duration: 0.0,
            segment_count: 0,
        },
    }
}

/// Write the full report as a JSON array, once per run.
pub fn write_report(path: &Path, reports: &[ManifestReport]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| RelayError::Internal(format!("cannot create report dir: {e}")))?;
    }

    let json = serde_json::to_string_pretty(reports)
        .map_err(|e| RelayError::Internal(format!("report serialization failed: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| RelayError::Internal(format!("cannot write report: {e}")))?;

    info!("Analysis report written to {}", path.display());
    Ok(())
}

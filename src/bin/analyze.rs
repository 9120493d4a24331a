//! Offline analysis of saved manifest files.
//!
//! Walks a directory of `.m3u8` files, classifies each one and writes a
//! flat JSON report. With `--check`, also probes every referenced
//! stream/segment URL with the lightweight existence check.
//!
//! Usage: `analyze [DIR] [--check] [--referer URL]`
//! Defaults: DIR = `output/m3u8_files`, report = `output/m3u8_analysis_report.json`.

use futures_util::{StreamExt, stream};
use hlsrelay::fetch::{Fetcher, RetryPolicy};
use hlsrelay::report::{ManifestReport, ReportKind, analyze_manifest, write_report};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let check = args.iter().any(|a| a == "--check");
    let referer = args
        .iter()
        .position(|a| a == "--referer")
        .and_then(|i| args.get(i + 1))
        .cloned();
    let dir = args
        .iter()
        .find(|a| !a.starts_with("--") && Some(a.as_str()) != referer.as_deref())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output/m3u8_files"));

    if let Err(e) = run(&dir, check, referer.as_deref()).await {
        error!("Analysis failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(
    dir: &Path,
    check: bool,
    referer: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("directory not found: {}", dir.display()).into());
    }

    let mut reports = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "m3u8"))
        .collect();
    entries.sort();

    if entries.is_empty() {
        warn!("No .m3u8 files found under {}", dir.display());
    }

    for path in &entries {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = std::fs::read_to_string(path)?;

        // Saved files carry no origin; a placeholder base keeps relative
        // entries visible in the report as-is.
        let report = analyze_manifest(&filename, &text, "file:///");
        log_summary(&report);
        reports.push(report);
    }

    if check {
        probe_urls(&reports, referer).await?;
    }

    let report_path = Path::new("output/m3u8_analysis_report.json");
    write_report(report_path, &reports)?;

    info!(
        "Analyzed {} file(s): {} master, {} media, {} invalid",
        reports.len(),
        reports
            .iter()
            .filter(|r| r.kind == ReportKind::MasterPlaylist)
            .count(),
        reports
            .iter()
            .filter(|r| r.kind == ReportKind::MediaPlaylist)
            .count(),
        reports
            .iter()
            .filter(|r| r.kind == ReportKind::Invalid)
            .count(),
    );
    info!("Generated at {}", chrono::Utc::now().to_rfc3339());

    Ok(())
}

fn log_summary(report: &ManifestReport) {
    match report.kind {
        ReportKind::MasterPlaylist => {
            info!("{}: master, {} stream(s)", report.filename, report.streams.len());
        }
        ReportKind::MediaPlaylist => {
            info!(
                "{}: media, {} segment(s), {:.1}s total",
                report.filename, report.segment_count, report.total_duration
            );
        }
        ReportKind::Invalid => warn!("{}: not a valid playlist", report.filename),
    }
}

/// Existence-check every referenced URL with the short probe timeout.
///
/// Probes run a few at a time; a playlist can reference hundreds of
/// segments and sequential HEADs would take minutes.
async fn probe_urls(
    reports: &[ManifestReport],
    referer: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = Fetcher::new(
        Duration::from_secs(30),
        Duration::from_secs(10),
        RetryPolicy::default(),
    )?;

    let urls: Vec<&str> = reports
        .iter()
        .flat_map(|r| {
            r.streams
                .iter()
                .map(|s| s.url.as_str())
                .chain(r.segments.iter().map(|s| s.url.as_str()))
        })
        .filter(|u| u.starts_with("http"))
        .collect();

    stream::iter(urls)
        .for_each_concurrent(8, |url| {
            let fetcher = fetcher.clone();
            async move {
                match fetcher.probe(url, referer).await {
                    Ok(status) if status.is_success() => info!("OK  {}", url),
                    Ok(status) => warn!("{} {}", status.as_u16(), url),
                    Err(e) => warn!("ERR {} ({})", url, e),
                }
            }
        })
        .await;

    Ok(())
}

//! HLS manifest resolver and rewriting relay.
//!
//! Recovers manifest URLs hidden in packed player scripts, classifies and
//! rewrites HLS playlists, and re-serves them through a CORS-friendly local
//! proxy with referrer spoofing.

pub mod config;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod hls;
pub mod report;
pub mod server;

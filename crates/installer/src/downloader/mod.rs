//! Archive fetcher
//!
//! Streams remote files to disk with throttled progress/ETA reporting and
//! fetches small bodies (catalogs, icons) into memory.

pub mod http;
pub mod progress;

pub use http::{parse_url, partial_path, HttpClient, BLOCK_SIZE};
pub use progress::{estimate_eta, DownloadProgress, ProgressCallback, ProgressTracker};

#[cfg(test)]
mod tests;

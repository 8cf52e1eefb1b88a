//! Segmented HTTP/HTTPS download engine: URL parsing and host
//! classification, a hand-rolled HTTP/1.1 client, range-support probing,
//! parallel segment scheduling with retry/resume, progress aggregation, and
//! merge — plus the config/logging/checksum ambient stack around it.
//!
//! The engine is consumed through two seams (spec.md §1): the blocking
//! [`download`] entry point, and the [`progress::ProgressObserver`] trait a
//! caller implements to render progress without the engine ever printing
//! directly.

pub mod body;
pub mod checksum;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch_head;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod segmenter;
pub mod single_stream;
pub mod storage;
pub mod transport;
pub mod url;
pub mod worker;

pub use config::DdmConfig;
pub use download::{download, DownloadOptions, DownloadOutcome, DownloadReport};
pub use error::DownloadError;

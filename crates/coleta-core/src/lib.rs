//! Resilient acquisition pipeline for paginated remote catalogs.
//!
//! The pipeline walks a catalog language by language: fetch a page
//! with retries, extract records, verify each record's asset links,
//! deduplicate, download the assets atomically, and write the record
//! to a listing sink. Site specifics live behind the [`Source`]
//! trait; the network seams ([`Fetch`], [`Probe`], [`Download`]) are
//! traits so tests can run the whole pipeline in memory.

pub mod backoff;
pub mod dedup;
pub mod download;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod pages;
pub mod progress;
pub mod record;
pub mod runner;
pub mod shutdown;
pub mod sink;
pub mod source;
pub mod stats;
pub mod verify;
pub mod work_queue;

pub use backoff::Backoff;
pub use dedup::DedupTracker;
pub use download::{cleanup_partial_files, AssetDownloader, Download, DownloadError};
pub use fetch::{Fetch, FetchError, FetchExhausted, RetryingFetcher};
pub use logging::init_logging;
pub use pages::{ExhaustedPolicy, Pagination, PaginationDriver};
pub use progress::ProgressContext;
pub use record::{AssetKind, DedupKey, Link, LinkStatus, Printable, Record};
pub use runner::{ConfigError, Pipeline, RunConfig};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use sink::{CsvSink, JsonlSink, RecordSink};
pub use source::{ExtractError, Source};
pub use stats::{LanguageOutcome, LanguageStats, RunSummary};
pub use verify::{LinkVerifier, Probe};
pub use work_queue::WorkQueue;

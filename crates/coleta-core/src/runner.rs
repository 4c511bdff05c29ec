//! Orchestration: drives pagination per language, fans each page's
//! records out to a worker pool, and funnels survivors into the sink.
//!
//! Languages are processed sequentially and isolated from each other:
//! an aborted language never stops the next one. Records within one
//! page are processed in parallel.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::backoff::Backoff;
use crate::dedup::DedupTracker;
use crate::download::Download;
use crate::fetch::Fetch;
use crate::pages::{ExhaustedPolicy, Pagination, PaginationDriver};
use crate::progress::ProgressContext;
use crate::record::{AssetKind, Record};
use crate::shutdown::is_shutdown_requested;
use crate::sink::RecordSink;
use crate::source::Source;
use crate::stats::{LanguageOutcome, LanguageStats, RunSummary};
use crate::verify::Probe;
use crate::work_queue::WorkQueue;

/// Invalid run configuration, reported before any network traffic.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    NoLanguages,
    ZeroWorkers,
    ZeroAttempts,
    ZeroTimeout,
    NoPageBound,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoLanguages => write!(f, "no languages selected"),
            ConfigError::ZeroWorkers => write!(f, "worker count must be at least 1"),
            ConfigError::ZeroAttempts => write!(f, "attempt count must be at least 1"),
            ConfigError::ZeroTimeout => write!(f, "timeouts must be non-zero"),
            ConfigError::NoPageBound => {
                write!(f, "bounded pagination needs a page count of at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything a run needs besides the pluggable components.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub languages: Vec<String>,
    pub pagination: Pagination,
    pub exhausted_policy: ExhaustedPolicy,
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub fetch_timeout: Duration,
    pub verify_timeout: Duration,
    pub download_timeout: Duration,
    pub workers: usize,
    pub output_root: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            pagination: Pagination::Auto { start: 1 },
            exhausted_policy: ExhaustedPolicy::SkipPage,
            max_attempts: 5,
            backoff: Backoff::default(),
            fetch_timeout: Duration::from_secs(30),
            verify_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(30),
            workers: 4,
            output_root: PathBuf::from("."),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.fetch_timeout.is_zero()
            || self.verify_timeout.is_zero()
            || self.download_timeout.is_zero()
        {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Pagination::Bounded { total_pages: 0, .. } = self.pagination {
            return Err(ConfigError::NoPageBound);
        }
        Ok(())
    }
}

/// Shared counters the worker pool updates while a page is in flight.
#[derive(Default)]
struct PageCounters {
    dedup_skipped: AtomicUsize,
    assets_downloaded: AtomicUsize,
    assets_failed: AtomicUsize,
}

/// One run of the acquisition pipeline over a single source.
pub struct Pipeline<'a> {
    source: &'a dyn Source,
    fetcher: &'a dyn Fetch,
    verifier: &'a dyn Probe,
    downloader: &'a dyn Download,
    dedup: &'a DedupTracker,
    config: RunConfig,
}

impl<'a> Pipeline<'a> {
    /// The tracker is caller-owned so reruns (or several sources in
    /// one process) can share dedup membership.
    pub fn new(
        source: &'a dyn Source,
        fetcher: &'a dyn Fetch,
        verifier: &'a dyn Probe,
        downloader: &'a dyn Download,
        dedup: &'a DedupTracker,
        config: RunConfig,
    ) -> Self {
        Self {
            source,
            fetcher,
            verifier,
            downloader,
            dedup,
            config,
        }
    }

    /// Run every configured language to completion, write surviving
    /// records to `sink`, and finalize it. Sink I/O errors abort the
    /// run; per-page and per-asset failures only show up in the
    /// summary.
    pub fn run(
        &self,
        sink: &mut dyn RecordSink,
        progress: &ProgressContext,
    ) -> io::Result<RunSummary> {
        let mut summary = RunSummary::default();

        for language in &self.config.languages {
            // every configured language gets a summary row, even ones
            // a shutdown request kept from starting
            if is_shutdown_requested() {
                let mut stats = LanguageStats::new(language);
                stats.outcome = LanguageOutcome::Interrupted;
                summary.push(stats);
                continue;
            }
            let stats = self.run_language(language, sink, progress)?;
            stats.log();
            summary.push(stats);
        }

        sink.finalize()?;
        Ok(summary)
    }

    fn run_language(
        &self,
        language: &str,
        sink: &mut dyn RecordSink,
        progress: &ProgressContext,
    ) -> io::Result<LanguageStats> {
        let start = Instant::now();
        let mut stats = LanguageStats::new(language);
        let mut driver = PaginationDriver::new(self.config.pagination);
        let pb = progress.language_line(language);

        while let Some(page) = driver.next_page() {
            if is_shutdown_requested() {
                stats.outcome = LanguageOutcome::Interrupted;
                break;
            }
            pb.set_message(format!(
                "page {page}: {} records so far",
                stats.records_written
            ));

            let url = self.source.page_url(language, page);
            let payload = match self.fetcher.fetch(&url) {
                Ok(payload) => payload,
                Err(err) => {
                    stats.pages_failed += 1;
                    log::error!("{language} page {page}: {err}");
                    // Auto mode has no page count to skip within
                    if driver.is_auto()
                        || self.config.exhausted_policy == ExhaustedPolicy::AbortLanguage
                    {
                        stats.outcome = LanguageOutcome::Aborted;
                        driver.terminate();
                        break;
                    }
                    continue;
                }
            };
            stats.pages_fetched += 1;

            let records = match self.source.extract(&payload, language) {
                Ok(records) => records,
                Err(err) => {
                    stats.parse_errors += 1;
                    log::warn!("{language} page {page}: {err}");
                    driver.record_yield(0);
                    continue;
                }
            };
            driver.record_yield(records.len());
            stats.records_extracted += records.len();
            if records.is_empty() {
                continue;
            }

            let written = self.process_page(language, records, &mut stats, sink)?;
            stats.records_written += written;
        }

        if stats.outcome == LanguageOutcome::Completed && is_shutdown_requested() {
            stats.outcome = LanguageOutcome::Interrupted;
        }
        stats.elapsed = start.elapsed();
        pb.finish_and_clear();
        Ok(stats)
    }

    /// Verify, claim, and download one page's records in parallel,
    /// then write the survivors to the sink in extraction order.
    fn process_page(
        &self,
        language: &str,
        records: Vec<Record>,
        stats: &mut LanguageStats,
        sink: &mut dyn RecordSink,
    ) -> io::Result<usize> {
        let indexed: Vec<(usize, Record)> = records.into_iter().enumerate().collect();
        let queue = WorkQueue::new(indexed);
        let counters = PageCounters::default();
        let done: Mutex<Vec<(usize, Record)>> = Mutex::new(Vec::with_capacity(queue.total()));

        rayon::scope(|s| {
            for _ in 0..self.config.workers.min(queue.total()) {
                s.spawn(|_| {
                    while let Some((idx, record)) = queue.next() {
                        if is_shutdown_requested() {
                            break;
                        }
                        if let Some(processed) = self.process_record(language, record, &counters) {
                            done.lock().expect("results lock poisoned").push((*idx, processed));
                        }
                    }
                });
            }
        });

        stats.dedup_skipped += counters.dedup_skipped.load(Ordering::Relaxed);
        stats.assets_downloaded += counters.assets_downloaded.load(Ordering::Relaxed);
        stats.assets_failed += counters.assets_failed.load(Ordering::Relaxed);

        let mut done = done.into_inner().expect("results lock poisoned");
        done.sort_unstable_by_key(|(idx, _)| *idx);
        let written = done.len();
        for (_, record) in &done {
            sink.write(record)?;
        }
        Ok(written)
    }

    /// Returns the processed record to persist, or `None` when it was
    /// a duplicate or every one of its downloads failed.
    fn process_record(
        &self,
        language: &str,
        record: &Record,
        counters: &PageCounters,
    ) -> Option<Record> {
        let key = record.dedup_key();
        if !self.dedup.claim(&key) {
            counters.dedup_skipped.fetch_add(1, Ordering::Relaxed);
            log::debug!("{language}: skipping duplicate {:?}", record.identity());
            return None;
        }

        let mut record = record.clone();
        for link in record.links.values_mut() {
            link.status = self.verifier.probe(&link.url);
        }

        let mut attempted = 0usize;
        let mut downloaded = 0usize;
        for (kind, link) in &record.links {
            if !kind.is_downloadable() || !link.is_available() {
                continue;
            }
            attempted += 1;
            let dest = self.asset_dest(language, &record, *kind);
            match self.downloader.download(&link.url, &dest) {
                Ok(bytes) => {
                    downloaded += 1;
                    counters.assets_downloaded.fetch_add(1, Ordering::Relaxed);
                    log::debug!("{language}: {} ({bytes} bytes)", dest.display());
                }
                Err(err) => {
                    counters.assets_failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{language}: {} failed: {err}", link.url);
                }
            }
        }

        // A record whose every download failed stays unclaimed so a
        // later occurrence can retry it.
        if attempted > 0 && downloaded == 0 {
            self.dedup.release(&key);
            return None;
        }
        Some(record)
    }

    fn asset_dest(&self, language: &str, record: &Record, kind: AssetKind) -> PathBuf {
        self.config
            .output_root
            .join(format!("{}_{}", self.source.name(), language.to_lowercase()))
            .join(kind.dir_name())
            .join(format!("{}.{}", record.file_stem(), kind.extension()))
    }
}

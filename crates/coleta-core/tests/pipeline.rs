//! End-to-end pipeline runs against in-memory components.
//!
//! A scripted fetcher serves canned page payloads, the test source
//! extracts comma-separated codes, and the downloader just records
//! which URLs it was asked for. No sockets anywhere.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use coleta_core::{
    AssetKind, Backoff, DedupTracker, Download, DownloadError, ExhaustedPolicy, ExtractError,
    Fetch, FetchError, FetchExhausted, Link, LinkStatus, Pagination, Pipeline, Printable, Probe,
    ProgressContext, Record, RecordSink, RunConfig, Source,
};

struct TestSource;

impl Source for TestSource {
    fn name(&self) -> &str {
        "testcat"
    }

    fn page_url(&self, language: &str, page: u32) -> String {
        format!("http://cat.test/{language}/{page}")
    }

    fn extract(&self, payload: &str, language: &str) -> Result<Vec<Record>, ExtractError> {
        if payload == "garbage" {
            return Err(ExtractError::new("not a listing"));
        }
        Ok(payload
            .split(',')
            .filter(|code| !code.is_empty())
            .map(|code| {
                let mut links = BTreeMap::new();
                links.insert(
                    AssetKind::Pdf,
                    Link::new(format!("http://cat.test/dl/{code}.pdf")),
                );
                links.insert(
                    AssetKind::Original,
                    Link::new(format!("http://cat.test/item/{code}")),
                );
                Record {
                    code: Some(code.to_string()),
                    title: format!("Title {code}"),
                    author: "Test Author".to_string(),
                    description: String::new(),
                    price: "0.00".to_string(),
                    printable: Printable::Unknown,
                    language: language.to_string(),
                    links,
                }
            })
            .collect())
    }
}

/// Serves canned payloads per URL; any unscripted URL is exhausted.
struct ScriptedFetcher {
    pages: HashMap<String, String>,
}

impl ScriptedFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
        }
    }
}

impl Fetch for ScriptedFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchExhausted> {
        self.pages.get(url).cloned().ok_or_else(|| FetchExhausted {
            url: url.to_string(),
            attempts: 5,
            last: FetchError::Http {
                status: Some(503),
                message: "scripted failure".to_string(),
            },
        })
    }
}

struct AlwaysAvailable;

impl Probe for AlwaysAvailable {
    fn probe(&self, _url: &str) -> LinkStatus {
        LinkStatus::Available
    }
}

/// Records download requests; URLs in `failing` report an error.
#[derive(Default)]
struct MemDownloader {
    downloaded: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl Download for MemDownloader {
    fn download(&self, url: &str, _dest: &Path) -> Result<u64, DownloadError> {
        if self.failing.contains(url) {
            return Err(DownloadError::Io(io::Error::other("scripted failure")));
        }
        self.downloaded
            .lock()
            .expect("downloads lock poisoned")
            .push(url.to_string());
        Ok(1024)
    }
}

#[derive(Default)]
struct MemSink {
    records: Vec<Record>,
    finalized: bool,
}

impl RecordSink for MemSink {
    fn write(&mut self, record: &Record) -> io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.finalized = true;
        Ok(())
    }
}

fn config(languages: &[&str], pagination: Pagination, policy: ExhaustedPolicy) -> RunConfig {
    RunConfig {
        languages: languages.iter().map(|l| l.to_string()).collect(),
        pagination,
        exhausted_policy: policy,
        max_attempts: 1,
        backoff: Backoff::Fixed(Duration::ZERO),
        workers: 2,
        output_root: std::env::temp_dir().join("coleta-pipeline-test"),
        ..RunConfig::default()
    }
}

#[test]
fn auto_mode_stops_at_first_empty_page() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A,B"),
        ("http://cat.test/EN/2", "C"),
        ("http://cat.test/EN/3", ""),
        ("http://cat.test/EN/4", "D"),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(&["EN"], Pagination::Auto { start: 1 }, ExhaustedPolicy::SkipPage),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    // page 4 exists but must never be requested
    assert_eq!(summary.languages.len(), 1);
    assert_eq!(summary.languages[0].pages_fetched, 3);
    assert_eq!(summary.languages[0].records_written, 3);
    assert_eq!(sink.records.len(), 3);
    assert!(sink.finalized);
    let codes: Vec<_> = sink.records.iter().filter_map(|r| r.code.clone()).collect();
    assert_eq!(codes, ["A", "B", "C"]);
}

#[test]
fn aborted_language_does_not_stop_the_next_one() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A"),
        // EN page 2 missing
        ("http://cat.test/PT/1", "P"),
        ("http://cat.test/PT/2", "Q"),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(
            &["EN", "PT"],
            Pagination::Bounded {
                start: 1,
                total_pages: 2,
            },
            ExhaustedPolicy::AbortLanguage,
        ),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    assert_eq!(summary.languages[0].outcome.as_str(), "aborted");
    assert_eq!(summary.languages[0].records_written, 1);
    assert_eq!(summary.languages[1].outcome.as_str(), "completed");
    assert_eq!(summary.languages[1].records_written, 2);
    assert!(summary.has_failures());
}

#[test]
fn skip_page_policy_continues_past_a_dead_page() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A"),
        // EN page 2 missing
        ("http://cat.test/EN/3", "B"),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(
            &["EN"],
            Pagination::Bounded {
                start: 1,
                total_pages: 3,
            },
            ExhaustedPolicy::SkipPage,
        ),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    let stats = &summary.languages[0];
    assert_eq!(stats.outcome.as_str(), "completed");
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.pages_failed, 1);
    assert_eq!(stats.records_written, 2);
}

#[test]
fn duplicate_records_download_once() {
    // code A appears on both pages
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A,B"),
        ("http://cat.test/EN/2", "A,C"),
        ("http://cat.test/EN/3", ""),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(&["EN"], Pagination::Auto { start: 1 }, ExhaustedPolicy::SkipPage),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    assert_eq!(summary.languages[0].dedup_skipped, 1);
    assert_eq!(summary.languages[0].records_extracted, 4);
    assert_eq!(summary.languages[0].records_written, 3);

    let downloads = downloader.downloaded.lock().unwrap();
    let a_count = downloads
        .iter()
        .filter(|u| u.ends_with("/A.pdf"))
        .count();
    assert_eq!(a_count, 1);
    assert_eq!(downloads.len(), 3);
}

#[test]
fn same_code_in_two_languages_downloads_twice() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A"),
        ("http://cat.test/EN/2", ""),
        ("http://cat.test/ES/1", "A"),
        ("http://cat.test/ES/2", ""),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(
            &["EN", "ES"],
            Pagination::Auto { start: 1 },
            ExhaustedPolicy::SkipPage,
        ),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    assert_eq!(summary.total_records(), 2);
    assert_eq!(downloader.downloaded.lock().unwrap().len(), 2);
}

#[test]
fn record_with_all_downloads_failed_is_retried_on_next_sighting() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A"),
        ("http://cat.test/EN/2", "A"),
        ("http://cat.test/EN/3", ""),
    ]);
    let downloader = MemDownloader {
        downloaded: Mutex::new(Vec::new()),
        failing: HashSet::from(["http://cat.test/dl/A.pdf".to_string()]),
    };
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(&["EN"], Pagination::Auto { start: 1 }, ExhaustedPolicy::SkipPage),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    // both sightings attempted the download, neither was deduplicated
    // away, and the failed record never reached the sink
    let stats = &summary.languages[0];
    assert_eq!(stats.assets_failed, 2);
    assert_eq!(stats.dedup_skipped, 0);
    assert_eq!(stats.records_written, 0);
    assert!(sink.records.is_empty());
}

#[test]
fn unparseable_page_terminates_auto_mode() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A"),
        ("http://cat.test/EN/2", "garbage"),
        ("http://cat.test/EN/3", "B"),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &AlwaysAvailable,
        &downloader,
        &dedup,
        config(&["EN"], Pagination::Auto { start: 1 }, ExhaustedPolicy::SkipPage),
    );

    let mut sink = MemSink::default();
    let summary = pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    let stats = &summary.languages[0];
    assert_eq!(stats.parse_errors, 1);
    assert_eq!(stats.records_written, 1);
    // page 3 never requested once the yield signal is lost
    assert_eq!(stats.pages_fetched, 2);
}

#[test]
fn verifier_unavailable_links_are_not_downloaded() {
    struct PdfOnlyProbe;
    impl Probe for PdfOnlyProbe {
        fn probe(&self, url: &str) -> LinkStatus {
            if url.ends_with(".pdf") {
                LinkStatus::Available
            } else {
                LinkStatus::Unavailable
            }
        }
    }

    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A"),
        ("http://cat.test/EN/2", ""),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let pipeline = Pipeline::new(
        &TestSource,
        &fetcher,
        &PdfOnlyProbe,
        &downloader,
        &dedup,
        config(&["EN"], Pagination::Auto { start: 1 }, ExhaustedPolicy::SkipPage),
    );

    let mut sink = MemSink::default();
    pipeline.run(&mut sink, &ProgressContext::new()).unwrap();

    let record = &sink.records[0];
    assert!(record.available_url(AssetKind::Pdf).is_some());
    assert!(record.available_url(AssetKind::Original).is_none());
    assert_eq!(downloader.downloaded.lock().unwrap().len(), 1);
}

#[test]
fn rerun_with_shared_tracker_downloads_nothing_new() {
    let fetcher = ScriptedFetcher::new(&[
        ("http://cat.test/EN/1", "A,B"),
        ("http://cat.test/EN/2", ""),
    ]);
    let downloader = MemDownloader::default();
    let dedup = DedupTracker::new();
    let cfg = config(&["EN"], Pagination::Auto { start: 1 }, ExhaustedPolicy::SkipPage);

    for _ in 0..2 {
        let pipeline = Pipeline::new(
            &TestSource,
            &fetcher,
            &AlwaysAvailable,
            &downloader,
            &dedup,
            cfg.clone(),
        );
        let mut sink = MemSink::default();
        pipeline.run(&mut sink, &ProgressContext::new()).unwrap();
    }

    assert_eq!(dedup.len(), 2);
    assert_eq!(downloader.downloaded.lock().unwrap().len(), 2);
}

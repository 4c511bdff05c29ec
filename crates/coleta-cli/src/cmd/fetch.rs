//! Fetch subcommand - run the acquisition pipeline against a catalog

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use coleta_chapel::ChapelLibrary;
use coleta_core::{
    cleanup_partial_files, AssetDownloader, CsvSink, DedupTracker, ExhaustedPolicy, JsonlSink,
    LinkVerifier, Pagination, Pipeline, ProgressContext, RecordSink, RetryingFetcher, RunConfig,
    Source,
};

use crate::config::{Config, ListingFormat};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Languages to collect (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Total page count; omit to paginate until an empty page
    #[arg(short = 'p', long)]
    pub pages: Option<u32>,

    /// First page to request
    #[arg(long)]
    pub page_start: Option<u32>,

    /// Abort a language when a page's retries are exhausted
    #[arg(long)]
    pub abort_on_failed_page: bool,

    /// Output directory root
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Listing format
    #[arg(short, long, value_enum)]
    pub format: Option<ListingFormat>,

    /// Number of parallel workers per page
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum fetch attempts per page
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Catalog base URL override
    #[arg(long)]
    pub base_url: Option<String>,
}

pub fn run(args: FetchArgs, config: &Config, progress: &ProgressContext) -> Result<ExitCode> {
    let run_config = build_run_config(&args, config);
    run_config
        .validate()
        .context("invalid run configuration")?;

    let source = match args.base_url.as_deref().or(config.source.base_url.as_deref()) {
        Some(base) => ChapelLibrary::with_base_url(base),
        None => ChapelLibrary::new(),
    };

    let fetcher = RetryingFetcher::new(
        run_config.fetch_timeout,
        run_config.max_attempts,
        run_config.backoff,
    );
    let mut verifier = LinkVerifier::new(run_config.verify_timeout);
    if let Some(prefix) = &config.http.verify_content_type {
        verifier = verifier.expecting_content_type(prefix);
    }
    let downloader = AssetDownloader::new(run_config.download_timeout);
    let dedup = DedupTracker::new();

    cleanup_partial_files(&run_config.output_root)
        .context("failed to clean up stale partial files")?;

    let format = args.format.unwrap_or(config.output.format);
    let listing_path = run_config
        .output_root
        .join(format!("{}_books.{}", source.name(), format.extension()));
    let mut sink: Box<dyn RecordSink> = match format {
        ListingFormat::Csv => Box::new(
            CsvSink::new(&listing_path)
                .with_context(|| format!("failed to open {}", listing_path.display()))?,
        ),
        ListingFormat::Jsonl => Box::new(
            JsonlSink::new(&listing_path)
                .with_context(|| format!("failed to open {}", listing_path.display()))?,
        ),
    };

    log::info!(
        "Collecting {} languages into {}",
        run_config.languages.len(),
        run_config.output_root.display()
    );

    let pipeline = Pipeline::new(&source, &fetcher, &verifier, &downloader, &dedup, run_config);
    let summary = pipeline
        .run(sink.as_mut(), progress)
        .context("pipeline run failed")?;

    if progress.is_tty() {
        summary.print();
    } else {
        summary.log();
    }
    log::info!("Listing written to {}", listing_path.display());

    if summary.was_interrupted() {
        return Ok(ExitCode::from(130));
    }
    // individual unreachable assets never fail the run
    if summary.has_aborted_language() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn build_run_config(args: &FetchArgs, config: &Config) -> RunConfig {
    let page_start = args.page_start.unwrap_or(config.run.page_start);
    let pagination = match args.pages.or(config.run.total_pages) {
        Some(total_pages) => Pagination::Bounded {
            start: page_start,
            total_pages,
        },
        None => Pagination::Auto { start: page_start },
    };

    let abort = args.abort_on_failed_page || config.run.abort_on_failed_page;

    RunConfig {
        languages: args
            .languages
            .clone()
            .unwrap_or_else(|| config.run.languages.clone()),
        pagination,
        exhausted_policy: if abort {
            ExhaustedPolicy::AbortLanguage
        } else {
            ExhaustedPolicy::SkipPage
        },
        max_attempts: args.max_attempts.unwrap_or(config.run.max_attempts),
        backoff: config.backoff(),
        fetch_timeout: Duration::from_secs(config.http.fetch_timeout),
        verify_timeout: Duration::from_secs(config.http.verify_timeout),
        download_timeout: Duration::from_secs(config.http.download_timeout),
        workers: args.workers.unwrap_or(config.run.workers),
        output_root: args
            .output
            .clone()
            .unwrap_or_else(|| config.output.root.clone()),
    }
}

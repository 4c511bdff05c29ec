//! coleta - resilient catalog acquisition for digital book libraries
//!
//! Walks a paginated catalog API language by language, verifies each
//! book's asset links, downloads PDFs and EPUBs, and writes a listing
//! file.

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use coleta_core::shutdown_flag;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "coleta")]
#[command(about = "Resilient catalog acquisition for digital book libraries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./coleta.toml or ~/.config/coleta/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Collect a catalog: fetch pages, verify links, download assets
    Fetch(cmd::fetch::FetchArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(coleta_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress bars show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    coleta_core::init_logging(quiet, cli.debug, multi);

    setup_signal_handler();

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config, &progress),
        Command::Config => {
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{
        modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Languages", &config.run.languages.join(", ")]);
    table.add_row(vec![
        "Pagination",
        &match config.run.total_pages {
            Some(n) => format!("bounded, {n} pages from {}", config.run.page_start),
            None => format!("auto from {}", config.run.page_start),
        },
    ]);
    table.add_row(vec![
        "On failed page",
        if config.run.abort_on_failed_page {
            "abort language"
        } else {
            "skip page"
        },
    ]);
    table.add_row(vec!["Max attempts", &config.run.max_attempts.to_string()]);
    table.add_row(vec![
        "Backoff",
        &format!("{:?}, {}s", config.run.backoff, config.run.backoff_secs),
    ]);
    table.add_row(vec![
        "Timeouts",
        &format!(
            "fetch {}s, verify {}s, download {}s",
            config.http.fetch_timeout, config.http.verify_timeout, config.http.download_timeout
        ),
    ]);
    table.add_row(vec!["Workers", &config.run.workers.to_string()]);
    table.add_row(vec![
        "Output root",
        &config.output.root.display().to_string(),
    ]);
    table.add_row(vec![
        "Listing format",
        config.output.format.extension(),
    ]);
    table.add_row(vec![
        "Base URL",
        config.source.base_url.as_deref().unwrap_or("default"),
    ]);

    eprintln!("\n{table}");
}

fn setup_signal_handler() {
    // First signal: set graceful shutdown flag
    // Second signal: force exit (default SIGINT behavior restored)
    // SAFETY: AtomicBool::store and process::exit are async-signal-safe
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGTERM, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .expect("Failed to register SIGTERM handler");
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .expect("Failed to register SIGINT handler");
    }
}

//! Per-language counters and the end-of-run summary table.

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, Table};

/// How a language's page sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageOutcome {
    /// All pages processed (or auto mode hit an empty page).
    Completed,
    /// A page failed under the abort policy, or extraction never recovered.
    Aborted,
    /// Shutdown was requested mid-language.
    Interrupted,
}

impl LanguageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageOutcome::Completed => "completed",
            LanguageOutcome::Aborted => "aborted",
            LanguageOutcome::Interrupted => "interrupted",
        }
    }
}

/// Counters for one language's pass through the pipeline.
#[derive(Debug, Clone)]
pub struct LanguageStats {
    pub language: String,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub parse_errors: usize,
    pub records_extracted: usize,
    pub dedup_skipped: usize,
    pub assets_downloaded: usize,
    pub assets_failed: usize,
    pub records_written: usize,
    pub outcome: LanguageOutcome,
    pub elapsed: Duration,
}

impl LanguageStats {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            pages_fetched: 0,
            pages_failed: 0,
            parse_errors: 0,
            records_extracted: 0,
            dedup_skipped: 0,
            assets_downloaded: 0,
            assets_failed: 0,
            records_written: 0,
            outcome: LanguageOutcome::Completed,
            elapsed: Duration::ZERO,
        }
    }

    pub fn log(&self) {
        log::info!(
            "{}: {}, {} pages ({} failed), {} of {} extracted records written ({} duplicates skipped), {} assets ({} failed) in {:.1}s",
            self.language,
            self.outcome.as_str(),
            self.pages_fetched,
            self.pages_failed,
            self.records_written,
            self.records_extracted,
            self.dedup_skipped,
            self.assets_downloaded,
            self.assets_failed,
            self.elapsed.as_secs_f64(),
        );
    }
}

/// Aggregated outcome of a full run, one row per language.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub languages: Vec<LanguageStats>,
}

impl RunSummary {
    pub fn push(&mut self, stats: LanguageStats) {
        self.languages.push(stats);
    }

    pub fn total_records(&self) -> usize {
        self.languages.iter().map(|s| s.records_written).sum()
    }

    pub fn total_assets(&self) -> usize {
        self.languages.iter().map(|s| s.assets_downloaded).sum()
    }

    /// Any language aborted, or any page/asset failure anywhere.
    pub fn has_failures(&self) -> bool {
        self.languages.iter().any(|s| {
            s.outcome == LanguageOutcome::Aborted || s.pages_failed > 0 || s.assets_failed > 0
        })
    }

    /// Whether any language ended in `Aborted`. Individual page and
    /// asset failures do not count; they are reported but never fail
    /// the run.
    pub fn has_aborted_language(&self) -> bool {
        self.languages
            .iter()
            .any(|s| s.outcome == LanguageOutcome::Aborted)
    }

    pub fn was_interrupted(&self) -> bool {
        self.languages
            .iter()
            .any(|s| s.outcome == LanguageOutcome::Interrupted)
    }

    fn format_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            "language", "outcome", "pages", "failed", "records", "dupes", "assets", "failed",
            "elapsed",
        ]);
        for s in &self.languages {
            table.add_row(vec![
                Cell::new(&s.language),
                Cell::new(s.outcome.as_str()),
                Cell::new(s.pages_fetched).set_alignment(CellAlignment::Right),
                Cell::new(s.pages_failed).set_alignment(CellAlignment::Right),
                Cell::new(s.records_written).set_alignment(CellAlignment::Right),
                Cell::new(s.dedup_skipped).set_alignment(CellAlignment::Right),
                Cell::new(s.assets_downloaded).set_alignment(CellAlignment::Right),
                Cell::new(s.assets_failed).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}s", s.elapsed.as_secs_f64()))
                    .set_alignment(CellAlignment::Right),
            ]);
        }
        table
    }

    /// Print the summary table to stdout (TTY sessions).
    pub fn print(&self) {
        println!("{}", self.format_table());
        println!(
            "total: {} records, {} assets",
            self.total_records(),
            self.total_assets()
        );
    }

    /// Log the summary line by line (non-TTY sessions).
    pub fn log(&self) {
        for s in &self.languages {
            s.log();
        }
        log::info!(
            "total: {} records, {} assets",
            self.total_records(),
            self.total_assets()
        );
    }
}

//! CSV and JSONL listing writers with atomic publish.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::record::{AssetKind, Record};

/// Destination for processed records. Implementations persist one
/// record per call; the directory layout and column choice are theirs.
pub trait RecordSink: Send {
    fn write(&mut self, record: &Record) -> io::Result<()>;

    /// Flush and publish the listing. Nothing is visible at the final
    /// path until this returns.
    fn finalize(&mut self) -> io::Result<()>;
}

fn open_partial(final_path: &Path) -> io::Result<(BufWriter<File>, PathBuf)> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut name = final_path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    let tmp_path = final_path.with_file_name(name);
    if tmp_path.exists() {
        fs::remove_file(&tmp_path)?;
    }
    Ok((BufWriter::new(File::create(&tmp_path)?), tmp_path))
}

/// Quote a CSV field, doubling embedded quotes. Descriptions keep
/// their newlines; quoting makes them valid inside one cell.
fn csv_escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// One row per record, link columns filled only for verified links.
pub struct CsvSink {
    out: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    rows: usize,
}

impl CsvSink {
    const HEADER: &'static str =
        "code,title,author,language,price,printable,pdf,epub,original,description";

    pub fn new(final_path: impl Into<PathBuf>) -> io::Result<Self> {
        let final_path = final_path.into();
        let (mut out, tmp_path) = open_partial(&final_path)?;
        writeln!(out, "{}", Self::HEADER)?;
        Ok(Self {
            out,
            tmp_path,
            final_path,
            rows: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl RecordSink for CsvSink {
    fn write(&mut self, record: &Record) -> io::Result<()> {
        let link = |kind| record.available_url(kind).unwrap_or_default();
        let fields = [
            record.code.as_deref().unwrap_or_default(),
            record.title.as_str(),
            record.author.as_str(),
            record.language.as_str(),
            record.price.as_str(),
            record.printable.as_str(),
            link(AssetKind::Pdf),
            link(AssetKind::Epub),
            link(AssetKind::Original),
            record.description.as_str(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        writeln!(self.out, "{}", row.join(","))?;
        self.rows += 1;
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.out.flush()?;
        fs::rename(&self.tmp_path, &self.final_path)
    }
}

/// One JSON object per line, the record serialized as-is.
pub struct JsonlSink {
    out: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    rows: usize,
}

impl JsonlSink {
    pub fn new(final_path: impl Into<PathBuf>) -> io::Result<Self> {
        let final_path = final_path.into();
        let (out, tmp_path) = open_partial(&final_path)?;
        Ok(Self {
            out,
            tmp_path,
            final_path,
            rows: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl RecordSink for JsonlSink {
    fn write(&mut self, record: &Record) -> io::Result<()> {
        let line = serde_json::to_string(record).map_err(io::Error::other)?;
        writeln!(self.out, "{line}")?;
        self.rows += 1;
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.out.flush()?;
        fs::rename(&self.tmp_path, &self.final_path)
    }
}

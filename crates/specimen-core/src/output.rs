//! Report output in JSON or JSONL.
//!
//! A report is a stream of [`ReportRecord`]s: one per processed image and a
//! closing batch summary.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{self, Read, Write};

use crate::types::{BatchReport, ProcessedImage};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One line (or array element) of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportRecord {
    Image(ProcessedImage),
    Summary(BatchReport),
}

/// A writer that serializes records as a JSON array or as JSON Lines.
///
/// JSONL records are written as they arrive; JSON records are buffered until
/// [`ReportWriter::finish`] so they can be emitted as one array.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<ReportRecord>,
    items_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Create a new report writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always one object per line.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            items_written: 0,
        }
    }

    /// Write a single record.
    pub fn write(&mut self, record: ReportRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.pending.push(record),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, &record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Get the number of records written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Emit any buffered records and flush the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json {
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &self.pending)
                    .map_err(io::Error::other)?;
            } else {
                serde_json::to_writer(&mut self.writer, &self.pending).map_err(io::Error::other)?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Collect the source hashes of every image record in an existing report.
///
/// Accepts both formats: a JSON array, or JSON Lines where lines that aren't
/// image records (summaries, blank or malformed lines) are skipped.
pub fn read_source_hashes<R: Read>(mut reader: R) -> io::Result<HashSet<String>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    if content.trim_start().starts_with('[') {
        let records: Vec<ReportRecord> =
            serde_json::from_str(&content).map_err(io::Error::other)?;
        return Ok(records
            .into_iter()
            .filter_map(|record| match record {
                ReportRecord::Image(image) => Some(image.source_hash),
                ReportRecord::Summary(_) => None,
            })
            .collect());
    }

    let mut hashes = HashSet::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(ReportRecord::Image(image)) = serde_json::from_str::<ReportRecord>(line) {
            hashes.insert(image.source_hash);
        }
    }
    Ok(hashes)
}

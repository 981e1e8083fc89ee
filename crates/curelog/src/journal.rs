//! Date-sectioned journal model.
//!
//! A journal file is a sequence of Markdown sections, each headed by a line
//! like `### 2023-04-10` (or `####`). This module splits raw journals into
//! [`Section`]s, reassembles curated output in date order, and provides the
//! filename-based date coverage check used by the `coverage` subcommand.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;

/// One dated section of a journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// ISO date from the header line (`YYYY-MM-DD`).
    pub date: String,
    /// The full header line, including the `###` prefix.
    pub header: String,
    /// Everything between this header and the next, trimmed.
    pub body: String,
}

impl Section {
    /// The section as it appears in the source file (header plus body).
    pub fn text(&self) -> String {
        format!("{}\n{}", self.header, self.body)
    }
}

/// Extract the ISO date from a section header line, if it is one.
///
/// A header line starts with `###` or `####` followed by a valid
/// `YYYY-MM-DD` date. Any trailing text after the date is allowed, including
/// punctuation that touches it (`### 2023-04-10: follow-up visit`), so only
/// the first ten characters after the marker are parsed as the date. Dates
/// are validated with [`chrono`], so `2023-02-30` is not a header.
pub fn header_date(line: &str) -> Option<String> {
    let rest = line
        .strip_prefix("####")
        .or_else(|| line.strip_prefix("###"))?;
    if !rest.starts_with(' ') {
        return None;
    }
    let candidate: String = rest.trim_start().chars().take(10).collect();
    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").ok()?;
    Some(candidate)
}

/// Split a journal file into dated sections.
///
/// Content before the first date header is ignored, matching the section
/// capture of the original curation flow. Sections whose body is empty are
/// skipped — there is nothing to format.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<(String, String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(date) = header_date(line) {
            if let Some(section) = finish_section(current.take()) {
                sections.push(section);
            }
            current = Some((date, line.to_string(), Vec::new()));
        } else if let Some((_, _, ref mut body)) = current {
            body.push(line);
        }
    }
    if let Some(section) = finish_section(current) {
        sections.push(section);
    }
    sections
}

fn finish_section(state: Option<(String, String, Vec<&str>)>) -> Option<Section> {
    let (date, header, body_lines) = state?;
    let body = body_lines.join("\n").trim().to_string();
    if body.is_empty() {
        return None;
    }
    Some(Section { date, header, body })
}

/// Assemble the curated log from per-section results, most recent date first.
///
/// Sorts `entries` in place (stable, so several sections for one date keep
/// their input order) and returns the joined text.
pub fn merge_curated(entries: &mut [(String, String)]) -> String {
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    entries
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collect the ISO dates that prefix filenames in a directory.
///
/// A file like `2023-04-10 ferritin panel.pdf` or `journal_2023-04-10.raw.md`
/// counts for `2023-04-10` only when the date starts the filename; the cache
/// file layout is handled by its own lookup, not this scan.
pub fn dates_in_dir(dir: &Path) -> Result<BTreeSet<String>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("failed to read directory '{}': {e}", dir.display()))?;

    let mut dates = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read directory entry: {e}"))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let candidate: String = name.chars().take(10).collect();
        if NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").is_ok() {
            dates.insert(candidate);
        }
    }
    Ok(dates)
}

/// Dates present in `source` but absent from `curated`, in ascending order.
pub fn missing_dates(curated: &BTreeSet<String>, source: &BTreeSet<String>) -> Vec<String> {
    source.difference(curated).cloned().collect()
}

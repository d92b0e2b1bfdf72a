//! Tabular reader: turns delimited text into a header and raw rows.
//!
//! The whole input is drained into memory up front. Grouping needs lookahead
//! and lookback, and exports are at most tens of thousands of rows.

use crate::error::{ImportError, Result};
use csv::{ReaderBuilder, Trim};
use std::io::Read;

const BOM: char = '\u{feff}';

/// Delimiters considered when sniffing a header line.
const SNIFFED_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// One data row as it appeared in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the input.
    pub line: usize,
    pub fields: Vec<String>,
    /// Original text of the row, for diagnostics.
    pub raw: String,
}

impl RawRow {
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// A header plus every non-blank data row below it.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub delimiter: u8,
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Reads the whole input into a string, dropping a leading byte order mark.
pub fn read_text<R: Read>(mut reader: R) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes)?;
    Ok(match text.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Locates the first non-blank line; returns its byte offset and content.
pub fn header_line(text: &str) -> Option<(usize, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(|c| c == '\r' || c == '\n');
        if !content.trim().is_empty() {
            return Some((offset, content));
        }
        offset += line.len();
    }
    None
}

/// Candidate delimiters in priority order: `;`, then `,`, then whatever
/// sniffing the header suggests. An explicit delimiter is the only candidate.
pub fn delimiter_candidates(header: &str, explicit: Option<u8>) -> Vec<u8> {
    if let Some(d) = explicit {
        return vec![d];
    }
    let mut candidates = vec![b';', b','];
    let sniffed = sniff_delimiter(header);
    if !candidates.contains(&sniffed) {
        candidates.push(sniffed);
    }
    candidates
}

/// Picks the delimiter occurring most often outside quotes.
pub fn sniff_delimiter(header: &str) -> u8 {
    let mut counts = [0usize; SNIFFED_DELIMITERS.len()];
    let mut quoted = false;
    for b in header.bytes() {
        if b == b'"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        if let Some(i) = SNIFFED_DELIMITERS.iter().position(|&d| d == b) {
            counts[i] += 1;
        }
    }
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n > 0)
        .max_by_key(|&(i, &n)| (n, std::cmp::Reverse(i)))
        .map(|(i, _)| SNIFFED_DELIMITERS[i])
        .unwrap_or(b',')
}

/// Splits a header line with the given delimiter, honouring quotes.
pub fn split_header(header: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(header.as_bytes());
    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(clean_token).collect()),
        None => Ok(Vec::new()),
    }
}

/// Strips a byte order mark, surrounding whitespace and wrapping quotes.
pub fn clean_token(token: &str) -> String {
    let token = token.trim().trim_start_matches(BOM).trim();
    let token = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token);
    token.trim().to_string()
}

/// Reads the table starting at the header line with a known delimiter.
pub fn read_table(text: &str, delimiter: u8) -> Result<RawTable> {
    let (offset, _) = header_line(text).ok_or(ImportError::EmptyInput)?;
    let body = &text[offset..];
    let skipped_lines = text[..offset].matches('\n').count();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());

    let mut header = None;
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let (start, line) = record
            .position()
            .map(|p| (p.byte() as usize, p.line() as usize))
            .unwrap_or((0, 1));
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if header.is_none() {
            header = Some(fields.iter().map(|f| clean_token(f)).collect());
            continue;
        }
        records.push((start, line + skipped_lines, fields));
    }

    let mut rows = Vec::with_capacity(records.len());
    for (i, (start, line, fields)) in records.iter().enumerate() {
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        let end = records.get(i + 1).map_or(body.len(), |next| next.0);
        let raw = body.get(*start..end).unwrap_or_default().trim_end().to_string();
        rows.push(RawRow {
            line: *line,
            fields: fields.clone(),
            raw,
        });
    }

    Ok(RawTable {
        delimiter,
        header: header.unwrap_or_default(),
        rows,
    })
}

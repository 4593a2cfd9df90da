//! Quote-aware parsing of comma-delimited report payloads.
//!
//! The first row is the header; every following row is zipped positionally
//! against it. Quotes only protect commas and line breaks from being treated
//! as delimiters; they are stripped from emitted values. Values are never
//! type-converted.

use std::collections::HashSet;

use crate::types::{ColumnNode, Document, Record, ReportError, ReportResult, RowNode};

const QUOTE: char = '"';
const DELIMITER: char = ',';

/// A parsed payload: header names plus data rows of equal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// One [`Record`] per data row.
    pub fn into_records(self) -> Vec<Record> {
        let header = self.header;
        self.rows
            .into_iter()
            .map(|row| Record::from_pairs(header.iter().cloned().zip(row).collect()))
            .collect()
    }

    /// The `Report` → rows → columns tree.
    pub fn into_document(self) -> Document {
        let header = self.header;
        let rows = self
            .rows
            .into_iter()
            .map(|row| RowNode {
                columns: header
                    .iter()
                    .zip(row)
                    .map(|(name, value)| ColumnNode {
                        name: name.clone(),
                        value,
                    })
                    .collect(),
            })
            .collect();
        Document::new(rows)
    }
}

/// Split a payload into rows.
///
/// `\r\n`, `\n` and `\r` end a row unless they fall inside a quoted field.
/// Empty rows are dropped; whitespace-only rows are kept. A payload without any row is malformed.
pub fn split_rows(text: &str) -> ReportResult<Vec<String>> {
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                push_row(&mut rows, &mut current);
            }
            _ => current.push(c),
        }
    }
    push_row(&mut rows, &mut current);

    if rows.is_empty() {
        return Err(ReportError::MalformedPayload(
            "payload has no header row".to_string(),
        ));
    }
    Ok(rows)
}

fn push_row(rows: &mut Vec<String>, current: &mut String) {
    if current.is_empty() {
        current.clear();
    } else {
        rows.push(std::mem::take(current));
    }
}

/// Split one row into fields on commas outside quotes, stripping every quote
/// character from the emitted values.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a payload into header and rows, checking every row against the
/// header width.
pub fn parse_table(text: &str) -> ReportResult<Table> {
    let mut lines = split_rows(text)?.into_iter();
    let header = match lines.next() {
        Some(line) => split_fields(&line),
        None => {
            return Err(ReportError::MalformedPayload(
                "payload has no header row".to_string(),
            ))
        }
    };

    let mut seen = HashSet::with_capacity(header.len());
    for name in &header {
        if !seen.insert(name.as_str()) {
            return Err(ReportError::DuplicateColumn(name.clone()));
        }
    }

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let fields = split_fields(&line);
        if fields.len() != header.len() {
            return Err(ReportError::FieldCountMismatch {
                row: index + 1,
                expected: header.len(),
                found: fields.len(),
            });
        }
        rows.push(fields);
    }

    Ok(Table { header, rows })
}

/// Parse a payload into header-keyed records.
pub fn to_records(text: &str) -> ReportResult<Vec<Record>> {
    Ok(parse_table(text)?.into_records())
}

/// Parse a payload into a [`Document`] tree.
pub fn to_document(text: &str) -> ReportResult<Document> {
    Ok(parse_table(text)?.into_document())
}

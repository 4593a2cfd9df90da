//! Core data types for report retrieval and parsed report data.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Identifies a report definition on the remote service. Used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ReportId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifies one server-side execution of a report.
///
/// Only meaningful for the retrieval that obtained it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    /// The status text matched the completion marker exactly.
    Complete,
    /// Anything else, carrying the status text the server reported.
    Pending(String),
}

impl ReportStatus {
    /// Classify a status value against the completion marker (case-sensitive).
    pub fn from_marker(status: &str, completion_marker: &str) -> Self {
        if status == completion_marker {
            ReportStatus::Complete
        } else {
            ReportStatus::Pending(status.to_string())
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ReportStatus::Complete)
    }
}

/// One data row keyed by header name, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub(crate) fn from_pairs(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column names in header order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Cell values in header order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    /// `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Serialized as a map so JSON output keeps header order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Tree form of a report: `Report` → rows → named columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub name: String,
    pub rows: Vec<RowNode>,
}

impl Document {
    /// Root element name.
    pub const ROOT: &'static str = "Report";

    pub fn new(rows: Vec<RowNode>) -> Self {
        Self {
            name: Self::ROOT.to_string(),
            rows,
        }
    }
}

/// One data row of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowNode {
    pub columns: Vec<ColumnNode>,
}

/// One cell of a [`RowNode`]; `name` is the header text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnNode {
    pub name: String,
    pub value: String,
}

/// Errors that can occur while retrieving or parsing a report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Malformed response: {body}")]
    MalformedResponse { body: String },

    #[error("Report {report_id} was not completed after {attempts} status checks")]
    ReportTimeout { report_id: ReportId, attempts: u32 },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Row {row} has {found} fields, header has {expected}")]
    FieldCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column in header: {0}")]
    DuplicateColumn(String),

    #[error("Template must contain {placeholder} exactly once, found {occurrences}")]
    InvalidTemplate {
        placeholder: &'static str,
        occurrences: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_marker_is_case_sensitive() {
        assert!(ReportStatus::from_marker("complete", "complete").is_complete());
        assert_eq!(
            ReportStatus::from_marker("Complete", "complete"),
            ReportStatus::Pending("Complete".to_string())
        );
        assert!(!ReportStatus::from_marker("", "complete").is_complete());
    }

    #[test]
    fn test_record_serializes_in_column_order() {
        let record = Record::from_pairs(vec![
            ("zeta".to_string(), "1".to_string()),
            ("alpha".to_string(), "2".to_string()),
        ]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
        assert_eq!(record.get("alpha"), Some("2"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_timeout_message_names_report() {
        let err = ReportError::ReportTimeout {
            report_id: ReportId::new("R-17"),
            attempts: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("R-17"));
        assert!(msg.contains('4'));
    }
}

//! Advocate reports — trigger a report run, poll until it completes, fetch
//! its delimited data, and expose it as text, records, or a document tree.

pub mod cache;
pub mod config;
pub mod delimited;
pub mod document;
pub mod engine;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use cache::ReportCache;
pub use config::{ClientConfig, PollPolicy};
pub use delimited::{parse_table, split_fields, split_rows, to_document, to_records, Table};
pub use engine::ReportEngine;
pub use request::{Credentials, RequestTemplate, RequestTemplates};
pub use response::extract_value;
pub use transport::{HttpTransport, Method, Transport, TransportRequest, TransportResponse};
pub use types::*;

//! Request shaping: templated XML bodies and the fixed header set sent with
//! every remote call.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::{ReportError, ReportResult};

/// Placeholder substituted with the report identifier in the run template.
pub const REPORT_ID_PLACEHOLDER: &str = "{ReportID}";
/// Placeholder substituted with the run handle in the status and data templates.
pub const RUN_ID_PLACEHOLDER: &str = "{RunID}";

/// A request body template holding exactly one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    body: String,
    placeholder: &'static str,
}

impl RequestTemplate {
    /// Validate that `body` contains `placeholder` exactly once.
    pub fn new(placeholder: &'static str, body: impl Into<String>) -> ReportResult<Self> {
        let body = body.into();
        let occurrences = body.matches(placeholder).count();
        if occurrences != 1 {
            return Err(ReportError::InvalidTemplate {
                placeholder,
                occurrences,
            });
        }
        Ok(Self { body, placeholder })
    }

    /// Substitute `value` for the placeholder.
    pub fn render(&self, value: &str) -> String {
        self.body.replacen(self.placeholder, value, 1)
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }
}

/// The three request bodies of the run / status / data protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplates {
    pub run: RequestTemplate,
    pub status: RequestTemplate,
    pub data: RequestTemplate,
}

impl RequestTemplates {
    /// Build and validate all three templates.
    pub fn new(
        run: impl Into<String>,
        status: impl Into<String>,
        data: impl Into<String>,
    ) -> ReportResult<Self> {
        Ok(Self {
            run: RequestTemplate::new(REPORT_ID_PLACEHOLDER, run)?,
            status: RequestTemplate::new(RUN_ID_PLACEHOLDER, status)?,
            data: RequestTemplate::new(RUN_ID_PLACEHOLDER, data)?,
        })
    }
}

/// Basic-auth credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Encoded on every request as `base64(user:password)`.
    UserPassword { user: String, password: String },
    /// An already encoded `user:password` string, used verbatim.
    Precomputed { authorization: String },
}

impl Credentials {
    /// Value of the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        match self {
            Credentials::UserPassword { user, password } => {
                let pair = format!("{user}:{password}");
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(latin1_or_utf8(&pair));
                format!("Basic {encoded}")
            }
            Credentials::Precomputed { authorization } => format!("Basic {authorization}"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::UserPassword { user, .. } => f
                .debug_struct("UserPassword")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Precomputed { .. } => f
                .debug_struct("Precomputed")
                .field("authorization", &"<redacted>")
                .finish(),
        }
    }
}

/// ISO-8859-1 bytes when every character fits, UTF-8 otherwise.
fn latin1_or_utf8(s: &str) -> Vec<u8> {
    if s.chars().all(|c| (c as u32) <= 0xFF) {
        s.chars().map(|c| c as u8).collect()
    } else {
        s.as_bytes().to_vec()
    }
}

/// Headers sent with every remote call, in send order.
pub fn build_headers(body: &str, host: &str, credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("Content-Length".to_string(), body.len().to_string()),
        ("Cache-Control".to_string(), "no-cache".to_string()),
        ("Connection".to_string(), "keep-alive".to_string()),
        ("Accept-Encoding".to_string(), "gzip, deflate".to_string()),
        (
            "Authorization".to_string(),
            credentials.authorization_header(),
        ),
        ("Content-Type".to_string(), "text/xml".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Host".to_string(), host.to_string()),
    ]
}

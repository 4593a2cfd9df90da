//! Extraction of the single text value carried by a remote response.
//!
//! Responses are small XML documents such as `<Result>complete</Result>`.
//! The extracted value is the concatenated text of the root element and its
//! descendants; whitespace-only text between elements is ignored.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::types::{ReportError, ReportResult};

/// Parse `body` as a single-rooted XML document and return its inner text.
pub fn extract_value(body: &str) -> ReportResult<String> {
    let malformed = || ReportError::MalformedResponse {
        body: body.to_string(),
    };

    let mut reader = Reader::from_str(body);
    reader.config_mut().check_end_names = true;

    let mut value = String::new();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.checked_sub(1).ok_or_else(malformed)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|_| malformed())?;
                if text.trim().is_empty() {
                    continue;
                }
                if depth == 0 {
                    return Err(malformed());
                }
                value.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                if depth == 0 {
                    return Err(malformed());
                }
                value.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err(malformed()),
            // Declarations, comments, processing instructions, doctype.
            Ok(_) => {}
        }
    }

    if roots != 1 || depth != 0 {
        return Err(malformed());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        assert_eq!(extract_value("<Result>complete</Result>").unwrap(), "complete");
    }

    #[test]
    fn test_declaration_and_nested_value() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
        <Response>
            <RunId>run-881</RunId>
        </Response>"#;
        assert_eq!(extract_value(body).unwrap(), "run-881");
    }

    #[test]
    fn test_entities_and_cdata() {
        assert_eq!(
            extract_value("<Data>a,b&#10;&quot;x&amp;y&quot;,2</Data>").unwrap(),
            "a,b\n\"x&y\",2"
        );
        assert_eq!(
            extract_value("<Data><![CDATA[a,b\n1,<2>]]></Data>").unwrap(),
            "a,b\n1,<2>"
        );
    }

    #[test]
    fn test_multiline_payload_is_preserved() {
        let body = "<Data>a,b\n1,2\n3,4</Data>";
        assert_eq!(extract_value(body).unwrap(), "a,b\n1,2\n3,4");
    }

    #[test]
    fn test_empty_root_is_empty_value() {
        assert_eq!(extract_value("<Result/>").unwrap(), "");
    }

    #[test]
    fn test_malformed_bodies_carry_raw_text() {
        for body in [
            "",
            "complete",
            "<Result>complete",
            "<Result>complete</Other>",
            "<a/><b/>",
            "text<a/>",
            "{\"status\":\"complete\"}",
        ] {
            match extract_value(body) {
                Err(ReportError::MalformedResponse { body: raw }) => assert_eq!(raw, body),
                other => panic!("expected MalformedResponse for {body:?}, got {other:?}"),
            }
        }
    }
}

//! Rendering of retrieved reports for stdout.

use advocate_report::{Document, Record};
use anyhow::Result;

/// Records as a JSON array of objects in column order.
pub fn records_json(records: &[Record], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(json)
}

/// Records as an aligned plain-text table.
pub fn records_table(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return "  No rows.\n".to_string();
    };

    let columns: Vec<&str> = first.columns().collect();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for record in records {
        for (width, value) in widths.iter_mut().zip(record.values()) {
            *width = (*width).max(value.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, columns.iter().copied(), &widths);
    push_row(&mut out, widths.iter().map(|w| "-".repeat(*w)), &widths);
    for record in records {
        push_row(&mut out, record.values(), &widths);
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: impl Iterator<Item = S>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Document as XML.
pub fn document_xml(document: &Document, pretty: bool) -> Result<String> {
    Ok(document.to_xml(pretty)?)
}

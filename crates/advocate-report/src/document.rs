//! XML rendering of a parsed report [`Document`].

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::types::{Document, ReportError, ReportResult};

const ROW: &str = "Row";
const COLUMN: &str = "Column";
const NAME_ATTR: &str = "name";

impl Document {
    /// Render as `<Report><Row><Column name="...">value</Column></Row></Report>`.
    ///
    /// With `indent`, nested elements are indented by two spaces per level.
    pub fn to_xml(&self, indent: bool) -> ReportResult<String> {
        let mut writer = if indent {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };

        if self.rows.is_empty() {
            write(&mut writer, Event::Empty(BytesStart::new(self.name.as_str())))?;
        } else {
            write(&mut writer, Event::Start(BytesStart::new(self.name.as_str())))?;
            for row in &self.rows {
                write(&mut writer, Event::Start(BytesStart::new(ROW)))?;
                for column in &row.columns {
                    let mut start = BytesStart::new(COLUMN);
                    start.push_attribute((NAME_ATTR, column.name.as_str()));
                    write(&mut writer, Event::Start(start))?;
                    write(&mut writer, Event::Text(BytesText::new(&column.value)))?;
                    write(&mut writer, Event::End(BytesEnd::new(COLUMN)))?;
                }
                write(&mut writer, Event::End(BytesEnd::new(ROW)))?;
            }
            write(&mut writer, Event::End(BytesEnd::new(self.name.as_str())))?;
        }

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| ReportError::MalformedPayload(format!("document is not UTF-8: {e}")))
    }
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> ReportResult<()> {
    writer
        .write_event(event)
        .map_err(|e| ReportError::Io(std::io::Error::other(e.to_string())))
}

//! Serialising data sources to delimited text and the XML data schema.

use std::io::{self, Write};

use crate::{tokenizer::escape_cell, xml::XmlWriter};

use super::{DataSource, DataSourceError, DataSourceFormat, SCHEMA_MARKER_PREFIX, SCHEMA_VERSION};

const LINE_END: &str = "\r\n";

impl DataSource {
    /// Serialise the data source in `format`.
    ///
    /// With `skip_empty_locations`, rows lacking both a coordinate pair and a
    /// non-empty geography are left out, except rows flagged for deletion.
    pub fn write<W: Write>(
        &self,
        writer: W,
        format: DataSourceFormat,
        skip_empty_locations: bool,
    ) -> Result<(), DataSourceError> {
        let result = match format.delimiter() {
            Some(delimiter) => self.write_delimited(writer, delimiter, skip_empty_locations),
            None if format == DataSourceFormat::Xml => self.write_xml(writer, skip_empty_locations),
            None => {
                return Err(DataSourceError::UnsupportedFormat {
                    format,
                    operation: "written",
                });
            }
        };
        result.map_err(|source| DataSourceError::Write { source })
    }

    /// Serialise into an in-memory buffer.
    pub fn to_bytes(
        &self,
        format: DataSourceFormat,
        skip_empty_locations: bool,
    ) -> Result<Vec<u8>, DataSourceError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, format, skip_empty_locations)?;
        Ok(buffer)
    }

    fn should_write(&self, row: usize, skip_empty_locations: bool) -> bool {
        !skip_empty_locations || self.is_marked_for_deletion(row) || self.row_has_location(row)
    }

    fn write_delimited<W: Write>(
        &self,
        mut writer: W,
        delimiter: char,
        skip_empty_locations: bool,
    ) -> io::Result<()> {
        write!(
            writer,
            "{SCHEMA_MARKER_PREFIX}, {SCHEMA_VERSION}, {}{LINE_END}",
            self.entity_type_or_default()
        )?;
        let header: Vec<String> = self.columns.iter().map(ToString::to_string).collect();
        write!(writer, "{}{LINE_END}", header.join(&delimiter.to_string()))?;

        let mut skipped = 0_usize;
        for (index, row) in self.rows.iter().enumerate() {
            if !self.should_write(index, skip_empty_locations) {
                skipped += 1;
                continue;
            }
            let cells: Vec<String> = row
                .iter()
                .map(|value| escape_cell(&value.to_text(), delimiter))
                .collect();
            write!(writer, "{}{LINE_END}", cells.join(&delimiter.to_string()))?;
        }
        if skipped > 0 {
            log::debug!("skipped {skipped} rows without a location");
        }
        writer.flush()
    }

    fn write_xml<W: Write>(&self, writer: W, skip_empty_locations: bool) -> io::Result<()> {
        let entity = self.entity_type_or_default();
        let root = self.xml_root_name();
        let mut xml = XmlWriter::new(writer);
        xml.declaration()?;
        xml.open(&root, &[])?;
        xml.open(
            "xs:schema",
            &[
                ("id", root.as_str()),
                ("xmlns:xs", "http://www.w3.org/2001/XMLSchema"),
                ("xmlns:msdata", "urn:schemas-microsoft-com:xml-msdata"),
            ],
        )?;
        xml.open(
            "xs:element",
            &[("name", root.as_str()), ("msdata:IsDataSet", "true")],
        )?;
        xml.open("xs:complexType", &[])?;
        xml.open("xs:choice", &[("minOccurs", "0"), ("maxOccurs", "unbounded")])?;
        xml.open("xs:element", &[("name", entity)])?;
        xml.open("xs:complexType", &[])?;
        xml.open("xs:sequence", &[])?;
        for column in &self.columns {
            xml.empty(
                "xs:element",
                &[
                    ("name", column.name()),
                    ("minOccurs", "0"),
                    ("type", column.xml_type()),
                ],
            )?;
        }
        xml.close("xs:sequence")?;
        xml.close("xs:complexType")?;
        xml.close("xs:element")?;
        xml.close("xs:choice")?;
        xml.close("xs:complexType")?;
        if let Some(key) = self.primary_key_index().and_then(|index| self.columns.get(index)) {
            let selector = format!(".//{entity}");
            xml.open(
                "xs:unique",
                &[("name", "Constraint1"), ("msdata:PrimaryKey", "true")],
            )?;
            xml.empty("xs:selector", &[("xpath", selector.as_str())])?;
            xml.empty("xs:field", &[("xpath", key.name())])?;
            xml.close("xs:unique")?;
        }
        xml.close("xs:element")?;
        xml.close("xs:schema")?;

        for (index, row) in self.rows.iter().enumerate() {
            if !self.should_write(index, skip_empty_locations) {
                continue;
            }
            xml.open(entity, &[])?;
            for (column, value) in self.columns.iter().zip(row) {
                if !value.is_empty() {
                    xml.text_element(column.name(), &value.to_text())?;
                }
            }
            xml.close(entity)?;
        }
        xml.close(&root)?;
        xml.into_inner().flush()
    }

    fn xml_root_name(&self) -> String {
        let name = self.details.name.trim();
        if crate::column::validate_column_name(name).is_ok() {
            name.to_owned()
        } else {
            format!("{}s", self.entity_type_or_default())
        }
    }
}

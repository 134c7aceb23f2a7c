//! Parsing data sources from delimited text and the XML data schema.

use std::io::Read;

use crate::{
    column::{Column, SemanticType},
    compression::{decode_text, read_payload},
    tokenizer::DelimitedTokenizer,
    value::Value,
    xml::{Element, parse_document},
};

use super::{DataSource, DataSourceError, DataSourceFormat, Row, SCHEMA_MARKER_PREFIX};

impl DataSource {
    /// Parse a data source from `reader`.
    ///
    /// Zip-compressed input is unpacked transparently. KML and shapefile
    /// payloads are rejected with [`DataSourceError::UnsupportedFormat`].
    pub fn read<R: Read>(reader: R, format: DataSourceFormat) -> Result<Self, DataSourceError> {
        if !format.is_parsable() {
            return Err(DataSourceError::UnsupportedFormat {
                format,
                operation: "read",
            });
        }
        let bytes = read_payload(reader)?;
        let text = decode_text(&bytes).map_err(|source| DataSourceError::Encoding { source })?;
        Self::parse(text, format)
    }

    /// Parse a data source from text that has already been decoded.
    pub fn parse(text: &str, format: DataSourceFormat) -> Result<Self, DataSourceError> {
        match format.delimiter() {
            Some(delimiter) => parse_delimited(text, delimiter),
            None if format == DataSourceFormat::Xml => parse_xml(text),
            None => Err(DataSourceError::UnsupportedFormat {
                format,
                operation: "read",
            }),
        }
    }

    /// Replace the contents of `self` with data parsed from `reader`.
    ///
    /// Returns `false` on failure and leaves `self` untouched apart from
    /// recording the cause, which [`DataSource::last_error`] then returns.
    pub fn read_into<R: Read>(&mut self, reader: R, format: DataSourceFormat) -> bool {
        match Self::read(reader, format) {
            Ok(parsed) => {
                self.details.entity_type_name = parsed.details.entity_type_name;
                if !parsed.details.name.is_empty() {
                    self.details.name = parsed.details.name;
                }
                self.columns = parsed.columns;
                self.rows = parsed.rows;
                self.last_error = None;
                true
            }
            Err(err) => {
                log::debug!("data source read failed: {err}");
                self.last_error = Some(err);
                false
            }
        }
    }
}

fn parse_delimited(text: &str, delimiter: char) -> Result<DataSource, DataSourceError> {
    let mut lines: Vec<Vec<String>> = DelimitedTokenizer::new(text, delimiter).collect();
    while lines.last().is_some_and(|cells| is_blank_line(cells)) {
        lines.pop();
    }
    let mut lines = lines.into_iter();
    let mut source = DataSource::new();

    let mut header = lines
        .find(|cells| !is_blank_line(cells))
        .ok_or_else(|| DataSourceError::Schema {
            message: "input is empty".to_owned(),
        })?;
    if let Some(entity_type) = schema_marker_entity(&header) {
        source.details.entity_type_name = entity_type;
        header = lines
            .find(|cells| !is_blank_line(cells))
            .ok_or_else(|| DataSourceError::Schema {
                message: "missing column header after the schema marker".to_owned(),
            })?;
    }

    for cell in merge_header_cells(header) {
        let column = cell
            .parse::<Column>()
            .map_err(|err| DataSourceError::Schema {
                message: format!("bad column header '{cell}': {err}"),
            })?;
        source.columns.push(column);
    }

    // A blank line is a null row only when there is a single column.
    let multi_column = source.columns.len() > 1;
    for cells in lines {
        if multi_column && is_blank_line(&cells) {
            continue;
        }
        let row: Row = cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let semantic_type = source
                    .columns
                    .get(index)
                    .map_or(SemanticType::String, Column::semantic_type);
                Value::from_delimited(cell, semantic_type)
            })
            .collect();
        source.rows.push(row);
    }
    log::debug!(
        "parsed {} columns and {} rows of delimited data",
        source.columns.len(),
        source.rows.len()
    );
    Ok(source)
}

fn is_blank_line(cells: &[String]) -> bool {
    matches!(cells, [only] if only.is_empty())
}

/// Entity type carried by a schema marker row, if `cells` is one.
///
/// The marker is always written comma separated, so in tab or pipe files it
/// arrives as a single cell and is split again here.
fn schema_marker_entity(cells: &[String]) -> Option<String> {
    let first = cells.first()?;
    if !first.trim_start().starts_with(SCHEMA_MARKER_PREFIX) {
        return None;
    }
    let entity = if cells.len() >= 3 {
        cells.get(2).map(|cell| cell.trim().to_owned())
    } else {
        cells
            .join(",")
            .split(',')
            .nth(2)
            .map(|token| token.trim().to_owned())
    };
    Some(entity.unwrap_or_default())
}

/// Re-join header cells split on a comma inside `Name(Type,primaryKey)`.
fn merge_header_cells(cells: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(cells.len());
    let mut open = false;
    for cell in cells {
        match merged.last_mut() {
            Some(last) if open => {
                last.push(',');
                last.push_str(&cell);
            }
            _ => merged.push(cell),
        }
        if let Some(last) = merged.last() {
            open = last.contains('(') && !last.trim_end().ends_with(')');
        }
    }
    merged
}

fn parse_xml(text: &str) -> Result<DataSource, DataSourceError> {
    let root = parse_document(text).map_err(|source| DataSourceError::Xml { source })?;
    let schema = root
        .children
        .first()
        .filter(|child| child.local_name().eq_ignore_ascii_case("schema"))
        .ok_or_else(|| DataSourceError::Schema {
            message: "the first child of the document is not a schema".to_owned(),
        })?;

    let mut source = DataSource::new();
    source.details.name = root.local_name().to_owned();
    let entity = entity_element(schema).ok_or_else(|| DataSourceError::Schema {
        message: "schema does not describe an entity type".to_owned(),
    })?;
    source.details.entity_type_name = entity.attribute("name").unwrap_or_default().to_owned();

    let primary_key = schema
        .descendant("unique")
        .and_then(|unique| unique.child("field"))
        .and_then(|field| field.attribute("xpath"))
        .map(|xpath| xpath.trim_start_matches(['.', '/']).to_owned());

    let Some(sequence) = entity.descendant("sequence") else {
        return Err(DataSourceError::Schema {
            message: "entity type has no element sequence".to_owned(),
        });
    };
    for element in sequence.children_named("element") {
        let name = element.attribute("name").unwrap_or_default();
        let semantic_type =
            SemanticType::from_xml_type(element.attribute("type").unwrap_or_default());
        let is_primary_key = primary_key
            .as_deref()
            .is_some_and(|key| key.eq_ignore_ascii_case(name));
        source
            .columns
            .push(Column::unchecked(name, semantic_type, is_primary_key));
    }

    for entry in root.children.iter().skip(1) {
        source.rows.push(xml_row(&source.columns, entry));
    }
    log::debug!(
        "parsed {} columns and {} rows of XML data",
        source.columns.len(),
        source.rows.len()
    );
    Ok(source)
}

/// The schema element whose type holds the column sequence.
fn entity_element(schema: &Element) -> Option<&Element> {
    fn walk(element: &Element) -> Option<&Element> {
        for child in &element.children {
            if child.local_name().eq_ignore_ascii_case("element")
                && child
                    .child("complexType")
                    .and_then(|ty| ty.child("sequence"))
                    .is_some()
            {
                return Some(child);
            }
            if let Some(found) = walk(child) {
                return Some(found);
            }
        }
        None
    }
    walk(schema)
}

fn xml_row(columns: &[Column], entry: &Element) -> Row {
    columns
        .iter()
        .map(|column| {
            entry
                .children
                .iter()
                .find(|cell| column.name_matches(cell.local_name()))
                .map_or(Value::Null, |cell| {
                    Value::from_xml(&cell.text, column.semantic_type())
                })
        })
        .collect()
}

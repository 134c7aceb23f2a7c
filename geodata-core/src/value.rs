//! Cell values of a tabular data source.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::{column::SemanticType, geography::Geography};

/// A single cell. The variant must agree with the owning column's
/// [`SemanticType`]; [`Value::Null`] is valid for every type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    /// Text.
    String(String),
    /// 64-bit integer.
    Int64(i64),
    /// Double precision float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// WKT geometry.
    Geography(Geography),
}

impl Value {
    /// Whether the cell carries no value. Empty strings and blank geographies
    /// count as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(text) => text.is_empty(),
            Self::Geography(geography) => geography.is_empty(),
            Self::Int64(_) | Self::Double(_) | Self::Bool(_) | Self::DateTime(_) => false,
        }
    }

    /// Numeric view used for coordinate checks.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "integer coordinates are small enough to be exact"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            Self::Int64(value) => Some(*value as f64),
            Self::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view used for the delete flag.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int64(value) => Some(*value != 0),
            Self::String(text) => parse_bool(text),
            _ => None,
        }
    }

    /// Text view of the cell, if it is textual.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            Self::Geography(geography) => Some(geography.wkt()),
            _ => None,
        }
    }

    /// Geography view of the cell.
    #[must_use]
    pub const fn as_geography(&self) -> Option<&Geography> {
        match self {
            Self::Geography(geography) => Some(geography),
            _ => None,
        }
    }

    /// Coerce delimited text into a value of `semantic_type`.
    ///
    /// Empty text is `Null`. Numbers and booleans that fail to parse fall back
    /// to zero and `false`. Timestamps are always `Null`: delimited files have
    /// never carried usable timestamps through this path and callers depend on
    /// that.
    #[must_use]
    pub fn from_delimited(text: &str, semantic_type: SemanticType) -> Self {
        if text.is_empty() {
            return Self::Null;
        }
        match semantic_type {
            SemanticType::String => Self::String(text.to_owned()),
            SemanticType::Int64 => Self::Int64(text.trim().parse().unwrap_or_default()),
            SemanticType::Double => Self::Double(text.trim().parse().unwrap_or_default()),
            SemanticType::Bool => Self::Bool(parse_bool(text).unwrap_or_default()),
            SemanticType::DateTime => Self::Null,
            SemanticType::Geography => Self::Geography(Geography::new(text)),
        }
    }

    /// Coerce XML element text into a value of `semantic_type`.
    ///
    /// Behaves like [`Value::from_delimited`] except that `xs:dateTime`
    /// values are parsed; unparseable timestamps become `Null`.
    #[must_use]
    pub fn from_xml(text: &str, semantic_type: SemanticType) -> Self {
        match semantic_type {
            SemanticType::DateTime if !text.trim().is_empty() => {
                parse_datetime(text).map_or(Self::Null, Self::DateTime)
            }
            _ => Self::from_delimited(text, semantic_type),
        }
    }

    /// Render the value as text for serialisation. `Null` renders empty.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::String(text) => f.write_str(text),
            Self::Int64(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::DateTime(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Geography(geography) => f.write_str(geography.wkt()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Geography> for Value {
    fn from(value: Geography) -> Self {
        Self::Geography(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        Some(false)
    } else {
        None
    }
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("42", SemanticType::Int64, Value::Int64(42))]
    #[case("forty", SemanticType::Int64, Value::Int64(0))]
    #[case("47.6", SemanticType::Double, Value::Double(47.6))]
    #[case("north", SemanticType::Double, Value::Double(0.0))]
    #[case("TRUE", SemanticType::Bool, Value::Bool(true))]
    #[case("yes", SemanticType::Bool, Value::Bool(false))]
    #[case("", SemanticType::Double, Value::Null)]
    #[case("2024-01-01T00:00:00Z", SemanticType::DateTime, Value::Null)]
    #[case("Store A", SemanticType::String, Value::String("Store A".to_owned()))]
    fn coerces_delimited_text(
        #[case] text: &str,
        #[case] semantic_type: SemanticType,
        #[case] expected: Value,
    ) {
        assert_eq!(Value::from_delimited(text, semantic_type), expected);
    }

    #[rstest]
    fn xml_parses_timestamps() {
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(
            Value::from_xml("2024-03-01T12:30:00Z", SemanticType::DateTime),
            Value::DateTime(expected)
        );
        assert_eq!(
            Value::from_xml("2024-03-01T12:30:00", SemanticType::DateTime),
            Value::DateTime(expected)
        );
        assert_eq!(
            Value::from_xml("last tuesday", SemanticType::DateTime),
            Value::Null
        );
    }

    #[rstest]
    fn timestamps_render_as_rfc3339() {
        let value = Value::DateTime(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
                .single()
                .expect("valid timestamp"),
        );
        assert_eq!(value.to_text(), "2024-03-01T12:30:00Z");
    }

    #[rstest]
    fn emptiness_covers_blank_text() {
        assert!(Value::Null.is_empty());
        assert!(Value::String(String::new()).is_empty());
        assert!(Value::Geography(Geography::new("  ")).is_empty());
        assert!(!Value::Double(0.0).is_empty());
    }
}

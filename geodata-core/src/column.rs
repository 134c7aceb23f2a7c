//! Typed column headers shared by every tabular format.
//!
//! A [`Column`] couples a validated name with a [`SemanticType`] and a
//! primary-key flag. The naming rule and the two reserved names are part of
//! the wire contract with the remote service and must not drift.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

/// Maximum number of characters in a column name.
pub const MAX_COLUMN_NAME_LEN: usize = 50;

/// Reserved column flagging rows the service should delete.
pub const DELETE_ENTITY_COLUMN: &str = "__deleteEntity";

/// Reserved column carrying query distances in service responses.
pub const DISTANCE_COLUMN: &str = "__distance";

static COLUMN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|err| panic!("invalid pattern: {err}"))
});

/// The kind of value held by every cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SemanticType {
    /// Free text.
    #[default]
    String,
    /// Signed 64-bit integer.
    Int64,
    /// Double precision float.
    Double,
    /// Boolean flag.
    Bool,
    /// UTC timestamp.
    DateTime,
    /// Well-Known-Text geometry.
    Geography,
}

impl SemanticType {
    /// Compact tag used in delimited headers, e.g. `Edm.Double`.
    #[must_use]
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::Int64 => "Edm.Int64",
            Self::Double => "Edm.Double",
            Self::Bool => "Edm.Boolean",
            Self::DateTime => "Edm.dateTime",
            Self::Geography => "Edm.Geography",
        }
    }

    /// XML Schema type name used by the XML data schema.
    #[must_use]
    pub const fn xml_type(self) -> &'static str {
        match self {
            Self::String => "xs:string",
            Self::Int64 => "xs:long",
            Self::Double => "xs:double",
            Self::Bool => "xs:boolean",
            Self::DateTime => "xs:dateTime",
            Self::Geography => "xs:anyType",
        }
    }

    /// Resolve a compact type tag. Unknown tags fall back to [`SemanticType::String`].
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Self {
        let tag = tag.trim();
        [
            Self::String,
            Self::Int64,
            Self::Double,
            Self::Bool,
            Self::DateTime,
            Self::Geography,
        ]
        .into_iter()
        .find(|candidate| candidate.type_tag().eq_ignore_ascii_case(tag))
        .unwrap_or_default()
    }

    /// Resolve an XML Schema type name. Unknown names fall back to [`SemanticType::String`].
    #[must_use]
    pub fn from_xml_type(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "xs:long" | "xs:int" | "xs:integer" => Self::Int64,
            "xs:double" | "xs:float" | "xs:decimal" => Self::Double,
            "xs:boolean" => Self::Bool,
            "xs:datetime" => Self::DateTime,
            "xs:anytype" => Self::Geography,
            _ => Self::String,
        }
    }
}

/// Errors returned when a column name breaks the naming rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ColumnNameError {
    /// The name was empty.
    #[error("column name must not be empty")]
    Empty,
    /// The name exceeded [`MAX_COLUMN_NAME_LEN`].
    #[error("column name '{name}' is {len} characters long; the limit is 50")]
    TooLong { name: String, len: usize },
    /// The name contained characters outside `[A-Za-z0-9_]` or started with a digit.
    #[error("'{name}' is not a valid column name")]
    InvalidCharacters { name: String },
}

/// Check a column name against the service naming rule.
///
/// # Examples
/// ```
/// use geodata_core::column::validate_column_name;
///
/// assert!(validate_column_name("AddressLine").is_ok());
/// assert!(validate_column_name("__deleteEntity").is_ok());
/// assert!(validate_column_name("1abc").is_err());
/// ```
pub fn validate_column_name(name: &str) -> Result<(), ColumnNameError> {
    if name == DELETE_ENTITY_COLUMN || name == DISTANCE_COLUMN {
        return Ok(());
    }
    if name.is_empty() {
        return Err(ColumnNameError::Empty);
    }
    let len = name.chars().count();
    if len > MAX_COLUMN_NAME_LEN {
        return Err(ColumnNameError::TooLong {
            name: name.to_owned(),
            len,
        });
    }
    if !COLUMN_NAME.is_match(name) {
        return Err(ColumnNameError::InvalidCharacters {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// A typed column header.
///
/// Equality is field-wise over name, type and primary-key flag.
///
/// # Examples
/// ```
/// use geodata_core::{Column, SemanticType};
///
/// # fn main() -> Result<(), geodata_core::ColumnNameError> {
/// let column = Column::new("EntityID", SemanticType::String, true)?;
/// assert_eq!(column.to_string(), "EntityID(Edm.String,primaryKey)");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Column {
    name: String,
    semantic_type: SemanticType,
    is_primary_key: bool,
}

impl Column {
    /// Validates the name and constructs a [`Column`].
    pub fn new(
        name: impl Into<String>,
        semantic_type: SemanticType,
        is_primary_key: bool,
    ) -> Result<Self, ColumnNameError> {
        let name = name.into();
        validate_column_name(&name)?;
        Ok(Self {
            name,
            semantic_type,
            is_primary_key,
        })
    }

    /// Construct a column without checking the naming rule.
    ///
    /// Parsers use this so that badly named columns survive long enough to be
    /// reported by validation rather than aborting the read.
    pub(crate) fn unchecked(
        name: impl Into<String>,
        semantic_type: SemanticType,
        is_primary_key: bool,
    ) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            is_primary_key,
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the column, rejecting names that break the naming rule.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ColumnNameError> {
        let name = name.into();
        validate_column_name(&name)?;
        self.name = name;
        Ok(())
    }

    /// Semantic type of the column's cells.
    #[must_use]
    pub const fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    /// Change the semantic type.
    pub const fn set_semantic_type(&mut self, semantic_type: SemanticType) {
        self.semantic_type = semantic_type;
    }

    /// Whether the column is the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    /// Flag or unflag the column as primary key.
    pub const fn set_primary_key(&mut self, is_primary_key: bool) {
        self.is_primary_key = is_primary_key;
    }

    /// Compact type tag, e.g. `Edm.Int64`.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        self.semantic_type.type_tag()
    }

    /// XML Schema type name, e.g. `xs:long`.
    #[must_use]
    pub const fn xml_type(&self) -> &'static str {
        self.semantic_type.xml_type()
    }

    /// Case-insensitive name comparison used by lookups and XML row matching.
    #[must_use]
    pub fn name_matches(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_primary_key {
            write!(f, "{}({},primaryKey)", self.name, self.type_tag())
        } else {
            write!(f, "{}({})", self.name, self.type_tag())
        }
    }
}

impl FromStr for Column {
    type Err = ColumnNameError;

    /// Parse a delimited header cell of the form `Name(TypeTag[,primaryKey])`.
    ///
    /// A bare `Name` yields a string column. The name itself is not validated
    /// here; that is left to data source validation.
    fn from_str(cell: &str) -> Result<Self, Self::Err> {
        let cell = cell.trim();
        let Some((name, rest)) = cell.split_once('(') else {
            if cell.is_empty() {
                return Err(ColumnNameError::Empty);
            }
            return Ok(Self::unchecked(cell, SemanticType::String, false));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ColumnNameError::Empty);
        }
        let inner = rest.trim_end().trim_end_matches(')');
        let mut parts = inner.split(',').map(str::trim);
        let semantic_type = parts
            .next()
            .map(SemanticType::from_type_tag)
            .unwrap_or_default();
        let is_primary_key = parts.any(|part| part.eq_ignore_ascii_case("primaryKey"));
        Ok(Self::unchecked(name, semantic_type, is_primary_key))
    }
}

//! File formats a data source can be exchanged in.

use std::{fmt, str::FromStr};

/// Encodings accepted by the platform for data source payloads.
///
/// Only the delimited variants and XML are parsed locally; KML and
/// shapefiles travel as opaque upload payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataSourceFormat {
    /// The fixed XML data schema.
    Xml,
    /// Comma separated values.
    #[default]
    Csv,
    /// Tab separated values.
    Tab,
    /// Pipe separated values.
    Pipe,
    /// Keyhole Markup Language.
    Kml,
    /// ESRI shapefile.
    Shp,
}

impl DataSourceFormat {
    /// Cell delimiter of the delimited formats.
    #[must_use]
    pub const fn delimiter(self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Tab => Some('\t'),
            Self::Pipe => Some('|'),
            Self::Xml | Self::Kml | Self::Shp => None,
        }
    }

    /// Whether the format can be read and written locally.
    #[must_use]
    pub const fn is_parsable(self) -> bool {
        !matches!(self, Self::Kml | Self::Shp)
    }

    /// Value of the `input` query parameter on upload requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Csv => "csv",
            Self::Tab => "tab",
            Self::Pipe => "pipe",
            Self::Kml => "kml",
            Self::Shp => "shp",
        }
    }

    /// Guess the format from a file extension.
    ///
    /// # Examples
    /// ```
    /// use geodata_core::DataSourceFormat;
    ///
    /// assert_eq!(DataSourceFormat::from_extension("TSV"), Some(DataSourceFormat::Tab));
    /// assert_eq!(DataSourceFormat::from_extension("json"), None);
    /// ```
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "tab" | "tsv" => Some(Self::Tab),
            "pipe" | "psv" => Some(Self::Pipe),
            "kml" => Some(Self::Kml),
            "shp" | "zip" => Some(Self::Shp),
            _ => None,
        }
    }
}

impl fmt::Display for DataSourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for unknown format names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data source format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for DataSourceFormat {
    type Err = UnknownFormat;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(Self::Xml),
            "csv" => Ok(Self::Csv),
            "tab" => Ok(Self::Tab),
            "pipe" => Ok(Self::Pipe),
            "kml" => Ok(Self::Kml),
            "shp" => Ok(Self::Shp),
            other => Err(UnknownFormat(other.to_owned())),
        }
    }
}

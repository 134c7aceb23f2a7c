//! Batch geocode feeds.
//!
//! A [`GeocodeFeed`] is the document exchanged with the batch geocode job:
//! the caller sends entities carrying requests and receives the same
//! entities back with responses attached. Feeds travel as XML or in one of
//! two fixed delimited layouts.

mod address;
mod delimited;
mod entity;
mod error;
mod xml;


use std::{
    fmt,
    io::{Read, Write},
    str::FromStr,
};

pub use address::{
    ADDRESS_LINE_ALIASES, ADMIN_DISTRICT_ALIASES, ADMIN_DISTRICT2_ALIASES, Address,
    AddressColumns, COUNTRY_REGION_ALIASES, LOCALITY_ALIASES, POSTAL_CODE_ALIASES,
};
pub use entity::{
    DEFAULT_CULTURE, GeocodeEntity, GeocodeRequest, GeocodeResponse, ReverseGeocodeRequest,
    STATUS_SUCCESS,
};
pub use error::FeedError;
pub use xml::GEOCODE_NAMESPACE;

use crate::{
    compression::{decode_text, read_payload},
    data_source::DataSourceFormat,
};

/// Layout generation of a geocode feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeedVersion {
    /// Legacy layout.
    V1,
    /// Current layout with reverse requests and bounding boxes.
    #[default]
    V2,
}

impl fmt::Display for FeedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
        })
    }
}

impl FromStr for FeedVersion {
    type Err = FeedError;

    fn from_str(version: &str) -> Result<Self, Self::Err> {
        match version.trim() {
            "1" | "1.0" => Ok(Self::V1),
            "2" | "2.0" => Ok(Self::V2),
            other => Err(FeedError::UnsupportedVersion {
                version: other.to_owned(),
            }),
        }
    }
}

/// An ordered list of geocode entities.
///
/// # Examples
/// ```
/// use geodata_core::DataSourceFormat;
/// use geodata_core::geocode::{Address, GeocodeEntity, GeocodeFeed, GeocodeRequest};
///
/// # fn main() -> Result<(), geodata_core::geocode::FeedError> {
/// let address = Address {
///     address_line: "1 Microsoft Way".into(),
///     locality: "Redmond".into(),
///     ..Address::default()
/// };
/// let mut entity = GeocodeEntity::new("0");
/// entity.request = Some(GeocodeRequest::for_address(address.clone(), "en-US"));
/// let feed = GeocodeFeed::from_entities(vec![entity]);
///
/// let xml = feed.to_bytes(DataSourceFormat::Xml)?;
/// let parsed = GeocodeFeed::read(xml.as_slice(), DataSourceFormat::Xml)?;
/// assert_eq!(parsed.contains_address(&address), Some("0"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeFeed {
    version: FeedVersion,
    entities: Vec<GeocodeEntity>,
}

impl GeocodeFeed {
    /// An empty feed in the current layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty feed written in `version`'s layout.
    #[must_use]
    pub fn with_version(version: FeedVersion) -> Self {
        Self {
            version,
            entities: Vec::new(),
        }
    }

    /// A feed in the current layout holding `entities`.
    #[must_use]
    pub fn from_entities(entities: Vec<GeocodeEntity>) -> Self {
        Self {
            entities,
            ..Self::default()
        }
    }

    /// Layout version.
    #[must_use]
    pub const fn version(&self) -> FeedVersion {
        self.version
    }

    /// Change the layout used by [`GeocodeFeed::write`].
    pub const fn set_version(&mut self, version: FeedVersion) {
        self.version = version;
    }

    /// Entities in order.
    #[must_use]
    pub fn entities(&self) -> &[GeocodeEntity] {
        &self.entities
    }

    /// Mutable entities.
    pub const fn entities_mut(&mut self) -> &mut Vec<GeocodeEntity> {
        &mut self.entities
    }

    /// Append an entity.
    pub fn push(&mut self, entity: GeocodeEntity) {
        self.entities.push(entity);
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the feed holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity with the given id.
    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&GeocodeEntity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    /// Id of the first entity whose request address equals `address`.
    #[must_use]
    pub fn contains_address(&self, address: &Address) -> Option<&str> {
        self.entities
            .iter()
            .find(|entity| {
                entity
                    .request
                    .as_ref()
                    .is_some_and(|request| request.address == *address)
            })
            .map(|entity| entity.id.as_str())
    }

    /// Parse a feed, unpacking zip-compressed input.
    pub fn read<R: Read>(reader: R, format: DataSourceFormat) -> Result<Self, FeedError> {
        if !format.is_parsable() {
            return Err(FeedError::UnsupportedFormat {
                format,
                operation: "read",
            });
        }
        let bytes = read_payload(reader)?;
        let text = decode_text(&bytes).map_err(|source| FeedError::Encoding { source })?;
        Self::parse(text, format)
    }

    /// Parse a feed from decoded text.
    pub fn parse(text: &str, format: DataSourceFormat) -> Result<Self, FeedError> {
        match format.delimiter() {
            Some(delimiter) => delimited::parse(text, delimiter),
            None if format == DataSourceFormat::Xml => xml::parse(text),
            None => Err(FeedError::UnsupportedFormat {
                format,
                operation: "read",
            }),
        }
    }

    /// Serialise the feed.
    pub fn write<W: Write>(&self, writer: W, format: DataSourceFormat) -> Result<(), FeedError> {
        let result = match format.delimiter() {
            Some(delimiter) => delimited::write(self, writer, delimiter),
            None if format == DataSourceFormat::Xml => xml::write(self, writer),
            None => {
                return Err(FeedError::UnsupportedFormat {
                    format,
                    operation: "written",
                });
            }
        };
        result.map_err(|source| FeedError::Write { source })
    }

    /// Serialise into an in-memory buffer.
    pub fn to_bytes(&self, format: DataSourceFormat) -> Result<Vec<u8>, FeedError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, format)?;
        Ok(buffer)
    }
}

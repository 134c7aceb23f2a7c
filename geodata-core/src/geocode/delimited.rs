//! Fixed-position delimited layouts of the geocode feed.
//!
//! Version 1 is the legacy layout with rooftop and interpolated points.
//! Version 2 adds reverse geocode requests, bounding boxes and a few request
//! options. A feed file starts with a `Bing Spatial Data Services, {version}`
//! marker, optionally followed by a header row naming the columns.

use std::{
    collections::HashMap,
    io::{self, Write},
};

use crate::{
    data_source::SCHEMA_MARKER_PREFIX,
    geography::{BoundingBox, Coordinate},
    tokenizer::{DelimitedTokenizer, escape_cell},
};

use super::{
    Address, FeedError, FeedVersion, GeocodeEntity, GeocodeFeed, GeocodeRequest, GeocodeResponse,
    ReverseGeocodeRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressPart {
    AddressLine,
    AdminDistrict,
    CountryRegion,
    AdminDistrict2,
    FormattedAddress,
    Locality,
    PostalCode,
    PostalTown,
    Neighborhood,
    Landmark,
}

impl AddressPart {
    fn get(self, address: &Address) -> &str {
        match self {
            Self::AddressLine => &address.address_line,
            Self::AdminDistrict => &address.admin_district,
            Self::CountryRegion => &address.country_region,
            Self::AdminDistrict2 => &address.admin_district2,
            Self::FormattedAddress => &address.formatted_address,
            Self::Locality => &address.locality,
            Self::PostalCode => &address.postal_code,
            Self::PostalTown => &address.postal_town,
            Self::Neighborhood => &address.neighborhood,
            Self::Landmark => &address.landmark,
        }
    }

    const fn slot(self, address: &mut Address) -> &mut String {
        match self {
            Self::AddressLine => &mut address.address_line,
            Self::AdminDistrict => &mut address.admin_district,
            Self::CountryRegion => &mut address.country_region,
            Self::AdminDistrict2 => &mut address.admin_district2,
            Self::FormattedAddress => &mut address.formatted_address,
            Self::Locality => &mut address.locality,
            Self::PostalCode => &mut address.postal_code,
            Self::PostalTown => &mut address.postal_town,
            Self::Neighborhood => &mut address.neighborhood,
            Self::Landmark => &mut address.landmark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Culture,
    Query,
    RequestAddress(AddressPart),
    MinimumConfidence,
    IncludeNeighborhood,
    MaxResults,
    ReverseCulture,
    ReverseEntityTypes,
    ReverseLatitude,
    ReverseLongitude,
    ResponseAddress(AddressPart),
    Confidence,
    Name,
    EntityType,
    MatchCodes,
    PointLatitude,
    PointLongitude,
    InterpolatedLatitude,
    InterpolatedLongitude,
    South,
    West,
    North,
    East,
    StatusCode,
    FaultReason,
    TraceId,
}

use AddressPart as A;
use Field as F;

const V1_LAYOUT: &[(&str, Field)] = &[
    ("Id", F::Id),
    ("GeocodeRequest/Culture", F::Culture),
    ("GeocodeRequest/Query", F::Query),
    ("GeocodeRequest/Address/AddressLine", F::RequestAddress(A::AddressLine)),
    ("GeocodeRequest/Address/AdminDistrict", F::RequestAddress(A::AdminDistrict)),
    ("GeocodeRequest/Address/CountryRegion", F::RequestAddress(A::CountryRegion)),
    ("GeocodeRequest/Address/AdminDistrict2", F::RequestAddress(A::AdminDistrict2)),
    ("GeocodeRequest/Address/FormattedAddress", F::RequestAddress(A::FormattedAddress)),
    ("GeocodeRequest/Address/Locality", F::RequestAddress(A::Locality)),
    ("GeocodeRequest/Address/PostalCode", F::RequestAddress(A::PostalCode)),
    ("GeocodeRequest/Address/PostalTown", F::RequestAddress(A::PostalTown)),
    ("GeocodeRequest/ConfidenceFilter/MinimumConfidence", F::MinimumConfidence),
    ("GeocodeResponse/Address/AddressLine", F::ResponseAddress(A::AddressLine)),
    ("GeocodeResponse/Address/AdminDistrict", F::ResponseAddress(A::AdminDistrict)),
    ("GeocodeResponse/Address/CountryRegion", F::ResponseAddress(A::CountryRegion)),
    ("GeocodeResponse/Address/AdminDistrict2", F::ResponseAddress(A::AdminDistrict2)),
    ("GeocodeResponse/Address/FormattedAddress", F::ResponseAddress(A::FormattedAddress)),
    ("GeocodeResponse/Address/Locality", F::ResponseAddress(A::Locality)),
    ("GeocodeResponse/Address/PostalCode", F::ResponseAddress(A::PostalCode)),
    ("GeocodeResponse/Address/PostalTown", F::ResponseAddress(A::PostalTown)),
    ("GeocodeResponse/Confidence", F::Confidence),
    ("GeocodeResponse/DisplayName", F::Name),
    ("GeocodeResponse/EntityType", F::EntityType),
    ("GeocodeResponse/RooftopLocation/Latitude", F::PointLatitude),
    ("GeocodeResponse/RooftopLocation/Longitude", F::PointLongitude),
    ("GeocodeResponse/InterpolatedLocation/Latitude", F::InterpolatedLatitude),
    ("GeocodeResponse/InterpolatedLocation/Longitude", F::InterpolatedLongitude),
    ("StatusCode", F::StatusCode),
    ("FaultReason", F::FaultReason),
    ("TraceId", F::TraceId),
];

const V2_LAYOUT: &[(&str, Field)] = &[
    ("Id", F::Id),
    ("GeocodeRequest/Culture", F::Culture),
    ("GeocodeRequest/Query", F::Query),
    ("GeocodeRequest/Address/AddressLine", F::RequestAddress(A::AddressLine)),
    ("GeocodeRequest/Address/AdminDistrict", F::RequestAddress(A::AdminDistrict)),
    ("GeocodeRequest/Address/CountryRegion", F::RequestAddress(A::CountryRegion)),
    ("GeocodeRequest/Address/AdminDistrict2", F::RequestAddress(A::AdminDistrict2)),
    ("GeocodeRequest/Address/FormattedAddress", F::RequestAddress(A::FormattedAddress)),
    ("GeocodeRequest/Address/Locality", F::RequestAddress(A::Locality)),
    ("GeocodeRequest/Address/PostalCode", F::RequestAddress(A::PostalCode)),
    ("GeocodeRequest/Address/PostalTown", F::RequestAddress(A::PostalTown)),
    ("GeocodeRequest/ConfidenceFilter/MinimumConfidence", F::MinimumConfidence),
    ("GeocodeRequest/IncludeNeighborhood", F::IncludeNeighborhood),
    ("GeocodeRequest/MaxResults", F::MaxResults),
    ("ReverseGeocodeRequest/Culture", F::ReverseCulture),
    ("ReverseGeocodeRequest/IncludeEntityTypes", F::ReverseEntityTypes),
    ("ReverseGeocodeRequest/Location/Latitude", F::ReverseLatitude),
    ("ReverseGeocodeRequest/Location/Longitude", F::ReverseLongitude),
    ("GeocodeResponse/Address/AddressLine", F::ResponseAddress(A::AddressLine)),
    ("GeocodeResponse/Address/AdminDistrict", F::ResponseAddress(A::AdminDistrict)),
    ("GeocodeResponse/Address/CountryRegion", F::ResponseAddress(A::CountryRegion)),
    ("GeocodeResponse/Address/AdminDistrict2", F::ResponseAddress(A::AdminDistrict2)),
    ("GeocodeResponse/Address/FormattedAddress", F::ResponseAddress(A::FormattedAddress)),
    ("GeocodeResponse/Address/Locality", F::ResponseAddress(A::Locality)),
    ("GeocodeResponse/Address/PostalCode", F::ResponseAddress(A::PostalCode)),
    ("GeocodeResponse/Address/PostalTown", F::ResponseAddress(A::PostalTown)),
    ("GeocodeResponse/Address/Neighborhood", F::ResponseAddress(A::Neighborhood)),
    ("GeocodeResponse/Address/Landmark", F::ResponseAddress(A::Landmark)),
    ("GeocodeResponse/Confidence", F::Confidence),
    ("GeocodeResponse/Name", F::Name),
    ("GeocodeResponse/EntityType", F::EntityType),
    ("GeocodeResponse/MatchCodes", F::MatchCodes),
    ("GeocodeResponse/Point/Latitude", F::PointLatitude),
    ("GeocodeResponse/Point/Longitude", F::PointLongitude),
    ("GeocodeResponse/BoundingBox/SouthLatitude", F::South),
    ("GeocodeResponse/BoundingBox/WestLongitude", F::West),
    ("GeocodeResponse/BoundingBox/NorthLatitude", F::North),
    ("GeocodeResponse/BoundingBox/EastLongitude", F::East),
    ("StatusCode", F::StatusCode),
    ("FaultReason", F::FaultReason),
    ("TraceId", F::TraceId),
];

const fn layout(version: FeedVersion) -> &'static [(&'static str, Field)] {
    match version {
        FeedVersion::V1 => V1_LAYOUT,
        FeedVersion::V2 => V2_LAYOUT,
    }
}

/// Header names of the delimited layout for `version`.
pub(crate) fn header_names(version: FeedVersion) -> impl Iterator<Item = &'static str> {
    layout(version).iter().map(|(name, _)| *name)
}

/// Fields of one row before they are attached to an entity.
#[derive(Debug, Default)]
struct RowDraft {
    entity: GeocodeEntity,
    request: GeocodeRequest,
    has_request: bool,
    reverse: ReverseGeocodeRequest,
    reverse_latitude: Option<f64>,
    reverse_longitude: Option<f64>,
    response: GeocodeResponse,
    has_response: bool,
    point: [Option<f64>; 2],
    interpolated: [Option<f64>; 2],
    bounds: [Option<f64>; 4],
}

impl RowDraft {
    fn apply(&mut self, field: Field, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let number = || text.parse::<f64>().ok();
        match field {
            F::Id => text.clone_into(&mut self.entity.id),
            F::StatusCode => text.clone_into(&mut self.entity.status_code),
            F::FaultReason => text.clone_into(&mut self.entity.fault_reason),
            F::TraceId => text.clone_into(&mut self.entity.trace_id),
            F::ReverseCulture => text.clone_into(&mut self.reverse.culture),
            F::ReverseEntityTypes => text.clone_into(&mut self.reverse.include_entity_types),
            F::ReverseLatitude => self.reverse_latitude = number(),
            F::ReverseLongitude => self.reverse_longitude = number(),
            F::Culture
            | F::Query
            | F::RequestAddress(_)
            | F::MinimumConfidence
            | F::IncludeNeighborhood
            | F::MaxResults => {
                self.has_request = true;
                self.apply_request(field, text);
            }
            _ => {
                self.has_response = true;
                self.apply_response(field, text, number());
            }
        }
    }

    fn apply_request(&mut self, field: Field, text: &str) {
        let request = &mut self.request;
        match field {
            F::Culture => text.clone_into(&mut request.culture),
            F::Query => text.clone_into(&mut request.query),
            F::RequestAddress(part) => text.clone_into(part.slot(&mut request.address)),
            F::MinimumConfidence => text.clone_into(&mut request.minimum_confidence),
            F::IncludeNeighborhood => {
                request.include_neighborhood = text.eq_ignore_ascii_case("true") || text == "1";
            }
            F::MaxResults => request.max_results = text.parse().ok(),
            _ => {}
        }
    }

    fn apply_response(&mut self, field: Field, text: &str, number: Option<f64>) {
        let response = &mut self.response;
        match field {
            F::ResponseAddress(part) => text.clone_into(part.slot(&mut response.address)),
            F::Confidence => text.clone_into(&mut response.confidence),
            F::Name => text.clone_into(&mut response.name),
            F::EntityType => text.clone_into(&mut response.entity_type),
            F::MatchCodes => text.clone_into(&mut response.match_codes),
            F::PointLatitude => self.point[0] = number,
            F::PointLongitude => self.point[1] = number,
            F::InterpolatedLatitude => self.interpolated[0] = number,
            F::InterpolatedLongitude => self.interpolated[1] = number,
            F::South => self.bounds[0] = number,
            F::West => self.bounds[1] = number,
            F::North => self.bounds[2] = number,
            F::East => self.bounds[3] = number,
            _ => {}
        }
    }

    fn finish(self) -> GeocodeEntity {
        let Self {
            mut entity,
            request,
            has_request,
            mut reverse,
            reverse_latitude,
            reverse_longitude,
            mut response,
            has_response,
            point,
            interpolated,
            bounds,
        } = self;
        if has_request {
            entity.request = Some(request);
        }
        if let (Some(latitude), Some(longitude)) = (reverse_latitude, reverse_longitude) {
            reverse.location = Coordinate::new(latitude, longitude);
            entity.reverse_request = Some(reverse);
        }
        if has_response {
            response.interpolated_point = pair(interpolated);
            response.point = pair(point).or(response.interpolated_point);
            if let [Some(south), Some(west), Some(north), Some(east)] = bounds {
                response.bounding_box = Some(BoundingBox::new(south, west, north, east));
            }
            entity.responses.push(response);
        }
        entity
    }
}

fn pair(values: [Option<f64>; 2]) -> Option<Coordinate> {
    match values {
        [Some(latitude), Some(longitude)] => Some(Coordinate::new(latitude, longitude)),
        _ => None,
    }
}

/// Version announced by a marker row, if `cells` is one.
fn marker_version(cells: &[String]) -> Option<Result<FeedVersion, FeedError>> {
    let first = cells.first()?;
    if !first.trim_start().starts_with(SCHEMA_MARKER_PREFIX) {
        return None;
    }
    let version = if cells.len() >= 2 {
        cells.get(1).map(|cell| cell.trim().to_owned())
    } else {
        first.split(',').nth(1).map(|token| token.trim().to_owned())
    }
    .unwrap_or_default();
    Some(version.parse())
}

fn is_header_row(cells: &[String]) -> bool {
    cells
        .first()
        .is_some_and(|cell| cell.trim().eq_ignore_ascii_case("Id"))
}

pub(crate) fn parse(text: &str, delimiter: char) -> Result<GeocodeFeed, FeedError> {
    let mut rows = DelimitedTokenizer::new(text, delimiter)
        .filter(|cells| !(cells.len() == 1 && cells.iter().all(String::is_empty)))
        .peekable();

    let marked = rows.peek().and_then(|cells| marker_version(cells)).transpose()?;
    if marked.is_some() {
        rows.next();
    }
    let header_len = rows.peek().filter(|cells| is_header_row(cells)).map(Vec::len);
    if header_len.is_some() {
        rows.next();
    }
    let version = marked.unwrap_or_else(|| match header_len {
        Some(len) if len == V1_LAYOUT.len() => FeedVersion::V1,
        _ => FeedVersion::V2,
    });

    let mut feed = GeocodeFeed::with_version(version);
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for cells in rows {
        let mut draft = RowDraft::default();
        for ((_, field), cell) in layout(version).iter().zip(&cells) {
            draft.apply(*field, cell);
        }
        let entity = draft.finish();
        match by_id.get(&entity.id).and_then(|index| feed.entities.get_mut(*index)) {
            Some(existing) => {
                existing.responses.extend(entity.responses);
                if existing.request.is_none() {
                    existing.request = entity.request;
                }
                if existing.reverse_request.is_none() {
                    existing.reverse_request = entity.reverse_request;
                }
            }
            None => {
                by_id.insert(entity.id.clone(), feed.entities.len());
                feed.entities.push(entity);
            }
        }
    }
    log::debug!(
        "parsed {} geocode entities from a version {} feed",
        feed.entities.len(),
        version
    );
    Ok(feed)
}

pub(crate) fn write<W: Write>(
    feed: &GeocodeFeed,
    mut writer: W,
    delimiter: char,
) -> io::Result<()> {
    let separator = delimiter.to_string();
    let layout = layout(feed.version);
    write!(
        writer,
        "{SCHEMA_MARKER_PREFIX}, {}\r\n",
        feed.version
    )?;
    let header: Vec<&str> = header_names(feed.version).collect();
    write!(writer, "{}\r\n", header.join(&separator))?;
    for entity in &feed.entities {
        let responses: Vec<Option<&GeocodeResponse>> = if entity.responses.is_empty() {
            vec![None]
        } else {
            entity.responses.iter().map(Some).collect()
        };
        for response in responses {
            let cells: Vec<String> = layout
                .iter()
                .map(|(_, field)| escape_cell(&cell_text(*field, entity, response), delimiter))
                .collect();
            write!(writer, "{}\r\n", cells.join(&separator))?;
        }
    }
    writer.flush()
}

fn cell_text(field: Field, entity: &GeocodeEntity, response: Option<&GeocodeResponse>) -> String {
    let request = entity.request.as_ref();
    let reverse = entity.reverse_request.as_ref();
    let point = response.and_then(|r| r.point);
    let interpolated = response.and_then(|r| r.interpolated_point);
    let bounds = response.and_then(|r| r.bounding_box);
    let number = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    let text = |value: Option<&str>| value.unwrap_or_default().to_owned();
    match field {
        F::Id => entity.id.clone(),
        F::StatusCode => entity.status_code.clone(),
        F::FaultReason => entity.fault_reason.clone(),
        F::TraceId => entity.trace_id.clone(),
        F::Culture => text(request.map(|r| r.culture.as_str())),
        F::Query => text(request.map(|r| r.query.as_str())),
        F::RequestAddress(part) => text(request.map(|r| part.get(&r.address))),
        F::MinimumConfidence => text(request.map(|r| r.minimum_confidence.as_str())),
        F::IncludeNeighborhood => text(
            request
                .filter(|r| r.include_neighborhood)
                .map(|_| "true"),
        ),
        F::MaxResults => request
            .and_then(|r| r.max_results)
            .map(|max| max.to_string())
            .unwrap_or_default(),
        F::ReverseCulture => text(reverse.map(|r| r.culture.as_str())),
        F::ReverseEntityTypes => text(reverse.map(|r| r.include_entity_types.as_str())),
        F::ReverseLatitude => number(reverse.map(|r| r.location.latitude())),
        F::ReverseLongitude => number(reverse.map(|r| r.location.longitude())),
        F::ResponseAddress(part) => text(response.map(|r| part.get(&r.address))),
        F::Confidence => text(response.map(|r| r.confidence.as_str())),
        F::Name => text(response.map(|r| r.name.as_str())),
        F::EntityType => text(response.map(|r| r.entity_type.as_str())),
        F::MatchCodes => text(response.map(|r| r.match_codes.as_str())),
        F::PointLatitude => number(point.map(|p| p.latitude())),
        F::PointLongitude => number(point.map(|p| p.longitude())),
        F::InterpolatedLatitude => number(interpolated.map(|p| p.latitude())),
        F::InterpolatedLongitude => number(interpolated.map(|p| p.longitude())),
        F::South => number(bounds.map(|b| b.south())),
        F::West => number(bounds.map(|b| b.west())),
        F::North => number(bounds.map(|b| b.north())),
        F::East => number(bounds.map(|b| b.east())),
    }
}

//! The `GeocodeFeed` XML document.

use std::io::{self, Write};

use crate::{
    geography::{BoundingBox, Coordinate},
    xml::{Element, XmlWriter, parse_document},
};

use super::{
    Address, FeedError, FeedVersion, GeocodeEntity, GeocodeFeed, GeocodeRequest, GeocodeResponse,
    ReverseGeocodeRequest,
};

/// Namespace of geocode feed documents.
pub const GEOCODE_NAMESPACE: &str = "http://schemas.microsoft.com/search/local/2010/5/geocode";

pub(crate) fn parse(text: &str) -> Result<GeocodeFeed, FeedError> {
    let root = parse_document(text).map_err(|source| FeedError::Xml { source })?;
    if !root.local_name().eq_ignore_ascii_case("GeocodeFeed") {
        return Err(FeedError::Schema {
            message: format!("expected a GeocodeFeed root, found '{}'", root.name),
        });
    }
    let version = match root.attribute("Version") {
        Some(version) => version.parse()?,
        None => FeedVersion::default(),
    };
    let mut feed = GeocodeFeed::with_version(version);
    for element in root.children_named("GeocodeEntity") {
        feed.entities.push(entity_from(element));
    }
    Ok(feed)
}

fn entity_from(element: &Element) -> GeocodeEntity {
    let mut entity = GeocodeEntity::new(element.attribute("Id").unwrap_or_default());
    entity.request = element.child("GeocodeRequest").map(request_from);
    entity.reverse_request = element
        .child("ReverseGeocodeRequest")
        .and_then(reverse_request_from);
    entity.responses = element
        .children_named("GeocodeResponse")
        .map(response_from)
        .collect();

    let first_response = element.child("GeocodeResponse");
    let status = |name: &str| {
        element
            .attribute(name)
            .or_else(|| first_response.and_then(|response| response.attribute(name)))
            .unwrap_or_default()
            .to_owned()
    };
    entity.status_code = status("StatusCode");
    entity.fault_reason = status("FaultReason");
    entity.trace_id = status("TraceId");
    entity
}

fn request_from(element: &Element) -> GeocodeRequest {
    let text = |name: &str| element.attribute(name).unwrap_or_default().to_owned();
    GeocodeRequest {
        culture: text("Culture"),
        query: text("Query"),
        address: element.child("Address").map(address_from).unwrap_or_default(),
        minimum_confidence: element
            .child("ConfidenceFilter")
            .and_then(|filter| filter.attribute("MinimumConfidence"))
            .unwrap_or_default()
            .to_owned(),
        include_neighborhood: element
            .attribute("IncludeNeighborhood")
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true") || flag == "1"),
        max_results: element
            .attribute("MaxResults")
            .and_then(|max| max.trim().parse().ok()),
    }
}

fn reverse_request_from(element: &Element) -> Option<ReverseGeocodeRequest> {
    let location = coordinate_from(element.child("Location")?)?;
    Some(ReverseGeocodeRequest {
        culture: element.attribute("Culture").unwrap_or_default().to_owned(),
        location,
        include_entity_types: element
            .attribute("IncludeEntityTypes")
            .unwrap_or_default()
            .to_owned(),
    })
}

fn response_from(element: &Element) -> GeocodeResponse {
    let text = |name: &str| element.attribute(name).unwrap_or_default().to_owned();
    let mut response = GeocodeResponse {
        name: element
            .attribute("Name")
            .or_else(|| element.attribute("DisplayName"))
            .unwrap_or_default()
            .to_owned(),
        address: element.child("Address").map(address_from).unwrap_or_default(),
        confidence: text("Confidence"),
        entity_type: text("EntityType"),
        match_codes: text("MatchCodes"),
        bounding_box: element.child("BoundingBox").and_then(bounding_box_from),
        ..GeocodeResponse::default()
    };
    for point in element.children_named("GeocodePoint") {
        let method = point.attribute("CalculationMethod").unwrap_or_default();
        let Some(coordinate) = coordinate_from(point) else {
            continue;
        };
        if method.to_ascii_lowercase().starts_with("interpolation") {
            response.interpolated_point.get_or_insert(coordinate);
        } else {
            response.point.get_or_insert(coordinate);
        }
    }
    if response.point.is_none() {
        response.point = element
            .child("Point")
            .and_then(coordinate_from)
            .or(response.interpolated_point);
    }
    response
}

fn address_from(element: &Element) -> Address {
    let text = |name: &str| element.attribute(name).unwrap_or_default().to_owned();
    Address {
        address_line: text("AddressLine"),
        admin_district: text("AdminDistrict"),
        admin_district2: text("AdminDistrict2"),
        country_region: text("CountryRegion"),
        formatted_address: text("FormattedAddress"),
        locality: text("Locality"),
        postal_code: text("PostalCode"),
        postal_town: text("PostalTown"),
        neighborhood: text("Neighborhood"),
        landmark: text("Landmark"),
    }
}

fn coordinate_from(element: &Element) -> Option<Coordinate> {
    let number = |name: &str| element.attribute(name)?.trim().parse::<f64>().ok();
    Some(Coordinate::new(number("Latitude")?, number("Longitude")?))
}

fn bounding_box_from(element: &Element) -> Option<BoundingBox> {
    let number = |name: &str| element.attribute(name)?.trim().parse::<f64>().ok();
    Some(BoundingBox::new(
        number("SouthLatitude")?,
        number("WestLongitude")?,
        number("NorthLatitude")?,
        number("EastLongitude")?,
    ))
}

pub(crate) fn write<W: Write>(feed: &GeocodeFeed, writer: W) -> io::Result<()> {
    let version = feed.version.to_string();
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.open(
        "GeocodeFeed",
        &[("xmlns", GEOCODE_NAMESPACE), ("Version", version.as_str())],
    )?;
    for entity in &feed.entities {
        write_entity(&mut xml, entity)?;
    }
    xml.close("GeocodeFeed")?;
    xml.into_inner().flush()
}

fn write_entity<W: Write>(xml: &mut XmlWriter<W>, entity: &GeocodeEntity) -> io::Result<()> {
    let attributes = present(&[
        ("Id", entity.id.as_str()),
        ("StatusCode", entity.status_code.as_str()),
        ("FaultReason", entity.fault_reason.as_str()),
        ("TraceId", entity.trace_id.as_str()),
    ]);
    xml.open("GeocodeEntity", &attributes)?;
    if let Some(request) = &entity.request {
        let max_results = request.max_results.map(|max| max.to_string()).unwrap_or_default();
        let attributes = present(&[
            ("Culture", request.culture.as_str()),
            ("Query", request.query.as_str()),
            (
                "IncludeNeighborhood",
                if request.include_neighborhood { "true" } else { "" },
            ),
            ("MaxResults", max_results.as_str()),
        ]);
        xml.open("GeocodeRequest", &attributes)?;
        write_address(xml, &request.address)?;
        if !request.minimum_confidence.is_empty() {
            xml.empty(
                "ConfidenceFilter",
                &[("MinimumConfidence", request.minimum_confidence.as_str())],
            )?;
        }
        xml.close("GeocodeRequest")?;
    }
    if let Some(reverse) = &entity.reverse_request {
        let attributes = present(&[
            ("Culture", reverse.culture.as_str()),
            ("IncludeEntityTypes", reverse.include_entity_types.as_str()),
        ]);
        xml.open("ReverseGeocodeRequest", &attributes)?;
        write_point(xml, "Location", reverse.location, &[])?;
        xml.close("ReverseGeocodeRequest")?;
    }
    for response in &entity.responses {
        write_response(xml, response)?;
    }
    xml.close("GeocodeEntity")
}

fn write_response<W: Write>(xml: &mut XmlWriter<W>, response: &GeocodeResponse) -> io::Result<()> {
    let attributes = present(&[
        ("Name", response.name.as_str()),
        ("Confidence", response.confidence.as_str()),
        ("EntityType", response.entity_type.as_str()),
        ("MatchCodes", response.match_codes.as_str()),
    ]);
    xml.open("GeocodeResponse", &attributes)?;
    write_address(xml, &response.address)?;
    if let Some(bounds) = response.bounding_box {
        let edges = [
            bounds.south().to_string(),
            bounds.west().to_string(),
            bounds.north().to_string(),
            bounds.east().to_string(),
        ];
        let [south, west, north, east] = &edges;
        xml.empty(
            "BoundingBox",
            &[
                ("SouthLatitude", south.as_str()),
                ("WestLongitude", west.as_str()),
                ("NorthLatitude", north.as_str()),
                ("EastLongitude", east.as_str()),
            ],
        )?;
    }
    if let Some(point) = response.point {
        write_point(
            xml,
            "GeocodePoint",
            point,
            &[("CalculationMethod", "Rooftop"), ("Type", "Point"), ("UsageTypes", "Display")],
        )?;
    }
    if let Some(point) = response.interpolated_point {
        write_point(
            xml,
            "GeocodePoint",
            point,
            &[("CalculationMethod", "Interpolation"), ("Type", "Point"), ("UsageTypes", "Route")],
        )?;
    }
    xml.close("GeocodeResponse")
}

fn write_address<W: Write>(xml: &mut XmlWriter<W>, address: &Address) -> io::Result<()> {
    if address.is_empty() {
        return Ok(());
    }
    let attributes = present(&[
        ("AddressLine", address.address_line.as_str()),
        ("AdminDistrict", address.admin_district.as_str()),
        ("AdminDistrict2", address.admin_district2.as_str()),
        ("CountryRegion", address.country_region.as_str()),
        ("FormattedAddress", address.formatted_address.as_str()),
        ("Locality", address.locality.as_str()),
        ("PostalCode", address.postal_code.as_str()),
        ("PostalTown", address.postal_town.as_str()),
        ("Neighborhood", address.neighborhood.as_str()),
        ("Landmark", address.landmark.as_str()),
    ]);
    xml.empty("Address", &attributes)
}

fn write_point<W: Write>(
    xml: &mut XmlWriter<W>,
    name: &str,
    point: Coordinate,
    extra: &[(&str, &str)],
) -> io::Result<()> {
    let latitude = point.latitude().to_string();
    let longitude = point.longitude().to_string();
    let mut attributes = vec![("Latitude", latitude.as_str()), ("Longitude", longitude.as_str())];
    attributes.extend_from_slice(extra);
    xml.empty(name, &attributes)
}

/// Keep only attributes with a value.
fn present<'a>(attributes: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    attributes
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .copied()
        .collect()
}

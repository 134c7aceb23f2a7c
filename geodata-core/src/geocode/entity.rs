//! Request and response records carried by a geocode feed.

use crate::geography::{BoundingBox, Coordinate};

use super::Address;

/// Status code the service reports for a resolved entity.
pub const STATUS_SUCCESS: &str = "Success";

/// Culture used when none is given.
pub const DEFAULT_CULTURE: &str = "en-US";

/// A forward geocode request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeRequest {
    /// Culture such as `en-US`.
    pub culture: String,
    /// Free-form query, used instead of a structured address.
    pub query: String,
    /// Structured address.
    pub address: Address,
    /// Lowest confidence the caller accepts (`High`, `Medium`, `Low`).
    pub minimum_confidence: String,
    /// Whether neighbourhoods should be returned.
    pub include_neighborhood: bool,
    /// Maximum number of candidate responses.
    pub max_results: Option<u32>,
}

impl GeocodeRequest {
    /// A request for `address` in `culture`.
    #[must_use]
    pub fn for_address(address: Address, culture: &str) -> Self {
        Self {
            culture: culture.to_owned(),
            address,
            ..Self::default()
        }
    }
}

/// A reverse geocode request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReverseGeocodeRequest {
    /// Culture such as `en-US`.
    pub culture: String,
    /// Location to resolve.
    pub location: Coordinate,
    /// Comma separated entity types of interest.
    pub include_entity_types: String,
}

/// One candidate result for an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeResponse {
    /// Display name of the match.
    pub name: String,
    /// Matched address.
    pub address: Address,
    /// Display point, rooftop where available.
    pub point: Option<Coordinate>,
    /// Interpolated point along the street.
    pub interpolated_point: Option<Coordinate>,
    /// Extent of the match.
    pub bounding_box: Option<BoundingBox>,
    /// `High`, `Medium` or `Low`.
    pub confidence: String,
    /// Kind of entity matched, e.g. `Address` or `PopulatedPlace`.
    pub entity_type: String,
    /// Comma separated match codes, e.g. `Good`.
    pub match_codes: String,
}

/// A feed entry: the request sent and the responses received for one id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeEntity {
    /// Identifier, unique within a feed.
    pub id: String,
    /// Forward request, if any.
    pub request: Option<GeocodeRequest>,
    /// Reverse request, if any.
    pub reverse_request: Option<ReverseGeocodeRequest>,
    /// Candidate responses, best first.
    pub responses: Vec<GeocodeResponse>,
    /// Outcome reported by the service.
    pub status_code: String,
    /// Reason given for a failed entity.
    pub fault_reason: String,
    /// Service trace identifier.
    pub trace_id: String,
}

impl GeocodeEntity {
    /// An entity with the given id and nothing else.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Point of the best response.
    #[must_use]
    pub fn best_point(&self) -> Option<Coordinate> {
        self.responses
            .iter()
            .find_map(|response| response.point.or(response.interpolated_point))
    }

    /// Whether the service reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.eq_ignore_ascii_case(STATUS_SUCCESS)
    }
}

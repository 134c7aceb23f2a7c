//! Identity of a data source on the remote platform.

/// Host serving the query API for published data sources.
pub const DEFAULT_QUERY_BASE_URL: &str = "https://spatial.virtualearth.net";

const QUERY_PATH: &str = "/REST/v1/data/";

/// Access id, name and entity type of a data source, plus the keys used to
/// manage and query it.
///
/// The query URL is derived from the first three fields and can be parsed
/// back into them.
///
/// # Examples
/// ```
/// use geodata_core::DataSourceDetails;
///
/// let details = DataSourceDetails {
///     access_id: "20181f26d9e94c81acdf9496133d4f23".into(),
///     name: "FourthCoffeeSample".into(),
///     entity_type_name: "FourthCoffeeShops".into(),
///     ..DataSourceDetails::default()
/// };
/// let url = details.query_url(false);
/// assert_eq!(
///     url,
///     "https://spatial.virtualearth.net/REST/v1/data/20181f26d9e94c81acdf9496133d4f23/FourthCoffeeSample/FourthCoffeeShops"
/// );
/// let parsed = DataSourceDetails::from_query_url(&url).expect("query url");
/// assert_eq!(parsed.name, "FourthCoffeeSample");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataSourceDetails {
    /// Service-assigned access id.
    pub access_id: String,
    /// Data source name.
    pub name: String,
    /// Entity type name shared by every row.
    pub entity_type_name: String,
    /// Key allowed to manage the data source.
    pub master_key: String,
    /// Key allowed to query the data source.
    pub query_key: String,
    /// Free-form description.
    pub description: String,
}

impl DataSourceDetails {
    /// Query URL on the default host; staging URLs carry `isStaging=1`.
    #[must_use]
    pub fn query_url(&self, staging: bool) -> String {
        self.query_url_with_base(DEFAULT_QUERY_BASE_URL, staging)
    }

    /// Query URL on a caller-supplied host.
    #[must_use]
    pub fn query_url_with_base(&self, base_url: &str, staging: bool) -> String {
        let mut url = format!(
            "{}{QUERY_PATH}{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.access_id,
            self.name,
            self.entity_type_name
        );
        if staging {
            url.push_str("?isStaging=1");
        }
        url
    }

    /// Recover access id, name and entity type from a query URL.
    ///
    /// Returns `None` when the URL does not contain the data query path
    /// followed by three non-empty segments.
    #[must_use]
    pub fn from_query_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let start = path.to_ascii_lowercase().find(&QUERY_PATH.to_ascii_lowercase())?;
        let rest = path.get(start + QUERY_PATH.len()..)?;
        let mut segments = rest.split('/').filter(|segment| !segment.is_empty());
        let access_id = segments.next()?;
        let name = segments.next()?;
        let entity_type_name = segments.next()?;
        Some(Self {
            access_id: access_id.to_owned(),
            name: name.to_owned(),
            entity_type_name: entity_type_name.to_owned(),
            ..Self::default()
        })
    }
}

//! Postal addresses and their discovery in data source columns.

use crate::{data_source::DataSource, value::Value};

/// Column names recognised as the street line, in priority order.
pub const ADDRESS_LINE_ALIASES: &[&str] =
    &["AddressLine", "Street", "Road", "Address", "StreetAddress"];
/// Column names recognised as the city.
pub const LOCALITY_ALIASES: &[&str] = &["Locality", "City", "Town"];
/// Column names recognised as the state or province.
pub const ADMIN_DISTRICT_ALIASES: &[&str] = &["AdminDistrict", "State", "Province", "Region"];
/// Column names recognised as the county.
pub const ADMIN_DISTRICT2_ALIASES: &[&str] = &["AdminDistrict2", "County"];
/// Column names recognised as the postal code.
pub const POSTAL_CODE_ALIASES: &[&str] = &["PostalCode", "Zip", "ZipCode", "PostCode", "Postal"];
/// Column names recognised as the country.
pub const COUNTRY_REGION_ALIASES: &[&str] = &["CountryRegion", "Country"];

/// A structured postal address. Empty fields are empty strings.
///
/// Equality and hashing are field-wise, which is what duplicate grouping
/// relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Street line.
    pub address_line: String,
    /// State or province.
    pub admin_district: String,
    /// County.
    pub admin_district2: String,
    /// Country or region.
    pub country_region: String,
    /// Single-line rendering returned by the service.
    pub formatted_address: String,
    /// City.
    pub locality: String,
    /// Postal code.
    pub postal_code: String,
    /// Postal town.
    pub postal_town: String,
    /// Neighbourhood, response only.
    pub neighborhood: String,
    /// Landmark, response only.
    pub landmark: String,
}

impl Address {
    /// Whether every field is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.address_line,
            &self.admin_district,
            &self.admin_district2,
            &self.country_region,
            &self.formatted_address,
            &self.locality,
            &self.postal_code,
            &self.postal_town,
            &self.neighborhood,
            &self.landmark,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

/// Positions of the address-bearing columns of a data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressColumns {
    /// Street line column.
    pub address_line: Option<usize>,
    /// City column.
    pub locality: Option<usize>,
    /// State column.
    pub admin_district: Option<usize>,
    /// County column.
    pub admin_district2: Option<usize>,
    /// Postal code column.
    pub postal_code: Option<usize>,
    /// Country column.
    pub country_region: Option<usize>,
}

impl AddressColumns {
    /// Locate address columns by the first alias present for each part.
    ///
    /// Returns `None` when the data source has no street, city, state,
    /// postal code or country column at all.
    ///
    /// # Examples
    /// ```
    /// use geodata_core::{Column, DataSource, SemanticType};
    /// use geodata_core::geocode::AddressColumns;
    ///
    /// # fn main() -> Result<(), geodata_core::ColumnNameError> {
    /// let mut source = DataSource::new();
    /// source.push_column(Column::new("Street", SemanticType::String, false)?);
    /// source.push_column(Column::new("Zip", SemanticType::String, false)?);
    /// let columns = AddressColumns::detect(&source).expect("address columns");
    /// assert_eq!(columns.address_line, Some(0));
    /// assert_eq!(columns.postal_code, Some(1));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn detect(source: &DataSource) -> Option<Self> {
        let columns = Self {
            address_line: source.find_column(ADDRESS_LINE_ALIASES),
            locality: source.find_column(LOCALITY_ALIASES),
            admin_district: source.find_column(ADMIN_DISTRICT_ALIASES),
            admin_district2: source.find_column(ADMIN_DISTRICT2_ALIASES),
            postal_code: source.find_column(POSTAL_CODE_ALIASES),
            country_region: source.find_column(COUNTRY_REGION_ALIASES),
        };
        let any = [
            columns.address_line,
            columns.locality,
            columns.admin_district,
            columns.postal_code,
            columns.country_region,
        ]
        .iter()
        .any(Option::is_some);
        any.then_some(columns)
    }

    /// Build the address held by `row`.
    #[must_use]
    pub fn address(&self, row: &[Value]) -> Address {
        let text = |index: Option<usize>| {
            index
                .and_then(|index| row.get(index))
                .map(|value| value.to_text().trim().to_owned())
                .unwrap_or_default()
        };
        Address {
            address_line: text(self.address_line),
            admin_district: text(self.admin_district),
            admin_district2: text(self.admin_district2),
            country_region: text(self.country_region),
            locality: text(self.locality),
            postal_code: text(self.postal_code),
            ..Address::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, SemanticType};
    use rstest::rstest;

    fn source(names: &[&str]) -> DataSource {
        let mut source = DataSource::new();
        for name in names {
            source.push_column(
                Column::new(*name, SemanticType::String, false).expect("valid column"),
            );
        }
        source
    }

    #[rstest]
    fn prefers_earlier_aliases() {
        let columns =
            AddressColumns::detect(&source(&["Address", "Road", "City", "Country", "County"]))
                .expect("address columns");
        assert_eq!(columns.address_line, Some(1));
        assert_eq!(columns.locality, Some(2));
        assert_eq!(columns.country_region, Some(3));
        assert_eq!(columns.admin_district2, Some(4));
    }

    #[rstest]
    #[case(&["Name", "Latitude"])]
    #[case(&["Name", "County"])]
    fn requires_a_primary_address_column(#[case] names: &[&str]) {
        assert_eq!(AddressColumns::detect(&source(names)), None);
    }

    #[rstest]
    fn builds_addresses_from_cells() {
        let columns = AddressColumns::detect(&source(&["Street", "Zip"])).expect("address columns");
        let address = columns.address(&[Value::from(" 1 Main St "), Value::Int64(98052)]);
        assert_eq!(address.address_line, "1 Main St");
        assert_eq!(address.postal_code, "98052");
        assert!(!address.is_empty());
        assert!(Address::default().is_empty());
    }
}

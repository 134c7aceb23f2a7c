//! In-memory tabular data source.
//!
//! A [`DataSource`] holds identity details, an ordered list of typed
//! [`Column`]s and rows of [`Value`]s aligned with them. The submodules add
//! parsing ([`read`]), serialisation ([`write`]) and limit checks
//! ([`validate`]).

mod details;
mod error;
mod format;
pub mod read;
pub mod validate;
pub mod write;


pub use details::{DEFAULT_QUERY_BASE_URL, DataSourceDetails};
pub use error::DataSourceError;
pub use format::{DataSourceFormat, UnknownFormat};
pub use validate::ValidationReport;

use crate::{
    column::{Column, DELETE_ENTITY_COLUMN},
    value::Value,
};

/// Name given to a primary-key column appended by validation.
pub const DEFAULT_PRIMARY_KEY: &str = "EntityID";
/// Latitude column name.
pub const LATITUDE_COLUMN: &str = "Latitude";
/// Longitude column name.
pub const LONGITUDE_COLUMN: &str = "Longitude";
/// Prefix of the first line of a delimited data schema file.
pub const SCHEMA_MARKER_PREFIX: &str = "Bing Spatial Data Services";
/// Data schema version written to the marker line.
pub const SCHEMA_VERSION: &str = "1.0";
/// Entity type used when a data source has none.
pub const DEFAULT_ENTITY_TYPE: &str = "Entity";

/// Maximum columns per data source, latitude and longitude included.
pub const MAX_COLUMNS: usize = 352;
/// Row count above which validation warns.
pub const MAX_ROWS: usize = 200_000;
/// Maximum characters in a string cell.
pub const MAX_STRING_LEN: usize = 2_560;
/// Maximum coordinate pairs in a geography cell.
pub const MAX_GEOGRAPHY_POINTS: usize = 100_000;

/// One row of cells, positionally aligned with the columns.
pub type Row = Vec<Value>;

/// A named, typed table of entities.
///
/// # Examples
/// ```
/// use geodata_core::{DataSource, DataSourceFormat};
///
/// # fn main() -> Result<(), geodata_core::DataSourceError> {
/// let csv = "Bing Spatial Data Services, 1.0, Store\n\
///            EntityID(Edm.String,primaryKey),Name(Edm.String)\n\
///            1,Corner Shop\n";
/// let source = DataSource::read(csv.as_bytes(), DataSourceFormat::Csv)?;
/// assert_eq!(source.details().entity_type_name, "Store");
/// assert_eq!(source.rows().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DataSource {
    details: DataSourceDetails,
    columns: Vec<Column>,
    rows: Vec<Row>,
    last_error: Option<DataSourceError>,
}

impl DataSource {
    /// Create an empty data source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty data source with the given identity.
    #[must_use]
    pub fn with_details(details: DataSourceDetails) -> Self {
        Self {
            details,
            ..Self::default()
        }
    }

    /// Identity details.
    #[must_use]
    pub const fn details(&self) -> &DataSourceDetails {
        &self.details
    }

    /// Mutable identity details.
    pub const fn details_mut(&mut self) -> &mut DataSourceDetails {
        &mut self.details
    }

    /// Columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Mutable access to the columns.
    ///
    /// Callers that add or remove columns are responsible for keeping rows
    /// aligned; [`DataSource::push_column`] does so automatically.
    pub const fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }

    /// Rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Mutable access to the rows.
    pub const fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    /// Append a column and a `Null` cell to every existing row.
    pub fn push_column(&mut self, column: Column) {
        self.columns.push(column);
        for row in &mut self.rows {
            row.push(Value::Null);
        }
    }

    /// Append a row. No alignment check is made; validation reports
    /// mismatched rows.
    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Index of the column called `name`, ignoring case.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name_matches(name))
    }

    /// Index of the first primary-key column.
    #[must_use]
    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(Column::is_primary_key)
    }

    /// Index of the first column matching any of `aliases`, tried in order.
    ///
    /// # Examples
    /// ```
    /// use geodata_core::{Column, DataSource, SemanticType};
    ///
    /// # fn main() -> Result<(), geodata_core::ColumnNameError> {
    /// let mut source = DataSource::new();
    /// source.push_column(Column::new("Town", SemanticType::String, false)?);
    /// assert_eq!(source.find_column(&["Locality", "City", "Town"]), Some(0));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.column_index(alias))
    }

    /// Cell of row `row` in the column called `name`.
    #[must_use]
    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row)?.get(index)
    }

    /// Whether row `row` carries a truthy `__deleteEntity` cell.
    #[must_use]
    pub fn is_marked_for_deletion(&self, row: usize) -> bool {
        self.cell(row, DELETE_ENTITY_COLUMN)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether row `row` has both coordinates or a non-empty geography.
    #[must_use]
    pub fn row_has_location(&self, row: usize) -> bool {
        let has = |name: &str| self.cell(row, name).is_some_and(|value| !value.is_empty());
        if has(LATITUDE_COLUMN) && has(LONGITUDE_COLUMN) {
            return true;
        }
        self.rows.get(row).is_some_and(|cells| {
            cells
                .iter()
                .filter_map(Value::as_geography)
                .any(|geography| !geography.is_empty())
        })
    }

    /// The failure recorded by the last [`DataSource::read_into`] call.
    #[must_use]
    pub const fn last_error(&self) -> Option<&DataSourceError> {
        self.last_error.as_ref()
    }

    /// Entity type name, falling back to [`DEFAULT_ENTITY_TYPE`].
    pub(crate) fn entity_type_or_default(&self) -> &str {
        let name = self.details.entity_type_name.trim();
        if name.is_empty() {
            DEFAULT_ENTITY_TYPE
        } else {
            name
        }
    }
}

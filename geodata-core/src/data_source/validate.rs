//! Checks a data source against the platform's limits.
//!
//! Validation never aborts: problems accumulate into a [`ValidationReport`].
//! A missing primary key and missing coordinate columns are repaired in
//! place, each repair leaving a warning behind.

use std::collections::HashSet;

use crate::{
    column::{Column, SemanticType, validate_column_name},
    value::Value,
};

use super::{
    DEFAULT_PRIMARY_KEY, DataSource, DataSourceError, LATITUDE_COLUMN, LONGITUDE_COLUMN,
    MAX_COLUMNS, MAX_GEOGRAPHY_POINTS, MAX_ROWS, MAX_STRING_LEN,
};

/// Outcome of [`DataSource::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationReport {
    /// Problems the service would reject.
    pub errors: Vec<String>,
    /// Problems worth reporting that do not block an upload.
    pub warnings: Vec<String>,
    /// Whether every row carries a coordinate pair or a geography.
    pub all_rows_have_location: bool,
}

impl ValidationReport {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl DataSource {
    /// Validate the data source, repairing what can be repaired.
    ///
    /// # Examples
    /// ```
    /// use geodata_core::{Column, DataSource, SemanticType, Value};
    ///
    /// # fn main() -> Result<(), geodata_core::ColumnNameError> {
    /// let mut source = DataSource::new();
    /// source.details_mut().name = "Shops".into();
    /// source.details_mut().entity_type_name = "Shop".into();
    /// source.push_column(Column::new("Name", SemanticType::String, false)?);
    /// source.push_row(vec![Value::from("Corner Shop")]);
    ///
    /// let report = source.validate();
    /// assert!(report.is_valid());
    /// assert_eq!(source.columns().len(), 4); // EntityID, Latitude, Longitude added
    /// assert!(!report.all_rows_have_location);
    /// # Ok(())
    /// # }
    /// ```
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport {
            all_rows_have_location: true,
            ..ValidationReport::default()
        };
        if self.columns.is_empty() {
            report.errors.push("The data source has no columns.".to_owned());
            report.all_rows_have_location = false;
            return report;
        }
        self.check_identity(&mut report);

        match self.ensure_primary_key() {
            Ok(true) => report.warnings.push(format!(
                "No primary key column was found; a '{DEFAULT_PRIMARY_KEY}' column was added and filled with row numbers."
            )),
            Ok(false) => {}
            Err(err) => report.errors.push(err.to_string()),
        }
        for name in self.ensure_location_columns() {
            report
                .warnings
                .push(format!("No '{name}' column was found; an empty one was added."));
        }

        self.check_columns(&mut report);
        self.check_row_counts(&mut report);
        for index in 0..self.rows.len() {
            self.check_row(index, &mut report);
        }
        if report.all_rows_have_location {
            log::debug!("every row has a location");
        }
        report
    }

    /// Make sure a primary-key column exists.
    ///
    /// Returns `Ok(true)` when a string key column named
    /// [`DEFAULT_PRIMARY_KEY`] was appended and filled with row indices, and
    /// fails when an unflagged column already carries that name.
    pub fn ensure_primary_key(&mut self) -> Result<bool, DataSourceError> {
        if self.primary_key_index().is_some() {
            return Ok(false);
        }
        if let Some(existing) = self.column_index(DEFAULT_PRIMARY_KEY) {
            let name = self
                .columns
                .get(existing)
                .map_or_else(|| DEFAULT_PRIMARY_KEY.to_owned(), |c| c.name().to_owned());
            return Err(DataSourceError::AmbiguousPrimaryKey { name });
        }
        log::warn!("adding primary key column '{DEFAULT_PRIMARY_KEY}'");
        self.push_column(Column::unchecked(
            DEFAULT_PRIMARY_KEY,
            SemanticType::String,
            true,
        ));
        for (index, row) in self.rows.iter_mut().enumerate() {
            if let Some(cell) = row.last_mut() {
                *cell = Value::String(index.to_string());
            }
        }
        Ok(true)
    }

    /// Append missing `Latitude`/`Longitude` double columns.
    ///
    /// Returns the names of the columns that were added.
    pub fn ensure_location_columns(&mut self) -> Vec<&'static str> {
        let mut added = Vec::new();
        for name in [LATITUDE_COLUMN, LONGITUDE_COLUMN] {
            if self.column_index(name).is_none() {
                log::warn!("adding location column '{name}'");
                self.push_column(Column::unchecked(name, SemanticType::Double, false));
                added.push(name);
            }
        }
        added
    }

    fn check_identity(&self, report: &mut ValidationReport) {
        let checks = [
            ("data source name", self.details.name.as_str()),
            ("entity type name", self.details.entity_type_name.as_str()),
        ];
        for (label, value) in checks {
            if value.trim().is_empty() {
                report.errors.push(format!("The {label} is missing."));
            } else if let Err(err) = validate_column_name(value) {
                report
                    .errors
                    .push(format!("The {label} '{value}' is invalid: {err}."));
            }
        }
    }

    fn check_columns(&self, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if let Err(err) = validate_column_name(column.name()) {
                report.errors.push(format!("Invalid column name: {err}."));
            }
            if !seen.insert(column.name().to_ascii_lowercase()) {
                report
                    .errors
                    .push(format!("Duplicate column name '{}'.", column.name()));
            }
        }
        if self.columns.len() > MAX_COLUMNS {
            report.errors.push(format!(
                "The data source has {} columns; at most {MAX_COLUMNS} are allowed, Latitude and Longitude included.",
                self.columns.len()
            ));
        }
    }

    fn check_row_counts(&self, report: &mut ValidationReport) {
        if self.rows.is_empty() {
            report.warnings.push("The data source has no rows.".to_owned());
        } else if self.rows.len() > MAX_ROWS {
            report.warnings.push(format!(
                "The data source has {} rows; uploads are limited to {MAX_ROWS}.",
                self.rows.len()
            ));
        }
    }

    fn check_row(&self, index: usize, report: &mut ValidationReport) {
        let number = index + 1;
        let Some(row) = self.rows.get(index) else {
            return;
        };
        if row.len() != self.columns.len() {
            report.errors.push(format!(
                "Row {number} has {} cells but the data source has {} columns.",
                row.len(),
                self.columns.len()
            ));
            report.all_rows_have_location = false;
            return;
        }

        let mut has_latitude = false;
        let mut has_longitude = false;
        let mut has_geography = false;
        for (column, value) in self.columns.iter().zip(row) {
            match value {
                Value::String(text) if text.chars().count() > MAX_STRING_LEN => {
                    report.errors.push(format!(
                        "Row {number}: '{}' is longer than {MAX_STRING_LEN} characters.",
                        column.name()
                    ));
                }
                Value::Geography(geography) => {
                    let points = geography.point_count();
                    if points > MAX_GEOGRAPHY_POINTS {
                        report.errors.push(format!(
                            "Row {number}: '{}' has {points} points; the limit is {MAX_GEOGRAPHY_POINTS}.",
                            column.name()
                        ));
                    } else if points > 0 {
                        has_geography = true;
                    }
                }
                _ => {}
            }
            if column.name_matches(LATITUDE_COLUMN) {
                has_latitude = check_coordinate(value, 90.0, number, LATITUDE_COLUMN, report);
            } else if column.name_matches(LONGITUDE_COLUMN) {
                has_longitude = check_coordinate(value, 180.0, number, LONGITUDE_COLUMN, report);
            }
        }

        if !(has_geography || (has_latitude && has_longitude)) {
            report.warnings.push(format!(
                "Row {number} is missing location data: it needs a Latitude and Longitude or a Geography value."
            ));
            report.all_rows_have_location = false;
        }
    }
}

/// Range check one coordinate cell; returns whether the cell holds a value.
fn check_coordinate(
    value: &Value,
    limit: f64,
    number: usize,
    name: &str,
    report: &mut ValidationReport,
) -> bool {
    if value.is_empty() {
        return false;
    }
    match value.as_f64() {
        Some(coordinate) if coordinate.abs() <= limit => {}
        Some(coordinate) => report.errors.push(format!(
            "Row {number}: {name} {coordinate} is outside [-{limit}, {limit}]."
        )),
        None => report
            .errors
            .push(format!("Row {number}: {name} is not a number.")),
    }
    true
}

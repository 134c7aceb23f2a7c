//! Geocoding the rows of a data source.

use std::collections::{HashMap, HashSet};

use geodata_core::{
    Address, DataSource, GeocodeEntity, GeocodeFeed, Value,
    data_source::{LATITUDE_COLUMN, LONGITUDE_COLUMN},
    geocode::{AddressColumns, GeocodeRequest},
};

use super::BatchGeocoder;
use crate::dataflow::{DataflowError, DataflowTransport};

/// Result of geocoding a data source.
#[derive(Debug, Default)]
pub struct DataSourceGeocodeOutcome {
    /// Rows that received coordinates.
    pub geocoded_rows: usize,
    /// Primary-key values of rows that could not be geocoded.
    pub failed_rows: Vec<String>,
    /// Why the whole operation failed; no row was updated when set.
    pub error: Option<DataflowError>,
}

impl DataSourceGeocodeOutcome {
    /// Whether the operation ran to completion. Individual rows may still
    /// have failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Rows sharing one address, submitted as a single entity.
struct AddressGroup {
    address: Address,
    rows: Vec<usize>,
}

impl<T: DataflowTransport> BatchGeocoder<T> {
    /// Fill `Latitude`/`Longitude` for rows that have an address but no
    /// location.
    ///
    /// Rows carrying a geography or both coordinates, and rows marked for
    /// deletion, are left alone. Rows with identical addresses are geocoded
    /// once and all receive the result.
    pub async fn geocode_data_source(
        &self,
        source: &mut DataSource,
        key: &str,
        culture: &str,
    ) -> DataSourceGeocodeOutcome {
        let mut outcome = DataSourceGeocodeOutcome::default();
        if let Err(err) = self.geocode_rows(source, key, culture, &mut outcome).await {
            log::warn!("data source geocoding failed: {err}");
            outcome.geocoded_rows = 0;
            outcome.failed_rows.clear();
            outcome.error = Some(err);
        }
        outcome
    }

    async fn geocode_rows(
        &self,
        source: &mut DataSource,
        key: &str,
        culture: &str,
        outcome: &mut DataSourceGeocodeOutcome,
    ) -> Result<(), DataflowError> {
        if key.trim().is_empty() {
            return Err(DataflowError::MissingKey {
                operation: "geocoding",
            });
        }
        let columns = AddressColumns::detect(source).ok_or(DataflowError::NoAddressColumns)?;
        source.ensure_primary_key()?;
        source.ensure_location_columns();

        let (groups, unaddressed) = group_rows(source, &columns);
        outcome.failed_rows = primary_keys(source, &unaddressed);
        if groups.is_empty() {
            log::info!("no rows need geocoding");
            return Ok(());
        }

        let feed = GeocodeFeed::from_entities(
            groups
                .iter()
                .enumerate()
                .map(|(id, group)| {
                    let mut entity = GeocodeEntity::new(id.to_string());
                    entity.request =
                        Some(GeocodeRequest::for_address(group.address.clone(), culture));
                    entity
                })
                .collect(),
        );
        log::info!(
            "submitting {} unique addresses for {} rows",
            groups.len(),
            groups.iter().map(|group| group.rows.len()).sum::<usize>()
        );
        let result = self.geocode(&feed, key).await;
        if let Some(err) = result.error {
            return Err(err);
        }

        self.notify("Merging geocode results.");
        let (Some(latitude), Some(longitude)) = (
            source.column_index(LATITUDE_COLUMN),
            source.column_index(LONGITUDE_COLUMN),
        ) else {
            return Ok(());
        };
        let mut resolved = HashSet::new();
        for entity in result.succeeded.entities() {
            let Ok(id) = entity.id.parse::<usize>() else {
                continue;
            };
            let Some(group) = groups.get(id) else {
                continue;
            };
            let succeeded = entity.status_code.is_empty() || entity.is_success();
            let Some(point) = entity.best_point().filter(|_| succeeded) else {
                continue;
            };
            for &row in &group.rows {
                if let Some(cells) = source.rows_mut().get_mut(row) {
                    set_cell(cells, latitude, Value::Double(point.latitude()));
                    set_cell(cells, longitude, Value::Double(point.longitude()));
                }
            }
            outcome.geocoded_rows += group.rows.len();
            resolved.insert(id);
        }

        let unresolved: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(id, _)| !resolved.contains(id))
            .flat_map(|(_, group)| group.rows.iter().copied())
            .collect();
        outcome.failed_rows.extend(primary_keys(source, &unresolved));
        Ok(())
    }
}

/// Group rows needing coordinates by address. Returns the groups in first
/// appearance order and the rows whose address is blank.
fn group_rows(source: &DataSource, columns: &AddressColumns) -> (Vec<AddressGroup>, Vec<usize>) {
    let mut groups: Vec<AddressGroup> = Vec::new();
    let mut index: HashMap<Address, usize> = HashMap::new();
    let mut unaddressed = Vec::new();
    for (row, cells) in source.rows().iter().enumerate() {
        if source.row_has_location(row) || source.is_marked_for_deletion(row) {
            continue;
        }
        let address = columns.address(cells);
        if address.is_empty() {
            unaddressed.push(row);
            continue;
        }
        if let Some(group) = index.get(&address).and_then(|&slot| groups.get_mut(slot)) {
            group.rows.push(row);
        } else {
            index.insert(address.clone(), groups.len());
            groups.push(AddressGroup {
                address,
                rows: vec![row],
            });
        }
    }
    (groups, unaddressed)
}

fn primary_keys(source: &DataSource, rows: &[usize]) -> Vec<String> {
    let key = source.primary_key_index();
    rows.iter()
        .map(|&row| {
            key.and_then(|column| source.rows().get(row)?.get(column))
                .map_or_else(|| row.to_string(), Value::to_text)
        })
        .collect()
}

fn set_cell(cells: &mut [Value], column: usize, value: Value) {
    if let Some(cell) = cells.get_mut(column) {
        *cell = value;
    }
}

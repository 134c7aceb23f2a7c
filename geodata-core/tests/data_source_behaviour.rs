//! Behavioural tests for data source validation.

use geodata_core::{DataSource, DataSourceFormat, ValidationReport};
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

thread_local! {
    static SOURCE: RefCell<Option<DataSource>> = const { RefCell::new(None) };
    static REPORT: RefCell<Option<ValidationReport>> = const { RefCell::new(None) };
}

const SHOPS: &str = "\
Bing Spatial Data Services, 1.0, Shop
EntityID(Edm.String,primaryKey),Name(Edm.String),Latitude(Edm.Double),Longitude(Edm.Double)
1,Corner Shop,47.6,-122.3
2,\"Kiosk, North\",,
";

fn report() -> ValidationReport {
    REPORT.with(|cell| cell.borrow().clone().expect("validation must have run"))
}

#[given("a CSV data source with two shops")]
fn csv_shops() {
    let mut source = DataSource::parse(SHOPS, DataSourceFormat::Csv).expect("parse shops");
    source.details_mut().name = "Shops".into();
    SOURCE.with(|cell| *cell.borrow_mut() = Some(source));
}

#[given("a data source without a name or entity type")]
fn anonymous_source() {
    let mut source = DataSource::parse(SHOPS, DataSourceFormat::Csv).expect("parse shops");
    source.details_mut().entity_type_name.clear();
    source.details_mut().name.clear();
    SOURCE.with(|cell| *cell.borrow_mut() = Some(source));
}

#[when("the data source is validated")]
fn validate_source() {
    let report = SOURCE.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .expect("source must be initialised")
            .validate()
    });
    REPORT.with(|cell| *cell.borrow_mut() = Some(report));
}

#[then("no validation errors are reported")]
fn no_errors() {
    let report = report();
    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);
}

#[then("one warning names row 2")]
fn warning_for_second_row() {
    let report = report();
    assert_eq!(report.warnings.len(), 1, "warnings: {:?}", report.warnings);
    assert!(report.warnings[0].starts_with("Row 2 "));
}

#[then("not every row has a location")]
fn partial_locations() {
    assert!(!report().all_rows_have_location);
}

#[then("the identity errors are reported")]
fn identity_errors() {
    let report = report();
    assert!(!report.is_valid());
    assert_eq!(report.errors.len(), 2, "errors: {:?}", report.errors);
}

#[scenario(path = "tests/features/data_source.feature", index = 0)]
fn unlocated_row_warns() {}

#[scenario(path = "tests/features/data_source.feature", index = 1)]
fn missing_identity_fails() {}

//! Unit tests for batch geocoding.

use std::{cell::RefCell, io::Read, rc::Rc, time::Duration};

use flate2::read::GzDecoder;
use geodata_core::{
    Column, Coordinate, DataSource, DataSourceDetails, DataSourceFormat, GeocodeEntity,
    GeocodeFeed, SemanticType, Value,
    geocode::{GeocodeResponse, STATUS_SUCCESS},
};
use rstest::{fixture, rstest};

use super::*;
use crate::dataflow::test_support::{ScriptedTransport, block_on_for_tests, job_status_json};

const LOCATION: &str = "https://example.org/REST/v1/Dataflows/Geocode/job-1";
const SUCCEEDED_URL: &str = "https://example.org/REST/v1/Dataflows/Geocode/job-1/output/succeeded";
const FAILED_URL: &str = "https://example.org/REST/v1/Dataflows/Geocode/job-1/output/failed";

#[fixture]
fn config() -> DataflowConfig {
    DataflowConfig::new("https://example.org/REST/v1").with_poll_interval(Duration::ZERO)
}

fn answered(id: &str, latitude: f64, longitude: f64) -> GeocodeEntity {
    let mut entity = GeocodeEntity::new(id);
    entity.status_code = STATUS_SUCCESS.into();
    entity.responses.push(GeocodeResponse {
        point: Some(Coordinate::new(latitude, longitude)),
        confidence: "High".into(),
        ..GeocodeResponse::default()
    });
    entity
}

fn feed_xml(entities: Vec<GeocodeEntity>) -> Vec<u8> {
    GeocodeFeed::from_entities(entities)
        .to_bytes(DataSourceFormat::Xml)
        .expect("feed xml")
}

/// Queue a completed job whose outputs are `succeeded` and `failed`.
fn script_completed_job(
    transport: &ScriptedTransport,
    succeeded: Vec<GeocodeEntity>,
    failed: Vec<GeocodeEntity>,
) {
    transport.push_created(LOCATION);
    transport.push_job("Pending", &[]);
    transport.push_ok(job_status_json(
        "job-1",
        "Completed",
        &[
            ("output", "succeeded", SUCCEEDED_URL),
            ("output", "failed", FAILED_URL),
        ],
    ));
    transport.push_ok(feed_xml(succeeded));
    transport.push_ok(feed_xml(failed));
}

fn submitted_feed(transport: &ScriptedTransport) -> GeocodeFeed {
    let request = transport.requests().into_iter().next().expect("create request");
    assert!(request.gzip);
    let mut xml = String::new();
    GzDecoder::new(request.body.as_slice())
        .read_to_string(&mut xml)
        .expect("gunzip body");
    GeocodeFeed::parse(&xml, DataSourceFormat::Xml).expect("submitted feed")
}

fn column(name: &str, semantic_type: SemanticType, key: bool) -> Column {
    Column::new(name, semantic_type, key).expect("valid column")
}

fn text(value: &str) -> Value {
    Value::String(value.to_owned())
}

#[fixture]
fn shops() -> DataSource {
    let mut source = DataSource::with_details(DataSourceDetails {
        name: "Shops".into(),
        entity_type_name: "Shop".into(),
        ..DataSourceDetails::default()
    });
    source.push_column(column("ShopId", SemanticType::String, true));
    source.push_column(column("AddressLine", SemanticType::String, false));
    source.push_column(column("Locality", SemanticType::String, false));
    source.push_column(column("Latitude", SemanticType::Double, false));
    source.push_column(column("Longitude", SemanticType::Double, false));
    for (id, street) in [("a", "1 High St"), ("b", "1 High St"), ("c", "9 Low Rd")] {
        source.push_row(vec![text(id), text(street), text("Leeds"), Value::Null, Value::Null]);
    }
    source.push_row(vec![
        text("d"),
        text("5 Mill Ln"),
        text("Leeds"),
        Value::Double(53.8),
        Value::Double(-1.55),
    ]);
    source
}

#[rstest]
fn geocode_returns_both_output_feeds(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    script_completed_job(&transport, vec![answered("0", 1.0, 2.0)], vec![GeocodeEntity::new("1")]);
    let geocoder = BatchGeocoder::new(&transport, config);

    let outcome = block_on_for_tests(geocoder.geocode(&GeocodeFeed::new(), "key"));

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    let requests = transport.requests();
    assert_eq!(requests.len(), 6);
    assert!(requests[4].url.starts_with(SUCCEEDED_URL));
    assert!(requests[5].url.starts_with(FAILED_URL));
}

#[rstest]
fn aborted_jobs_carry_the_error_and_skip_downloads(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_created(LOCATION);
    transport.push_job("Aborted", &[]);
    let geocoder = BatchGeocoder::new(&transport, config);

    let outcome = block_on_for_tests(geocoder.geocode(&GeocodeFeed::new(), "key"));

    assert!(matches!(outcome.error, Some(DataflowError::JobAborted { .. })));
    assert_eq!(outcome.job.map(|job| job.status), Some(crate::JobStatus::Aborted));
    assert_eq!(transport.requests().len(), 2);
}

#[rstest]
fn missing_key_fails_before_any_request(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    let geocoder = BatchGeocoder::new(&transport, config);
    let outcome = block_on_for_tests(geocoder.geocode(&GeocodeFeed::new(), " "));
    assert!(matches!(outcome.error, Some(DataflowError::MissingKey { .. })));
    assert!(transport.requests().is_empty());
}

#[rstest]
fn status_sink_sees_each_checkpoint(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    script_completed_job(&transport, Vec::new(), Vec::new());
    let messages = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&messages);
    let geocoder = BatchGeocoder::new(&transport, config)
        .with_status_sink(move |message: &str| recorder.borrow_mut().push(message.to_owned()));

    let outcome = block_on_for_tests(geocoder.geocode(&GeocodeFeed::new(), "key"));

    assert!(outcome.is_success());
    assert_eq!(
        *messages.borrow(),
        [
            "Creating geocode job.",
            "Job created.",
            "Job processing.",
            "Job completed.",
            "Downloading geocode results.",
        ]
    );
}

#[rstest]
fn data_source_rows_share_results_for_identical_addresses(
    config: DataflowConfig,
    shops: DataSource,
) {
    let transport = ScriptedTransport::new();
    script_completed_job(
        &transport,
        vec![answered("0", 53.796_12, -1.547_33)],
        vec![GeocodeEntity::new("1")],
    );
    let geocoder = BatchGeocoder::new(&transport, config);
    let mut source = shops;

    let outcome = block_on_for_tests(geocoder.geocode_data_source(&mut source, "key", "en-GB"));

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(outcome.geocoded_rows, 2);
    assert_eq!(outcome.failed_rows, ["c"]);

    let submitted = submitted_feed(&transport);
    assert_eq!(submitted.len(), 2);
    let first = submitted.entities()[0].request.as_ref().expect("request");
    assert_eq!(first.culture, "en-GB");
    assert_eq!(first.address.address_line, "1 High St");

    for row in [0, 1] {
        assert_eq!(source.cell(row, "Latitude"), Some(&Value::Double(53.796_12)));
        assert_eq!(source.cell(row, "Longitude"), Some(&Value::Double(-1.547_33)));
    }
    assert_eq!(source.cell(2, "Latitude"), Some(&Value::Null));
    assert_eq!(source.cell(3, "Latitude"), Some(&Value::Double(53.8)));
}

#[rstest]
fn data_source_without_address_columns_is_rejected(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    let geocoder = BatchGeocoder::new(&transport, config);
    let mut source = DataSource::new();
    source.push_column(column("Name", SemanticType::String, true));

    let outcome = block_on_for_tests(geocoder.geocode_data_source(&mut source, "key", "en-US"));

    assert!(matches!(outcome.error, Some(DataflowError::NoAddressColumns)));
    assert_eq!(outcome.geocoded_rows, 0);
    assert!(transport.requests().is_empty());
}

#[rstest]
fn data_source_gains_key_and_location_columns(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    script_completed_job(&transport, vec![answered("0", 10.0, 20.0)], Vec::new());
    let geocoder = BatchGeocoder::new(&transport, config);
    let mut source = DataSource::new();
    source.push_column(column("City", SemanticType::String, false));
    source.push_row(vec![text("Oslo")]);

    let outcome = block_on_for_tests(geocoder.geocode_data_source(&mut source, "key", "en-US"));

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(outcome.geocoded_rows, 1);
    assert_eq!(source.primary_key_index(), source.column_index("EntityID"));
    assert_eq!(source.cell(0, "Latitude"), Some(&Value::Double(10.0)));
}

#[rstest]
fn failed_job_leaves_rows_untouched(config: DataflowConfig, shops: DataSource) {
    let transport = ScriptedTransport::new();
    transport.push_created(LOCATION);
    for _ in 0..4 {
        transport.push_network_failure("reset");
    }
    let geocoder = BatchGeocoder::new(&transport, config);
    let mut source = shops;

    let outcome = block_on_for_tests(geocoder.geocode_data_source(&mut source, "key", "en-US"));

    assert!(matches!(outcome.error, Some(DataflowError::JobUnknown { .. })));
    assert_eq!(outcome.geocoded_rows, 0);
    assert!(outcome.failed_rows.is_empty());
    assert_eq!(source.cell(0, "Latitude"), Some(&Value::Null));
}

#[rstest]
fn located_and_deleted_rows_are_not_submitted(config: DataflowConfig, shops: DataSource) {
    let transport = ScriptedTransport::new();
    let geocoder = BatchGeocoder::new(&transport, config);
    let mut source = shops;
    source.push_column(column("__deleteEntity", SemanticType::Bool, false));
    for row in source.rows_mut().iter_mut().take(3) {
        if let Some(flag) = row.last_mut() {
            *flag = Value::Bool(true);
        }
    }

    let outcome = block_on_for_tests(geocoder.geocode_data_source(&mut source, "key", "en-US"));

    assert!(outcome.is_success());
    assert_eq!(outcome.geocoded_rows, 0);
    assert!(transport.requests().is_empty());
}

#[rstest]
fn blank_addresses_are_reported_without_submission(config: DataflowConfig, shops: DataSource) {
    let transport = ScriptedTransport::new();
    let geocoder = BatchGeocoder::new(&transport, config);
    let mut source = shops;
    source.rows_mut().truncate(1);
    source.rows_mut()[0][1] = text("");
    source.rows_mut()[0][2] = Value::Null;

    let outcome = block_on_for_tests(geocoder.geocode_data_source(&mut source, "key", "en-US"));

    assert!(outcome.is_success());
    assert_eq!(outcome.failed_rows, ["a"]);
    assert!(transport.requests().is_empty());
}

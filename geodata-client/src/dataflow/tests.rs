//! Unit tests for the job poller.

use std::{cell::RefCell, io::Read, time::Duration};

use flate2::read::GzDecoder;
use rstest::{fixture, rstest};

use super::test_support::{ScriptedTransport, block_on_for_tests};
use super::*;

const LOCATION: &str = "https://example.org/REST/v1/Dataflows/Geocode/job-1";

#[fixture]
fn config() -> DataflowConfig {
    DataflowConfig::new("https://example.org/REST/v1").with_poll_interval(Duration::ZERO)
}

fn create_request(config: &DataflowConfig) -> TransportRequest {
    let url = JobKind::Geocode.create_url(config, "key").expect("create url");
    TransportRequest::post_gzip(url, "application/xml", Vec::new())
}

#[rstest]
fn run_polls_until_completed(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_created(LOCATION);
    transport.push_job("Pending", &[]);
    transport.push_job("Pending", &[]);
    transport.push_job("Completed", &[("output", "succeeded", "https://example.org/out")]);

    let messages = RefCell::new(Vec::new());
    let sink = |message: &str| messages.borrow_mut().push(message.to_owned());
    let poller = JobPoller::new(&transport, &config).with_sink(Some(&sink));
    let job = block_on_for_tests(poller.run(create_request(&config), "key")).expect("job");

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(transport.remaining(), 0);
    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].method, Method::Get);
    assert_eq!(
        requests[1].url,
        format!("{LOCATION}?output=json&key=key&clientApi={DEFAULT_CLIENT_VERSION}")
    );
    assert_eq!(
        *messages.borrow(),
        ["Job created.", "Job processing.", "Job processing.", "Job completed."]
    );
}

#[rstest]
fn four_consecutive_failures_make_the_job_unknown(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_created(LOCATION);
    for attempt in 0..4 {
        transport.push_network_failure(&format!("reset {attempt}"));
    }
    transport.push_job("Completed", &[]);

    let poller = JobPoller::new(&transport, &config);
    let job = block_on_for_tests(poller.run(create_request(&config), "key")).expect("job");

    assert_eq!(job.status, JobStatus::Unknown);
    assert!(job.error_message.contains("reset 3"), "{}", job.error_message);
    assert_eq!(transport.remaining(), 1, "poller must stop after the fourth failure");
}

#[rstest]
fn successful_check_resets_the_failure_count(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_created(LOCATION);
    for _ in 0..3 {
        transport.push_network_failure("reset");
    }
    transport.push_job("Pending", &[]);
    for _ in 0..3 {
        transport.push_ok("not json");
    }
    transport.push_job("Completed", &[]);

    let poller = JobPoller::new(&transport, &config);
    let job = block_on_for_tests(poller.run(create_request(&config), "key")).expect("job");
    assert_eq!(job.status, JobStatus::Completed);
}

#[rstest]
fn unrecognised_status_counts_as_failure(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    for _ in 0..4 {
        transport.push_job("Exploded", &[]);
    }
    let poller = JobPoller::new(&transport, &config);
    let job = block_on_for_tests(poller.poll(LOCATION)).expect("job");
    assert_eq!(job.status, JobStatus::Unknown);
    assert!(job.error_message.contains("Exploded"));
}

#[rstest]
fn aborted_jobs_stop_polling(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        r#"{"resourceSets":[{"resources":[{"id":"j","status":"Aborted"}]}],"errorDetails":["Feed is empty."]}"#,
    );
    let poller = JobPoller::new(&transport, &config);
    let job = block_on_for_tests(poller.poll(LOCATION)).expect("job");
    assert_eq!(job.status, JobStatus::Aborted);
    assert_eq!(job.error_message, "Feed is empty.");
}

#[rstest]
fn missing_location_is_fatal(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_response(TransportResponse {
        status: 201,
        ..TransportResponse::default()
    });
    let poller = JobPoller::new(&transport, &config);
    let result = block_on_for_tests(poller.run(create_request(&config), "key"));
    assert!(matches!(result, Err(DataflowError::MissingLocation { .. })));
    assert_eq!(transport.requests().len(), 1);
}

#[rstest]
fn creation_errors_surface_service_details(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_response(TransportResponse {
        status: 401,
        location: None,
        body: br#"{"errorDetails":["Access was denied."]}"#.to_vec(),
    });
    let poller = JobPoller::new(&transport, &config);
    let result = block_on_for_tests(poller.run(create_request(&config), "key"));
    assert!(matches!(
        result,
        Err(DataflowError::Service { status: 401, details }) if details == "Access was denied."
    ));
}

#[rstest]
fn fetch_signs_output_links(config: DataflowConfig) {
    let transport = ScriptedTransport::new();
    transport.push_ok("payload");
    let poller = JobPoller::new(&transport, &config);
    let body = block_on_for_tests(poller.fetch("https://example.org/out", "key")).expect("fetch");
    assert_eq!(body, b"payload");
    assert!(transport.requests()[0].url.starts_with("https://example.org/out?key=key"));
}

#[rstest]
fn gzip_output_decompresses() {
    let compressed = gzip(b"<GeocodeFeed />").expect("gzip");
    let mut text = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut text)
        .expect("gunzip");
    assert_eq!(text, "<GeocodeFeed />");
}

//! Behavioural tests for the bounded status poll.

use std::cell::RefCell;
use std::time::Duration;

use geodata_client::dataflow::test_support::{ScriptedTransport, block_on_for_tests};
use geodata_client::{DataflowConfig, DataflowError, DataflowJob, JobPoller, JobStatus};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

const STATUS_URL: &str = "https://example.org/REST/v1/Dataflows/Geocode/job-1?key=k";

type ResultCell = RefCell<Option<Result<DataflowJob, DataflowError>>>;

#[fixture]
fn transport() -> ScriptedTransport {
    ScriptedTransport::new()
}

#[fixture]
fn result() -> ResultCell {
    RefCell::new(None)
}

#[given("a job whose status endpoint fails 4 times in a row")]
fn four_failures(#[from(transport)] transport: &ScriptedTransport) {
    for attempt in 1..=4 {
        transport.push_network_failure(&format!("connection reset ({attempt})"));
    }
    transport.push_job("Completed", &[]);
}

#[given("a job whose status endpoint fails 3 times before completing")]
fn three_failures(#[from(transport)] transport: &ScriptedTransport) {
    for attempt in 1..=3 {
        transport.push_network_failure(&format!("connection reset ({attempt})"));
    }
    transport.push_job("Completed", &[]);
}

#[when("the job is polled")]
fn poll_job(
    #[from(transport)] transport: &ScriptedTransport,
    #[from(result)] result: &ResultCell,
) {
    let config = DataflowConfig::default().with_poll_interval(Duration::ZERO);
    let poller = JobPoller::new(transport, &config);
    *result.borrow_mut() = Some(block_on_for_tests(poller.poll(STATUS_URL)));
}

fn polled_status(result: &ResultCell) -> JobStatus {
    let borrowed = result.borrow();
    let job = borrowed
        .as_ref()
        .expect("poll must have run")
        .as_ref()
        .expect("poll returns a job");
    job.status
}

#[then("the job status is Unknown")]
fn then_unknown(#[from(result)] result: &ResultCell) {
    assert_eq!(polled_status(result), JobStatus::Unknown);
}

#[then("the job status is Completed")]
fn then_completed(#[from(result)] result: &ResultCell) {
    assert_eq!(polled_status(result), JobStatus::Completed);
}

#[then("no further status checks are made")]
fn then_stopped(#[from(transport)] transport: &ScriptedTransport) {
    assert_eq!(transport.requests().len(), 4);
    assert_eq!(transport.remaining(), 1);
}

#[scenario(path = "tests/features/job_polling.feature", index = 0)]
fn flaky_endpoint_gives_unknown(transport: ScriptedTransport, result: ResultCell) {
    let _ = (transport, result);
}

#[scenario(path = "tests/features/job_polling.feature", index = 1)]
fn transient_failure_is_tolerated(transport: ScriptedTransport, result: ResultCell) {
    let _ = (transport, result);
}

//! Behaviour-driven step definitions driving the CLI scenarios.

use super::helpers::{OVERSIZED_CSV, SHOPS_CSV, Workspace, output_json};
use super::*;
use crate::service::GeocodeConfig;
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Scenario state shared by every step.
struct CliWorld {
    workspace: Workspace,
    input: RefCell<Option<Utf8PathBuf>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl CliWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            input: RefCell::new(None),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn input(&self) -> Utf8PathBuf {
        self.input.borrow().clone().expect("input file written")
    }

    fn error_with<T>(&self, check: impl FnOnce(&CliError) -> T) -> T {
        let borrowed = self.result.borrow();
        let error = borrowed
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect_err("expected error");
        check(error)
    }
}

#[fixture]
fn world() -> CliWorld {
    CliWorld::new()
}

#[given("a data source file with two shops")]
fn shops_file(#[from(world)] world: &CliWorld) {
    let path = world.workspace.write("shops.csv", SHOPS_CSV);
    world.input.replace(Some(path));
}

#[given("a data source file with an out-of-range latitude")]
fn oversized_file(#[from(world)] world: &CliWorld) {
    let path = world.workspace.write("shops.csv", OVERSIZED_CSV);
    world.input.replace(Some(path));
}

#[when("I run the validate command on it")]
fn run_validate_command(#[from(world)] world: &CliWorld) {
    let input = world.input();
    let outcome = Cli::try_parse_from(["geodata", "validate", input.as_str()])
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| cli.run_with(&mut *world.stdout.borrow_mut()));
    world.result.replace(Some(outcome));
}

#[when("I configure the geocode command without a key")]
fn configure_geocode(#[from(world)] world: &CliWorld) {
    let input = world.input();
    let output = world.workspace.path("geocoded.csv");
    let outcome = Cli::try_parse_from([
        "geodata",
        "geocode",
        "--input",
        input.as_str(),
        "--output",
        output.as_str(),
    ])
    .map_err(CliError::ArgumentParsing)
    .and_then(|cli| match cli.command {
        Command::Geocode(args) => GeocodeConfig::try_from(args).map(drop),
        other => panic!("unexpected command {other:?}"),
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds")]
fn command_succeeds(#[from(world)] world: &CliWorld) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    assert!(result.is_ok(), "unexpected error {result:?}");
}

#[then("the report warns that row 2 has no location")]
fn warns_about_row_two(#[from(world)] world: &CliWorld) {
    let report = output_json(&world.stdout.borrow());
    let warnings = report["warnings"].as_array().expect("warnings");
    assert!(
        warnings
            .iter()
            .any(|w| w.as_str().is_some_and(|w| w.starts_with("Row 2 is missing location"))),
        "warnings: {warnings:?}"
    );
}

#[then("the command reports 1 validation error")]
fn reports_one_error(#[from(world)] world: &CliWorld) {
    world.error_with(|error| match error {
        CliError::Invalid { errors, .. } => assert_eq!(*errors, 1),
        other => panic!("unexpected error {other:?}"),
    });
    let report = output_json(&world.stdout.borrow());
    assert_eq!(report["errors"].as_array().map(Vec::len), Some(1));
}

#[then("the CLI reports that the \"key\" flag is missing")]
fn reports_missing_key(#[from(world)] world: &CliWorld) {
    world.error_with(|error| match error {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_KEY);
            assert_eq!(*env, ENV_GEOCODE_KEY);
        }
        other => panic!("unexpected error {other:?}"),
    });
}

macro_rules! register_cli_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/cli_commands.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CliWorld) {
            let _ = world;
        }
    };
}

register_cli_scenario!(validating_well_formed, "validating a well-formed data source");
register_cli_scenario!(validating_bad_latitude, "validating a data source with a bad latitude");
register_cli_scenario!(rejecting_missing_key, "rejecting a geocode run without a key");

//! The introspection scenario.
//!
//! Creates two databases and three time series, checks what the inspector
//! reports for them, deletes the databases again and checks they are gone.
//! Check failures are recorded in the report and never stop the run.
//! Teardown runs whenever setup was attempted.

use std::collections::BTreeSet;

use iotdb_dialect::{Engine, Result as DialectResult, SYSTEM_DATABASE};

use crate::report::{CheckOutcome, TestReport};

/// Database holding the fixture devices.
pub const FIXTURE_SCHEMA: &str = "root.cursor";
/// Second, empty fixture database.
pub const SECOND_SCHEMA: &str = "root.cursor_s1";

pub const SETUP_STATEMENTS: [&str; 5] = [
    "create database root.cursor",
    "create database root.cursor_s1",
    "create timeseries root.cursor.device1.temperature with datatype=FLOAT,encoding=RLE",
    "create timeseries root.cursor.device1.status with datatype=FLOAT,encoding=RLE",
    "create timeseries root.cursor.device2.temperature with datatype=FLOAT,encoding=RLE",
];

pub const TEARDOWN_STATEMENTS: [&str; 2] = [
    "delete database root.cursor",
    "delete database root.cursor_s1",
];

pub const CHECK_SETUP: &str = "fixture_setup";
pub const CHECK_SCHEMA_NAMES: &str = "get_schema_names";
pub const CHECK_TABLE_NAMES: &str = "get_table_names";
pub const CHECK_COLUMNS: &str = "get_columns";
pub const CHECK_CLEANUP: &str = "cleanup";

const EXPECTED_TABLES: [&str; 2] = ["device1", "device2"];
const EXPECTED_COLUMN_COUNT: usize = 3;

/// Runs setup, checks and teardown against `engine`, then disposes it.
///
/// # Arguments
///
/// * `engine` - Connected engine; disposed before this returns
///
/// # Returns
///
/// One outcome per check, in order. Failures never end the run early.
pub async fn run_scenario(engine: &Engine) -> TestReport {
    let mut report = TestReport::new();

    match setup(engine).await {
        Ok(()) => {
            check_schema_names(engine, &mut report).await;
            check_table_names(engine, &mut report).await;
            check_columns(engine, &mut report).await;
        }
        Err(e) => {
            report.record(CheckOutcome::fail(
                CHECK_SETUP,
                e.to_string(),
                "fixture setup failed!",
            ));
            for name in [CHECK_SCHEMA_NAMES, CHECK_TABLE_NAMES, CHECK_COLUMNS] {
                report.record(CheckOutcome::fail(
                    name,
                    "not run",
                    format!("{} skipped: fixture setup failed", name),
                ));
            }
        }
    }

    teardown(engine).await;
    check_cleanup(engine, &mut report).await;

    engine.dispose();
    report
}

/// Executes the fixture statements in order, stopping at the first failure.
async fn setup(engine: &Engine) -> DialectResult<()> {
    let mut session = engine.session()?;
    for sql in SETUP_STATEMENTS {
        session.execute(sql).await?;
    }
    session.close();
    Ok(())
}

/// Executes every teardown statement, each independently of the others.
async fn teardown(engine: &Engine) {
    let mut session = match engine.session() {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Teardown could not open a session: {}", e);
            return;
        }
    };
    for sql in TEARDOWN_STATEMENTS {
        if let Err(e) = session.execute(sql).await {
            tracing::warn!("Teardown statement failed: {}", e);
        }
    }
    session.close();
}

async fn check_schema_names(engine: &Engine, report: &mut TestReport) {
    let outcome = match engine.inspector().get_schema_names().await {
        Ok(names) => {
            let listed: BTreeSet<&str> = names.iter().map(String::as_str).collect();
            let missing: Vec<&str> = [SYSTEM_DATABASE, FIXTURE_SCHEMA, SECOND_SCHEMA]
                .into_iter()
                .filter(|name| !listed.contains(name))
                .collect();
            if missing.is_empty() {
                CheckOutcome::pass(CHECK_SCHEMA_NAMES, format!("{:?}", names))
            } else {
                CheckOutcome::fail(
                    CHECK_SCHEMA_NAMES,
                    format!("{:?}", names),
                    format!("get_schema_names failed! missing: {}", missing.join(", ")),
                )
            }
        }
        Err(e) => CheckOutcome::fail(CHECK_SCHEMA_NAMES, e.to_string(), "get_schema_names failed!"),
    };
    report.record(outcome);
}

async fn check_table_names(engine: &Engine, report: &mut TestReport) {
    let outcome = match engine.inspector().get_table_names(FIXTURE_SCHEMA).await {
        Ok(tables) if tables == EXPECTED_TABLES => {
            CheckOutcome::pass(CHECK_TABLE_NAMES, format!("{:?}", tables))
        }
        Ok(tables) => CheckOutcome::fail(
            CHECK_TABLE_NAMES,
            format!("{:?}", tables),
            "get_table_names failed!",
        ),
        Err(e) => CheckOutcome::fail(CHECK_TABLE_NAMES, e.to_string(), "get_table_names failed!"),
    };
    report.record(outcome);
}

async fn check_columns(engine: &Engine, report: &mut TestReport) {
    let outcome = match engine.inspector().get_columns("device1", FIXTURE_SCHEMA).await {
        Ok(columns) if columns.len() == EXPECTED_COLUMN_COUNT => {
            CheckOutcome::pass(CHECK_COLUMNS, columns.len().to_string())
        }
        Ok(columns) => {
            let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            CheckOutcome::fail(
                CHECK_COLUMNS,
                format!("{} {:?}", columns.len(), names),
                "get_columns failed!",
            )
        }
        Err(e) => CheckOutcome::fail(CHECK_COLUMNS, e.to_string(), "get_columns failed!"),
    };
    report.record(outcome);
}

/// Neither fixture database may survive teardown.
async fn check_cleanup(engine: &Engine, report: &mut TestReport) {
    let outcome = match engine.inspector().get_schema_names().await {
        Ok(names) => {
            let left: Vec<&str> = names
                .iter()
                .map(String::as_str)
                .filter(|name| *name == FIXTURE_SCHEMA || *name == SECOND_SCHEMA)
                .collect();
            if left.is_empty() {
                CheckOutcome::pass(CHECK_CLEANUP, format!("{:?}", names))
            } else {
                CheckOutcome::fail(
                    CHECK_CLEANUP,
                    format!("{:?}", names),
                    format!("teardown left databases: {}", left.join(", ")),
                )
            }
        }
        Err(e) => CheckOutcome::fail(CHECK_CLEANUP, e.to_string(), "cleanup check failed!"),
    };
    report.record(outcome);
}

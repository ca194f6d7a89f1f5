//! Scenario runs against the REST stub, plus the container-backed run.

use ntest::timeout;
use pretty_assertions::assert_eq;
use tokio::runtime::Runtime;

use dialect_harness::scenario::{
    CHECK_CLEANUP, CHECK_COLUMNS, CHECK_SCHEMA_NAMES, CHECK_SETUP, CHECK_TABLE_NAMES,
};
use dialect_harness::{run_against, run_scenario, run_with_container, HarnessConfig};
use iotdb_dialect::{Engine, EngineConfig, Registry};
use iotdb_rest_stub::{StubConfig, StubServer};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

#[test]
#[timeout(20000)]
fn test_scenario_passes_and_cleans_up() {
    runtime().block_on(async {
        let stub = StubServer::spawn(StubConfig::default()).await.unwrap();
        let config = HarnessConfig::default();
        let url = config.connection_url("127.0.0.1", stub.port());

        let report = run_against(&config, &Registry::with_defaults(), &url)
            .await
            .unwrap();

        assert!(report.is_success(), "{}", report.render());
        let names: Vec<&str> = report.outcomes().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec![CHECK_SCHEMA_NAMES, CHECK_TABLE_NAMES, CHECK_COLUMNS, CHECK_CLEANUP]
        );
        assert_eq!(
            report.outcome(CHECK_TABLE_NAMES).unwrap().actual,
            "[\"device1\", \"device2\"]"
        );
        assert_eq!(report.outcome(CHECK_COLUMNS).unwrap().actual, "3");
        assert_eq!(report.render(), "All executions done!!\n");
        assert_eq!(stub.tree().databases().count(), 0);
        assert_eq!(stub.tree().series_count(), 0);
    });
}

#[test]
#[timeout(20000)]
fn test_setup_failure_skips_checks_but_tears_down() {
    runtime().block_on(async {
        let stub = StubServer::spawn(StubConfig::default()).await.unwrap();
        stub.seed(&["create database root.cursor"]).unwrap();

        let url = HarnessConfig::default().connection_url("127.0.0.1", stub.port());
        let engine =
            Engine::connect(&Registry::with_defaults(), &url, EngineConfig::default()).unwrap();
        let report = run_scenario(&engine).await;

        assert!(engine.is_disposed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failed_count(), 4);
        let setup = report.outcome(CHECK_SETUP).unwrap();
        assert!(setup.actual.contains("903"), "{}", setup.actual);
        assert_eq!(report.outcome(CHECK_COLUMNS).unwrap().actual, "not run");

        assert!(report.outcome(CHECK_CLEANUP).unwrap().passed);
        assert_eq!(stub.tree().databases().count(), 0);
        assert!(report.render().ends_with("failed count: 4\n"));
    });
}

#[test]
#[timeout(20000)]
fn test_rejected_credentials_fail_every_check() {
    runtime().block_on(async {
        let stub = StubServer::spawn(StubConfig::default()).await.unwrap();
        let config = HarnessConfig {
            password: "root".to_string(),
            ..Default::default()
        };
        let url = config.connection_url("127.0.0.1", stub.port());

        let report = run_against(&config, &Registry::with_defaults(), &url)
            .await
            .unwrap();

        assert_eq!(report.failed_count(), 5);
        let cleanup = report.outcome(CHECK_CLEANUP).unwrap();
        assert!(cleanup.actual.contains("801"), "{}", cleanup.actual);
        assert!(report
            .render()
            .contains("Some test failed, please have a check\nfailed count: 5\n"));
    });
}

#[test]
#[timeout(20000)]
fn test_unknown_scheme_is_an_error_not_a_report() {
    runtime().block_on(async {
        let config = HarnessConfig {
            scheme: "influx".to_string(),
            ..Default::default()
        };
        let url = config.connection_url("127.0.0.1", 1);
        let err = run_against(&config, &Registry::with_defaults(), &url)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("influx"), "{}", err);
    });
}

/// Needs a container runtime and the `iotdb:dev` image.
#[test]
#[ignore]
fn test_scenario_against_container() {
    runtime().block_on(async {
        let mut config = HarnessConfig::default();
        config.apply_env_overrides().unwrap();
        let report = run_with_container(&config, &Registry::with_defaults())
            .await
            .unwrap();
        println!("{}", report.render());
        assert!(report.is_success());
    });
}

//! Configuration files feeding a bootstrapped system.

use ha_core::config::ConfigLoader;
use ha_core::models::{HaResource, ResourceType};
use ha_core::orchestration::{HaSystem, StoreBackend};
use ha_core::provider::{HaConfigKey, HaProvider, SIMULATOR_PROVIDER_NAME, SIMULATOR_SUB_TYPE};
use ha_core::state_machine::HaState;
use std::collections::HashMap;
use std::io::Write;
use tokio_test::assert_ok;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn bootstrap_from_file_applies_provider_tunables() {
    let file = write_config(
        r#"
        [orchestrator]
        management_server_id = 3
        poll_interval_ms = 50
        max_concurrent_checks = 2

        [providers.SimulatorHaProvider]
        max_recovery_attempts = 7
        health_check_timeout_ms = 1500
        "#,
    );
    let config = assert_ok!(ConfigLoader::load_with_overrides(file.path(), HashMap::new()));
    let system = assert_ok!(HaSystem::bootstrap(config).await);
    assert_eq!(system.backend(), StoreBackend::Memory);
    assert_eq!(system.manager().management_server_id().0, 3);

    let host = HaResource::new(1, ResourceType::Host, SIMULATOR_SUB_TYPE);
    let attempts = system
        .simulator()
        .count_value(HaConfigKey::MaxRecoveryAttempts, &host)
        .unwrap();
    assert_eq!(attempts, 7);

    let manager = system.manager();
    assert_ok!(manager.configure(&host, SIMULATOR_PROVIDER_NAME).await);
    assert!(assert_ok!(manager.enable(1, ResourceType::Host).await));
    let summary = assert_ok!(manager.run_cycle().await);
    assert_eq!(summary.transitioned, 1);
    assert_eq!(
        manager.find_record(1, ResourceType::Host).await.unwrap().state,
        HaState::Available
    );
}

#[test]
fn env_overrides_beat_the_file() {
    let file = write_config("[orchestrator]\nmax_concurrent_checks = 2\n");
    let overrides = HashMap::from([(
        "HA__ORCHESTRATOR__MAX_CONCURRENT_CHECKS".to_string(),
        "9".to_string(),
    )]);
    let config = ConfigLoader::load_with_overrides(file.path(), overrides).unwrap();
    assert_eq!(config.orchestrator.max_concurrent_checks, 9);
}

#[test]
fn invalid_ratio_is_rejected() {
    let file = write_config("[providers.SimulatorHaProvider]\nactivity_check_failure_ratio = 1.2\n");
    assert!(ConfigLoader::load_with_overrides(file.path(), HashMap::new()).is_err());
}

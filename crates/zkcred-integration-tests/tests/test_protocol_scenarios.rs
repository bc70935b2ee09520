//! # Protocol Scenarios
//!
//! The CLI's scenario files driven through node sessions, and session
//! behavior under abort.

use std::path::PathBuf;

use zkcred_cli::demo::run_scenario;
use zkcred_cli::scenario::Scenario;

fn scenario_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

#[tokio::test]
async fn employee_scenario_follows_the_revocation_timeline() {
    let scenario = Scenario::load(&scenario_file("employee.yaml")).unwrap();
    let report = run_scenario(&scenario).await.unwrap();
    assert!(report.verified);
    assert_eq!(report.verified_after_revocation, Some(false));
    assert_eq!(report.verified_as_of_issuance, Some(true));
    assert!(report.rev_reg_id.as_deref().is_some_and(|id| id.contains(":CL_ACCUM:")));
}

#[tokio::test]
async fn license_scenario_is_not_revocable() {
    let scenario = Scenario::load(&scenario_file("license.yaml")).unwrap();
    let report = run_scenario(&scenario).await.unwrap();
    assert!(report.verified);
    assert!(report.revoked_at.is_none());
    assert!(report.as_expected());
}

#[tokio::test]
async fn wrong_expected_value_is_a_false_verdict() {
    let mut scenario = Scenario::default();
    scenario.reveal.insert("name".into(), "Mallory".into());
    let report = run_scenario(&scenario).await.unwrap();
    assert!(!report.verified);
}

#[tokio::test]
async fn invalid_scenario_never_reaches_the_ledger() {
    let mut scenario = Scenario::default();
    scenario.values.remove("role");
    assert!(run_scenario(&scenario).await.is_err());
}

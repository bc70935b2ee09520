//! # Demo Subcommand
//!
//! Runs one scenario through the whole lifecycle on an in-process ledger:
//! publish artifacts, issue over a session, prove, revoke, and prove again
//! both now and as of the issuance time. The ledger clock is manual so the
//! timeline is the same on every run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use zkcred_core::{Interval, LedgerRole, RevocationBinding};
use zkcred_ledger::{Clock, InMemoryLedger, ManualClock};
use zkcred_protocol::{Node, ProtocolConfig};
use zkcred_wallet::{InMemoryWalletStore, WalletConfig};
use zkcred_zkp::{EnginePolicy, MockCredentialEngine};

use crate::scenario::Scenario;

/// Seconds the ledger clock moves between lifecycle steps.
const STEP_SECS: i64 = 60;

const ISSUER_SEED: [u8; 32] = [0x11; 32];
const HOLDER_SEED: [u8; 32] = [0x22; 32];

/// Arguments for the demo subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Scenario YAML. The built-in employee scenario runs when omitted.
    pub scenario: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// What happened at each step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoReport {
    pub issuer: String,
    pub holder: String,
    pub schema_id: String,
    pub cred_def_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<String>,
    pub credential_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_after_revocation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_as_of_issuance: Option<bool>,
}

impl DemoReport {
    /// The proof held before revocation, failed after it, and still holds
    /// for the moment of issuance.
    pub fn as_expected(&self) -> bool {
        self.verified
            && self.verified_after_revocation != Some(true)
            && self.verified_as_of_issuance != Some(false)
    }

    fn print(&self) {
        println!("issuer:        {}", self.issuer);
        println!("holder:        {}", self.holder);
        println!("schema:        {}", self.schema_id);
        println!("cred def:      {}", self.cred_def_id);
        if let Some(reg) = &self.rev_reg_id {
            println!("registry:      {reg}");
        }
        println!("credential:    {}", self.credential_id);
        println!("verified:      {}", self.verified);
        if let Some(at) = self.revoked_at {
            println!("revoked at:    {at}");
        }
        if let Some(v) = self.verified_after_revocation {
            println!("after revoke:  {v}");
        }
        if let Some(v) = self.verified_as_of_issuance {
            println!("as of issue:   {v}");
        }
    }
}

/// Execute the demo subcommand.
pub fn run_demo(args: &DemoArgs) -> Result<u8> {
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(run_scenario(&scenario))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    if report.as_expected() {
        Ok(0)
    } else {
        tracing::error!("scenario finished with unexpected verification results");
        Ok(2)
    }
}

struct Network {
    clock: Arc<ManualClock>,
    issuer: Arc<Node>,
    holder: Arc<Node>,
    verifier: Arc<Node>,
}

impl Network {
    fn open(start: i64) -> Result<Self> {
        let config = ProtocolConfig::from_env()?;
        let clock = Arc::new(ManualClock::at_epoch_secs(start)?);
        let issuer_wallet = WalletConfig::seeded(ISSUER_SEED);
        let ledger = Arc::new(
            InMemoryLedger::new(clock.clone())
                .with_genesis([issuer_wallet.genesis_nym(Some(LedgerRole::Endorser))?]),
        );
        tracing::warn!("demo runs the mock credential engine");
        let open = |wallet: WalletConfig| -> Result<Arc<Node>> {
            let node = Node::open(
                config.clone(),
                EnginePolicy::development(),
                wallet,
                ledger.clone(),
                Arc::new(MockCredentialEngine::new()),
                Arc::new(InMemoryWalletStore::new()),
            )?;
            Ok(Arc::new(node))
        };
        Ok(Self {
            issuer: open(issuer_wallet.clone())?,
            holder: open(WalletConfig::seeded(HOLDER_SEED))?,
            verifier: open(WalletConfig::default())?,
            clock,
        })
    }

    async fn present(&self, scenario: &Scenario, interval: Option<Interval>) -> Result<bool> {
        let mut builder = scenario.fill_request(self.verifier.proof_request("demo"));
        if let Some(interval) = interval {
            builder = builder.non_revoked(interval);
        }
        let request = builder.build();
        let (mut verifier_end, mut holder_end) = self.verifier.verification_sessions();
        let holder = self.holder.clone();
        let presenting = tokio::spawn(async move { holder.present_proof(&mut holder_end).await });
        let verdict = self.verifier.request_proof(&mut verifier_end, request).await;
        if let Err(e) = presenting.await? {
            tracing::warn!(error = %e, "holder did not present");
        }
        Ok(verdict)
    }
}

/// Run `scenario` against a fresh in-process network.
pub async fn run_scenario(scenario: &Scenario) -> Result<DemoReport> {
    scenario.check()?;
    let net = Network::open(scenario.ledger_start)?;
    let issuer = net.issuer.issuer();

    let schema = issuer.create_schema(
        &scenario.schema.name,
        &scenario.schema.version,
        &scenario.schema.attributes,
    )?;
    let cred_def = issuer.create_credential_definition(&schema.id, scenario.revocable)?;
    if scenario.revocable {
        issuer.create_revocation_registry(&cred_def.id, scenario.capacity)?;
    }
    net.clock.advance(STEP_SECS)?;

    let (mut issuer_end, mut holder_end) = net.issuer.issuance_sessions();
    let holder = net.holder.clone();
    let receiving = tokio::spawn(async move { holder.receive_credential(&mut holder_end).await });
    let issued = net
        .issuer
        .issue(&mut issuer_end, &cred_def.id, &scenario.proposal_json()?)
        .await;
    let stored = receiving.await?;
    let info = issued.context("issuance failed")?;
    let credential_id = stored.context("holder did not store the credential")?;
    tracing::info!(%credential_id, "credential issued");

    let current = |clock: &ManualClock| scenario.revocable.then(|| Interval::at(clock.now()));
    let verified = net.present(scenario, current(&net.clock)).await?;

    let mut report = DemoReport {
        issuer: net.issuer.holder().did().to_string(),
        holder: net.holder.holder().did().to_string(),
        schema_id: schema.id.to_string(),
        cred_def_id: cred_def.id.to_string(),
        rev_reg_id: None,
        credential_id: credential_id.to_string(),
        issued_at: info.delta_timestamp.map(|t| t.epoch_secs()),
        verified,
        revoked_at: None,
        verified_after_revocation: None,
        verified_as_of_issuance: None,
    };

    if let RevocationBinding::Revocable { registry, index } = info.revocation() {
        net.clock.advance(STEP_SECS)?;
        let (_, revoked_at) = issuer.revoke_credential(registry, *index)?;
        tracing::info!(%registry, index, %revoked_at, "credential revoked");
        report.rev_reg_id = Some(registry.to_string());
        report.revoked_at = Some(revoked_at.epoch_secs());
        report.verified_after_revocation =
            Some(net.present(scenario, current(&net.clock)).await?);
        if let Some(issued_at) = info.delta_timestamp {
            report.verified_as_of_issuance =
                Some(net.present(scenario, Some(Interval::at(issued_at))).await?);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_scenario_runs_the_full_timeline() {
        let report = run_scenario(&Scenario::default()).await.unwrap();
        assert!(report.verified);
        assert_eq!(report.verified_after_revocation, Some(false));
        assert_eq!(report.verified_as_of_issuance, Some(true));
        assert!(report.as_expected());
        assert!(report.revoked_at > report.issued_at);
        assert!(report.schema_id.ends_with(":2:employee:1.0"));
    }

    #[tokio::test]
    async fn non_revocable_scenario_skips_revocation() {
        let scenario = Scenario {
            revocable: false,
            ..Scenario::default()
        };
        let report = run_scenario(&scenario).await.unwrap();
        assert!(report.verified);
        assert!(report.rev_reg_id.is_none());
        assert!(report.verified_after_revocation.is_none());
        assert!(report.as_expected());
    }

    #[tokio::test]
    async fn unmet_predicate_reports_failure() {
        let mut scenario = Scenario::default();
        scenario.predicates[0].value = 65;
        let report = run_scenario(&scenario).await.unwrap();
        assert!(!report.verified);
        assert!(!report.as_expected());
    }

    #[test]
    fn report_json_omits_absent_steps() {
        let report = DemoReport {
            issuer: "did:sov:a".into(),
            holder: "did:sov:b".into(),
            schema_id: "s".into(),
            cred_def_id: "c".into(),
            rev_reg_id: None,
            credential_id: "id".into(),
            issued_at: None,
            verified: true,
            revoked_at: None,
            verified_after_revocation: None,
            verified_as_of_issuance: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["credDefId"], "c");
        assert!(json.get("revokedAt").is_none());
    }
}

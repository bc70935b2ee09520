//! # Node Composition
//!
//! A node is one party: a wallet holder with its issuer, prover, and
//! verifier roles, admitted by the engine policy and configured for
//! sessions. Roles share the holder; issuance counters live in the
//! node's issuer and so are shared by every session the node runs.

use std::sync::Arc;

use zkcred_core::{
    CredentialDefinitionId, CredentialId, CredentialInfo, ProofRequest, ProofRequestBuilder,
};
use zkcred_ledger::LedgerTransport;
use zkcred_vc::{Issuer, Prover, Verifier};
use zkcred_wallet::{WalletConfig, WalletHolder, WalletStore};
use zkcred_zkp::{CredentialEngine, EnginePolicy};

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::issuance::{run_issuer, run_prover_issuance};
use crate::message::{IssuanceMessage, VerificationMessage};
use crate::session::ChannelSession;
use crate::verification::{run_prover_verification, run_verifier};

/// One protocol participant.
#[derive(Debug)]
pub struct Node {
    config: ProtocolConfig,
    holder: Arc<WalletHolder>,
    issuer: Issuer,
    prover: Prover,
    verifier: Verifier,
}

impl Node {
    /// Open a wallet and compose the roles on it. Fails when `policy`
    /// does not admit the engine.
    pub fn open(
        config: ProtocolConfig,
        policy: EnginePolicy,
        wallet: WalletConfig,
        transport: Arc<dyn LedgerTransport>,
        engine: Arc<dyn CredentialEngine>,
        store: Arc<dyn WalletStore>,
    ) -> Result<Self, ProtocolError> {
        policy.validate(engine.backend())?;
        let holder = Arc::new(WalletHolder::open(wallet, transport, engine, store)?);
        Ok(Self {
            config,
            issuer: Issuer::new(holder.clone()),
            prover: Prover::new(holder.clone()),
            verifier: Verifier::new(holder.clone()),
            holder,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn holder(&self) -> &Arc<WalletHolder> {
        &self.holder
    }

    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    pub fn prover(&self) -> &Prover {
        &self.prover
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// A fresh proof request stamped with the configured version.
    pub fn proof_request(&self, name: impl Into<String>) -> ProofRequestBuilder {
        self.verifier
            .new_proof_request(name)
            .version(self.config.proof_version.clone())
    }

    /// Connected issuance session ends with the configured timeout.
    pub fn issuance_sessions(
        &self,
    ) -> (ChannelSession<IssuanceMessage>, ChannelSession<IssuanceMessage>) {
        ChannelSession::pair(self.config.session_timeout)
    }

    /// Connected verification session ends with the configured timeout.
    pub fn verification_sessions(
        &self,
    ) -> (ChannelSession<VerificationMessage>, ChannelSession<VerificationMessage>) {
        ChannelSession::pair(self.config.session_timeout)
    }

    pub async fn issue(
        &self,
        session: &mut ChannelSession<IssuanceMessage>,
        cred_def_id: &CredentialDefinitionId,
        proposal_json: &str,
    ) -> Result<CredentialInfo, ProtocolError> {
        run_issuer(&self.issuer, session, cred_def_id, proposal_json).await
    }

    pub async fn receive_credential(
        &self,
        session: &mut ChannelSession<IssuanceMessage>,
    ) -> Result<CredentialId, ProtocolError> {
        run_prover_issuance(&self.prover, session).await
    }

    pub async fn request_proof(
        &self,
        session: &mut ChannelSession<VerificationMessage>,
        request: ProofRequest,
    ) -> bool {
        run_verifier(&self.verifier, session, request).await
    }

    pub async fn present_proof(
        &self,
        session: &mut ChannelSession<VerificationMessage>,
    ) -> Result<(), ProtocolError> {
        run_prover_verification(&self.prover, session).await
    }
}

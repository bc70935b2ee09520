//! # Issuance Choreography
//!
//! ```text
//! issuer                              holder
//!   │ ── OFFER ───────────────────────▶ │  session DID with issuer
//!   │ ◀─────────────────────── REQUEST ─ │
//!   │  issue                             │
//!   │ ── CREDENTIAL ──────────────────▶ │  validate + store
//!   │ ◀─────────────────────────── ACK ─ │
//! ```
//!
//! Either side sends `ABORT` on failure and returns the error. The holder
//! stores nothing unless the full credential arrived and validated.

use zkcred_core::{CredentialDefinitionId, CredentialId, CredentialInfo};
use zkcred_state::{DynIssuanceExchange, IssuanceExchange, IssuanceState, SessionId};
use zkcred_vc::{Issuer, Prover};

use crate::error::ProtocolError;
use crate::message::IssuanceMessage;
use crate::session::ChannelSession;

type Session = ChannelSession<IssuanceMessage>;

/// Drive the issuer side: offer a credential under `cred_def_id` with the
/// attribute values in `proposal_json`.
pub async fn run_issuer(
    issuer: &Issuer,
    session: &mut Session,
    cred_def_id: &CredentialDefinitionId,
    proposal_json: &str,
) -> Result<CredentialInfo, ProtocolError> {
    let session_id = SessionId::new();
    let offer = issuer.create_credential_offer(cred_def_id)?;
    let exchange = IssuanceExchange::new(session_id, offer.clone());
    tracing::info!(%session_id, %cred_def_id, "issuance session started");

    let reply = match session
        .send_and_receive(IssuanceMessage::Offer { session_id, offer: offer.clone() }, "REQUEST")
        .await
    {
        Ok(reply) => reply,
        Err(e) => return Err(abandon(session, exchange, e).await),
    };
    let request = match reply {
        IssuanceMessage::Request { session_id: id, request } if id == session_id => request,
        other => return Err(abandon(session, exchange, rejected(other, "REQUEST")).await),
    };
    let exchange = exchange.request(request.clone())?;

    let credential = match issuer.issue_credential(&request, proposal_json, &offer) {
        Ok(credential) => credential,
        Err(e) => return Err(abandon(session, exchange, e.into()).await),
    };
    let exchange = exchange.issue(credential.clone())?;

    let reply = match session
        .send_and_receive(
            IssuanceMessage::Credential {
                session_id,
                credential: Box::new(credential.clone()),
            },
            "ACK",
        )
        .await
    {
        Ok(reply) => reply,
        Err(e) => return Err(abandon(session, exchange, e).await),
    };
    match reply {
        IssuanceMessage::Ack { session_id: id } if id == session_id => {}
        other => return Err(abandon(session, exchange, rejected(other, "ACK")).await),
    }
    let exchange = exchange.store();
    tracing::info!(%session_id, state = exchange.state_name(), "issuance session complete");
    Ok(credential)
}

/// Drive the holder side: answer an offer from a session DID, then
/// validate and store the credential.
pub async fn run_prover_issuance(
    prover: &Prover,
    session: &mut Session,
) -> Result<CredentialId, ProtocolError> {
    let (session_id, offer) = match session.receive("OFFER").await? {
        IssuanceMessage::Offer { session_id, offer } => (session_id, offer),
        IssuanceMessage::Abort { reason, .. } => return Err(ProtocolError::Aborted(reason)),
        other => {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "OFFER",
                got: other.kind(),
            })
        }
    };
    let exchange = IssuanceExchange::new(session_id, offer.clone());
    tracing::info!(%session_id, issuer = %offer.issuer_did, "received credential offer");

    let holder = prover.holder();
    let prepared = holder
        .get_identity(&offer.issuer_did)
        .and_then(|issuer| holder.create_session_did(&issuer))
        .and_then(|session_did| prover.create_credential_request(&offer, &session_did));
    let (request, metadata) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return Err(abandon(session, exchange, e.into()).await),
    };
    let exchange = exchange.request(request.clone())?;

    let reply = match session
        .send_and_receive(IssuanceMessage::Request { session_id, request }, "CREDENTIAL")
        .await
    {
        Ok(reply) => reply,
        Err(e) => return Err(abandon(session, exchange, e).await),
    };
    let credential = match reply {
        IssuanceMessage::Credential { session_id: id, credential } if id == session_id => *credential,
        other => return Err(abandon(session, exchange, rejected(other, "CREDENTIAL")).await),
    };
    let exchange = match exchange.issue(credential.clone()) {
        Ok(exchange) => exchange,
        Err(e) => {
            let error = ProtocolError::State(e);
            notify_abort(session, session_id, &error).await;
            return Err(error);
        }
    };

    let credential_id = match prover.store_credential(&metadata, &credential) {
        Ok(id) => id,
        Err(e) => return Err(abandon(session, exchange, e.into()).await),
    };
    let exchange = exchange.store();
    session.send(IssuanceMessage::Ack { session_id }).await?;
    tracing::info!(%session_id, %credential_id, state = exchange.state_name(), "stored issued credential");
    Ok(credential_id)
}

/// The error for a message that does not fit the exchange state. A peer
/// abort is surfaced as [`ProtocolError::Aborted`].
fn rejected(message: IssuanceMessage, expected: &'static str) -> ProtocolError {
    match message {
        IssuanceMessage::Abort { reason, .. } => ProtocolError::Aborted(reason),
        other => ProtocolError::UnexpectedMessage {
            expected,
            got: other.kind(),
        },
    }
}

/// Best-effort `ABORT` to the peer, skipped when the peer ended the session.
async fn notify_abort(session: &Session, session_id: SessionId, error: &ProtocolError) {
    if matches!(error, ProtocolError::Aborted(_) | ProtocolError::ChannelClosed) {
        return;
    }
    let abort = IssuanceMessage::Abort {
        session_id,
        reason: error.to_string(),
    };
    if session.send(abort).await.is_err() {
        tracing::debug!(%session_id, "peer gone before abort was delivered");
    }
}

/// Abort the session and log where the exchange stopped.
async fn abandon<S>(
    session: &Session,
    exchange: IssuanceExchange<S>,
    error: ProtocolError,
) -> ProtocolError
where
    S: IssuanceState,
    DynIssuanceExchange: From<IssuanceExchange<S>>,
{
    let session_id = exchange.session_id;
    let record: DynIssuanceExchange = exchange.into();
    notify_abort(session, session_id, &error).await;
    tracing::warn!(
        %session_id,
        state = %record.state,
        transitions = record.transition_log.len(),
        error = %error,
        "issuance session aborted"
    );
    error
}

//! # Verification Choreography
//!
//! ```text
//! verifier                            prover
//!   │ ── REQUEST ─────────────────────▶ │  select credentials, prove
//!   │ ◀───────────────────────── PROOF ─ │
//!   │  verify                            │
//! ```
//!
//! The verifier's session result is a boolean. Transport failures,
//! lookup failures, and a proof that does not verify all end in `false`;
//! they are logged distinctly.

use zkcred_core::ProofRequest;
use zkcred_state::{DynVerificationExchange, SessionId, VerificationExchange};
use zkcred_vc::{Prover, Verifier};

use crate::error::ProtocolError;
use crate::message::VerificationMessage;
use crate::session::ChannelSession;

type Session = ChannelSession<VerificationMessage>;

/// Drive the verifier side. `true` only for a proof that verifies and
/// carries every requested value.
pub async fn run_verifier(verifier: &Verifier, session: &mut Session, request: ProofRequest) -> bool {
    let session_id = SessionId::new();
    let exchange =
        VerificationExchange::new(session_id, verifier.holder().did().clone(), request.clone());
    tracing::info!(%session_id, request = %request.name, "verification session started");

    let reply = session
        .send_and_receive(
            VerificationMessage::Request {
                session_id,
                request: request.clone(),
            },
            "PROOF",
        )
        .await;
    let proof = match reply {
        Ok(VerificationMessage::Proof { session_id: id, proof }) if id == session_id => *proof,
        Ok(VerificationMessage::Abort { reason, .. }) => {
            let record: DynVerificationExchange = exchange.abort(reason.clone()).into();
            tracing::warn!(%session_id, state = %record.state, %reason, "prover aborted verification");
            return false;
        }
        Ok(other) => {
            let error = ProtocolError::UnexpectedMessage {
                expected: "PROOF",
                got: other.kind(),
            };
            let abort = VerificationMessage::Abort {
                session_id,
                reason: error.to_string(),
            };
            if session.send(abort).await.is_err() {
                tracing::debug!(%session_id, "peer gone before abort was delivered");
            }
            let record: DynVerificationExchange = exchange.abort(error.to_string()).into();
            tracing::warn!(%session_id, state = %record.state, %error, "verification session aborted");
            return false;
        }
        Err(error) => {
            let record: DynVerificationExchange = exchange.abort(error.to_string()).into();
            tracing::warn!(%session_id, state = %record.state, %error, "verification transport failed");
            return false;
        }
    };

    let exchange = match exchange.receive(proof.clone()) {
        Ok(exchange) => exchange,
        Err(error) => {
            tracing::warn!(%session_id, %error, "received proof could not be recorded");
            return false;
        }
    };
    let verified = match verifier.verify(&request, &proof) {
        Ok(valid) => exchange.conclude(valid, None),
        Err(error) => {
            tracing::warn!(%session_id, %error, "proof could not be checked");
            exchange.conclude(false, Some(error.to_string()))
        }
    };
    tracing::info!(%session_id, valid = verified.is_valid(), "verification session complete");
    verified.is_valid()
}

/// Drive the prover side: answer one proof request from the wallet.
pub async fn run_prover_verification(
    prover: &Prover,
    session: &mut Session,
) -> Result<(), ProtocolError> {
    let (session_id, request) = match session.receive("REQUEST").await? {
        VerificationMessage::Request {
            session_id,
            request,
        } => (session_id, request),
        VerificationMessage::Abort { reason, .. } => return Err(ProtocolError::Aborted(reason)),
        other => {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "REQUEST",
                got: other.kind(),
            })
        }
    };
    tracing::info!(%session_id, request = %request.name, "received proof request");

    match prover.create_proof(&request, prover.holder().master_secret_id()) {
        Ok(proof) => {
            session
                .send(VerificationMessage::Proof {
                    session_id,
                    proof: Box::new(proof),
                })
                .await?;
            tracing::info!(%session_id, "sent proof");
            Ok(())
        }
        Err(error) => {
            tracing::warn!(%session_id, %error, "cannot answer proof request");
            let abort = VerificationMessage::Abort {
                session_id,
                reason: error.to_string(),
            };
            if session.send(abort).await.is_err() {
                tracing::debug!(%session_id, "peer gone before abort was delivered");
            }
            Err(error.into())
        }
    }
}

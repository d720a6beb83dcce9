//! Engine-level errors: a closed reason-code enumeration plus a
//! human-readable message, matching the actor protocol's
//! `error.message`/reason-code contract exactly.

use serde::Serialize;
use thiserror::Error;

/// The full reason-code enumeration recognised by the actor protocol. Not
/// every variant is ever produced by this engine (several name relay-HTTP
/// or identity-provisioning failure modes that are explicit Non-goals) —
/// they are kept as valid wire values so a conformance driver checking
/// `error.message` against this closed set never sees an unknown code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NoncanonicalQse,
    BoundsExceeded,
    InvalidRequest,
    RateLimited,
    QueueFull,
    AuthFailed,
    Forbidden,
    NotFound,
    Conflict,
    OpkUnavailable,
    ServerError,
    KtFail,
    BundleSigFail,
    AeadFail,
    Replay,
    ReplayDurable,
    PolicyReject,
    RejectScaRollbackDetected,
    RejectS2ParseBadLen,
    RejectS2HdrAuthFail,
    RejectS2BodyAuthFail,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // serde_json::to_string on a unit-variant-only enum never fails.
        let s = serde_json::to_string(self).unwrap_or_default();
        f.write_str(s.trim_matches('"'))
    }
}

#[derive(Debug, Error)]
#[error("{reason}: {message}")]
pub struct EngineError {
    pub reason: ReasonCode,
    pub message: String,
}

impl EngineError {
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self { reason, message: message.into() }
    }
}

impl From<qshield_crypto::CryptoError> for EngineError {
    fn from(e: qshield_crypto::CryptoError) -> Self {
        use qshield_crypto::CryptoError as C;
        let reason = match &e {
            C::AeadDecrypt | C::AeadEncrypt => ReasonCode::AeadFail,
            C::SkipTooLarge { .. } | C::HeaderKeyEvicted => ReasonCode::BoundsExceeded,
            C::ScaRejected(_) => ReasonCode::RejectScaRollbackDetected,
            C::SignatureVerification => ReasonCode::BundleSigFail,
            _ => ReasonCode::InvalidRequest,
        };
        EngineError::new(reason, e.to_string())
    }
}

impl From<qshield_proto::ProtoError> for EngineError {
    fn from(e: qshield_proto::ProtoError) -> Self {
        use qshield_proto::ReasonCode as P;
        let reason = match e.reason() {
            P::NoncanonicalQse => ReasonCode::NoncanonicalQse,
            P::BoundsExceeded => ReasonCode::BoundsExceeded,
            P::InvalidRequest => ReasonCode::InvalidRequest,
            P::PolicyReject => ReasonCode::PolicyReject,
            P::KtFail => ReasonCode::KtFail,
        };
        EngineError::new(reason, e.to_string())
    }
}

impl From<qshield_store::StoreError> for EngineError {
    fn from(e: qshield_store::StoreError) -> Self {
        EngineError::new(ReasonCode::ServerError, e.to_string())
    }
}

//! Wire-format errors, carrying the reason code the engine surfaces to the
//! actor boundary unchanged.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    NoncanonicalQse,
    BoundsExceeded,
    InvalidRequest,
    PolicyReject,
    KtFail,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReasonCode::NoncanonicalQse => "noncanonical_qse",
            ReasonCode::BoundsExceeded => "bounds_exceeded",
            ReasonCode::InvalidRequest => "invalid_request",
            ReasonCode::PolicyReject => "policy_reject",
            ReasonCode::KtFail => "kt_fail",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("{reason}: {detail}")]
    Rejected { reason: ReasonCode, detail: String },
}

impl ProtoError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            ProtoError::Rejected { reason, .. } => *reason,
        }
    }

    pub(crate) fn noncanonical(detail: impl Into<String>) -> Self {
        ProtoError::Rejected { reason: ReasonCode::NoncanonicalQse, detail: detail.into() }
    }

    pub(crate) fn bounds(detail: impl Into<String>) -> Self {
        ProtoError::Rejected { reason: ReasonCode::BoundsExceeded, detail: detail.into() }
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        ProtoError::Rejected { reason: ReasonCode::InvalidRequest, detail: detail.into() }
    }

    pub(crate) fn policy(detail: impl Into<String>) -> Self {
        ProtoError::Rejected { reason: ReasonCode::PolicyReject, detail: detail.into() }
    }

    pub(crate) fn kt(detail: impl Into<String>) -> Self {
        ProtoError::Rejected { reason: ReasonCode::KtFail, detail: detail.into() }
    }
}

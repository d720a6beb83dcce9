//! qshield-proto — wire codecs for the QShield protocol engine.
//!
//! # Modules
//! - `qsp`   — QSP wire prefix (hybrid double-ratchet message framing)
//! - `qse`   — QSE relay-transport envelope
//! - `kt`    — Key Transparency artifact length framings
//! - `b64u`  — strict base64url codec
//! - `error` — `ProtoError` + `ReasonCode`

pub mod b64u;
pub mod error;
pub mod kt;
pub mod qse;
pub mod qsp;

pub use error::{ProtoError, ReasonCode};

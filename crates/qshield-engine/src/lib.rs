//! qshield-engine — the session engine gluing codecs, SCKA, the ratchet
//! core and durability behind the small operation set driven by the actor
//! protocol.
//!
//! # Module layout
//! - `config`  — engine configuration (QSE policy gates)
//! - `error`   — closed reason-code enumeration and `EngineError`
//! - `session` — the `Engine` type: handshake/encrypt/decrypt/debug ops

pub mod config;
pub mod error;
pub mod session;

pub use config::EngineConfig;
pub use error::{EngineError, ReasonCode};
pub use session::{Engine, HandshakeOptions, HandshakeStatus, SuiteWire};

//! qshield-crypto — cryptographic primitives for the QShield protocol engine
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - All public APIs return opaque newtypes to prevent accidental misuse.
//!
//! # Module layout
//! - `kem`        — hybrid X25519 + ML-KEM-768 (Kyber768) key encapsulation
//! - `kdf`        — domain-separated KMAC256 / HKDF-SHA256 key derivation
//! - `handshake`  — three-message hybrid handshake (msg1/msg2/finish)
//! - `ratchet`    — hybrid double ratchet, send/recv chains, epoch advance
//! - `scka`       — SCKA ADV/CTXT bounded state machine
//! - `aead`       — AES-256-GCM (QSP) and XChaCha20-Poly1305 (legacy) AEAD
//! - `hash`       — BLAKE3 / SHA-512 digest utilities, pq_bind
//! - `error`      — unified error type

pub mod aead;
pub mod error;
pub mod handshake;
pub mod hash;
pub mod kdf;
pub mod kem;
pub mod ratchet;
pub mod scka;

pub use error::CryptoError;

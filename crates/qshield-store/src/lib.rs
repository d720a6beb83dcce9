//! qshield-store — durable replay journal and encrypted session snapshots.
//!
//! # Encryption strategy
//! SQLite does not natively encrypt. Snapshot blobs are stored as
//! XChaCha20-Poly1305 ciphertext (via `qshield_crypto::aead`), base64url
//! -encoded, under a vault key held in memory only while unlocked.
//! Journal metadata (session_id, epoch_tag, digest) is stored in plaintext —
//! it carries no message content, only accept/reject bookkeeping.
//!
//! # Migration
//! SQLx migrations in `migrations/` run automatically on `Store::open`.

pub mod db;
pub mod error;
pub mod journal;
pub mod snapshot;
pub mod vault;

pub use db::Store;
pub use error::StoreError;
pub use vault::Vault;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("vault is locked — unlock with a password first")]
    VaultLocked,

    #[error("crypto error: {0}")]
    Crypto(#[from] qshield_crypto::CryptoError),

    #[error("serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("no snapshot recorded for session {0}")]
    NoSnapshot(String),

    #[error("migration error: {0}")]
    Migration(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch)")]
    AeadDecrypt,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("KEM encapsulation failed: {0}")]
    KemEncapsulate(String),

    #[error("KEM decapsulation failed: {0}")]
    KemDecapsulate(String),

    #[error("ratchet step failed: {0}")]
    RatchetStep(String),

    #[error("ratchet rejected: skip count {got} exceeds MAX_SKIP {max}")]
    SkipTooLarge { got: u64, max: u64 },

    #[error("ratchet rejected: header key for this epoch has been evicted (beyond MAX_HKSKIPPED)")]
    HeaderKeyEvicted,

    #[error("SCKA rejected: {0}")]
    ScaRejected(&'static str),

    #[error("serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

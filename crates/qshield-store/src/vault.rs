//! Vault: in-memory key material unlocked by a password.
//!
//! Holds the 32-byte at-rest encryption key used to seal session snapshots.
//! Locking zeroizes the key. The auto-lock timer appropriate for an
//! interactive desktop app is dropped since the conformance engine has no
//! interactive session — a vault here is unlocked for the lifetime of the
//! actor process.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use tokio::sync::RwLock;
use zeroize::ZeroizeOnDrop;

use crate::error::StoreError;

#[derive(ZeroizeOnDrop)]
struct VaultInner {
    key: [u8; 32],
}

/// Thread-safe vault handle; cheap to clone.
#[derive(Clone)]
pub struct Vault {
    inner: Arc<RwLock<Option<VaultInner>>>,
}

impl Vault {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(None)) }
    }

    /// Unlock the vault by deriving a key from `password` and `salt` with
    /// Argon2id.
    pub async fn unlock(&self, password: &[u8], salt: &[u8; 16]) -> Result<(), StoreError> {
        let key = vault_key_from_password(password, salt)?;
        let mut guard = self.inner.write().await;
        *guard = Some(VaultInner { key });
        Ok(())
    }

    /// Unlock with an already-derived key (used by tests and by the actor's
    /// in-memory-store mode, where no password is ever collected).
    pub async fn unlock_with_key(&self, key: [u8; 32]) {
        let mut guard = self.inner.write().await;
        *guard = Some(VaultInner { key });
    }

    pub async fn lock(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }

    pub async fn is_locked(&self) -> bool {
        self.inner.read().await.is_none()
    }

    /// Access the raw key for an encrypt/decrypt operation.
    pub async fn with_key<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&[u8; 32]) -> Result<R, StoreError>,
    {
        let guard = self.inner.read().await;
        match guard.as_ref() {
            Some(inner) => f(&inner.key),
            None => Err(StoreError::VaultLocked),
        }
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a 32-byte vault key from a password and salt via Argon2id.
pub fn vault_key_from_password(password: &[u8], salt: &[u8; 16]) -> Result<[u8; 32], StoreError> {
    let salt_string = SaltString::encode_b64(salt)
        .map_err(|e| StoreError::Crypto(qshield_crypto::CryptoError::KeyDerivation(e.to_string())))?;
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password, &salt_string)
        .map_err(|e| StoreError::Crypto(qshield_crypto::CryptoError::KeyDerivation(e.to_string())))?;
    let raw = hash
        .hash
        .ok_or_else(|| StoreError::Crypto(qshield_crypto::CryptoError::KeyDerivation("argon2 produced no output".into())))?;
    let bytes = raw.as_bytes();
    if bytes.len() < 32 {
        return Err(StoreError::Crypto(qshield_crypto::CryptoError::KeyDerivation(
            "argon2 output shorter than 32 bytes".into(),
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[..32]);
    Ok(out)
}

/// Generate a fresh random 16-byte salt for a new vault.
pub fn generate_salt() -> [u8; 16] {
    use rand::RngCore;
    let mut salt = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn locked_vault_rejects_key_access() {
        let vault = Vault::new();
        assert!(vault.is_locked().await);
        let result = vault.with_key(|_| Ok(())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unlock_with_key_allows_access() {
        let vault = Vault::new();
        vault.unlock_with_key([7u8; 32]).await;
        assert!(!vault.is_locked().await);
        let key = vault.with_key(|k| Ok(*k)).await.unwrap();
        assert_eq!(key, [7u8; 32]);
    }

    #[test]
    fn password_derivation_is_deterministic_for_same_salt() {
        let salt = generate_salt();
        let a = vault_key_from_password(b"correct horse battery staple", &salt).unwrap();
        let b = vault_key_from_password(b"correct horse battery staple", &salt).unwrap();
        assert_eq!(a, b);
    }
}

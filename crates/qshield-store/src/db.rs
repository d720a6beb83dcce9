//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};

use crate::{error::StoreError, vault::Vault};

/// Central store handle. Cheap to clone (`SqlitePool` is internally `Arc`'d).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
    pub vault: Vault,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`, running all
    /// pending migrations.
    ///
    /// WAL journal mode is configured at connection time rather than inside
    /// a migration — SQLite forbids changing `journal_mode` inside a
    /// transaction, and sqlx wraps every migration in one.
    pub async fn open(db_path: &Path, vault: Vault) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        Self::connect(opts, vault).await
    }

    /// Open an in-memory database — used by tests and by the actor when no
    /// durable store directory is configured.
    pub async fn open_in_memory(vault: Vault) -> Result<Self, StoreError> {
        let opts: SqliteConnectOptions = "sqlite::memory:".parse().map_err(sqlx::Error::from)?;
        Self::connect(opts, vault).await
    }

    async fn connect(opts: SqliteConnectOptions, vault: Vault) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect_with(opts).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(Self { pool, vault })
    }

    /// Encrypt a plaintext value with the vault key, returning a base64url
    /// string suitable for a TEXT column.
    pub async fn encrypt_value(&self, plaintext: &[u8]) -> Result<String, StoreError> {
        self.vault
            .with_key(|key| {
                let ct = qshield_crypto::aead::encrypt(key, plaintext, b"qshield-store-v1").map_err(StoreError::Crypto)?;
                Ok(base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, ct))
            })
            .await
    }

    /// Decrypt a vault-encrypted value previously produced by
    /// [`Store::encrypt_value`].
    pub async fn decrypt_value(&self, b64: &str) -> Result<Vec<u8>, StoreError> {
        let ct = base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, b64)
            .map_err(|e| StoreError::Crypto(qshield_crypto::CryptoError::Base64Decode(e)))?;
        self.vault
            .with_key(|key| {
                let pt = qshield_crypto::aead::decrypt(key, &ct, b"qshield-store-v1").map_err(StoreError::Crypto)?;
                Ok(pt.to_vec())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::vault::Vault;

    #[tokio::test]
    async fn encrypt_decrypt_roundtrip_via_vault() {
        let vault = Vault::new();
        vault.unlock_with_key([3u8; 32]).await;
        let store = Store::open_in_memory(vault).await.expect("open in-memory store");

        let encrypted = store.encrypt_value(b"session snapshot bytes").await.unwrap();
        let decrypted = store.decrypt_value(&encrypted).await.unwrap();
        assert_eq!(decrypted, b"session snapshot bytes");
    }

    #[tokio::test]
    async fn decrypt_fails_when_vault_locked() {
        let vault = Vault::new();
        let store = Store::open_in_memory(vault).await.expect("open in-memory store");
        assert!(store.encrypt_value(b"anything").await.is_err());
    }
}

//! Opaque session snapshots, encrypted at rest under the vault key.
//!
//! The blob's internal shape (send chain, receive chain, SCKA state, journal
//! high-water mark) is entirely the engine's concern; this module only
//! persists and retrieves bytes keyed by `session_id`.

use crate::{db::Store, error::StoreError};

pub async fn save(store: &Store, session_id: &str, blob: &[u8]) -> Result<(), StoreError> {
    let blob_enc = store.encrypt_value(blob).await?;
    sqlx::query(
        "INSERT INTO session_snapshots (session_id, blob_enc, taken_at) VALUES (?, ?, datetime('now'))
         ON CONFLICT(session_id) DO UPDATE SET blob_enc = excluded.blob_enc, taken_at = excluded.taken_at",
    )
    .bind(session_id)
    .bind(blob_enc)
    .execute(&store.pool)
    .await?;
    Ok(())
}

pub async fn load(store: &Store, session_id: &str) -> Result<Vec<u8>, StoreError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT blob_enc FROM session_snapshots WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(&store.pool)
        .await?;
    match row {
        Some((blob_enc,)) => store.decrypt_value(&blob_enc).await,
        None => Err(StoreError::NoSnapshot(session_id.to_string())),
    }
}

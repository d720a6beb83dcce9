//! Durable replay journal.
//!
//! Persists `(session_id, epoch_tag, ciphertext_digest)` tuples for every
//! decrypted ciphertext, plus a per-session high-water epoch tag used to
//! detect a restore that crosses an epoch boundary (rollback).

use tracing::debug;

use crate::{db::Store, error::StoreError};

/// Record an accepted ciphertext. Idempotent: inserting the same
/// `(session_id, digest)` twice is a no-op, matching the one-time-accept
/// semantics of the journal itself (the caller is expected to have already
/// rejected the replay via [`is_replay`] before calling this).
pub async fn record(store: &Store, session_id: &str, epoch_tag: u64, digest: &[u8; 32]) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT OR IGNORE INTO journal_entries (session_id, epoch_tag, ciphertext_digest) VALUES (?, ?, ?)",
    )
    .bind(session_id)
    .bind(epoch_tag as i64)
    .bind(digest.as_slice())
    .execute(&store.pool)
    .await?;

    debug!(session_id, epoch_tag, "journal entry recorded");
    bump_high_water(store, session_id, epoch_tag).await
}

/// Whether `digest` has already been accepted for `session_id` — a durable
/// replay, distinguishable by the caller from an in-memory-only replay.
pub async fn is_replay(store: &Store, session_id: &str, digest: &[u8; 32]) -> Result<bool, StoreError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM journal_entries WHERE session_id = ? AND ciphertext_digest = ?",
    )
    .bind(session_id)
    .bind(digest.as_slice())
    .fetch_optional(&store.pool)
    .await?;
    Ok(row.is_some())
}

/// The highest epoch tag ever accepted for `session_id`, or `None` if the
/// session has no journal history yet.
pub async fn high_water(store: &Store, session_id: &str) -> Result<Option<u64>, StoreError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT epoch_tag FROM journal_high_water WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(&store.pool)
        .await?;
    Ok(row.map(|(tag,)| tag as u64))
}

async fn bump_high_water(store: &Store, session_id: &str, epoch_tag: u64) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO journal_high_water (session_id, epoch_tag) VALUES (?, ?)
         ON CONFLICT(session_id) DO UPDATE SET epoch_tag = MAX(epoch_tag, excluded.epoch_tag)",
    )
    .bind(session_id)
    .bind(epoch_tag as i64)
    .execute(&store.pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::Vault;

    async fn fresh_store() -> Store {
        Store::open_in_memory(Vault::new()).await.expect("open in-memory store")
    }

    #[tokio::test]
    async fn records_and_detects_replay() {
        let store = fresh_store().await;
        let digest = [9u8; 32];
        assert!(!is_replay(&store, "s1", &digest).await.unwrap());
        record(&store, "s1", 0, &digest).await.unwrap();
        assert!(is_replay(&store, "s1", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn high_water_tracks_max_epoch_tag() {
        let store = fresh_store().await;
        record(&store, "s1", 3, &[1u8; 32]).await.unwrap();
        record(&store, "s1", 1, &[2u8; 32]).await.unwrap();
        assert_eq!(high_water(&store, "s1").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn unknown_session_has_no_high_water() {
        let store = fresh_store().await;
        assert_eq!(high_water(&store, "unknown").await.unwrap(), None);
    }
}

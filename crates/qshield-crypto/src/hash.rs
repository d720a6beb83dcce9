//! Digest utilities.
//!
//! - BLAKE3 ciphertext digests for the durable replay journal.
//! - `pq_bind`: truncated SHA-512 binding of the QSP flags + PQ-prefix into
//!   the AEAD associated data.

use sha2::{Digest, Sha512};

pub const PQ_BIND_LABEL: &[u8] = b"QSP5.0/PQ-BIND";

pub fn hash(data: &[u8]) -> [u8; 32] {
    blake3::hash(data).into()
}

/// Keyed hash — used where a key context differentiates domains.
pub fn keyed_hash(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    blake3::keyed_hash(key, data).into()
}

/// Digest an accepted ciphertext for the durable replay journal.
pub fn ciphertext_digest(ciphertext: &[u8]) -> [u8; 32] {
    blake3::hash(ciphertext).into()
}

/// `pq_bind = SHA-512("QSP5.0/PQ-BIND" || u16(flags) || pq_prefix)[:32]`.
/// `pq_prefix` is the concatenation of whichever conditional PQ fields
/// (`pq_adv_pub`, `pq_ct`) are present on the wire; empty when neither the
/// PQ_ADV nor PQ_CTXT flag is set.
pub fn pq_bind(flags: u16, pq_prefix: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(PQ_BIND_LABEL);
    hasher.update(flags.to_be_bytes());
    hasher.update(pq_prefix);
    let full = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pq_bind_is_deterministic_and_flag_sensitive() {
        let a = pq_bind(0x0000, &[]);
        let b = pq_bind(0x0000, &[]);
        let c = pq_bind(0x0005, &[]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

//! Hybrid key encapsulation: classical X25519 ECDH combined with
//! ML-KEM-768 (Kyber768) post-quantum encapsulation.
//!
//! ML-KEM-768 parameters: 1184-byte public key, 1088-byte ciphertext,
//! 32-byte shared secret — matching the QSP wire prefix's `pq_adv_pub` /
//! `pq_ct` field widths exactly.

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};
use zeroize::Zeroize;

use crate::error::CryptoError;

pub const PQ_PUBLIC_KEY_LEN: usize = 1184;
pub const PQ_CIPHERTEXT_LEN: usize = 1088;

/// A classical + PQ keypair for one side of a hybrid handshake or PQ reseed.
/// The PQ secret key has no public `Zeroize` impl; `Drop` below zeroizes the
/// one buffer we fully own (`pq_public` isn't secret, but `x25519_secret`
/// already zeroizes itself via `x25519-dalek`'s own `Drop`).
pub struct HybridKeypair {
    pub x25519_public: X25519Public,
    x25519_secret: X25519Secret,
    pub pq_public: [u8; PQ_PUBLIC_KEY_LEN],
    pq_secret: kyber768::SecretKey,
}

impl HybridKeypair {
    pub fn generate() -> Self {
        let x25519_secret = X25519Secret::random_from_rng(OsRng);
        let x25519_public = X25519Public::from(&x25519_secret);
        let (pq_pk, pq_sk) = kyber768::keypair();
        let mut pq_public = [0u8; PQ_PUBLIC_KEY_LEN];
        pq_public.copy_from_slice(pq_pk.as_bytes());
        Self {
            x25519_public,
            x25519_secret,
            pq_public,
            pq_secret: pq_sk,
        }
    }

    pub fn x25519_dh(&self, peer_public: &X25519Public) -> [u8; 32] {
        self.x25519_secret.diffie_hellman(peer_public).to_bytes()
    }

    /// Decapsulate a PQ ciphertext addressed to this keypair's public key.
    pub fn pq_decapsulate(&self, ct: &[u8]) -> Result<[u8; 32], CryptoError> {
        if ct.len() != PQ_CIPHERTEXT_LEN {
            return Err(CryptoError::KemDecapsulate(format!(
                "expected {PQ_CIPHERTEXT_LEN}-byte ciphertext, got {}",
                ct.len()
            )));
        }
        let ct = kyber768::Ciphertext::from_bytes(ct)
            .map_err(|e| CryptoError::KemDecapsulate(e.to_string()))?;
        let ss = kyber768::decapsulate(&ct, &self.pq_secret);
        let mut out = [0u8; 32];
        out.copy_from_slice(ss.as_bytes());
        Ok(out)
    }
}

/// Encapsulate against a peer's PQ public key. Returns (ciphertext,
/// shared_secret).
pub fn pq_encapsulate(peer_pq_public: &[u8]) -> Result<([u8; PQ_CIPHERTEXT_LEN], [u8; 32]), CryptoError> {
    if peer_pq_public.len() != PQ_PUBLIC_KEY_LEN {
        return Err(CryptoError::KemEncapsulate(format!(
            "expected {PQ_PUBLIC_KEY_LEN}-byte public key, got {}",
            peer_pq_public.len()
        )));
    }
    let pk = kyber768::PublicKey::from_bytes(peer_pq_public)
        .map_err(|e| CryptoError::KemEncapsulate(e.to_string()))?;
    let (ss, ct) = kyber768::encapsulate(&pk);
    let mut ct_out = [0u8; PQ_CIPHERTEXT_LEN];
    ct_out.copy_from_slice(ct.as_bytes());
    let mut ss_out = [0u8; 32];
    ss_out.copy_from_slice(ss.as_bytes());
    Ok((ct_out, ss_out))
}

/// Parse a raw 32-byte X25519 public key from the wire.
pub fn x25519_public_from_bytes(bytes: &[u8; 32]) -> X25519Public {
    X25519Public::from(*bytes)
}

impl Drop for HybridKeypair {
    fn drop(&mut self) {
        self.pq_public.zeroize();
    }
}

/// A PQ-only keypair advertised by SCKA for an ongoing hybrid reseed. Unlike
/// [`HybridKeypair`], a reseed never needs a fresh classical DH key — the
/// ratchet's existing `dh_secret_self` already covers the EC side, so SCKA's
/// ADV/CTXT exchange only ever carries a Kyber768 keypair.
pub struct PqReseedKeypair {
    pub pq_public: [u8; PQ_PUBLIC_KEY_LEN],
    pq_secret: kyber768::SecretKey,
}

impl PqReseedKeypair {
    pub fn generate() -> Self {
        let (pq_pk, pq_sk) = kyber768::keypair();
        let mut pq_public = [0u8; PQ_PUBLIC_KEY_LEN];
        pq_public.copy_from_slice(pq_pk.as_bytes());
        Self { pq_public, pq_secret: pq_sk }
    }

    pub fn decapsulate(&self, ct: &[u8]) -> Result<[u8; 32], CryptoError> {
        if ct.len() != PQ_CIPHERTEXT_LEN {
            return Err(CryptoError::KemDecapsulate(format!(
                "expected {PQ_CIPHERTEXT_LEN}-byte ciphertext, got {}",
                ct.len()
            )));
        }
        let ct = kyber768::Ciphertext::from_bytes(ct)
            .map_err(|e| CryptoError::KemDecapsulate(e.to_string()))?;
        let ss = kyber768::decapsulate(&ct, &self.pq_secret);
        let mut out = [0u8; 32];
        out.copy_from_slice(ss.as_bytes());
        Ok(out)
    }

    /// The raw secret-key bytes, for wrapping into a serialisable snapshot
    /// (`kyber768::SecretKey` has no `Serialize` impl of its own).
    pub fn secret_bytes(&self) -> Vec<u8> {
        self.pq_secret.as_bytes().to_vec()
    }

    /// Reconstruct from a public key and the raw secret bytes produced by
    /// [`secret_bytes`](Self::secret_bytes).
    pub fn from_parts(pq_public: [u8; PQ_PUBLIC_KEY_LEN], secret_bytes: &[u8]) -> Result<Self, CryptoError> {
        let pq_secret = kyber768::SecretKey::from_bytes(secret_bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { pq_public, pq_secret })
    }
}

impl Drop for PqReseedKeypair {
    fn drop(&mut self) {
        self.pq_public.zeroize();
    }
}

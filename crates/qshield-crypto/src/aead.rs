//! Authenticated Encryption with Associated Data.
//!
//! QSP header/body ciphertexts use AES-256-GCM (matching the reference
//! vector runner's choice of AES-GCM). XChaCha20-Poly1305 is kept available
//! for callers that want a misuse-resistant random-nonce AEAD — in
//! particular the durability layer's at-rest snapshot encryption.

use aes_gcm::{
    aead::{Aead as _, KeyInit as _, Payload},
    Aes256Gcm, Nonce,
};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Seal `plaintext` under `key` (32 bytes) with a caller-supplied 12-byte
/// nonce (QSP derives nonces deterministically from the header — see
/// `derive_nonce` below — it never uses a random nonce) and `aad`. Returns
/// ciphertext+tag with no nonce prefix; the nonce travels separately on the
/// QSP wire.
pub fn gcm_seal(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadEncrypt)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AeadEncrypt)
}

/// Open an AES-256-GCM ciphertext+tag sealed by [`gcm_seal`].
pub fn gcm_open(key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadDecrypt)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AeadDecrypt)?;
    Ok(Zeroizing::new(plaintext))
}

/// `nonce_hdr`/`nonce_body` derivation: SHA-512(label || session_id ||
/// dh_pub || u32(n))[:12]. Pass `b"QSP5.0/HDR-NONCE"` or
/// `b"QSP5.0/BODY-NONCE"` as `label`.
pub fn derive_nonce(label: &[u8], session_id: &[u8; 16], dh_pub: &[u8; 32], n: u32) -> [u8; 12] {
    use sha2::{Digest, Sha512};
    let mut hasher = Sha512::new();
    hasher.update(label);
    hasher.update(session_id);
    hasher.update(dh_pub);
    hasher.update(n.to_be_bytes());
    let full = hasher.finalize();
    let mut out = [0u8; 12];
    out.copy_from_slice(&full[..12]);
    out
}

// ── Legacy / at-rest XChaCha20-Poly1305 (random-nonce, nonce-prefixed) ──────

/// Encrypt `plaintext` with a 32-byte key, prepending a random 24-byte nonce.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::AeadEncrypt)?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);
    let ciphertext = cipher
        .encrypt(&nonce, chacha20poly1305::aead::Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AeadEncrypt)?;
    let mut out = Vec::with_capacity(24 + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt wire-format bytes (nonce || ciphertext+tag).
pub fn decrypt(key: &[u8; 32], data: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if data.len() < 24 {
        return Err(CryptoError::AeadDecrypt);
    }
    let (nonce_bytes, ct) = data.split_at(24);
    let nonce = chacha20poly1305::XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::AeadDecrypt)?;
    let plaintext = cipher
        .decrypt(nonce, chacha20poly1305::aead::Payload { msg: ct, aad })
        .map_err(|_| CryptoError::AeadDecrypt)?;
    Ok(Zeroizing::new(plaintext))
}

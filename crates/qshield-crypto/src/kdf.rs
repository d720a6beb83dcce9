//! Key derivation functions.
//!
//! Two families are in play:
//!
//! - The hybrid (Suite-2, protocol_version 0x0500) chain uses KMAC256 for
//!   every labelled derivation, matching the reference vector runner's
//!   domain-separation scheme exactly (label set and input ordering below).
//! - The legacy classical (Suite-1, protocol_version 0x0403) chain inherited
//!   from the pre-hybrid ratchet uses HKDF-SHA256, unchanged from before.

use hkdf::Hkdf;
use sha2::Sha256;
use tiny_keccak::{Hasher, Kmac};

use crate::error::CryptoError;

pub const LABEL_CK: &[u8] = b"QSP5.0/CK";
pub const LABEL_MK: &[u8] = b"QSP5.0/MK";
pub const LABEL_PQCK: &[u8] = b"QSP5.0/PQCK";
pub const LABEL_PQMK: &[u8] = b"QSP5.0/PQMK";
pub const LABEL_HYBRID: &[u8] = b"QSP5.0/HYBRID";
pub const LABEL_HK_A2B: &[u8] = b"QSP5.0/HK/A->B";
pub const LABEL_HK_B2A: &[u8] = b"QSP5.0/HK/B->A";
pub const LABEL_CK0_A2B: &[u8] = b"QSP5.0/CK0/A->B";
pub const LABEL_CK0_B2A: &[u8] = b"QSP5.0/CK0/B->A";
pub const LABEL_PQ0_A2B: &[u8] = b"QSP5.0/PQ0/A->B";
pub const LABEL_PQ0_B2A: &[u8] = b"QSP5.0/PQ0/B->A";
pub const LABEL_RK0: &[u8] = b"QSP5.0/RK0";
pub const LABEL_RKPQ: &[u8] = b"QSP5.0/RKPQ";
pub const LABEL_PQSEED_A2B: &[u8] = b"QSP5.0/PQSEED/A->B";
pub const LABEL_PQSEED_B2A: &[u8] = b"QSP5.0/PQSEED/B->A";
pub const LABEL_SCKA_CTXT: &[u8] = b"QSP5.0/SCKA/CTXT";
pub const LABEL_RKDH: &[u8] = b"QSP5.0/RKDH";

/// KMAC256(key, data, 32, label) as used throughout the hybrid chain.
/// `label` plays the role of KMAC's customization string; `key` is the MAC
/// key; `data` is appended to the sponge after the customization block.
pub fn kmac256(key: &[u8], data: &[u8], label: &[u8]) -> [u8; 32] {
    let mut kmac = Kmac::v256(key, label);
    kmac.update(data);
    let mut out = [0u8; 32];
    kmac.finalize(&mut out);
    out
}

/// KMAC256 with a 64-byte output, used where a single derivation needs to
/// split into two 32-byte halves (`derive_rk_dh`'s `RK'`/`CK_ec0` pair).
pub fn kmac256_64(key: &[u8], data: &[u8], label: &[u8]) -> [u8; 64] {
    let mut kmac = Kmac::v256(key, label);
    kmac.update(data);
    let mut out = [0u8; 64];
    kmac.finalize(&mut out);
    out
}

/// Ratchet-step root-key update from a DH output: `KMAC256(RK, dh_out, 64,
/// "QSP5.0/RKDH")`, the first 32 bytes becoming `RK'` and the second 32
/// becoming the freshly reseeded EC chain key `CK_ec0`. Used by the
/// Suite-2 vector runner's `kdf_rk_dh` check; distinct from
/// [`derive_rk0`]/[`derive_rk_pq`], which seed the root key once at
/// handshake completion rather than on an in-session DH ratchet step.
pub fn derive_rk_dh(rk: &[u8; 32], dh_out: &[u8]) -> ([u8; 32], [u8; 32]) {
    let out = kmac256_64(rk, dh_out, LABEL_RKDH);
    let mut rk_prime = [0u8; 32];
    let mut ck_ec0 = [0u8; 32];
    rk_prime.copy_from_slice(&out[..32]);
    ck_ec0.copy_from_slice(&out[32..]);
    (rk_prime, ck_ec0)
}

/// KDF_CK (hybrid): advance one chain key and derive its message-key
/// sub-component. `advance_label`/`mk_label` select `QSP5.0/CK`+`QSP5.0/MK`
/// for the EC chain or `QSP5.0/PQCK`+`QSP5.0/PQMK` for the PQ chain.
pub fn chain_step_labelled(ck: &[u8; 32], advance_label: &[u8], mk_label: &[u8]) -> ([u8; 32], [u8; 32]) {
    let next_ck = kmac256(ck, &[0x01], advance_label);
    let sub_mk = kmac256(ck, &[0x02], mk_label);
    (next_ck, sub_mk)
}

/// Hybrid chain step over the EC sub-chain: `QSP5.0/CK` / `QSP5.0/MK`.
pub fn chain_step_ec(ck_ec: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    chain_step_labelled(ck_ec, LABEL_CK, LABEL_MK)
}

/// Hybrid chain step over the PQ sub-chain: `QSP5.0/PQCK` / `QSP5.0/PQMK`.
pub fn chain_step_pq(ck_pq: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    chain_step_labelled(ck_pq, LABEL_PQCK, LABEL_PQMK)
}

/// Combine the EC and PQ message-key sub-components into the hybrid MK
/// under `QSP5.0/HYBRID`, advancing both chains in the process.
///
/// Returns (new_ck_ec, new_ck_pq, mk).
pub fn derive_mk_step(ck_ec: &[u8; 32], ck_pq: &[u8; 32]) -> ([u8; 32], [u8; 32], [u8; 32]) {
    let (new_ck_ec, ec_mk) = chain_step_ec(ck_ec);
    let (new_ck_pq, pq_mk) = chain_step_pq(ck_pq);
    let mut combined = [0u8; 33];
    combined[..32].copy_from_slice(&pq_mk);
    combined[32] = 0x01;
    let mk = kmac256(&ec_mk, &combined, LABEL_HYBRID);
    (new_ck_ec, new_ck_pq, mk)
}

/// Initial root key from the classical DH output, session-bound.
pub fn derive_rk0(dh_init: &[u8; 32], session_id: &[u8; 16]) -> [u8; 32] {
    let mut data = [0u8; 17];
    data[..16].copy_from_slice(session_id);
    data[16] = 0x01;
    kmac256(dh_init, &data, LABEL_RK0)
}

/// Mix the initial PQ shared secret into the root key.
pub fn derive_rk_pq(rk0: &[u8; 32], pq_init_ss: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 33];
    data[..32].copy_from_slice(pq_init_ss);
    data[32] = 0x01;
    kmac256(rk0, &data, LABEL_RKPQ)
}

/// Derive the per-direction header key from the root key.
pub fn derive_header_key(rk: &[u8; 32], a_to_b: bool) -> [u8; 32] {
    let label = if a_to_b { LABEL_HK_A2B } else { LABEL_HK_B2A };
    kmac256(rk, &[0x01], label)
}

/// Derive the per-direction initial EC chain key from the root key.
pub fn derive_initial_ck_ec(rk: &[u8; 32], a_to_b: bool) -> [u8; 32] {
    let label = if a_to_b { LABEL_CK0_A2B } else { LABEL_CK0_B2A };
    kmac256(rk, &[0x01], label)
}

/// Derive the per-direction initial PQ chain key from the root key.
pub fn derive_initial_ck_pq(rk: &[u8; 32], a_to_b: bool) -> [u8; 32] {
    let label = if a_to_b { LABEL_PQ0_A2B } else { LABEL_PQ0_B2A };
    kmac256(rk, &[0x01], label)
}

/// PQ reseed context for an SCKA CTXT consumption: `label || u32(target_id)
/// || SHA-512(ct)[:32] || ss`.
pub fn scka_reseed_context(target_id: u32, ct: &[u8], ss: &[u8; 32]) -> Vec<u8> {
    use sha2::Digest;
    let digest32: [u8; 32] = {
        let full = sha2::Sha512::digest(ct);
        let mut out = [0u8; 32];
        out.copy_from_slice(&full[..32]);
        out
    };
    let mut ctx = Vec::with_capacity(LABEL_SCKA_CTXT.len() + 4 + 32 + 32);
    ctx.extend_from_slice(LABEL_SCKA_CTXT);
    ctx.extend_from_slice(&target_id.to_be_bytes());
    ctx.extend_from_slice(&digest32);
    ctx.extend_from_slice(ss);
    ctx
}

/// Derive the per-direction PQ-reseed chain key from the root key plus the
/// SCKA reseed context.
pub fn derive_pq_reseed(rk: &[u8; 32], ctx: &[u8], a_to_b: bool) -> [u8; 32] {
    let label = if a_to_b { LABEL_PQSEED_A2B } else { LABEL_PQSEED_B2A };
    kmac256(rk, ctx, label)
}

// ── Legacy classical (Suite-1) HKDF-SHA256 chain ────────────────────────────

/// Expand `ikm` + `info` into `output.len()` bytes of key material.
pub fn hkdf_expand(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output: &mut [u8],
) -> Result<(), CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

/// KDF_RK (classical): derive new root key + send/recv chain keys from a DH
/// ratchet step.
pub fn ratchet_keys(
    root_key: &[u8; 32],
    dh_ratchet_output: &[u8],
) -> Result<([u8; 32], [u8; 32], [u8; 32]), CryptoError> {
    let mut new_root = [0u8; 32];
    let mut ck_send = [0u8; 32];
    let mut ck_recv = [0u8; 32];

    let hk = Hkdf::<Sha256>::new(Some(root_key), dh_ratchet_output);
    hk.expand(b"qsp-classical-root-key", &mut new_root)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    hk.expand(b"qsp-classical-chain-send", &mut ck_send)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    hk.expand(b"qsp-classical-chain-recv", &mut ck_recv)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok((new_root, ck_send, ck_recv))
}

/// KDF_CK (classical): derive the next chain key and a message key.
pub fn chain_step_classical(ck: &[u8; 32]) -> Result<([u8; 32], [u8; 32]), CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(ck), b"qsp-classical-chain-step");
    let mut next_ck = [0u8; 32];
    let mut mk = [0u8; 32];
    hk.expand(b"next-chain-key", &mut next_ck)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    hk.expand(b"message-key", &mut mk)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok((next_ck, mk))
}

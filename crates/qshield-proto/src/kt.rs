//! Key Transparency artifact framing checks.
//!
//! These are length-only validations — the artifacts themselves are opaque
//! to this crate (no Merkle-tree verification logic lives here, only the
//! canonical-size gate the reference harness applies before a KT artifact
//! is accepted at all).

use crate::error::ProtoError;

/// Signed tree heads are a fixed 3453 bytes, no exceptions.
pub const STH_LEN: usize = 3453;

pub fn parse_sth(b: &[u8]) -> Result<(), ProtoError> {
    if b.len() != STH_LEN {
        return Err(ProtoError::kt(format!("expected {STH_LEN}-byte STH, got {}", b.len())));
    }
    Ok(())
}

/// `count(u16, <=64) || count*32B || u64`.
pub fn parse_inclusion_proof(b: &[u8]) -> Result<(), ProtoError> {
    if b.len() < 2 {
        return Err(ProtoError::kt("inclusion proof truncated"));
    }
    let count = u16::from_be_bytes([b[0], b[1]]) as usize;
    if count > 64 {
        return Err(ProtoError::kt("inclusion proof count too large"));
    }
    let expected = 2 + 32 * count + 8;
    if b.len() != expected {
        return Err(ProtoError::kt(format!("bad inclusion proof length: expected {expected}, got {}", b.len())));
    }
    Ok(())
}

/// `count(u16, <=64) || count*32B`.
pub fn parse_consistency_proof(b: &[u8]) -> Result<(), ProtoError> {
    if b.len() < 2 {
        return Err(ProtoError::kt("consistency proof truncated"));
    }
    let count = u16::from_be_bytes([b[0], b[1]]) as usize;
    if count > 64 {
        return Err(ProtoError::kt("consistency proof count too large"));
    }
    let expected = 2 + 32 * count;
    if b.len() != expected {
        return Err(ProtoError::kt(format!("bad consistency proof length: expected {expected}, got {}", b.len())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sth_exact_length_only() {
        assert!(parse_sth(&vec![0u8; STH_LEN]).is_ok());
        assert!(parse_sth(&vec![0u8; STH_LEN - 1]).is_err());
        assert!(parse_sth(&vec![0u8; STH_LEN + 1]).is_err());
    }

    #[test]
    fn inclusion_proof_length_matches_count() {
        let count: u16 = 3;
        let mut buf = count.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 32 * 3]);
        buf.extend_from_slice(&0u64.to_be_bytes());
        assert!(parse_inclusion_proof(&buf).is_ok());
        buf.push(0);
        assert!(parse_inclusion_proof(&buf).is_err());
    }

    #[test]
    fn inclusion_proof_rejects_count_over_64() {
        let mut buf = 65u16.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 32 * 65 + 8]);
        assert!(parse_inclusion_proof(&buf).is_err());
    }

    #[test]
    fn consistency_proof_length_matches_count() {
        let count: u16 = 2;
        let mut buf = count.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 32 * 2]);
        assert!(parse_consistency_proof(&buf).is_ok());
        buf.pop();
        assert!(parse_consistency_proof(&buf).is_err());
    }
}

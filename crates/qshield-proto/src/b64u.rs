//! Strict base64url — no padding, `[A-Za-z0-9_-]` alphabet only.
//!
//! The actor protocol carries every binary field as a base64url string;
//! deviating encoders (padded, mixed-alphabet) are rejected rather than
//! tolerated, matching the reference harness's strict decoder.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::error::ProtoError;

/// Decode a strict base64url string. Rejects `=` padding, any character
/// outside `[A-Za-z0-9_-]`, and lengths with `len % 4 == 1` (no valid
/// base64 encoding has that remainder).
pub fn decode_strict(s: &str) -> Result<Vec<u8>, ProtoError> {
    if s.contains('=') {
        return Err(ProtoError::invalid("base64url padding not allowed"));
    }
    if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        return Err(ProtoError::invalid("invalid base64url alphabet"));
    }
    if s.len() % 4 == 1 {
        return Err(ProtoError::invalid("invalid base64url length"));
    }
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| ProtoError::invalid(format!("base64url decode failed: {e}")))
}

/// Encode bytes as unpadded base64url.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"hybrid ratchet payload";
        let encoded = encode(data);
        assert!(!encoded.contains('='));
        let decoded = decode_strict(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_padding() {
        assert!(decode_strict("AAAA=").is_err());
    }

    #[test]
    fn rejects_bad_alphabet() {
        assert!(decode_strict("AA+B").is_err());
        assert!(decode_strict("AA/B").is_err());
    }

    #[test]
    fn rejects_length_mod_four_is_one() {
        // A 5-char string has no valid base64 decoding.
        assert!(decode_strict("AAAAA").is_err());
    }
}

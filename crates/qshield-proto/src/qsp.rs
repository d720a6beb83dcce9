//! QSP wire prefix — the hybrid double-ratchet message format.
//!
//! `protocol_version(u16) || suite_id(u16) || session_id(16B) || dh_pub(32B)
//! || flags(u16) || nonce_hdr(12B) || [pq_adv_id(u32) || pq_adv_pub(1184B)]?
//! || [pq_target_id(u32) || pq_ct(1088B)]? || hdr_ct_len(u16,=24) || hdr_ct
//! || body_ct_len(u32,>=16) || body_ct`.

use qshield_crypto::kem::{PQ_CIPHERTEXT_LEN, PQ_PUBLIC_KEY_LEN};

use crate::error::ProtoError;

pub const PROTOCOL_VERSION_CLASSICAL: u16 = 0x0403;
pub const PROTOCOL_VERSION_HYBRID: u16 = 0x0500;

pub const SUITE_CLASSICAL: u16 = 0x0001;
pub const SUITE_HYBRID: u16 = 0x0002;

pub const FLAG_PQ_ADV: u16 = 0x0001;
pub const FLAG_PQ_CTXT: u16 = 0x0002;
pub const FLAG_BOUNDARY: u16 = 0x0004;
const KNOWN_FLAGS: u16 = FLAG_PQ_ADV | FLAG_PQ_CTXT | FLAG_BOUNDARY;

const HDR_CT_LEN: u16 = 24;

#[derive(Debug, Clone)]
pub struct QspMessage {
    pub protocol_version: u16,
    pub suite_id: u16,
    pub session_id: [u8; 16],
    pub dh_pub: [u8; 32],
    pub flags: u16,
    pub nonce_hdr: [u8; 12],
    pub pq_adv: Option<(u32, [u8; PQ_PUBLIC_KEY_LEN])>,
    pub pq_ctxt: Option<(u32, [u8; PQ_CIPHERTEXT_LEN])>,
    pub hdr_ct: Vec<u8>,
    pub body_ct: Vec<u8>,
}

struct Cursor<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    fn need(&self, n: usize) -> Result<(), ProtoError> {
        if self.off + n > self.buf.len() {
            return Err(ProtoError::invalid("truncated"));
        }
        Ok(())
    }

    fn take_u16(&mut self) -> Result<u16, ProtoError> {
        self.need(2)?;
        let v = u16::from_be_bytes([self.buf[self.off], self.buf[self.off + 1]]);
        self.off += 2;
        Ok(v)
    }

    fn take_u32(&mut self) -> Result<u32, ProtoError> {
        self.need(4)?;
        let v = u32::from_be_bytes(self.buf[self.off..self.off + 4].try_into().unwrap());
        self.off += 4;
        Ok(v)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtoError> {
        self.need(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.off..self.off + N]);
        self.off += N;
        Ok(out)
    }

    fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtoError> {
        self.need(n)?;
        let s = &self.buf[self.off..self.off + n];
        self.off += n;
        Ok(s)
    }
}

pub fn parse(b: &[u8]) -> Result<QspMessage, ProtoError> {
    let mut c = Cursor::new(b);

    let protocol_version = c.take_u16()?;
    let suite_id = c.take_u16()?;
    if protocol_version != PROTOCOL_VERSION_CLASSICAL && protocol_version != PROTOCOL_VERSION_HYBRID {
        return Err(ProtoError::invalid("unknown protocol_version"));
    }
    if suite_id != SUITE_CLASSICAL && suite_id != SUITE_HYBRID {
        return Err(ProtoError::invalid("unknown suite_id"));
    }

    let session_id = c.take_array::<16>()?;
    let dh_pub = c.take_array::<32>()?;
    let flags = c.take_u16()?;
    let nonce_hdr = c.take_array::<12>()?;

    if flags & !KNOWN_FLAGS != 0 {
        return Err(ProtoError::invalid("unknown flags"));
    }
    if flags & FLAG_PQ_ADV != 0 && flags & FLAG_BOUNDARY == 0 {
        return Err(ProtoError::invalid("PQ_ADV requires BOUNDARY"));
    }
    if flags & FLAG_PQ_CTXT != 0 && flags & FLAG_BOUNDARY == 0 {
        return Err(ProtoError::invalid("PQ_CTXT requires BOUNDARY"));
    }

    let pq_adv = if flags & FLAG_PQ_ADV != 0 {
        let id = c.take_u32()?;
        let pub_key = c.take_array::<PQ_PUBLIC_KEY_LEN>()?;
        Some((id, pub_key))
    } else {
        None
    };

    let pq_ctxt = if flags & FLAG_PQ_CTXT != 0 {
        let id = c.take_u32()?;
        let ct = c.take_array::<PQ_CIPHERTEXT_LEN>()?;
        Some((id, ct))
    } else {
        None
    };

    let hdr_ct_len = c.take_u16()?;
    if hdr_ct_len != HDR_CT_LEN {
        return Err(ProtoError::invalid("hdr_ct_len must be 24"));
    }
    let hdr_ct = c.take_bytes(hdr_ct_len as usize)?.to_vec();

    let body_ct_len = c.take_u32()?;
    if body_ct_len < 16 {
        return Err(ProtoError::invalid("body_ct_len too small"));
    }
    let body_ct = c.take_bytes(body_ct_len as usize)?.to_vec();

    if c.off != b.len() {
        return Err(ProtoError::invalid("trailing bytes"));
    }

    Ok(QspMessage {
        protocol_version,
        suite_id,
        session_id,
        dh_pub,
        flags,
        nonce_hdr,
        pq_adv,
        pq_ctxt,
        hdr_ct,
        body_ct,
    })
}

pub fn serialize(msg: &QspMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + msg.hdr_ct.len() + msg.body_ct.len());
    out.extend_from_slice(&msg.protocol_version.to_be_bytes());
    out.extend_from_slice(&msg.suite_id.to_be_bytes());
    out.extend_from_slice(&msg.session_id);
    out.extend_from_slice(&msg.dh_pub);
    out.extend_from_slice(&msg.flags.to_be_bytes());
    out.extend_from_slice(&msg.nonce_hdr);

    if let Some((id, pub_key)) = &msg.pq_adv {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(pub_key);
    }
    if let Some((id, ct)) = &msg.pq_ctxt {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(ct);
    }

    out.extend_from_slice(&HDR_CT_LEN.to_be_bytes());
    out.extend_from_slice(&msg.hdr_ct);
    out.extend_from_slice(&(msg.body_ct.len() as u32).to_be_bytes());
    out.extend_from_slice(&msg.body_ct);
    out
}

/// Header AD = `session_id || protocol_version || suite_id || dh_pub ||
/// flags || pq_bind`.
pub fn ad_header(session_id: &[u8; 16], protocol_version: u16, suite_id: u16, dh_pub: &[u8; 32], flags: u16, pq_bind: &[u8; 32]) -> Vec<u8> {
    let mut ad = Vec::with_capacity(16 + 2 + 2 + 32 + 2 + 32);
    ad.extend_from_slice(session_id);
    ad.extend_from_slice(&protocol_version.to_be_bytes());
    ad.extend_from_slice(&suite_id.to_be_bytes());
    ad.extend_from_slice(dh_pub);
    ad.extend_from_slice(&flags.to_be_bytes());
    ad.extend_from_slice(pq_bind);
    ad
}

/// Body AD = `session_id || protocol_version || suite_id || pq_bind`.
pub fn ad_body(session_id: &[u8; 16], protocol_version: u16, suite_id: u16, pq_bind: &[u8; 32]) -> Vec<u8> {
    let mut ad = Vec::with_capacity(16 + 2 + 2 + 32);
    ad.extend_from_slice(session_id);
    ad.extend_from_slice(&protocol_version.to_be_bytes());
    ad.extend_from_slice(&suite_id.to_be_bytes());
    ad.extend_from_slice(pq_bind);
    ad
}

/// `pq_bind` input material: the concatenation of whichever conditional PQ
/// fields are present on the wire (`pq_adv_pub` then `pq_ct`), empty when
/// neither flag is set.
pub fn pq_prefix(msg: &QspMessage) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some((_, pub_key)) = &msg.pq_adv {
        out.extend_from_slice(pub_key);
    }
    if let Some((_, ct)) = &msg.pq_ctxt {
        out.extend_from_slice(ct);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(flags: u16, pq_adv: Option<(u32, [u8; PQ_PUBLIC_KEY_LEN])>, pq_ctxt: Option<(u32, [u8; PQ_CIPHERTEXT_LEN])>) -> QspMessage {
        QspMessage {
            protocol_version: PROTOCOL_VERSION_HYBRID,
            suite_id: SUITE_HYBRID,
            session_id: [1u8; 16],
            dh_pub: [2u8; 32],
            flags,
            nonce_hdr: [3u8; 12],
            pq_adv,
            pq_ctxt,
            hdr_ct: vec![4u8; 24],
            body_ct: vec![5u8; 32],
        }
    }

    #[test]
    fn roundtrip_no_pq_fields() {
        let msg = sample(0, None, None);
        let wire = serialize(&msg);
        let parsed = parse(&wire).unwrap();
        assert_eq!(parsed.session_id, msg.session_id);
        assert_eq!(parsed.body_ct, msg.body_ct);
    }

    #[test]
    fn roundtrip_with_pq_adv_and_ctxt() {
        let msg = sample(
            FLAG_BOUNDARY | FLAG_PQ_ADV | FLAG_PQ_CTXT,
            Some((7, [9u8; PQ_PUBLIC_KEY_LEN])),
            Some((11, [13u8; PQ_CIPHERTEXT_LEN])),
        );
        let wire = serialize(&msg);
        let parsed = parse(&wire).unwrap();
        assert_eq!(parsed.pq_adv.unwrap().0, 7);
        assert_eq!(parsed.pq_ctxt.unwrap().0, 11);
    }

    #[test]
    fn pq_adv_without_boundary_rejected() {
        let msg = sample(FLAG_PQ_ADV, Some((1, [0u8; PQ_PUBLIC_KEY_LEN])), None);
        let wire = serialize(&msg);
        assert!(parse(&wire).is_err());
    }

    #[test]
    fn unknown_flag_bit_rejected() {
        let msg = sample(0x0008, None, None);
        let wire = serialize(&msg);
        assert!(parse(&wire).is_err());
    }

    #[test]
    fn hdr_ct_len_must_be_24() {
        let mut msg = sample(0, None, None);
        msg.hdr_ct = vec![0u8; 10];
        // Hand-roll the wire bytes since `serialize` always writes 24.
        let mut wire = Vec::new();
        wire.extend_from_slice(&msg.protocol_version.to_be_bytes());
        wire.extend_from_slice(&msg.suite_id.to_be_bytes());
        wire.extend_from_slice(&msg.session_id);
        wire.extend_from_slice(&msg.dh_pub);
        wire.extend_from_slice(&msg.flags.to_be_bytes());
        wire.extend_from_slice(&msg.nonce_hdr);
        wire.extend_from_slice(&10u16.to_be_bytes());
        wire.extend_from_slice(&msg.hdr_ct);
        wire.extend_from_slice(&(msg.body_ct.len() as u32).to_be_bytes());
        wire.extend_from_slice(&msg.body_ct);
        assert!(parse(&wire).is_err());
    }

    #[test]
    fn pq_prefix_concatenates_present_fields() {
        let msg = sample(
            FLAG_BOUNDARY | FLAG_PQ_ADV,
            Some((1, [6u8; PQ_PUBLIC_KEY_LEN])),
            None,
        );
        let prefix = pq_prefix(&msg);
        assert_eq!(prefix.len(), PQ_PUBLIC_KEY_LEN);
    }
}

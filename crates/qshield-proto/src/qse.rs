//! QSE 1.8 envelope — relay-transport framing wrapped around a QSP
//! ciphertext.
//!
//! Wire: `env_version(u16) || flags(u16) || route_token(varbytes<u16>) ||
//! timestamp_bucket(u32) || pad_len(u16) || payload_len(u32) || payload ||
//! pad`. Field order is exactly this — `pad_len` is read before
//! `payload_len`, but the `payload` byte run still precedes the `pad` byte
//! run, per the reference harness parser.

use crate::error::ProtoError;

pub const ENV_VERSION: u16 = 0x0100;
pub const MAX_ROUTE_TOKEN: usize = 512;
pub const MAX_PAYLOAD: usize = 1_048_576;

#[derive(Debug, Clone)]
pub struct QseEnvelope {
    pub env_version: u16,
    pub flags: u16,
    pub route_token: Vec<u8>,
    pub timestamp_bucket: u32,
    pub payload: Vec<u8>,
    pub pad: Vec<u8>,
}

/// Policy gates consulted only where the wire format itself is ambiguous
/// about acceptance — never part of the framing grammar.
#[derive(Debug, Clone, Copy)]
pub struct QsePolicy {
    pub allow_zero_timestamp_bucket: bool,
    pub timestamp_window_enforced: bool,
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
            return Err(ProtoError::noncanonical("truncated"));
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

    fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtoError> {
        self.need(n)?;
        let s = &self.buf[self.off..self.off + n];
        self.off += n;
        Ok(s)
    }
}

pub fn parse(b: &[u8], policy: QsePolicy) -> Result<QseEnvelope, ProtoError> {
    let mut c = Cursor::new(b);

    let env_version = c.take_u16()?;
    let flags = c.take_u16()?;
    if env_version != ENV_VERSION {
        return Err(ProtoError::invalid("unknown env_version"));
    }
    if flags != 0 {
        return Err(ProtoError::invalid("nonzero flags"));
    }

    let rt_len = c.take_u16()? as usize;
    if rt_len > MAX_ROUTE_TOKEN {
        return Err(ProtoError::bounds("route_token too long"));
    }
    let route_token = c.take_bytes(rt_len)?.to_vec();

    let timestamp_bucket = c.take_u32()?;
    let pad_len = c.take_u16()? as usize;
    let payload_len = c.take_u32()? as usize;
    if payload_len > MAX_PAYLOAD {
        return Err(ProtoError::bounds("payload too large"));
    }

    if timestamp_bucket == 0 && !policy.allow_zero_timestamp_bucket {
        return Err(ProtoError::policy("zero timestamp bucket disallowed"));
    }
    if policy.timestamp_window_enforced && timestamp_bucket == 0xFFFF_FFFF {
        return Err(ProtoError::policy("timestamp out of window"));
    }

    let payload = c.take_bytes(payload_len)?.to_vec();
    let pad = c.take_bytes(pad_len)?.to_vec();

    if c.off != b.len() {
        return Err(ProtoError::noncanonical("trailing bytes"));
    }

    Ok(QseEnvelope { env_version, flags, route_token, timestamp_bucket, payload, pad })
}

/// Serialise an envelope back to the canonical wire form. Used by the
/// engine when constructing outgoing relay frames and by tests that exercise
/// the round trip.
pub fn serialize(env: &QseEnvelope) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + env.route_token.len() + env.payload.len() + env.pad.len());
    out.extend_from_slice(&env.env_version.to_be_bytes());
    out.extend_from_slice(&env.flags.to_be_bytes());
    out.extend_from_slice(&(env.route_token.len() as u16).to_be_bytes());
    out.extend_from_slice(&env.route_token);
    out.extend_from_slice(&env.timestamp_bucket.to_be_bytes());
    out.extend_from_slice(&(env.pad.len() as u16).to_be_bytes());
    out.extend_from_slice(&(env.payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&env.payload);
    out.extend_from_slice(&env.pad);
    out
}

//! Hybrid double ratchet: dual EC + PQ chains, epoch advance, bounded
//! out-of-order tolerance.
//!
//! Built on the same shape as a single-EC-chain ratchet session: DH ratchet
//! on a new peer public key, skipped-key buffering with bounded eviction,
//! `Drop` zeroizing all chain secrets — extended to the dual-chain hybrid
//! key schedule of `crate::kdf`.
//!
//! State separation:
//!   RK          — root key, updated on every epoch advance
//!   CKs_ec/pq   — sending chain keys (advance per message via `derive_mk_step`)
//!   CKr_ec/pq   — receiving chain keys
//!   MK          — message key, derived once per message, never reused
//!
//! Forward secrecy: consumed chain/message keys are overwritten in place.
//! Post-compromise security: an epoch advance (new peer DH-pub) re-derives
//! the root key from a fresh DH (and, for hybrid epochs, a fresh PQ
//! encapsulation via SCKA).

use std::collections::HashMap;

use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::kdf::{
    derive_header_key, derive_initial_ck_ec, derive_initial_ck_pq, derive_mk_step, derive_pq_reseed, ratchet_keys,
};

/// Out-of-order tolerance within the current epoch.
pub const MAX_SKIP: u64 = 256;
/// Retained header keys across previous epochs.
pub const MAX_HKSKIPPED: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    A,
    B,
}

/// Identifies a skipped message key: which epoch it belongs to and its
/// sequence number within that epoch's receiving chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkippedKeyId {
    pub epoch: u64,
    pub n: u64,
}

pub struct SendChain {
    pub session_id: [u8; 16],
    dh_secret_self: StaticSecret,
    pub dh_pub_self: X25519Public,
    pub header_key_send: [u8; 32],
    root_key: [u8; 32],
    chain_key_ec: [u8; 32],
    chain_key_pq: [u8; 32],
    pub ns: u64,
    pub pn: u64,
}

impl Drop for SendChain {
    fn drop(&mut self) {
        self.root_key.zeroize();
        self.chain_key_ec.zeroize();
        self.chain_key_pq.zeroize();
        self.header_key_send.zeroize();
    }
}

impl SendChain {
    pub fn new(
        session_id: [u8; 16],
        dh_secret_self: StaticSecret,
        root_key: [u8; 32],
        header_key_send: [u8; 32],
        chain_key_ec: [u8; 32],
        chain_key_pq: [u8; 32],
    ) -> Self {
        let dh_pub_self = X25519Public::from(&dh_secret_self);
        Self {
            session_id,
            dh_secret_self,
            dh_pub_self,
            header_key_send,
            root_key,
            chain_key_ec,
            chain_key_pq,
            ns: 0,
            pn: 0,
        }
    }

    /// Advance the send chain by one message, returning (n, message_key).
    /// `ns` is incremented on success; this function cannot fail, so it is
    /// always a commit (there is no reject path on encrypt).
    pub fn encrypt_step(&mut self) -> (u64, [u8; 32]) {
        let (new_ec, new_pq, mk) = derive_mk_step(&self.chain_key_ec, &self.chain_key_pq);
        self.chain_key_ec = new_ec;
        self.chain_key_pq = new_pq;
        let n = self.ns;
        self.ns += 1;
        (n, mk)
    }

    /// Mix a completed SCKA PQ reseed into the sending chain's PQ component,
    /// the send-side counterpart of [`ReceiveChain::decrypt_step`]'s
    /// `pq_reseed_ctx` parameter — the party encapsulating against a peer's
    /// advertised key applies this to the chain it uses to send, so the
    /// message it attaches the ciphertext to is itself sealed under the
    /// reseeded key the peer will independently derive on decrypt.
    pub fn apply_pq_reseed(&mut self, ctx: &[u8], a_to_b: bool) {
        self.chain_key_pq = derive_pq_reseed(&self.root_key, ctx, a_to_b);
    }

    fn dh_secret(&self) -> &StaticSecret {
        &self.dh_secret_self
    }

    /// Export the durable portion of send-chain state for a debug snapshot.
    /// Skipped-key buffers have no analogue here (the send side never
    /// buffers); the exported state is everything needed to resume sending.
    pub fn export(&self) -> SendChainState {
        SendChainState {
            dh_secret: self.dh_secret_self.to_bytes(),
            header_key_send: self.header_key_send,
            root_key: self.root_key,
            chain_key_ec: self.chain_key_ec,
            chain_key_pq: self.chain_key_pq,
            ns: self.ns,
            pn: self.pn,
        }
    }

    /// Reconstruct a send chain from a previously [`export`](Self::export)ed state.
    pub fn from_state(session_id: [u8; 16], state: SendChainState) -> Self {
        let dh_secret_self = StaticSecret::from(state.dh_secret);
        let dh_pub_self = X25519Public::from(&dh_secret_self);
        Self {
            session_id,
            dh_secret_self,
            dh_pub_self,
            header_key_send: state.header_key_send,
            root_key: state.root_key,
            chain_key_ec: state.chain_key_ec,
            chain_key_pq: state.chain_key_pq,
            ns: state.ns,
            pn: state.pn,
        }
    }
}

/// Serialisable snapshot of [`SendChain`] state, used by the engine's
/// `debug_snapshot`/`debug_restore` operations.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct SendChainState {
    pub dh_secret: [u8; 32],
    pub header_key_send: [u8; 32],
    pub root_key: [u8; 32],
    pub chain_key_ec: [u8; 32],
    pub chain_key_pq: [u8; 32],
    pub ns: u64,
    pub pn: u64,
}

pub struct ReceiveChain {
    pub session_id: [u8; 16],
    pub role: Role,
    pub peer_dh_pub: Option<X25519Public>,
    pub header_key_recv: [u8; 32],
    root_key: [u8; 32],
    chain_key_ec: [u8; 32],
    chain_key_pq: [u8; 32],
    pub nr: u64,
    pub epoch: u64,
    /// Header keys for up to `MAX_HKSKIPPED` previous epochs, oldest first.
    retained_header_keys: Vec<(u64, [u8; 32])>,
    skipped_message_keys: HashMap<SkippedKeyId, [u8; 32]>,
}

impl Drop for ReceiveChain {
    fn drop(&mut self) {
        self.root_key.zeroize();
        self.chain_key_ec.zeroize();
        self.chain_key_pq.zeroize();
        self.header_key_recv.zeroize();
        for (_, mk) in self.skipped_message_keys.iter_mut() {
            mk.zeroize();
        }
        for (_, hk) in self.retained_header_keys.iter_mut() {
            hk.zeroize();
        }
    }
}

/// A clone of the externally-observable receive-chain state, used to
/// restore byte-for-byte identical state on any reject path.
#[derive(Clone)]
struct ReceiveSnapshot {
    root_key: [u8; 32],
    chain_key_ec: [u8; 32],
    chain_key_pq: [u8; 32],
    nr: u64,
    epoch: u64,
    peer_dh_pub: Option<X25519Public>,
    header_key_recv: [u8; 32],
    retained_header_keys: Vec<(u64, [u8; 32])>,
    skipped_message_keys: HashMap<SkippedKeyId, [u8; 32]>,
}

impl ReceiveChain {
    pub fn new(
        session_id: [u8; 16],
        role: Role,
        root_key: [u8; 32],
        header_key_recv: [u8; 32],
        chain_key_ec: [u8; 32],
        chain_key_pq: [u8; 32],
    ) -> Self {
        Self {
            session_id,
            role,
            peer_dh_pub: None,
            header_key_recv,
            root_key,
            chain_key_ec,
            chain_key_pq,
            nr: 0,
            epoch: 0,
            retained_header_keys: Vec::new(),
            skipped_message_keys: HashMap::new(),
        }
    }

    fn snapshot(&self) -> ReceiveSnapshot {
        ReceiveSnapshot {
            root_key: self.root_key,
            chain_key_ec: self.chain_key_ec,
            chain_key_pq: self.chain_key_pq,
            nr: self.nr,
            epoch: self.epoch,
            peer_dh_pub: self.peer_dh_pub,
            header_key_recv: self.header_key_recv,
            retained_header_keys: self.retained_header_keys.clone(),
            skipped_message_keys: self.skipped_message_keys.clone(),
        }
    }

    fn restore(&mut self, snap: ReceiveSnapshot) {
        self.root_key = snap.root_key;
        self.chain_key_ec = snap.chain_key_ec;
        self.chain_key_pq = snap.chain_key_pq;
        self.nr = snap.nr;
        self.epoch = snap.epoch;
        self.peer_dh_pub = snap.peer_dh_pub;
        self.header_key_recv = snap.header_key_recv;
        self.retained_header_keys = snap.retained_header_keys;
        self.skipped_message_keys = snap.skipped_message_keys;
    }

    /// Derive the message key for an incoming message with DH-ratchet
    /// public key `peer_dh_pub_wire` and sequence `n`, ratcheting state as
    /// needed. On any rejection, state is restored byte-for-byte to the
    /// pre-call value (fail-closed, invariant 1 of the universal
    /// invariants).
    ///
    /// `pq_reseed_ctx`, when present, is the SCKA reseed context built from a
    /// completed PQ encapsulation (see `crate::kdf::scka_reseed_context`) and
    /// is mixed into the PQ chain key in place of the epoch's initial
    /// derivation — this is the only path by which the PQ half of the chain
    /// is re-seeded with fresh KEM material after the handshake. With no
    /// reseed context, an epoch advance falls back to the handshake-style
    /// derivation from the new root key alone.
    pub fn decrypt_step(
        &mut self,
        send_chain: &SendChain,
        peer_dh_pub_wire: &[u8; 32],
        n: u64,
        pn: u64,
        pq_reseed_ctx: Option<&[u8]>,
    ) -> Result<[u8; 32], CryptoError> {
        let pre = self.snapshot();

        let skip_id = SkippedKeyId { epoch: self.epoch, n };
        if let Some(mk) = self.skipped_message_keys.get(&skip_id).copied() {
            self.skipped_message_keys.remove(&skip_id);
            return Ok(mk);
        }

        let peer_dh = X25519Public::from(*peer_dh_pub_wire);
        let needs_epoch_advance = match self.peer_dh_pub {
            Some(current) => current.as_bytes() != peer_dh.as_bytes(),
            None => true,
        };

        if needs_epoch_advance {
            if self.peer_dh_pub.is_some() {
                if let Err(e) = self.skip_message_keys_to(pn) {
                    self.restore(pre);
                    return Err(e);
                }
                self.retained_header_keys.push((self.epoch, self.header_key_recv));
                while self.retained_header_keys.len() > MAX_HKSKIPPED {
                    self.retained_header_keys.remove(0);
                }
            }

            let dh_out = send_chain.dh_secret().diffie_hellman(&peer_dh);
            let (new_root, new_ck_ec, _unused_ck_recv) = match ratchet_keys(&self.root_key, dh_out.as_bytes()) {
                Ok(v) => v,
                Err(e) => {
                    self.restore(pre);
                    return Err(e);
                }
            };
            self.root_key = new_root;
            self.chain_key_ec = new_ck_ec;
            self.chain_key_pq = derive_initial_ck_pq(&self.root_key, self.role == Role::A);
            self.header_key_recv = derive_header_key(&self.root_key, self.role == Role::A);
            self.peer_dh_pub = Some(peer_dh);
            self.epoch += 1;
            self.nr = 0;
        }

        if let Some(ctx) = pq_reseed_ctx {
            self.chain_key_pq = derive_pq_reseed(&self.root_key, ctx, self.role == Role::A);
        }

        if let Err(e) = self.skip_message_keys_to(n) {
            self.restore(pre);
            return Err(e);
        }

        let (new_ec, new_pq, mk) = derive_mk_step(&self.chain_key_ec, &self.chain_key_pq);
        self.chain_key_ec = new_ec;
        self.chain_key_pq = new_pq;
        self.nr = n + 1;
        Ok(mk)
    }

    /// Buffer skipped message keys for `[nr, until)`, rejecting (without
    /// mutation beyond what the caller will itself roll back) if the
    /// implied gap exceeds `MAX_SKIP`.
    fn skip_message_keys_to(&mut self, until: u64) -> Result<(), CryptoError> {
        if until < self.nr {
            return Ok(());
        }
        let skip_count = until - self.nr;
        if skip_count > MAX_SKIP {
            return Err(CryptoError::SkipTooLarge { got: skip_count, max: MAX_SKIP });
        }
        while self.nr < until {
            let (new_ec, new_pq, mk) = derive_mk_step(&self.chain_key_ec, &self.chain_key_pq);
            self.chain_key_ec = new_ec;
            self.chain_key_pq = new_pq;
            self.skipped_message_keys
                .insert(SkippedKeyId { epoch: self.epoch, n: self.nr }, mk);
            self.nr += 1;
        }
        while self.skipped_message_keys.len() > MAX_SKIP as usize {
            if let Some(key) = self.skipped_message_keys.keys().next().copied() {
                if let Some(mut mk) = self.skipped_message_keys.remove(&key) {
                    mk.zeroize();
                }
            }
        }
        Ok(())
    }

    /// Whether `epoch` is still authenticatable (its header key has not
    /// been evicted past `MAX_HKSKIPPED`).
    pub fn epoch_is_retained(&self, epoch: u64) -> bool {
        epoch == self.epoch || self.retained_header_keys.iter().any(|(e, _)| *e == epoch)
    }

    /// Export the durable portion of receive-chain state. Skipped-key and
    /// retained-header-key buffers are intentionally excluded (transient,
    /// bounded re-acquisition cost on the next in-order message).
    pub fn export(&self) -> ReceiveChainState {
        ReceiveChainState {
            role_a: self.role == Role::A,
            peer_dh_pub: self.peer_dh_pub.map(|p| p.to_bytes()),
            header_key_recv: self.header_key_recv,
            root_key: self.root_key,
            chain_key_ec: self.chain_key_ec,
            chain_key_pq: self.chain_key_pq,
            nr: self.nr,
            epoch: self.epoch,
        }
    }

    /// Reconstruct a receive chain from a previously [`export`](Self::export)ed state.
    pub fn from_state(session_id: [u8; 16], state: ReceiveChainState) -> Self {
        Self {
            session_id,
            role: if state.role_a { Role::A } else { Role::B },
            peer_dh_pub: state.peer_dh_pub.map(X25519Public::from),
            header_key_recv: state.header_key_recv,
            root_key: state.root_key,
            chain_key_ec: state.chain_key_ec,
            chain_key_pq: state.chain_key_pq,
            nr: state.nr,
            epoch: state.epoch,
            retained_header_keys: Vec::new(),
            skipped_message_keys: HashMap::new(),
        }
    }
}

/// Serialisable snapshot of [`ReceiveChain`] state, used by the engine's
/// `debug_snapshot`/`debug_restore` operations.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct ReceiveChainState {
    pub role_a: bool,
    pub peer_dh_pub: Option<[u8; 32]>,
    pub header_key_recv: [u8; 32],
    pub root_key: [u8; 32],
    pub chain_key_ec: [u8; 32],
    pub chain_key_pq: [u8; 32],
    pub nr: u64,
    pub epoch: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{derive_header_key as hk, derive_initial_ck_ec, derive_initial_ck_pq};
    use rand_core::OsRng;

    fn paired_chains() -> (SendChain, ReceiveChain, SendChain, ReceiveChain) {
        let session_id = [1u8; 16];
        let root_key = [5u8; 32];

        let a_secret = StaticSecret::random_from_rng(OsRng);
        let b_secret = StaticSecret::random_from_rng(OsRng);

        let a_send = SendChain::new(
            session_id,
            a_secret,
            root_key,
            hk(&root_key, true),
            derive_initial_ck_ec(&root_key, true),
            derive_initial_ck_pq(&root_key, true),
        );
        let b_send = SendChain::new(
            session_id,
            b_secret,
            root_key,
            hk(&root_key, false),
            derive_initial_ck_ec(&root_key, false),
            derive_initial_ck_pq(&root_key, false),
        );

        let a_recv = ReceiveChain::new(
            session_id,
            Role::A,
            root_key,
            hk(&root_key, false),
            derive_initial_ck_ec(&root_key, false),
            derive_initial_ck_pq(&root_key, false),
        );
        let b_recv = ReceiveChain::new(
            session_id,
            Role::B,
            root_key,
            hk(&root_key, true),
            derive_initial_ck_ec(&root_key, true),
            derive_initial_ck_pq(&root_key, true),
        );

        (a_send, a_recv, b_send, b_recv)
    }

    #[test]
    fn in_order_roundtrip() {
        let (a_send, mut a_recv, b_send, mut b_recv) = paired_chains();
        let mut a_send = a_send;
        let mut b_send = b_send;

        let (n0, mk0) = a_send.encrypt_step();
        let mk0_b = b_recv.decrypt_step(&b_send, a_send.dh_pub_self.as_bytes(), n0, 0, None).unwrap();
        assert_eq!(mk0, mk0_b);

        let (n1, mk1) = b_send.encrypt_step();
        let mk1_a = a_recv.decrypt_step(&a_send, b_send.dh_pub_self.as_bytes(), n1, 0, None).unwrap();
        assert_eq!(mk1, mk1_a);
    }

    #[test]
    fn out_of_order_within_max_skip() {
        let (mut a_send, _a_recv, b_send, mut b_recv) = paired_chains();

        let (n0, mk0) = a_send.encrypt_step();
        let (n1, mk1) = a_send.encrypt_step();
        let (n2, mk2) = a_send.encrypt_step();

        let dh = a_send.dh_pub_self.as_bytes();
        let mk2_b = b_recv.decrypt_step(&b_send, dh, n2, 0, None).unwrap();
        assert_eq!(mk2, mk2_b);
        let mk0_b = b_recv.decrypt_step(&b_send, dh, n0, 0, None).unwrap();
        assert_eq!(mk0, mk0_b);
        let mk1_b = b_recv.decrypt_step(&b_send, dh, n1, 0, None).unwrap();
        assert_eq!(mk1, mk1_b);
    }

    #[test]
    fn beyond_max_skip_rejects_without_state_change() {
        let (mut a_send, _a_recv, b_send, mut b_recv) = paired_chains();
        for _ in 0..3 {
            a_send.encrypt_step();
        }
        let dh = a_send.dh_pub_self.as_bytes();
        let before_nr = b_recv.nr;
        let result = b_recv.decrypt_step(&b_send, dh, MAX_SKIP + 10, 0, None);
        assert!(result.is_err());
        assert_eq!(b_recv.nr, before_nr, "reject must leave nr unchanged");
        assert!(b_recv.skipped_message_keys.is_empty());
    }

    #[test]
    fn replay_of_consumed_skipped_key_is_rejected_by_engine_layer() {
        // The ratchet itself removes a consumed skipped key from its map;
        // replay detection against the durable journal is the engine's job
        // (qshield-engine), not the ratchet's — this test documents that
        // boundary: decrypting the same (epoch, n) twice without an
        // intervening skip yields two different outcomes (second lookup
        // misses the skipped-key map and falls through to live derivation),
        // which is exactly why the engine must consult the replay journal.
        let (mut a_send, _a_recv, b_send, mut b_recv) = paired_chains();
        let (n0, _mk0) = a_send.encrypt_step();
        let (n1, _mk1) = a_send.encrypt_step();
        let dh = a_send.dh_pub_self.as_bytes();
        let _ = b_recv.decrypt_step(&b_send, dh, n1, 0, None).unwrap();
        assert!(b_recv.skipped_message_keys.contains_key(&SkippedKeyId { epoch: 0, n: n0 }));
    }

    #[test]
    fn pq_reseed_context_changes_message_key_and_is_deterministic() {
        let (mut a_send, _a_recv, b_send, mut b_recv) = paired_chains();
        let (n0, _mk0) = a_send.encrypt_step();
        let dh = *a_send.dh_pub_self.as_bytes();
        let pre = b_recv.snapshot();

        let mk_plain = b_recv.decrypt_step(&b_send, &dh, n0, 0, None).unwrap();
        b_recv.restore(pre.clone());

        let ctx = crate::kdf::scka_reseed_context(7, &[9u8; 1088], &[3u8; 32]);
        let mk_reseeded_once = b_recv.decrypt_step(&b_send, &dh, n0, 0, Some(&ctx)).unwrap();
        assert_ne!(mk_plain, mk_reseeded_once, "a reseed context must change the derived message key");

        b_recv.restore(pre);
        let mk_reseeded_again = b_recv.decrypt_step(&b_send, &dh, n0, 0, Some(&ctx)).unwrap();
        assert_eq!(mk_reseeded_once, mk_reseeded_again, "the same reseed context must derive the same key");
    }
}

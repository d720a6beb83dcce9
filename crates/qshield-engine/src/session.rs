//! The C5 session engine: glues codecs (C1), SCKA (C2), the ratchet core
//! (C3), and durability (C4) behind the public operation set.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use qshield_crypto::{
    handshake::{self, InitiatorState, Suite},
    hash, kdf,
    kem::{self, PqReseedKeypair, PQ_CIPHERTEXT_LEN, PQ_PUBLIC_KEY_LEN},
    ratchet::{ReceiveChain, ReceiveChainState, Role, SendChain, SendChainState},
};
use qshield_proto::{b64u, qsp};
use qshield_store::Store;

use crate::{
    config::EngineConfig,
    error::{EngineError, ReasonCode},
};

pub type SessionId = [u8; 16];

fn session_id_hex(id: &SessionId) -> String {
    hex::encode(id)
}

fn parse_session_id(s: &str) -> Result<SessionId, EngineError> {
    let bytes = hex::decode(s).map_err(|e| EngineError::new(ReasonCode::InvalidRequest, e.to_string()))?;
    if bytes.len() != 16 {
        return Err(EngineError::new(ReasonCode::InvalidRequest, "session_id must be 16 bytes"));
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuiteWire {
    S1,
    S1B,
}

impl From<SuiteWire> for Suite {
    fn from(w: SuiteWire) -> Self {
        match w {
            SuiteWire::S1 => Suite::S1,
            SuiteWire::S1B => Suite::S1B,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HandshakeOptions {
    pub suite: SuiteWire,
}

#[derive(Debug, Serialize, Deserialize)]
struct Msg1Wire {
    session_id: String,
    suite: SuiteWire,
    dh_pub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pq_pub: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Msg2Wire {
    session_id: String,
    dh_pub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pq_ct: Option<String>,
}

struct PendingHandshake {
    suite: Suite,
    state: InitiatorState,
}

struct Session {
    suite: Suite,
    send: SendChain,
    recv: ReceiveChain,
    scka_local: qshield_crypto::scka::PartyState,
    scka_peer: qshield_crypto::scka::PartyState,
    /// PQ reseed keys this side has advertised (ADV) and not yet seen
    /// consumed by a matching CTXT, keyed by the SCKA id from `scka_local`.
    local_pq_keys: HashMap<u32, PqReseedKeypair>,
    /// PQ reseed public keys the peer has advertised and not yet consumed
    /// by a CTXT from us, keyed by the SCKA id from `scka_peer`. Removing an
    /// entry is this side's tombstone-equivalent for "already consumed".
    peer_pq_keys: BTreeMap<u32, [u8; PQ_PUBLIC_KEY_LEN]>,
}

#[derive(Debug, Serialize)]
pub struct HandshakeStatus {
    pub state: &'static str,
    pub send_ready: bool,
    pub reason: String,
}

/// Wire form of a [`PqReseedKeypair`] for snapshotting: the Kyber secret key
/// has no `Serialize` impl of its own, so it's round-tripped through
/// `secret_bytes`/`from_parts`.
#[derive(Serialize, Deserialize)]
struct LocalPqKeyWire {
    #[serde(with = "serde_big_array::BigArray")]
    pq_public: [u8; PQ_PUBLIC_KEY_LEN],
    secret: Vec<u8>,
}

/// Durable state captured by `debug_snapshot` / restored by `debug_restore`.
/// Skipped-message-key and retained-header-key buffers are intentionally
/// excluded (transient, not required to resume deterministically — see
/// `ReceiveChain::export`).
#[derive(Serialize, Deserialize)]
struct SnapshotV1 {
    suite_hybrid: bool,
    send: SendChainState,
    recv: ReceiveChainState,
    scka_local: qshield_crypto::scka::PartyState,
    scka_peer: qshield_crypto::scka::PartyState,
    #[serde(default)]
    local_pq_keys: HashMap<u32, LocalPqKeyWire>,
    #[serde(default)]
    peer_pq_keys: BTreeMap<u32, serde_big_array::Array<u8, PQ_PUBLIC_KEY_LEN>>,
}

pub struct Engine {
    store: Store,
    config: EngineConfig,
    sessions: Mutex<HashMap<SessionId, Session>>,
    pending: Mutex<HashMap<SessionId, PendingHandshake>>,
    seen_digests: Mutex<HashMap<SessionId, HashSet<[u8; 32]>>>,
}

const OPERATIONS: &[&str] = &[
    "reset",
    "capabilities",
    "handshake_init",
    "handshake_respond",
    "handshake_finish",
    "handshake_status",
    "encrypt",
    "decrypt",
    "debug_snapshot",
    "debug_restore",
];

impl Engine {
    pub fn new(store: Store, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            seen_digests: Mutex::new(HashMap::new()),
        }
    }

    pub fn capabilities(&self) -> Vec<&'static str> {
        OPERATIONS.to_vec()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn reset(&self) {
        self.sessions.lock().await.clear();
        self.pending.lock().await.clear();
        self.seen_digests.lock().await.clear();
    }

    pub async fn handshake_init(&self, options: HandshakeOptions) -> Result<String, EngineError> {
        let suite: Suite = options.suite.into();
        let (state, material) = handshake::init(suite);

        let mut session_id = [0u8; 16];
        {
            use rand_core::RngCore;
            rand_core::OsRng.fill_bytes(&mut session_id);
        }

        let wire = Msg1Wire {
            session_id: session_id_hex(&session_id),
            suite: options.suite,
            dh_pub: b64u::encode(&material.dh_pub),
            pq_pub: material.pq_pub.map(|pk| b64u::encode(&pk)),
        };

        self.pending.lock().await.insert(session_id, PendingHandshake { suite, state });
        debug!(session_id = %session_id_hex(&session_id), "handshake_init");

        serde_json::to_string(&wire).map_err(|e| EngineError::new(ReasonCode::InvalidRequest, e.to_string()))
    }

    pub async fn handshake_respond(&self, msg1_b64: &str) -> Result<String, EngineError> {
        let wire: Msg1Wire = serde_json::from_str(msg1_b64)
            .map_err(|e| EngineError::new(ReasonCode::InvalidRequest, format!("bad msg1: {e}")))?;
        let session_id = parse_session_id(&wire.session_id)?;
        let suite: Suite = wire.suite.into();
        let initiator_dh_pub = fixed32(&b64u::decode_strict(&wire.dh_pub)?)?;
        let initiator_pq_pub = match &wire.pq_pub {
            Some(s) => Some(fixed_pq_pub(&b64u::decode_strict(s)?)?),
            None => None,
        };

        let outcome = handshake::respond(suite, &session_id, &initiator_dh_pub, initiator_pq_pub.as_ref())?;

        let role_a = false;
        let send = SendChain::new(
            session_id,
            outcome.responder_secret,
            outcome.root_key,
            qshield_crypto::kdf::derive_header_key(&outcome.root_key, role_a),
            qshield_crypto::kdf::derive_initial_ck_ec(&outcome.root_key, role_a),
            qshield_crypto::kdf::derive_initial_ck_pq(&outcome.root_key, role_a),
        );
        let recv = ReceiveChain::new(
            session_id,
            Role::B,
            outcome.root_key,
            qshield_crypto::kdf::derive_header_key(&outcome.root_key, !role_a),
            qshield_crypto::kdf::derive_initial_ck_ec(&outcome.root_key, !role_a),
            qshield_crypto::kdf::derive_initial_ck_pq(&outcome.root_key, !role_a),
        );

        self.sessions.lock().await.insert(
            session_id,
            Session {
                suite,
                send,
                recv,
                scka_local: qshield_crypto::scka::PartyState::new(),
                scka_peer: qshield_crypto::scka::PartyState::new(),
                local_pq_keys: HashMap::new(),
                peer_pq_keys: BTreeMap::new(),
            },
        );

        let wire_out = Msg2Wire {
            session_id: wire.session_id,
            dh_pub: b64u::encode(&outcome.msg2_dh_pub),
            pq_ct: outcome.pq_ct.map(|ct| b64u::encode(&ct)),
        };
        debug!(session_id = %session_id_hex(&session_id), "handshake_respond");
        serde_json::to_string(&wire_out).map_err(|e| EngineError::new(ReasonCode::InvalidRequest, e.to_string()))
    }

    pub async fn handshake_finish(&self, msg2_b64: &str) -> Result<String, EngineError> {
        let wire: Msg2Wire = serde_json::from_str(msg2_b64)
            .map_err(|e| EngineError::new(ReasonCode::InvalidRequest, format!("bad msg2: {e}")))?;
        let session_id = parse_session_id(&wire.session_id)?;
        let responder_dh_pub = fixed32(&b64u::decode_strict(&wire.dh_pub)?)?;
        let pq_ct = wire.pq_ct.as_deref().map(b64u::decode_strict).transpose()?;

        let pending = self
            .pending
            .lock()
            .await
            .remove(&session_id)
            .ok_or_else(|| EngineError::new(ReasonCode::NotFound, "no pending handshake for session_id"))?;

        let suite = pending.suite;
        let outcome = handshake::finish(pending.state, &session_id, &responder_dh_pub, pq_ct.as_deref())?;

        let role_a = true;
        let send = SendChain::new(
            session_id,
            outcome.initiator_secret,
            outcome.root_key,
            qshield_crypto::kdf::derive_header_key(&outcome.root_key, role_a),
            qshield_crypto::kdf::derive_initial_ck_ec(&outcome.root_key, role_a),
            qshield_crypto::kdf::derive_initial_ck_pq(&outcome.root_key, role_a),
        );
        let recv = ReceiveChain::new(
            session_id,
            Role::A,
            outcome.root_key,
            qshield_crypto::kdf::derive_header_key(&outcome.root_key, !role_a),
            qshield_crypto::kdf::derive_initial_ck_ec(&outcome.root_key, !role_a),
            qshield_crypto::kdf::derive_initial_ck_pq(&outcome.root_key, !role_a),
        );

        self.sessions.lock().await.insert(
            session_id,
            Session {
                suite,
                send,
                recv,
                scka_local: qshield_crypto::scka::PartyState::new(),
                scka_peer: qshield_crypto::scka::PartyState::new(),
                local_pq_keys: HashMap::new(),
                peer_pq_keys: BTreeMap::new(),
            },
        );
        debug!(session_id = %session_id_hex(&session_id), "handshake_finish");
        Ok(session_id_hex(&session_id))
    }

    pub async fn handshake_status(&self, session_id: &str) -> Result<HandshakeStatus, EngineError> {
        let id = parse_session_id(session_id)?;
        if self.sessions.lock().await.contains_key(&id) {
            return Ok(HandshakeStatus { state: "established", send_ready: true, reason: "ok".into() });
        }
        if self.pending.lock().await.contains_key(&id) {
            return Ok(HandshakeStatus { state: "pending", send_ready: false, reason: "awaiting msg2".into() });
        }
        Ok(HandshakeStatus { state: "failed", send_ready: false, reason: "unknown session".into() })
    }

    pub async fn encrypt(&self, session_id: &str, plaintext_b64: &str) -> Result<String, EngineError> {
        let id = parse_session_id(session_id)?;
        let plaintext = b64u::decode_strict(plaintext_b64)?;

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| EngineError::new(ReasonCode::NotFound, "unknown session_id"))?;

        let (protocol_version, suite_id) = protocol_ids(session.suite);
        let dh_pub = session.send.dh_pub_self.to_bytes();

        // Opportunistically advertise a fresh PQ reseed key (if we have none
        // outstanding) and consume one the peer has advertised (if any),
        // piggy-backing both on this message via SCKA's ADV/CTXT exchange.
        let mut flags: u16 = 0;
        let mut pq_adv: Option<(u32, [u8; PQ_PUBLIC_KEY_LEN])> = None;
        let mut pq_ctxt: Option<(u32, [u8; PQ_CIPHERTEXT_LEN])> = None;
        let mut reseed_ctx: Option<Vec<u8>> = None;

        if session.suite.is_hybrid() {
            if session.local_pq_keys.is_empty() {
                if let Ok(new_id) = session.scka_local.emit_adv() {
                    let kp = PqReseedKeypair::generate();
                    pq_adv = Some((new_id, kp.pq_public));
                    session.local_pq_keys.insert(new_id, kp);
                }
            }

            if let Some((&target_id, peer_pub)) = session.peer_pq_keys.iter().next() {
                if let Ok((ct, ss)) = kem::pq_encapsulate(peer_pub) {
                    reseed_ctx = Some(kdf::scka_reseed_context(target_id, &ct, &ss));
                    pq_ctxt = Some((target_id, ct));
                }
            }
            if let Some((target_id, _)) = pq_ctxt {
                session.peer_pq_keys.remove(&target_id);
            }

            if pq_adv.is_some() {
                flags |= qsp::FLAG_PQ_ADV | qsp::FLAG_BOUNDARY;
            }
            if pq_ctxt.is_some() {
                flags |= qsp::FLAG_PQ_CTXT | qsp::FLAG_BOUNDARY;
            }
        }

        if let Some(ctx) = &reseed_ctx {
            // The peer's own `decrypt_step` will tag this reseed with its
            // own role (`self.role == Role::A`); since roles are paired
            // within a session, that's the logical negation of ours.
            let peer_is_a = !(session.recv.role == Role::A);
            session.send.apply_pq_reseed(ctx, peer_is_a);
        }

        let prefix_src = qsp::QspMessage {
            protocol_version,
            suite_id,
            session_id: id,
            dh_pub,
            flags,
            nonce_hdr: [0u8; 12],
            pq_adv,
            pq_ctxt,
            hdr_ct: Vec::new(),
            body_ct: Vec::new(),
        };
        let pq_bind = hash::pq_bind(flags, &qsp::pq_prefix(&prefix_src));

        let (n, mk) = session.send.encrypt_step();

        let hdr_nonce = qshield_crypto::aead::derive_nonce(b"QSP5.0/HDR-NONCE", &id, &dh_pub, n as u32);
        let body_nonce = qshield_crypto::aead::derive_nonce(b"QSP5.0/BODY-NONCE", &id, &dh_pub, n as u32);

        let header_ad = qsp::ad_header(&id, protocol_version, suite_id, &dh_pub, flags, &pq_bind);
        let body_ad = qsp::ad_body(&id, protocol_version, suite_id, &pq_bind);

        let hdr_pt = n.to_be_bytes();
        let hdr_ct = qshield_crypto::aead::gcm_seal(&session.send.header_key_send, &hdr_nonce, &hdr_pt, &header_ad)?;
        let body_ct = qshield_crypto::aead::gcm_seal(&mk, &body_nonce, &plaintext, &body_ad)?;

        let msg = qsp::QspMessage {
            protocol_version,
            suite_id,
            session_id: id,
            dh_pub,
            flags,
            nonce_hdr: hdr_nonce,
            pq_adv,
            pq_ctxt,
            hdr_ct,
            body_ct,
        };
        let wire = qsp::serialize(&msg);
        debug!(session_id = session_id, n, pq_adv = pq_adv.is_some(), pq_ctxt = pq_ctxt.is_some(), "encrypt");
        Ok(b64u::encode(&wire))
    }

    pub async fn decrypt(&self, session_id: &str, ciphertext_b64: &str) -> Result<String, EngineError> {
        let id = parse_session_id(session_id)?;
        let wire = b64u::decode_strict(ciphertext_b64)?;
        let msg = qsp::parse(&wire)?;

        if msg.session_id != id {
            return Err(EngineError::new(ReasonCode::InvalidRequest, "session_id mismatch between operation and wire"));
        }

        let digest = hash::ciphertext_digest(&wire);

        {
            let mut seen = self.seen_digests.lock().await;
            let set = seen.entry(id).or_default();
            if set.contains(&digest) {
                warn!(session_id, "in-memory replay rejected");
                return Err(EngineError::new(ReasonCode::Replay, "ciphertext already accepted this session"));
            }
        }
        if qshield_store::journal::is_replay(&self.store, session_id, &digest).await? {
            warn!(session_id, "durable replay rejected");
            return Err(EngineError::new(ReasonCode::ReplayDurable, "ciphertext already accepted (durable journal)"));
        }

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| EngineError::new(ReasonCode::NotFound, "unknown session_id"))?;

        let (protocol_version, suite_id) = protocol_ids(session.suite);
        if msg.protocol_version != protocol_version || msg.suite_id != suite_id {
            return Err(EngineError::new(ReasonCode::InvalidRequest, "protocol_version/suite_id mismatch"));
        }

        let target_epoch = if session.recv.peer_dh_pub.map(|p| p.as_bytes() != &msg.dh_pub).unwrap_or(true) {
            session.recv.epoch + 1
        } else {
            session.recv.epoch
        };
        if let Some(hw) = qshield_store::journal::high_water(&self.store, session_id).await? {
            if target_epoch > session.recv.epoch && hw > session.recv.epoch {
                warn!(session_id, "rollback detected on decrypt");
                return Err(EngineError::new(
                    ReasonCode::RejectScaRollbackDetected,
                    "ciphertext epoch exceeds restored session's current epoch",
                ));
            }
        }

        let pq_prefix = qsp::pq_prefix(&msg);
        let pq_bind = hash::pq_bind(msg.flags, &pq_prefix);
        let header_ad = qsp::ad_header(&id, msg.protocol_version, msg.suite_id, &msg.dh_pub, msg.flags, &pq_bind);

        let hdr_pt = qshield_crypto::aead::gcm_open(&session.recv.header_key_recv, &msg.nonce_hdr, &msg.hdr_ct, &header_ad)?;
        if hdr_pt.len() != 8 {
            return Err(EngineError::new(ReasonCode::RejectS2HdrAuthFail, "decrypted header has unexpected length"));
        }
        let n = u64::from_be_bytes(hdr_pt[..8].try_into().unwrap());

        // A CTXT addressed to one of our own outstanding advertised keys
        // carries a fresh PQ shared secret: decapsulating it is a pure,
        // side-effect-free computation, safe to perform before the message
        // is fully authenticated. An unrecognised or already-consumed
        // target is not itself cause for rejection (pq_adv/pq_ctxt are
        // already bound into the header AEAD, so tampering is caught
        // there) — it just means no reseed context is available this time.
        let reseed_ctx = msg.pq_ctxt.as_ref().and_then(|(target_id, ct)| {
            session
                .local_pq_keys
                .get(target_id)
                .and_then(|kp| kp.decapsulate(ct).ok())
                .map(|ss| kdf::scka_reseed_context(*target_id, ct, &ss))
        });

        let mk = session.recv.decrypt_step(&session.send, &msg.dh_pub, n, 0, reseed_ctx.as_deref())?;

        let body_ad = qsp::ad_body(&id, msg.protocol_version, msg.suite_id, &pq_bind);
        let body_nonce = qshield_crypto::aead::derive_nonce(b"QSP5.0/BODY-NONCE", &id, &msg.dh_pub, n as u32);
        let plaintext = qshield_crypto::aead::gcm_open(&mk, &body_nonce, &msg.body_ct, &body_ad)?;

        // Commit SCKA bookkeeping only now that the message is fully
        // authenticated (fail-closed: a rejected message must never mutate
        // `scka_peer`/`scka_local`/the PQ key maps).
        if let Some((adv_id, adv_pub)) = msg.pq_adv {
            if session.scka_peer.receive_adv(adv_id).is_ok() {
                session.peer_pq_keys.insert(adv_id, adv_pub);
            } else {
                warn!(session_id, adv_id, "non-monotonic PQ ADV ignored");
            }
        }
        if let Some((target_id, _)) = msg.pq_ctxt {
            if session.local_pq_keys.remove(&target_id).is_some() && session.scka_local.receive_ctxt(target_id).is_err() {
                warn!(session_id, target_id, "PQ CTXT bookkeeping rejected after consuming local key");
            }
        }

        self.seen_digests.lock().await.entry(id).or_default().insert(digest);
        qshield_store::journal::record(&self.store, session_id, session.recv.epoch, &digest).await?;

        debug!(session_id, n, "decrypt");
        Ok(b64u::encode(&plaintext))
    }

    pub async fn debug_snapshot(&self, session_id: &str) -> Result<String, EngineError> {
        let id = parse_session_id(session_id)?;
        let sessions = self.sessions.lock().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| EngineError::new(ReasonCode::NotFound, "unknown session_id"))?;

        let local_pq_keys = session
            .local_pq_keys
            .iter()
            .map(|(id, kp)| (*id, LocalPqKeyWire { pq_public: kp.pq_public, secret: kp.secret_bytes() }))
            .collect();

        let snap = SnapshotV1 {
            suite_hybrid: session.suite.is_hybrid(),
            send: session.send.export(),
            recv: session.recv.export(),
            scka_local: session.scka_local.clone(),
            scka_peer: session.scka_peer.clone(),
            local_pq_keys,
            peer_pq_keys: session
                .peer_pq_keys
                .iter()
                .map(|(id, pub_key)| (*id, serde_big_array::Array(*pub_key)))
                .collect(),
        };
        let blob = serde_json::to_vec(&snap).map_err(|e| EngineError::new(ReasonCode::ServerError, e.to_string()))?;
        qshield_store::snapshot::save(&self.store, session_id, &blob).await?;
        debug!(session_id, "debug_snapshot");
        Ok(b64u::encode(&blob))
    }

    pub async fn debug_restore(&self, session_id: &str, blob_b64: &str) -> Result<(), EngineError> {
        let id = parse_session_id(session_id)?;
        let blob = b64u::decode_strict(blob_b64)?;
        let snap: SnapshotV1 =
            serde_json::from_slice(&blob).map_err(|e| EngineError::new(ReasonCode::ServerError, e.to_string()))?;

        // Restoring an older snapshot is not itself a rollback attempt — it's
        // the normal shape of crash recovery or migrating a session to a new
        // process. The durable journal's high-water mark still reflects
        // everything accepted before the crash, so `decrypt` catches the
        // actual attack (using the stale state to accept a ciphertext whose
        // epoch the journal already knows about) without this constructor
        // needing to pre-judge every restore.
        let suite = if snap.suite_hybrid { Suite::S1B } else { Suite::S1 };
        let send = SendChain::from_state(id, snap.send);
        let recv = ReceiveChain::from_state(id, snap.recv);
        let mut local_pq_keys = HashMap::with_capacity(snap.local_pq_keys.len());
        for (key_id, wire) in snap.local_pq_keys {
            let kp = PqReseedKeypair::from_parts(wire.pq_public, &wire.secret)
                .map_err(|e| EngineError::new(ReasonCode::ServerError, e.to_string()))?;
            local_pq_keys.insert(key_id, kp);
        }
        self.sessions.lock().await.insert(
            id,
            Session {
                suite,
                send,
                recv,
                scka_local: snap.scka_local,
                scka_peer: snap.scka_peer,
                local_pq_keys,
                peer_pq_keys: snap.peer_pq_keys.into_iter().map(|(id, pub_key)| (id, pub_key.0)).collect(),
            },
        );
        self.seen_digests.lock().await.remove(&id);
        debug!(session_id, "debug_restore");
        Ok(())
    }
}

fn protocol_ids(suite: Suite) -> (u16, u16) {
    if suite.is_hybrid() {
        (qsp::PROTOCOL_VERSION_HYBRID, qsp::SUITE_HYBRID)
    } else {
        (qsp::PROTOCOL_VERSION_CLASSICAL, qsp::SUITE_CLASSICAL)
    }
}

fn fixed32(bytes: &[u8]) -> Result<[u8; 32], EngineError> {
    if bytes.len() != 32 {
        return Err(EngineError::new(ReasonCode::InvalidRequest, "expected 32 bytes"));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    Ok(out)
}

fn fixed_pq_pub(bytes: &[u8]) -> Result<[u8; 1184], EngineError> {
    if bytes.len() != 1184 {
        return Err(EngineError::new(ReasonCode::InvalidRequest, "expected 1184-byte PQ public key"));
    }
    let mut out = [0u8; 1184];
    out.copy_from_slice(bytes);
    Ok(out)
}

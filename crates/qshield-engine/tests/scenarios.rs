//! End-to-end scenario tests exercising only the public `Engine` operation
//! set: handshake, encrypt/decrypt, and debug snapshot/restore. Each test
//! corresponds to one conformance scenario the actor protocol is expected
//! to reproduce against a live harness.

use qshield_engine::{Engine, EngineConfig, HandshakeOptions, ReasonCode, SuiteWire};
use qshield_proto::b64u;
use qshield_store::{Store, Vault};

async fn new_engine() -> Engine {
    let vault = Vault::new();
    vault.unlock_with_key([0x42u8; 32]).await;
    let store = Store::open_in_memory(vault).await.expect("open in-memory store");
    Engine::new(store, EngineConfig::default())
}

/// Runs a full three-message handshake between two fresh engines standing
/// in for the conformance harness's A and B actors, returning (A, B,
/// session_id).
async fn established_pair(suite: SuiteWire) -> (Engine, Engine, String) {
    let a = new_engine().await;
    let b = new_engine().await;

    let msg1 = a.handshake_init(HandshakeOptions { suite }).await.expect("handshake_init");
    let msg2 = b.handshake_respond(&msg1).await.expect("handshake_respond");
    let session_id = a.handshake_finish(&msg2).await.expect("handshake_finish");

    (a, b, session_id)
}

async fn snapshot_json(engine: &Engine, session_id: &str) -> serde_json::Value {
    let snap_b64 = engine.debug_snapshot(session_id).await.expect("debug_snapshot");
    let bytes = b64u::decode_strict(&snap_b64).expect("decode snapshot b64");
    serde_json::from_slice(&bytes).expect("parse snapshot json")
}

async fn restore_json(engine: &Engine, session_id: &str, value: &serde_json::Value) {
    let bytes = serde_json::to_vec(value).expect("serialize snapshot json");
    let blob_b64 = b64u::encode(&bytes);
    engine.debug_restore(session_id, &blob_b64).await.expect("debug_restore");
}

fn bytes32_json(b: &[u8; 32]) -> serde_json::Value {
    serde_json::json!(b.to_vec())
}

fn read_bytes32(v: &serde_json::Value) -> [u8; 32] {
    let arr = v.as_array().expect("expected byte array");
    let mut out = [0u8; 32];
    for (i, entry) in arr.iter().enumerate() {
        out[i] = entry.as_u64().expect("byte value") as u8;
    }
    out
}

/// Reads `b`'s static DH public key off the wire by having it encrypt a
/// disposable probe message; nothing decrypts it. Avoids reaching past the
/// public proto/engine surface to learn a value the wire format already
/// carries in the clear.
async fn peer_dh_pub(b: &Engine, session_id: &str) -> [u8; 32] {
    let wire_b64 = b.encrypt(session_id, &b64u::encode(b"probe")).await.expect("encrypt probe");
    let wire = b64u::decode_strict(&wire_b64).expect("decode probe wire");
    let msg = qshield_proto::qsp::parse(&wire).expect("parse probe wire");
    msg.dh_pub
}

/// Synthesizes a second DH ratchet turn for `a`'s send identity, deriving
/// matching post-ratchet root/chain/header key material for both `a`'s send
/// chain and `b`'s receive chain and installing it directly through the
/// debug snapshot/restore surface.
///
/// The engine's operation set has no explicit in-session rekey op — a send
/// chain's DH keypair is otherwise fixed for the life of a session, and the
/// one ratchet turn `decrypt` performs organically happens once, on the
/// first message a receive chain ever processes. Scenarios that need a
/// *second* epoch transition have to manufacture it; this helper derives
/// the transition with the same KDF calls `ReceiveChain::decrypt_step` uses
/// for its own ratchet turn, so both sides end up with identical key
/// material without depending on that internal code path.
async fn synth_ratchet_turn(a: &Engine, b: &Engine, session_id: &str, b_dh_pub: &[u8; 32]) {
    use rand_core::OsRng;
    use x25519_dalek::{PublicKey, StaticSecret};

    let new_secret = StaticSecret::random_from_rng(OsRng);
    let new_pub = PublicKey::from(&new_secret);
    let dh_out = new_secret.diffie_hellman(&PublicKey::from(*b_dh_pub));

    let mut b_snap = snapshot_json(b, session_id).await;
    let current_root = read_bytes32(&b_snap["recv"]["root_key"]);

    let (new_root, new_ck_ec, _unused_ck_recv) =
        qshield_crypto::kdf::ratchet_keys(&current_root, dh_out.as_bytes()).expect("ratchet_keys");
    let new_ck_pq = qshield_crypto::kdf::derive_initial_ck_pq(&new_root, true);
    let new_hk = qshield_crypto::kdf::derive_header_key(&new_root, true);

    b_snap["recv"]["root_key"] = bytes32_json(&new_root);
    b_snap["recv"]["chain_key_ec"] = bytes32_json(&new_ck_ec);
    b_snap["recv"]["chain_key_pq"] = bytes32_json(&new_ck_pq);
    b_snap["recv"]["header_key_recv"] = bytes32_json(&new_hk);
    b_snap["recv"]["peer_dh_pub"] = bytes32_json(new_pub.as_bytes());
    let epoch = b_snap["recv"]["epoch"].as_u64().expect("epoch");
    b_snap["recv"]["epoch"] = serde_json::json!(epoch + 1);
    b_snap["recv"]["nr"] = serde_json::json!(0);
    restore_json(b, session_id, &b_snap).await;

    let mut a_snap = snapshot_json(a, session_id).await;
    a_snap["send"]["dh_secret"] = bytes32_json(&new_secret.to_bytes());
    a_snap["send"]["chain_key_ec"] = bytes32_json(&new_ck_ec);
    a_snap["send"]["chain_key_pq"] = bytes32_json(&new_ck_pq);
    a_snap["send"]["header_key_send"] = bytes32_json(&new_hk);
    a_snap["send"]["ns"] = serde_json::json!(0);
    restore_json(a, session_id, &a_snap).await;
}

#[tokio::test]
async fn handshake_smoke_suite1_a_to_b() {
    let (a, b, session_id) = established_pair(SuiteWire::S1).await;

    let plaintext = b"interop-smoke";
    let wire = a.encrypt(&session_id, &b64u::encode(plaintext)).await.expect("encrypt");
    let out_b64 = b.decrypt(&session_id, &wire).await.expect("decrypt");
    let out = b64u::decode_strict(&out_b64).expect("decode plaintext");

    assert_eq!(out, plaintext);
}

#[tokio::test]
async fn it_msg_001_in_order_alternating_100() {
    let (a, b, session_id) = established_pair(SuiteWire::S1B).await;

    let mut failures = 0usize;
    for i in 0..100u32 {
        let pt = format!("message-{i}").into_bytes();
        let pt_b64 = b64u::encode(&pt);
        let (sender, receiver): (&Engine, &Engine) = if i % 2 == 0 { (&a, &b) } else { (&b, &a) };

        let wire = sender.encrypt(&session_id, &pt_b64).await.expect("encrypt");
        match receiver.decrypt(&session_id, &wire).await {
            Ok(out_b64) => assert_eq!(b64u::decode_strict(&out_b64).unwrap(), pt),
            Err(_) => failures += 1,
        }
    }

    assert_eq!(failures, 0, "100 in-order alternating messages must all succeed");
}

#[tokio::test]
async fn it_msg_002_out_of_order_within_max_skip_with_duplicates() {
    let (a, b, session_id) = established_pair(SuiteWire::S1).await;

    let span = 51usize;
    let mut wires = Vec::with_capacity(span);
    for i in 0..span {
        let pt = format!("ooo-{i}").into_bytes();
        wires.push(a.encrypt(&session_id, &b64u::encode(&pt)).await.expect("encrypt"));
    }

    // Deterministic shuffle: the boundary message (the last one sent, which
    // forces the largest skip) is delivered first, then the rest in
    // reverse send order.
    let mut delivery_order: Vec<usize> = vec![span - 1];
    delivery_order.extend((0..span - 1).rev());
    assert_eq!(delivery_order.len(), span);

    let mut accepted = std::collections::HashSet::new();
    for &idx in &delivery_order {
        let out_b64 = b.decrypt(&session_id, &wires[idx]).await.expect("original delivery must be accepted");
        let out = b64u::decode_strict(&out_b64).unwrap();
        assert_eq!(out, format!("ooo-{idx}").into_bytes());
        assert!(accepted.insert(idx), "message {idx} accepted more than once");
    }
    assert_eq!(accepted.len(), span, "all {span} originals must be accepted exactly once");

    let duplicate_indices = [0usize, 10, 20, 30, 50];
    for &idx in &duplicate_indices {
        let result = b.decrypt(&session_id, &wires[idx]).await;
        assert!(result.is_err(), "duplicate delivery of message {idx} must be rejected");
    }
}

#[tokio::test]
async fn it_msg_003_beyond_max_skip_rejected_without_state_change() {
    let (a, b, session_id) = established_pair(SuiteWire::S1).await;

    let warmup = a.encrypt(&session_id, &b64u::encode(b"warmup")).await.expect("encrypt warmup");
    b.decrypt(&session_id, &warmup).await.expect("warmup must be accepted");

    let snapshot_before = b.debug_snapshot(&session_id).await.expect("snapshot before");

    let gap = qshield_crypto::ratchet::MAX_SKIP + 10;
    let mut last_wire = None;
    for _ in 0..gap {
        last_wire = Some(a.encrypt(&session_id, &b64u::encode(b"skipped")).await.expect("encrypt skipped"));
    }
    let last_wire = last_wire.expect("at least one message encrypted");

    let result = b.decrypt(&session_id, &last_wire).await;
    assert!(result.is_err(), "a gap beyond MAX_SKIP must be rejected");

    let snapshot_after = b.debug_snapshot(&session_id).await.expect("snapshot after");
    assert_eq!(snapshot_before, snapshot_after, "a rejected delivery must leave session state byte-identical");
}

#[tokio::test]
async fn it_rat_003_replay_rejected_after_epoch_advance() {
    let (a, b, session_id) = established_pair(SuiteWire::S1B).await;

    let boundary = a.encrypt(&session_id, &b64u::encode(b"e0-boundary")).await.expect("encrypt boundary");
    b.decrypt(&session_id, &boundary).await.expect("e0 boundary accepted");

    let c_replay = a.encrypt(&session_id, &b64u::encode(b"e0-replay-target")).await.expect("encrypt c_replay");
    b.decrypt(&session_id, &c_replay).await.expect("c_replay accepted");

    let b_dh_pub = peer_dh_pub(&b, &session_id).await;
    synth_ratchet_turn(&a, &b, &session_id, &b_dh_pub).await;

    let e1_message = a.encrypt(&session_id, &b64u::encode(b"e1-after-ratchet")).await.expect("encrypt e1 message");
    b.decrypt(&session_id, &e1_message).await.expect("message under new epoch must be accepted");

    let result = b.decrypt(&session_id, &c_replay).await;
    assert!(result.is_err(), "redelivering c_replay after the epoch advance must be rejected");
}

#[tokio::test]
async fn it_dur_005_rollback_rejected_distinctly_from_durable_replay() {
    let (a, b, session_id) = established_pair(SuiteWire::S1B).await;

    let e0_anchor = a.encrypt(&session_id, &b64u::encode(b"e0-anchor")).await.expect("encrypt e0 anchor");
    b.decrypt(&session_id, &e0_anchor).await.expect("e0 anchor accepted");

    // S1: a snapshot of B's session state at E0, before the ratchet turn.
    let s1 = b.debug_snapshot(&session_id).await.expect("snapshot S1 at E0");
    let a_s0 = a.debug_snapshot(&session_id).await.expect("snapshot A at E0");

    let b_dh_pub = peer_dh_pub(&b, &session_id).await;
    synth_ratchet_turn(&a, &b, &session_id, &b_dh_pub).await;

    // A genuine E1 message B actually decrypts, advancing the durable
    // journal's high-water mark to E1.
    let e1_real = a.encrypt(&session_id, &b64u::encode(b"e1-real")).await.expect("encrypt e1 real");
    b.decrypt(&session_id, &e1_real).await.expect("e1 real message accepted, durable high-water now E1");

    // ct2b: a further E1 message B never decrypts.
    let ct2b = a.encrypt(&session_id, &b64u::encode(b"ct2b")).await.expect("encrypt ct2b");

    // Roll both peers back to S1/E0.
    b.debug_restore(&session_id, &s1).await.expect("restore B to S1");
    a.debug_restore(&session_id, &a_s0).await.expect("restore A to E0");

    let err = b.decrypt(&session_id, &ct2b).await.expect_err("ct2b must be rejected after rollback");
    assert_ne!(err.reason, ReasonCode::ReplayDurable, "rollback must be reported distinctly from durable replay");

    let m3 = a.encrypt(&session_id, &b64u::encode(b"m3-after-restore")).await.expect("encrypt m3");
    let out_b64 = b.decrypt(&session_id, &m3).await.expect("a fresh message in the restored session must succeed");
    assert_eq!(b64u::decode_strict(&out_b64).unwrap(), b"m3-after-restore");
}

#[tokio::test]
async fn pq_reseed_advertise_and_consume_changes_message_keys() {
    let (a, b, session_id) = established_pair(SuiteWire::S1B).await;

    // A's first hybrid message has no outstanding peer key to consume yet,
    // so it opportunistically advertises one of its own.
    let a_to_b_1 = a.encrypt(&session_id, &b64u::encode(b"a1")).await.expect("encrypt a1");
    let wire1 = qshield_proto::qsp::parse(&b64u::decode_strict(&a_to_b_1).unwrap()).expect("parse a1 wire");
    assert!(wire1.pq_adv.is_some(), "a's first hybrid send must advertise a PQ reseed key");
    assert!(wire1.pq_ctxt.is_none(), "a has no peer key yet to consume");
    assert_eq!(
        b64u::decode_strict(&b.decrypt(&session_id, &a_to_b_1).await.expect("b decrypts a1")).unwrap(),
        b"a1"
    );

    // B's first reply observes a's advertised key and consumes it via CTXT,
    // reseeding both peers' chain_key_pq in lockstep.
    let b_to_a_1 = b.encrypt(&session_id, &b64u::encode(b"b1")).await.expect("encrypt b1");
    let wire2 = qshield_proto::qsp::parse(&b64u::decode_strict(&b_to_a_1).unwrap()).expect("parse b1 wire");
    assert!(wire2.pq_ctxt.is_some(), "b must consume a's advertised PQ key via CTXT");
    assert_eq!(
        b64u::decode_strict(&a.decrypt(&session_id, &b_to_a_1).await.expect("a decrypts b1, applying the same reseed")).unwrap(),
        b"b1"
    );

    // Both sides' subsequent sends must still round-trip: if the two peers
    // had derived different post-reseed chain_key_pq values, this is where
    // it would surface as an AEAD authentication failure rather than a
    // wire-parse error.
    let a_to_b_2 = a.encrypt(&session_id, &b64u::encode(b"a2")).await.expect("encrypt a2");
    assert_eq!(
        b64u::decode_strict(&b.decrypt(&session_id, &a_to_b_2).await.expect("b decrypts a2 after reseed")).unwrap(),
        b"a2"
    );
    let b_to_a_2 = b.encrypt(&session_id, &b64u::encode(b"b2")).await.expect("encrypt b2");
    assert_eq!(
        b64u::decode_strict(&a.decrypt(&session_id, &b_to_a_2).await.expect("a decrypts b2 after reseed")).unwrap(),
        b"b2"
    );
}

//! Op-name dispatch: the JSONL actor protocol's operation set (§4.5 session
//! engine ops) plus the Suite-2 KDF/transcript/mk vector-runner ops named in
//! `interop_actor.py`, carried forward as a wire contract with the
//! conformance harness.
//!
//! Byte-valued params/results use plain hex strings, matching the bare-hex
//! shape `interop_actor.py`'s `_parse_bytes` accepts for any field (the
//! other shapes it tolerates, `{"hex": ...}`/`{"b64": ...}`/typed wrappers,
//! are harness conveniences this crate doesn't need to reproduce).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use qshield_engine::{Engine, HandshakeOptions};

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<Value>,
    pub op: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self { id, ok: true, result: Some(result), error: None }
    }

    fn err(id: Option<Value>, reason: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(json!({ "reason": reason, "message": message.into() })),
        }
    }
}

const SUITE2_OPS: &[&str] = &[
    "suite2.establish.run",
    "suite2.transcript.check",
    "suite2.mk_hybrid.check",
    "suite2.kdf_ec_ck",
    "suite2.kdf_pq_ck",
    "suite2.kdf_hybrid",
    "suite2.kdf_rk_dh",
    "suite2.kdf_rk_pq",
    "suite2.kdf_pq_reseed",
    "suite2.e2e.send",
    "suite2.e2e.recv",
];

pub async fn dispatch(engine: &Engine, req: Request) -> Response {
    let id = req.id.clone();
    match handle(engine, &req).await {
        Ok(result) => Response::ok(id, result),
        Err(e) => Response::err(id, &e.reason, e.message),
    }
}

struct OpError {
    reason: String,
    message: String,
}

impl OpError {
    fn invalid(message: impl Into<String>) -> Self {
        Self { reason: "invalid_request".into(), message: message.into() }
    }
}

impl From<qshield_engine::EngineError> for OpError {
    fn from(e: qshield_engine::EngineError) -> Self {
        Self { reason: e.reason.to_string(), message: e.message }
    }
}

async fn handle(engine: &Engine, req: &Request) -> Result<Value, OpError> {
    match req.op.as_str() {
        "capabilities" => {
            let mut ops: Vec<&str> = engine.capabilities();
            ops.extend_from_slice(SUITE2_OPS);
            Ok(json!({ "ops": ops }))
        }
        "reset" => {
            engine.reset().await;
            Ok(Value::Null)
        }
        "handshake_init" => {
            let options: HandshakeOptions = serde_json::from_value(req.params.clone())
                .map_err(|e| OpError::invalid(format!("bad handshake options: {e}")))?;
            let msg1 = engine.handshake_init(options).await?;
            Ok(json!({ "msg1": msg1 }))
        }
        "handshake_respond" => {
            let msg1 = param_str(&req.params, "msg1")?;
            let msg2 = engine.handshake_respond(&msg1).await?;
            Ok(json!({ "msg2": msg2 }))
        }
        "handshake_finish" => {
            let msg2 = param_str(&req.params, "msg2")?;
            let session_id = engine.handshake_finish(&msg2).await?;
            Ok(json!({ "session_id": session_id }))
        }
        "handshake_status" => {
            let session_id = param_str(&req.params, "session_id")?;
            let status = engine.handshake_status(&session_id).await?;
            serde_json::to_value(status).map_err(|e| OpError::invalid(e.to_string()))
        }
        "encrypt" => {
            let session_id = param_str(&req.params, "session_id")?;
            let plaintext_b64 = param_str(&req.params, "plaintext_b64")?;
            let ciphertext_b64 = engine.encrypt(&session_id, &plaintext_b64).await?;
            Ok(json!({ "ciphertext_b64": ciphertext_b64 }))
        }
        "decrypt" => {
            let session_id = param_str(&req.params, "session_id")?;
            let ciphertext_b64 = param_str(&req.params, "ciphertext_b64")?;
            let plaintext_b64 = engine.decrypt(&session_id, &ciphertext_b64).await?;
            Ok(json!({ "plaintext_b64": plaintext_b64 }))
        }
        "debug_snapshot" => {
            let session_id = param_str(&req.params, "session_id")?;
            let blob_b64 = engine.debug_snapshot(&session_id).await?;
            Ok(json!({ "blob_b64": blob_b64 }))
        }
        "debug_restore" => {
            let session_id = param_str(&req.params, "session_id")?;
            let blob_b64 = param_str(&req.params, "blob_b64")?;
            engine.debug_restore(&session_id, &blob_b64).await?;
            Ok(Value::Null)
        }
        "suite2.kdf_ec_ck" => {
            let ck = hex32(&req.params, "CK_ec")?;
            let (ck_prime, mk) = qshield_crypto::kdf::chain_step_ec(&ck);
            Ok(json!({ "CK_ec_prime": hex::encode(ck_prime), "ec_mk": hex::encode(mk) }))
        }
        "suite2.kdf_pq_ck" => {
            let ck = hex32(&req.params, "CK_pq")?;
            let (ck_prime, mk) = qshield_crypto::kdf::chain_step_pq(&ck);
            Ok(json!({ "CK_pq_prime": hex::encode(ck_prime), "pq_mk": hex::encode(mk) }))
        }
        "suite2.kdf_hybrid" => {
            let ec_mk = hex32(&req.params, "ec_mk")?;
            let pq_mk = hex32(&req.params, "pq_mk")?;
            let mut combined = [0u8; 33];
            combined[..32].copy_from_slice(&pq_mk);
            combined[32] = 0x01;
            let mk = qshield_crypto::kdf::kmac256(&ec_mk, &combined, qshield_crypto::kdf::LABEL_HYBRID);
            Ok(json!({ "mk": hex::encode(mk) }))
        }
        "suite2.kdf_rk_dh" => {
            let rk = hex32(&req.params, "RK")?;
            let dh_out = hex_bytes(&req.params, "dh_out")?;
            let (rk_prime, ck_ec0) = qshield_crypto::kdf::derive_rk_dh(&rk, &dh_out);
            Ok(json!({ "RK_prime": hex::encode(rk_prime), "CK_ec0": hex::encode(ck_ec0) }))
        }
        "suite2.kdf_rk_pq" => {
            let rk = hex32(&req.params, "RK")?;
            let ss = hex32(&req.params, "pq_ss")?;
            let rk_prime = qshield_crypto::kdf::derive_rk_pq(&rk, &ss);
            Ok(json!({ "RK_prime": hex::encode(rk_prime) }))
        }
        "suite2.kdf_pq_reseed" => {
            let rk = hex32(&req.params, "RK")?;
            let target_id = param_u32(&req.params, "pq_target_id")?;
            let ct = hex_bytes(&req.params, "pq_ct")?;
            let ss = hex32(&req.params, "pq_epoch_ss")?;
            let ctx = qshield_crypto::kdf::scka_reseed_context(target_id, &ct, &ss);
            let a2b = qshield_crypto::kdf::derive_pq_reseed(&rk, &ctx, true);
            let b2a = qshield_crypto::kdf::derive_pq_reseed(&rk, &ctx, false);
            Ok(json!({ "CK_pq_seed_A2B": hex::encode(a2b), "CK_pq_seed_B2A": hex::encode(b2a) }))
        }
        "suite2.mk_hybrid.check" => {
            let mut ck_ec = hex32(&req.params, "CK_ec")?;
            let mut ck_pq = hex32(&req.params, "CK_pq")?;
            let count = param_u32(&req.params, "count")?;
            let mut mk_list = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (next_ec, next_pq, mk) = qshield_crypto::kdf::derive_mk_step(&ck_ec, &ck_pq);
                mk_list.push(hex::encode(mk));
                ck_ec = next_ec;
                ck_pq = next_pq;
            }
            if let Some(expected) = req.params.get("expected_mk_list") {
                let expected: Vec<String> =
                    serde_json::from_value(expected.clone()).map_err(|_| OpError { reason: "reject".into(), message: "REJECT_S2_MK_MISMATCH".into() })?;
                if expected.len() != mk_list.len() || expected.iter().zip(&mk_list).any(|(a, b)| !a.eq_ignore_ascii_case(b)) {
                    return Err(OpError { reason: "reject".into(), message: "REJECT_S2_MK_MISMATCH".into() });
                }
            }
            Ok(json!({ "mk_list": mk_list, "CK_ec_final": hex::encode(ck_ec), "CK_pq_final": hex::encode(ck_pq) }))
        }
        "suite2.transcript.check" => {
            let negotiated = req.params.get("negotiated").ok_or_else(|| OpError::invalid("missing params.negotiated"))?;
            let protocol_version = param_u16(negotiated, "protocol_version")?;
            let suite_id = param_u16(negotiated, "suite_id")?;
            let session_id = hex16(&req.params, "session_id")?;
            let dh_pub = hex32(&req.params, "dh_pub")?;
            let flags = param_u16(&req.params, "flags")?;
            let pq_prefix = hex_bytes(&req.params, "pq_prefix")?;
            let ad_hdr_in = hex_bytes(&req.params, "ad_hdr")?;
            let ad_body_in = hex_bytes(&req.params, "ad_body")?;

            let pq_bind = qshield_crypto::hash::pq_bind(flags, &pq_prefix);
            let ad_hdr = qshield_proto::qsp::ad_header(&session_id, protocol_version, suite_id, &dh_pub, flags, &pq_bind);
            let ad_body = qshield_proto::qsp::ad_body(&session_id, protocol_version, suite_id, &pq_bind);
            if ad_hdr != ad_hdr_in || ad_body != ad_body_in {
                return Err(OpError { reason: "reject".into(), message: "REJECT_S2_AD_MISMATCH".into() });
            }
            Ok(json!({ "pq_bind": hex::encode(pq_bind), "ad_hdr": hex::encode(ad_hdr), "ad_body": hex::encode(ad_body) }))
        }
        "suite2.establish.run" => {
            let negotiated = req.params.get("negotiated").ok_or_else(|| OpError::invalid("missing params.negotiated"))?;
            let protocol_version = param_u16(negotiated, "protocol_version")?;
            let suite_id = param_u16(negotiated, "suite_id")?;
            if protocol_version != qshield_proto::qsp::PROTOCOL_VERSION_HYBRID || suite_id != qshield_proto::qsp::SUITE_HYBRID {
                return Err(OpError { reason: "reject".into(), message: "REJECT_S2_SUITE_MISMATCH".into() });
            }
            let authenticated = req.params.get("authenticated").and_then(Value::as_bool).unwrap_or(false);
            if !authenticated {
                return Err(OpError { reason: "reject".into(), message: "REJECT_S2_ESTABLISH_UNAUTHENTICATED".into() });
            }
            let session_id = hex16(&req.params, "session_id")?;
            let dh_init = hex32(&req.params, "dh_init")?;
            let pq_init_ss = hex32(&req.params, "pq_init_ss")?;

            let rk0 = qshield_crypto::kdf::derive_rk0(&dh_init, &session_id);
            let rk = qshield_crypto::kdf::derive_rk_pq(&rk0, &pq_init_ss);
            let hk_a2b = qshield_crypto::kdf::derive_header_key(&rk, true);
            let hk_b2a = qshield_crypto::kdf::derive_header_key(&rk, false);
            let ck0_a2b = qshield_crypto::kdf::derive_initial_ck_ec(&rk, true);
            let ck0_b2a = qshield_crypto::kdf::derive_initial_ck_ec(&rk, false);
            let pq0_a2b = qshield_crypto::kdf::derive_initial_ck_pq(&rk, true);
            let pq0_b2a = qshield_crypto::kdf::derive_initial_ck_pq(&rk, false);

            Ok(json!({
                "session_id": hex::encode(session_id),
                "rk": hex::encode(rk),
                "hk_a2b": hex::encode(hk_a2b),
                "hk_b2a": hex::encode(hk_b2a),
                "ck0_a2b": hex::encode(ck0_a2b),
                "ck0_b2a": hex::encode(ck0_b2a),
                "pq0_a2b": hex::encode(pq0_a2b),
                "pq0_b2a": hex::encode(pq0_b2a),
            }))
        }
        // The e2e send/recv vectors exercise the same wire codec and AEAD
        // construction as the real session engine, so they're driven
        // through the established C5 operations rather than a second,
        // parallel raw-state codec — see DESIGN.md.
        "suite2.e2e.send" => {
            let session_id = param_str(&req.params, "session_id")?;
            let plaintext_b64 = param_str(&req.params, "plaintext_b64")?;
            let wire_b64 = engine.encrypt(&session_id, &plaintext_b64).await?;
            Ok(json!({ "wire_b64": wire_b64 }))
        }
        "suite2.e2e.recv" => {
            let session_id = param_str(&req.params, "session_id")?;
            let wire_b64 = param_str(&req.params, "wire_b64")?;
            let plaintext_b64 = engine.decrypt(&session_id, &wire_b64).await?;
            Ok(json!({ "plaintext_b64": plaintext_b64 }))
        }
        other => Err(OpError { reason: "invalid_request".into(), message: format!("unsupported op: {other}") }),
    }
}

fn param_str(params: &Value, key: &str) -> Result<String, OpError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| OpError::invalid(format!("missing params.{key}")))
}

fn param_u16(params: &Value, key: &str) -> Result<u16, OpError> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| OpError::invalid(format!("missing/invalid params.{key}")))
}

fn param_u32(params: &Value, key: &str) -> Result<u32, OpError> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| OpError::invalid(format!("missing/invalid params.{key}")))
}

fn hex_bytes(params: &Value, key: &str) -> Result<Vec<u8>, OpError> {
    let s = param_str(params, key)?;
    hex::decode(&s).map_err(|e| OpError::invalid(format!("params.{key}: bad hex: {e}")))
}

fn hex32(params: &Value, key: &str) -> Result<[u8; 32], OpError> {
    let bytes = hex_bytes(params, key)?;
    if bytes.len() != 32 {
        return Err(OpError::invalid(format!("params.{key}: expected 32 bytes")));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn hex16(params: &Value, key: &str) -> Result<[u8; 16], OpError> {
    let bytes = hex_bytes(params, key)?;
    if bytes.len() != 16 {
        return Err(OpError::invalid(format!("params.{key}: expected 16 bytes")));
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes);
    Ok(out)
}

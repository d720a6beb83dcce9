//! Three-message hybrid handshake (msg1 / msg2 / finish).
//!
//! Extends a classical X3DH-style exchange (`initiate`/`respond`) from
//! a single classical DH agreement to one that additionally mixes an
//! ML-KEM-768 encapsulation when the negotiated suite is hybrid (`S1B`).
//! `Suite::S1` keeps the classical-only path for interop with the
//! non-hybrid protocol_version 0x0403 chain.

use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};

use crate::error::CryptoError;
use crate::kdf::{derive_rk0, derive_rk_pq};
use crate::kem::{pq_encapsulate, HybridKeypair, PQ_PUBLIC_KEY_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// Classical X25519-only handshake (protocol_version 0x0403).
    S1,
    /// Hybrid X25519 + ML-KEM-768 handshake (protocol_version 0x0500).
    S1B,
}

impl Suite {
    pub fn is_hybrid(self) -> bool {
        matches!(self, Suite::S1B)
    }
}

/// The initiator's half of the exchange, held between `handshake_init` and
/// `handshake_finish`.
pub struct InitiatorState {
    pub suite: Suite,
    ephemeral_secret: X25519Secret,
    pub ephemeral_public: X25519Public,
    pq_keypair: Option<HybridKeypair>,
}

/// What `handshake_init` hands to the wire layer to build `msg1_b64`.
pub struct Msg1Material {
    pub dh_pub: [u8; 32],
    pub pq_pub: Option<[u8; PQ_PUBLIC_KEY_LEN]>,
}

/// What `handshake_respond` hands to the wire layer to build `msg2_b64`,
/// plus the responder's completed root key.
pub struct RespondOutcome {
    pub msg2_dh_pub: [u8; 32],
    /// The ephemeral secret behind `msg2_dh_pub`, for the caller to seed its
    /// own send chain with (the root key alone doesn't carry it).
    pub responder_secret: X25519Secret,
    pub pq_ct: Option<[u8; crate::kem::PQ_CIPHERTEXT_LEN]>,
    pub root_key: [u8; 32],
}

/// The initiator's completed root key after `handshake_finish`.
pub struct FinishOutcome {
    pub root_key: [u8; 32],
    /// The ephemeral secret behind `msg1`'s `dh_pub`, handed back because
    /// `finish` consumes the retained [`InitiatorState`].
    pub initiator_secret: X25519Secret,
}

pub fn init(suite: Suite) -> (InitiatorState, Msg1Material) {
    let ephemeral_secret = X25519Secret::random_from_rng(OsRng);
    let ephemeral_public = X25519Public::from(&ephemeral_secret);
    let pq_keypair = suite.is_hybrid().then(HybridKeypair::generate);
    let material = Msg1Material {
        dh_pub: ephemeral_public.to_bytes(),
        pq_pub: pq_keypair.as_ref().map(|kp| kp.pq_public),
    };
    (
        InitiatorState {
            suite,
            ephemeral_secret,
            ephemeral_public,
            pq_keypair,
        },
        material,
    )
}

/// Responder side: consumes the initiator's `msg1` material, performs its
/// own DH (and PQ encapsulation, when hybrid), and produces the root key.
pub fn respond(
    suite: Suite,
    session_id: &[u8; 16],
    initiator_dh_pub: &[u8; 32],
    initiator_pq_pub: Option<&[u8; PQ_PUBLIC_KEY_LEN]>,
) -> Result<RespondOutcome, CryptoError> {
    let responder_secret = X25519Secret::random_from_rng(OsRng);
    let responder_public = X25519Public::from(&responder_secret);
    let peer_dh = X25519Public::from(*initiator_dh_pub);
    let dh_out = responder_secret.diffie_hellman(&peer_dh);

    let rk0 = derive_rk0(&dh_out.to_bytes(), session_id);

    let (pq_ct, root_key) = if suite.is_hybrid() {
        let pq_pub = initiator_pq_pub.ok_or_else(|| {
            CryptoError::KeyDerivation("hybrid suite requires initiator PQ public key".into())
        })?;
        let (ct, ss) = pq_encapsulate(pq_pub)?;
        let rk = derive_rk_pq(&rk0, &ss);
        (Some(ct), rk)
    } else {
        (None, rk0)
    };

    Ok(RespondOutcome {
        msg2_dh_pub: responder_public.to_bytes(),
        responder_secret,
        pq_ct,
        root_key,
    })
}

/// Initiator side: consumes `msg2` material and the state retained from
/// `init`, completing the root key.
pub fn finish(
    state: InitiatorState,
    session_id: &[u8; 16],
    responder_dh_pub: &[u8; 32],
    pq_ct: Option<&[u8]>,
) -> Result<FinishOutcome, CryptoError> {
    let peer_dh = X25519Public::from(*responder_dh_pub);
    let dh_out = state.ephemeral_secret.diffie_hellman(&peer_dh);
    let rk0 = derive_rk0(&dh_out.to_bytes(), session_id);

    let root_key = if state.suite.is_hybrid() {
        let kp = state
            .pq_keypair
            .as_ref()
            .ok_or_else(|| CryptoError::KeyDerivation("missing PQ keypair for hybrid suite".into()))?;
        let ct = pq_ct.ok_or_else(|| {
            CryptoError::KeyDerivation("hybrid suite requires a PQ ciphertext in msg2".into())
        })?;
        let ss = kp.pq_decapsulate(ct)?;
        derive_rk_pq(&rk0, &ss)
    } else {
        rk0
    };

    Ok(FinishOutcome { root_key, initiator_secret: state.ephemeral_secret })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hybrid_handshake_agrees_on_root_key() {
        let session_id = [42u8; 16];
        let (initiator, msg1) = init(Suite::S1B);
        let outcome = respond(Suite::S1B, &session_id, &msg1.dh_pub, msg1.pq_pub.as_ref()).unwrap();
        let finish_outcome = finish(
            initiator,
            &session_id,
            &outcome.msg2_dh_pub,
            outcome.pq_ct.as_ref().map(|ct| ct.as_slice()),
        )
        .unwrap();
        assert_eq!(finish_outcome.root_key, outcome.root_key);
    }

    #[test]
    fn classical_handshake_agrees_on_root_key() {
        let session_id = [7u8; 16];
        let (initiator, msg1) = init(Suite::S1);
        let outcome = respond(Suite::S1, &session_id, &msg1.dh_pub, None).unwrap();
        let finish_outcome = finish(initiator, &session_id, &outcome.msg2_dh_pub, None).unwrap();
        assert_eq!(finish_outcome.root_key, outcome.root_key);
    }

    #[test]
    fn different_sessions_produce_different_root_keys() {
        let (initiator_a, msg1_a) = init(Suite::S1B);
        let outcome_a = respond(Suite::S1B, &[1u8; 16], &msg1_a.dh_pub, msg1_a.pq_pub.as_ref()).unwrap();
        let _ = finish(
            initiator_a,
            &[1u8; 16],
            &outcome_a.msg2_dh_pub,
            outcome_a.pq_ct.as_ref().map(|ct| ct.as_slice()),
        )
        .unwrap();

        let (_, msg1_b) = init(Suite::S1B);
        let outcome_b = respond(Suite::S1B, &[2u8; 16], &msg1_b.dh_pub, msg1_b.pq_pub.as_ref()).unwrap();
        assert_ne!(outcome_a.root_key, outcome_b.root_key);
    }
}

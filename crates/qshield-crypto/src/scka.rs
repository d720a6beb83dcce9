//! SCKA — Side-Channel Key Agreement bounded state machine.
//!
//! One `PartyState` per direction, tracking the peer's advertised PQ-reseed
//! identifiers (ADV) and the one-time targets this side has advertised and
//! the peer has consumed (CTXT). Invariants (mirrored from the bounded
//! reference model):
//!
//! - `peer_max_adv_id_seen` is strictly monotonic across accepted ADVs.
//! - `local_keys` and `tombstones` are always sorted, unique, and disjoint.
//! - Once a target is tombstoned it can never return to `local_keys`.
//! - Every reject path leaves the state byte-for-byte unchanged.

use std::collections::BTreeSet;

use crate::error::CryptoError;

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct PartyState {
    pub peer_max_adv_id_seen: u32,
    pub peer_current_adv_id: Option<u32>,
    pub local_next_adv_id: u32,
    pub local_keys: BTreeSet<u32>,
    pub tombstones: BTreeSet<u32>,
}

impl PartyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal consistency check. A violation here is a fatal,
    /// non-recoverable programming error, never a rejection.
    pub fn assert_invariants(&self) {
        if let Some(current) = self.peer_current_adv_id {
            assert_eq!(current, self.peer_max_adv_id_seen);
        }
        assert!(
            self.local_keys.is_disjoint(&self.tombstones),
            "local_keys and tombstones must be disjoint"
        );
    }

    /// Receive an ADV(adv_id). Rejects (no state change) if `adv_id` does
    /// not strictly exceed `peer_max_adv_id_seen`.
    pub fn receive_adv(&mut self, adv_id: u32) -> Result<(), CryptoError> {
        if adv_id <= self.peer_max_adv_id_seen {
            return Err(CryptoError::ScaRejected("adv_id not strictly greater than peer_max_adv_id_seen"));
        }
        self.peer_max_adv_id_seen = adv_id;
        self.peer_current_adv_id = Some(adv_id);
        self.assert_invariants();
        Ok(())
    }

    /// Receive a CTXT(target_id). Rejects (no state change) if the target
    /// is already tombstoned or was never advertised locally. On success,
    /// moves `target_id` from `local_keys` to `tombstones` — one-time
    /// consumption; a replayed CTXT for the same target is rejected.
    pub fn receive_ctxt(&mut self, target_id: u32) -> Result<(), CryptoError> {
        if self.tombstones.contains(&target_id) {
            return Err(CryptoError::ScaRejected("target already tombstoned"));
        }
        if !self.local_keys.contains(&target_id) {
            return Err(CryptoError::ScaRejected("target not among advertised local keys"));
        }
        self.local_keys.remove(&target_id);
        self.tombstones.insert(target_id);
        self.assert_invariants();
        Ok(())
    }

    /// Emit an ADV: allocate the next local id. Rejects (no state change)
    /// on overflow — fail-closed rather than wrapping.
    pub fn emit_adv(&mut self) -> Result<u32, CryptoError> {
        let new_id = self
            .local_next_adv_id
            .checked_add(1)
            .ok_or(CryptoError::ScaRejected("local_next_adv_id overflow"))?;
        self.local_keys.insert(new_id);
        self.local_next_adv_id = new_id;
        self.assert_invariants();
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adv_strictly_monotonic() {
        let mut p = PartyState::new();
        p.receive_adv(5).unwrap();
        assert_eq!(p.peer_max_adv_id_seen, 5);
        let before = p.clone();
        assert!(p.receive_adv(5).is_err());
        assert_eq!(p, before, "reject must leave state unchanged");
        assert!(p.receive_adv(3).is_err());
        assert_eq!(p, before);
        p.receive_adv(6).unwrap();
        assert_eq!(p.peer_max_adv_id_seen, 6);
    }

    #[test]
    fn ctxt_one_time_consumption() {
        let mut p = PartyState::new();
        let id = p.emit_adv().unwrap();
        assert!(p.local_keys.contains(&id));
        p.receive_ctxt(id).unwrap();
        assert!(!p.local_keys.contains(&id));
        assert!(p.tombstones.contains(&id));

        let before = p.clone();
        assert!(p.receive_ctxt(id).is_err(), "replayed CTXT must be rejected");
        assert_eq!(p, before);
    }

    #[test]
    fn ctxt_unknown_target_rejected() {
        let mut p = PartyState::new();
        let before = p.clone();
        assert!(p.receive_ctxt(99).is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn local_keys_and_tombstones_stay_disjoint() {
        let mut p = PartyState::new();
        for _ in 0..5 {
            p.emit_adv().unwrap();
        }
        p.receive_ctxt(3).unwrap();
        p.assert_invariants();
        assert!(p.local_keys.is_disjoint(&p.tombstones));
    }
}

//! The equality protocol state machine.
//!
//! Every state owns the session it was reached with. [`ProtocolState::try_next`] consumes the
//! current state and returns the following one, so steps can only ever run in order and a state
//! can't be revisited.

use std::fmt;

use num_bigint::BigUint;
use rand::Rng;
use tracing::debug;

use super::options::SessionParams;
use super::party_a::PartyA;
use super::party_b::PartyB;
use crate::errors::ProtocolError;
use crate::paillier::cipher;

/// Both parties of one protocol run.
pub struct Session {
    pub(crate) party_a: PartyA,
    pub(crate) party_b: PartyB,
    pub(crate) params: SessionParams,
}

impl Session {
    /// Generate B's keypair and hand A both encrypted inputs.
    pub fn new<R: Rng + ?Sized>(
        a: &BigUint,
        b: &BigUint,
        params: SessionParams,
        keysize: usize,
        rng: &mut R,
    ) -> Result<Self, ProtocolError> {
        let party_b = PartyB::new(keysize, b.clone(), rng)?;
        let pk = party_b.public_key().clone();
        let enc_a = cipher::encrypt_with_rng(&pk, a, rng)?;
        let enc_b = party_b.encrypted_input(rng)?;
        let party_a = PartyA::new(pk, enc_a, enc_b, params);
        Ok(Session { party_a, party_b, params })
    }

    pub fn party_a(&self) -> &PartyA {
        &self.party_a
    }

    pub fn party_b(&self) -> &PartyB {
        &self.party_b
    }
}

/// The protocol states, in the only order they can be reached.
pub enum ProtocolState {
    Init(Session),
    RGenerated(Session),
    XorExchanged(Session),
    XorComputed(Session),
    DeltaDetermined(Session),
    CoinsComputed(Session),
    CoinsShuffled(Session),
    CoinsExchanged(Session),
    DeltaFinalized(Session),
    Done(Session),
    /// A step failed; the session is discarded.
    Failed,
}

use ProtocolState::*;

impl ProtocolState {
    pub fn name(&self) -> &'static str {
        match self {
            Init(_) => "Init",
            RGenerated(_) => "RGenerated",
            XorExchanged(_) => "XorExchanged",
            XorComputed(_) => "XorComputed",
            DeltaDetermined(_) => "DeltaDetermined",
            CoinsComputed(_) => "CoinsComputed",
            CoinsShuffled(_) => "CoinsShuffled",
            CoinsExchanged(_) => "CoinsExchanged",
            DeltaFinalized(_) => "DeltaFinalized",
            Done(_) => "Done",
            Failed => "Failed",
        }
    }

    /// Whether no further transition exists.
    pub fn is_final(&self) -> bool {
        matches!(self, Done(_) | Failed)
    }

    /// The session, for every state except `Failed`.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Init(s) | RGenerated(s) | XorExchanged(s) | XorComputed(s) | DeltaDetermined(s) | CoinsComputed(s)
            | CoinsShuffled(s) | CoinsExchanged(s) | DeltaFinalized(s) | Done(s) => Some(s),
            Failed => None,
        }
    }

    /// Run the step leading out of the current state.
    pub fn try_next<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Self, ProtocolError> {
        let current = self.name();
        let next = match self {
            // step1: A masks a - b, B decodes the masked value into bits.
            Init(mut s) => {
                let x = s.party_a.mask_input(rng);
                s.party_b.receive_masked(&x, s.params.width)?;
                RGenerated(s)
            }
            // step2: A pulls B's bits, encrypted under B's key.
            RGenerated(mut s) => {
                let xis = s.party_b.send_xis(rng)?;
                s.party_a.receive_xis(xis)?;
                XorExchanged(s)
            }
            // step3
            XorExchanged(mut s) => {
                s.party_a.compute_xor();
                XorComputed(s)
            }
            // step4
            XorComputed(mut s) => {
                s.party_a.determine_delta(rng)?;
                DeltaDetermined(s)
            }
            DeltaDetermined(mut s) => {
                s.party_a.compute_coins(rng)?;
                CoinsComputed(s)
            }
            // step12, first half
            CoinsComputed(mut s) => {
                s.party_a.shuffle_coins(rng);
                CoinsShuffled(s)
            }
            // step12 hand-over and the step13 acknowledgement
            CoinsShuffled(mut s) => {
                s.party_b.receive_coins(s.party_a.send_coins());
                let received = s.party_b.acknowledge_coins();
                if received != s.party_a.coin_count() {
                    return Err(ProtocolError::step(
                        "CoinsExchanged",
                        format!("B acknowledged {received} coins, A sent {}", s.party_a.coin_count()),
                    ));
                }
                CoinsExchanged(s)
            }
            // step14
            CoinsExchanged(mut s) => {
                let delta_b = s.party_b.finalize_delta(rng)?;
                s.party_a.receive_delta_b(delta_b, rng);
                DeltaFinalized(s)
            }
            // step15
            DeltaFinalized(s) => {
                s.party_a.check_consistency()?;
                Done(s)
            }
            Done(_) | Failed => {
                return Err(ProtocolError::step(current, "final state has no successor"));
            }
        };
        debug!(state = next.name(), "protocol step completed");
        Ok(next)
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolState::{}", self.name())
    }
}

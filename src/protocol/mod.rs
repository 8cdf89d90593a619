//! Two-party private equality test over Paillier.
//!
//! PartyB owns the keypair and the input `b`. PartyA only sees the public key, `Enc(a)` and
//! `Enc(b)`. At the end PartyA holds `curly_theta = Enc([a == b])`, which only B can open.
//!
//! Semi-honest construction; not reviewed for production use.

pub mod options;
pub mod party_a;
pub mod party_b;
pub mod state;

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{thread_rng, Rng};
use tracing::{error, info};

pub use options::{ProtocolOptions, SessionParams, DEFAULT_KAPPA};
pub use state::{ProtocolState, Session};

use crate::errors::ProtocolError;
use crate::paillier::cipher::Ciphertext;

/// Orchestrates one equality-test session over a pair of plaintext inputs.
pub struct Protocol {
    a: BigUint,
    b: BigUint,
    options: ProtocolOptions,
    params: SessionParams,
    state: Option<ProtocolState>,
}

impl Protocol {
    /// Validate the inputs and options; no cryptographic work happens until [`Protocol::start`].
    pub fn new(
        a: impl Into<BigUint>,
        b: impl Into<BigUint>,
        kappa: usize,
        keysize: usize,
    ) -> Result<Self, ProtocolError> {
        Self::with_options(a, b, ProtocolOptions { kappa, keysize })
    }

    pub fn with_options(
        a: impl Into<BigUint>,
        b: impl Into<BigUint>,
        options: ProtocolOptions,
    ) -> Result<Self, ProtocolError> {
        let (a, b) = (a.into(), b.into());
        let params = options.validate(&a, &b)?;
        Ok(Protocol { a, b, options, params, state: None })
    }

    /// Run the whole protocol with a fresh keypair and fresh randomness.
    ///
    /// Any previous run is discarded first. A failing step leaves the session in the failed
    /// state; the only recovery is another call to `start`.
    pub fn start(&mut self) -> Result<(), ProtocolError> {
        self.start_with_rng(&mut thread_rng())
    }

    /// [`Protocol::start`] drawing every key, mask and coin from `rng`.
    pub fn start_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ProtocolError> {
        self.state = None;
        let session = match Session::new(&self.a, &self.b, self.params, self.options.keysize, rng) {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e)),
        };

        let mut state = ProtocolState::Init(session);
        while !state.is_final() {
            state = match state.try_next(rng) {
                Ok(next) => next,
                Err(e) => return Err(self.fail(e)),
            };
        }
        info!(l = self.params.l, kappa = self.params.kappa, "equality protocol completed");
        self.state = Some(state);
        Ok(())
    }

    fn fail(&mut self, e: ProtocolError) -> ProtocolError {
        error!(error = %e, "equality protocol aborted");
        self.state = Some(ProtocolState::Failed);
        e
    }

    fn completed(&self) -> Result<&Session, ProtocolError> {
        match &self.state {
            Some(ProtocolState::Done(session)) => Ok(session),
            _ => Err(ProtocolError::NotCompleted),
        }
    }

    /// PartyA's `curly_theta`, an encryption of 1 if `a == b` and 0 otherwise.
    pub fn result(&self) -> Result<Ciphertext, ProtocolError> {
        self.completed()?
            .party_a()
            .curly_theta()
            .cloned()
            .ok_or(ProtocolError::NotCompleted)
    }

    /// Open [`Protocol::result`] with PartyB's secret key.
    pub fn decrypted_result(&self) -> Result<bool, ProtocolError> {
        let theta = self.result()?;
        let opened = self.completed()?.party_b().decrypt(&theta)?;
        Ok(!opened.is_zero())
    }

    /// Compare the decrypted outcome with `a == b` on the plaintexts.
    ///
    /// Needs both inputs in the clear, so it only makes sense in a trusted test harness.
    pub fn validate_outcome(&self) -> Result<(), ProtocolError> {
        let decrypted = self.decrypted_result()?;
        let expected = self.a == self.b;
        if decrypted != expected {
            error!(decrypted, expected, "equality protocol outcome mismatch");
            return Err(ProtocolError::OutcomeMismatch { decrypted, expected });
        }
        Ok(())
    }

    /// Name of the current state, `NotStarted` before the first run.
    pub fn state_name(&self) -> &'static str {
        self.state.as_ref().map(ProtocolState::name).unwrap_or("NotStarted")
    }

    pub fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::party_a::PartyA;
    use super::party_b::PartyB;
    use crate::errors::ProtocolOptionsError;
    use crate::paillier::cipher::decrypt;
    use crate::paillier::keys::Keypair;

    use once_cell::sync::Lazy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    const KEYSIZE: usize = 256;
    const KAPPA: usize = 40;

    static KEYPAIR: Lazy<Keypair> = Lazy::new(|| Keypair::generate(KEYSIZE).unwrap());

    fn session(a: u64, b: u64) -> Session {
        let (a, b) = (BigUint::from(a), BigUint::from(b));
        let params = ProtocolOptions { kappa: KAPPA, keysize: KEYSIZE }.validate(&a, &b).unwrap();
        let party_b = PartyB::with_keypair(KEYPAIR.clone(), b.clone());
        let pk = party_b.public_key().clone();
        let enc_a = crate::paillier::encrypt(&pk, &a).unwrap();
        let enc_b = party_b.encrypted_input(&mut thread_rng()).unwrap();
        Session { party_a: PartyA::new(pk, enc_a, enc_b, params), party_b, params }
    }

    fn run_to(mut state: ProtocolState, target: &str, rng: &mut StdRng) -> ProtocolState {
        while state.name() != target {
            state = state.try_next(rng).unwrap();
        }
        state
    }

    fn open(c: &Ciphertext) -> BigUint {
        decrypt(KEYPAIR.public(), KEYPAIR.secret(), c).unwrap()
    }

    #[rstest]
    #[case(42, 42)]
    #[case(42, 7)]
    #[case(0, 0)]
    #[case(0, 1)]
    #[case(255, 256)]
    #[case(1 << 20, (1 << 20) + 1)]
    fn states_run_in_order_and_decide_equality(#[case] a: u64, #[case] b: u64) {
        let mut rng = StdRng::seed_from_u64(a ^ b.rotate_left(17));
        let order = [
            "Init",
            "RGenerated",
            "XorExchanged",
            "XorComputed",
            "DeltaDetermined",
            "CoinsComputed",
            "CoinsShuffled",
            "CoinsExchanged",
            "DeltaFinalized",
            "Done",
        ];
        let mut state = ProtocolState::Init(session(a, b));
        for (expected, next) in order.iter().zip(order.iter().skip(1)) {
            assert_eq!(state.name(), *expected);
            assert!(!state.is_final());
            state = state.try_next(&mut rng).unwrap();
            assert_eq!(state.name(), *next);
        }
        assert!(state.is_final());

        let s = state.session().unwrap();
        let theta = s.party_a().curly_theta().unwrap();
        let expected = if a == b { 1u32 } else { 0 };
        assert_eq!(open(theta), BigUint::from(expected));
    }

    #[test]
    fn step_one_fills_mask_and_bit_vector() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = run_to(ProtocolState::Init(session(42, 42)), "RGenerated", &mut rng);
        let s = state.session().unwrap();
        assert_eq!(s.party_b().xis().len(), s.params.width);
        assert_eq!(s.party_a().mask_len(), s.params.l + KAPPA);
    }

    #[rstest]
    #[case(42, 42, 0)]
    #[case(42, 43, 1)]
    fn hamming_distance_is_zero_only_for_equal_inputs(#[case] a: u64, #[case] b: u64, #[case] min: u32) {
        let mut rng = StdRng::seed_from_u64(5);
        let state = run_to(ProtocolState::Init(session(a, b)), "DeltaDetermined", &mut rng);
        let s = state.session().unwrap();
        let distance = open(s.party_a().distance().unwrap());
        if min == 0 {
            assert!(distance.is_zero());
        } else {
            assert!(distance >= BigUint::from(min));
            assert!(distance <= BigUint::from(s.params.width));
        }
    }

    #[test]
    fn b_sees_delta_that_depends_on_a_coin() {
        // delta_b = [a == b] xor delta, so across seeds both coin values show up for equal inputs.
        let mut seen = [false, false];
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let state = run_to(ProtocolState::Init(session(9, 9)), "DeltaFinalized", &mut rng);
            let s = state.session().unwrap();
            let delta_b = s.party_b().delta().unwrap();
            assert_eq!(delta_b, !s.party_a().delta());
            seen[delta_b as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn final_states_have_no_successor() {
        let mut rng = StdRng::seed_from_u64(3);
        let done = run_to(ProtocolState::Init(session(1, 2)), "Done", &mut rng);
        assert!(matches!(done.try_next(&mut rng), Err(ProtocolError::Step { step: "Done", .. })));
        assert!(matches!(
            ProtocolState::Failed.try_next(&mut rng),
            Err(ProtocolError::Step { step: "Failed", .. })
        ));
    }

    #[test]
    fn protocol_runs_end_to_end() {
        let mut protocol = Protocol::new(42u32, 42u32, KAPPA, KEYSIZE).unwrap();
        assert_eq!(protocol.state_name(), "NotStarted");
        protocol.start().unwrap();
        assert_eq!(protocol.state_name(), "Done");
        assert!(protocol.decrypted_result().unwrap());
        protocol.validate_outcome().unwrap();
    }

    #[test]
    fn result_before_start_is_an_error() {
        let protocol = Protocol::new(1u32, 2u32, KAPPA, KEYSIZE).unwrap();
        assert_eq!(protocol.result().unwrap_err(), ProtocolError::NotCompleted);
        assert_eq!(protocol.decrypted_result().unwrap_err(), ProtocolError::NotCompleted);
        assert_eq!(protocol.validate_outcome().unwrap_err(), ProtocolError::NotCompleted);
    }

    #[test]
    fn mismatched_outcome_is_reported() {
        // A finished session for 42 == 42 attached to a protocol over 42 and 7.
        let mut rng = StdRng::seed_from_u64(8);
        let done = run_to(ProtocolState::Init(session(42, 42)), "Done", &mut rng);
        let mut protocol = Protocol::new(42u32, 7u32, KAPPA, KEYSIZE).unwrap();
        protocol.state = Some(done);

        assert!(protocol.decrypted_result().unwrap());
        assert_eq!(
            protocol.validate_outcome().unwrap_err(),
            ProtocolError::OutcomeMismatch { decrypted: true, expected: false }
        );
    }

    #[test]
    fn failed_run_exposes_no_result() {
        let mut protocol = Protocol::new(42u32, 42u32, KAPPA, KEYSIZE).unwrap();
        protocol.start().unwrap();
        protocol.state = Some(ProtocolState::Failed);

        assert_eq!(protocol.state_name(), "Failed");
        assert_eq!(protocol.result().unwrap_err(), ProtocolError::NotCompleted);
        assert_eq!(protocol.decrypted_result().unwrap_err(), ProtocolError::NotCompleted);
        assert_eq!(protocol.validate_outcome().unwrap_err(), ProtocolError::NotCompleted);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |seed| {
            let mut protocol = Protocol::new(17u32, 71u32, KAPPA, KEYSIZE).unwrap();
            protocol.start_with_rng(&mut StdRng::seed_from_u64(seed)).unwrap();
            let key = protocol.completed().unwrap().party_a().public_key().clone();
            (key, protocol.result().unwrap())
        };
        assert_eq!(run(21), run(21));
        assert_ne!(run(21).0, run(22).0);
    }

    #[test]
    fn invalid_options_fail_at_construction() {
        assert_eq!(
            Protocol::new(1u32, 1u32, 0, KEYSIZE).err(),
            Some(ProtocolError::Options(ProtocolOptionsError::ZeroKappa))
        );
    }

    #[test]
    fn restart_generates_a_new_key() {
        let mut protocol = Protocol::new(5u32, 6u32, KAPPA, KEYSIZE).unwrap();
        protocol.start().unwrap();
        let first = protocol.completed().unwrap().party_a().public_key().clone();
        protocol.start().unwrap();
        let second = protocol.completed().unwrap().party_a().public_key().clone();
        assert_ne!(first, second);
        assert!(!protocol.decrypted_result().unwrap());
    }
}

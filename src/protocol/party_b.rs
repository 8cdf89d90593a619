//! The key-owning party.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::Rng;
use tracing::debug;

use crate::errors::{CipherError, KeyGenError, ProtocolError};
use crate::paillier::cipher::{self, Ciphertext};
use crate::paillier::keys::{Keypair, PublicKey};
use crate::paillier::math::{bit_length, to_bits};

/// PartyB holds the Paillier keypair and its private input `b`.
pub struct PartyB {
    keypair: Keypair,
    b: BigUint,
    /// Plaintext bits of the masked value received from A.
    xis: Vec<bool>,
    /// Shuffled coins received from A.
    cis: Vec<Ciphertext>,
    /// Set when some coin decrypted to zero.
    delta: Option<bool>,
}

impl PartyB {
    /// Generate a fresh keypair for this session from `rng`.
    pub fn new<R: Rng + ?Sized>(keysize: usize, b: BigUint, rng: &mut R) -> Result<Self, KeyGenError> {
        let keypair = Keypair::generate_with_rng(keysize, rng)?;
        Ok(Self::with_keypair(keypair, b))
    }

    pub fn with_keypair(keypair: Keypair, b: BigUint) -> Self {
        PartyB { keypair, b, xis: Vec::new(), cis: Vec::new(), delta: None }
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keypair.public()
    }

    /// `Enc(b)` under B's own key, handed to A.
    pub fn encrypted_input<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Ciphertext, CipherError> {
        cipher::encrypt_with_rng(self.keypair.public(), &self.b, rng)
    }

    pub fn decrypt(&self, c: &Ciphertext) -> Result<BigUint, CipherError> {
        cipher::decrypt(self.keypair.public(), self.keypair.secret(), c)
    }

    /// Step 1: decrypt the masked value `x` and keep its `width` bits.
    pub(crate) fn receive_masked(&mut self, x: &Ciphertext, width: usize) -> Result<(), ProtocolError> {
        let x = self.decrypt(x)?;
        if bit_length(&x) > width {
            return Err(ProtocolError::step("RGenerated", "masked value exceeds the comparison width"));
        }
        self.xis = to_bits(&x, width);
        Ok(())
    }

    /// Step 2: the bits of `x`, each encrypted under B's key.
    pub(crate) fn send_xis<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Ciphertext>, CipherError> {
        let pk = self.keypair.public();
        self.xis
            .iter()
            .map(|bit| {
                let m = if *bit { BigUint::one() } else { BigUint::zero() };
                cipher::encrypt_with_rng(pk, &m, rng)
            })
            .collect()
    }

    /// Step 12: store the shuffled coins verbatim.
    pub(crate) fn receive_coins(&mut self, cis: Vec<Ciphertext>) {
        self.cis = cis;
    }

    /// Step 13: acknowledge how many coins arrived.
    pub(crate) fn acknowledge_coins(&self) -> usize {
        self.cis.len()
    }

    /// Step 14: `delta = 1` iff some coin decrypts to zero; returns `Enc(delta)`.
    pub(crate) fn finalize_delta<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Ciphertext, ProtocolError> {
        let mut delta = false;
        for coin in &self.cis {
            if self.decrypt(coin)?.is_zero() {
                delta = true;
            }
        }
        debug!(coins = self.cis.len(), "party B finalized delta");
        self.delta = Some(delta);
        let m = if delta { BigUint::one() } else { BigUint::zero() };
        Ok(cipher::encrypt_with_rng(self.keypair.public(), &m, rng)?)
    }

    #[cfg(test)]
    pub(crate) fn xis(&self) -> &[bool] {
        &self.xis
    }

    #[cfg(test)]
    pub(crate) fn delta(&self) -> Option<bool> {
        self.delta
    }
}

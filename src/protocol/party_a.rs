//! The party without decryption capability.
//!
//! A only ever handles ciphertexts under B's key. The mask `r`, the coin `delta` and the blinding
//! scalars are A's secrets; everything A sends to B is either masked or shuffled.

use num_bigint::BigUint;
use num_traits::One;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::options::SessionParams;
use crate::errors::ProtocolError;
use crate::paillier::cipher::{self, Ciphertext};
use crate::paillier::keys::PublicKey;
use crate::paillier::math::{from_bits, random_nonzero_below, to_bits};

pub struct PartyA {
    pk: PublicKey,
    params: SessionParams,
    enc_a: Ciphertext,
    enc_b: Ciphertext,
    /// Per-bit random mask, `l + kappa` bits.
    r: Vec<bool>,
    /// Bits of `2^l + r`, the value `x` equals exactly when `a == b`.
    masked_reference: Vec<bool>,
    /// `Enc(x_i)` as sent by B.
    xis: Vec<Ciphertext>,
    /// `Enc(x_i xor R_i)`.
    xors: Vec<Ciphertext>,
    /// `Enc(D)`, the Hamming distance between `x` and `R`.
    distance: Option<Ciphertext>,
    /// A's private coin, picks which zero test B runs.
    delta: bool,
    cis: Vec<Ciphertext>,
    delta_b: Option<Ciphertext>,
    curly_theta: Option<Ciphertext>,
}

impl PartyA {
    pub fn new(pk: PublicKey, enc_a: Ciphertext, enc_b: Ciphertext, params: SessionParams) -> Self {
        PartyA {
            pk,
            params,
            enc_a,
            enc_b,
            r: Vec::new(),
            masked_reference: Vec::new(),
            xis: Vec::new(),
            xors: Vec::new(),
            distance: None,
            delta: false,
            cis: Vec::new(),
            delta_b: None,
            curly_theta: None,
        }
    }

    /// Step 1: draw the mask and return `Enc(a - b + 2^l + r)`.
    pub(crate) fn mask_input<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Ciphertext {
        self.r = (0..self.params.mask_bits()).map(|_| rng.gen::<bool>()).collect();
        let reference = (BigUint::one() << self.params.l) + from_bits(&self.r);
        self.masked_reference = to_bits(&reference, self.params.width);

        let difference = cipher::sub(&self.pk, &self.enc_a, &self.enc_b);
        cipher::add_plain(&self.pk, &difference, &reference)
    }

    /// Step 2: take B's encrypted bit vector.
    pub(crate) fn receive_xis(&mut self, xis: Vec<Ciphertext>) -> Result<(), ProtocolError> {
        if xis.len() != self.params.width {
            return Err(ProtocolError::step(
                "XorExchanged",
                format!("expected {} encrypted bits, got {}", self.params.width, xis.len()),
            ));
        }
        self.xis = xis;
        Ok(())
    }

    /// Step 3: `Enc(x_i xor R_i)` for every bit.
    pub(crate) fn compute_xor(&mut self) {
        let one = BigUint::one();
        self.xors = self
            .xis
            .iter()
            .zip(&self.masked_reference)
            .map(|(x, r)| {
                if *r {
                    cipher::add_plain(&self.pk, &cipher::negate(&self.pk, x), &one)
                } else {
                    x.clone()
                }
            })
            .collect();
    }

    /// Step 4: sum the xor vector into `Enc(D)` and flip the coin `delta`.
    pub(crate) fn determine_delta<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ProtocolError> {
        let (first, rest) = self
            .xors
            .split_first()
            .ok_or_else(|| ProtocolError::step("DeltaDetermined", "empty xor vector"))?;
        let distance = rest.iter().fold(first.clone(), |acc, c| cipher::add(&self.pk, &acc, c));
        self.distance = Some(distance);
        self.delta = rng.gen::<bool>();
        Ok(())
    }

    /// Build the `width` coins.
    ///
    /// With `delta = 0` one coin is `Enc(s * D)` and the rest encrypt random non-zero values, so
    /// B sees a zero iff `D = 0`. With `delta = 1` the coins are `Enc(s_j * (D - j))` for
    /// `j = 1..=width`, so B sees a zero iff `D != 0`.
    pub(crate) fn compute_coins<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ProtocolError> {
        let distance = self
            .distance
            .as_ref()
            .ok_or_else(|| ProtocolError::step("CoinsComputed", "distance not determined"))?;
        let n = self.pk.n();
        let width = self.params.width;

        let coins = if self.delta {
            (1..=width)
                .map(|j| {
                    let shifted = cipher::add_plain(&self.pk, distance, &(n - BigUint::from(j)));
                    cipher::mul_plain(&self.pk, &shifted, &random_nonzero_below(n, rng))
                })
                .collect()
        } else {
            let mut coins = Vec::with_capacity(width);
            coins.push(cipher::mul_plain(&self.pk, distance, &random_nonzero_below(n, rng)));
            for _ in 1..width {
                let filler = random_nonzero_below(n, rng);
                coins.push(cipher::encrypt_with_rng(&self.pk, &filler, rng)?);
            }
            coins
        };
        self.cis = coins;
        Ok(())
    }

    /// Step 12: permute the coins and re-randomize each one.
    pub(crate) fn shuffle_coins<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cis.shuffle(rng);
        for coin in self.cis.iter_mut() {
            *coin = cipher::rerandomize(&self.pk, coin, rng);
        }
    }

    pub(crate) fn send_coins(&self) -> Vec<Ciphertext> {
        self.cis.clone()
    }

    pub(crate) fn coin_count(&self) -> usize {
        self.cis.len()
    }

    /// Step 14: combine B's `delta_b` with `delta` into `curly_theta = Enc([a == b])`.
    pub(crate) fn receive_delta_b<R: Rng + ?Sized>(&mut self, delta_b: Ciphertext, rng: &mut R) {
        let theta = if self.delta {
            cipher::add_plain(&self.pk, &cipher::negate(&self.pk, &delta_b), &BigUint::one())
        } else {
            delta_b.clone()
        };
        debug!("party A combined delta and delta_b");
        self.curly_theta = Some(cipher::rerandomize(&self.pk, &theta, rng));
        self.delta_b = Some(delta_b);
    }

    /// Step 15: every value the result depends on is present and inside the ciphertext space.
    pub(crate) fn check_consistency(&self) -> Result<(), ProtocolError> {
        let n_squared = self.pk.n_squared();
        let (theta, delta_b) = match (&self.curly_theta, &self.delta_b) {
            (Some(theta), Some(delta_b)) => (theta, delta_b),
            _ => return Err(ProtocolError::step("Done", "curly_theta was never computed")),
        };
        if theta.value() >= n_squared || delta_b.value() >= n_squared {
            return Err(ProtocolError::step("Done", "result outside the ciphertext space"));
        }
        if self.cis.len() != self.params.width {
            return Err(ProtocolError::step("Done", "coin vector has the wrong length"));
        }
        Ok(())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.pk
    }

    /// The encrypted equality indicator, once step 14 has run.
    pub fn curly_theta(&self) -> Option<&Ciphertext> {
        self.curly_theta.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn delta(&self) -> bool {
        self.delta
    }

    #[cfg(test)]
    pub(crate) fn distance(&self) -> Option<&Ciphertext> {
        self.distance.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn mask_len(&self) -> usize {
        self.r.len()
    }
}

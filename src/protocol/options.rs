//! Session configuration.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::errors::ProtocolOptionsError;
use crate::paillier::keys::{DEFAULT_KEY_SIZE, MIN_KEY_SIZE};
use crate::paillier::math::bit_length;

/// Default statistical security parameter.
pub const DEFAULT_KAPPA: usize = 40;

/// Options for one equality-test session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolOptions {
    /// Statistical security parameter; the masked difference B sees is within `2^-kappa` of uniform.
    pub kappa: usize,
    /// Paillier modulus size in bits.
    pub keysize: usize,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        ProtocolOptions { kappa: DEFAULT_KAPPA, keysize: DEFAULT_KEY_SIZE }
    }
}

/// Sizes derived from the inputs and the options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionParams {
    /// `max(bitlen(a), bitlen(b))`.
    pub l: usize,
    pub kappa: usize,
    /// Bits in the masked comparison value, and the number of coins.
    pub width: usize,
}

impl SessionParams {
    /// Bits in the mask vector `r`.
    pub fn mask_bits(&self) -> usize {
        self.l + self.kappa
    }
}

impl ProtocolOptions {
    /// Check the options against the inputs and derive the session sizes.
    pub fn validate(&self, a: &BigUint, b: &BigUint) -> Result<SessionParams, ProtocolOptionsError> {
        if self.kappa == 0 {
            return Err(ProtocolOptionsError::ZeroKappa);
        }
        if self.keysize % 2 != 0 || self.keysize < MIN_KEY_SIZE {
            return Err(ProtocolOptionsError::KeySize(self.keysize, MIN_KEY_SIZE));
        }
        let l = bit_length(a).max(bit_length(b));
        let width = l + self.kappa + 2;
        // Generated moduli have exactly `keysize` bits, so anything below 2^(keysize - 1) fits.
        let available = self.keysize - 1;
        if width > available {
            return Err(ProtocolOptionsError::InputTooLarge { needed: width, available });
        }
        Ok(SessionParams { l, kappa: self.kappa, width })
    }
}

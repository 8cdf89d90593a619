//! Modular arithmetic helpers used by key generation and the cipher.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

use crate::errors::ArithmeticError;

/// Sample a value uniformly from `[1, n)` that is coprime to `n`.
///
/// `n` must be greater than one.
pub fn generate_coprime<R: Rng + ?Sized>(n: &BigUint, rng: &mut R) -> BigUint {
    debug_assert!(*n > BigUint::one(), "coprime sampling needs n > 1");
    let one = BigUint::one();
    loop {
        let candidate = rng.gen_biguint_range(&one, n);
        if candidate.gcd(n).is_one() {
            return candidate;
        }
    }
}

/// Least common multiple, `x * y / gcd(x, y)`.
pub fn lcm(x: &BigUint, y: &BigUint) -> BigUint {
    if x.is_zero() || y.is_zero() {
        return BigUint::zero();
    }
    (x * y) / x.gcd(y)
}

/// The Paillier L-function, `L(u) = (u - 1) / n`.
///
/// The division is exact for every `u` congruent to 1 modulo `n`.
pub fn l_function(u: &BigUint, n: &BigUint) -> BigUint {
    (u - BigUint::one()) / n
}

/// Compute `mu = L(g^lambda mod n^2)^-1 mod n`.
pub fn get_mu(g: &BigUint, lambda: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    let n_squared = n * n;
    let u = g.modpow(lambda, &n_squared);
    if u.is_zero() {
        return Err(ArithmeticError::NoInverse);
    }
    l_function(&u, n).modinv(n).ok_or(ArithmeticError::NoInverse)
}

/// Number of significant bits, zero for zero.
pub fn bit_length(x: &BigUint) -> usize {
    x.bits() as usize
}

/// Little-endian bit decomposition of `x` into exactly `width` bits.
///
/// Bits of `x` above `width` are dropped.
pub fn to_bits(x: &BigUint, width: usize) -> Vec<bool> {
    (0..width as u64).map(|i| x.bit(i)).collect()
}

/// Inverse of [`to_bits`].
pub fn from_bits(bits: &[bool]) -> BigUint {
    let mut value = BigUint::zero();
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            value.set_bit(i as u64, true);
        }
    }
    value
}

/// Sample a value uniformly from `[1, n)`.
pub(crate) fn random_nonzero_below<R: Rng + ?Sized>(n: &BigUint, rng: &mut R) -> BigUint {
    rng.gen_biguint_range(&BigUint::one(), n)
}

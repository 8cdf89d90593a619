//! Probable prime generation.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_prime::nt_funcs::is_prime64;
use num_traits::{One, ToPrimitive, Zero};
use once_cell::sync::Lazy;
use rand::Rng;

use crate::errors::KeyGenError;

/// Smallest prime size we are willing to search for.
pub const MIN_PRIME_BITS: usize = 16;

/// Candidates tried per requested bit before giving up.
///
/// Around one in `0.35 * bits` odd candidates is prime, so this leaves a wide margin.
pub const PRIME_ATTEMPTS_PER_BIT: usize = 64;

const SMALL_PRIME_BOUND: u64 = 2000;

static SMALL_PRIMES: Lazy<Vec<u64>> = Lazy::new(|| (3..SMALL_PRIME_BOUND).filter(|x| is_prime64(*x)).collect());

/// Miller–Rabin rounds for a random candidate of `bits` bits.
///
/// Smaller candidates get more rounds; every size keeps the false positive rate below 2^-128 for
/// randomly drawn candidates.
pub fn miller_rabin_rounds(bits: usize) -> usize {
    match bits {
        0..=255 => 64,
        256..=511 => 32,
        512..=1023 => 16,
        1024..=2047 => 8,
        _ => 5,
    }
}

/// Generate a probable prime of exactly `bits` bits.
pub fn generate_prime<R: Rng + ?Sized>(bits: usize, rng: &mut R) -> Result<BigUint, KeyGenError> {
    if bits < MIN_PRIME_BITS {
        return Err(KeyGenError::PrimeTooSmall(bits, MIN_PRIME_BITS));
    }
    let rounds = miller_rabin_rounds(bits);
    let attempts = PRIME_ATTEMPTS_PER_BIT * bits;
    for _ in 0..attempts {
        let mut candidate = rng.gen_biguint(bits as u64);
        // top two bits set so a product of two such primes has exactly 2 * bits bits
        candidate.set_bit(bits as u64 - 1, true);
        candidate.set_bit(bits as u64 - 2, true);
        candidate.set_bit(0, true);
        if is_probable_prime(&candidate, rounds, rng) {
            return Ok(candidate);
        }
    }
    Err(KeyGenError::PrimeSearchExhausted { bits, attempts })
}

/// Trial division by small primes followed by `rounds` Miller–Rabin trials with random bases.
pub fn is_probable_prime<R: Rng + ?Sized>(candidate: &BigUint, rounds: usize, rng: &mut R) -> bool {
    if let Some(small) = candidate.to_u64() {
        if small < SMALL_PRIME_BOUND {
            return is_prime64(small);
        }
    }
    if candidate.is_even() {
        return false;
    }
    for p in SMALL_PRIMES.iter() {
        if (candidate % *p).is_zero() {
            return false;
        }
    }

    let one = BigUint::one();
    let two = BigUint::from(2u8);
    let n_minus_one = candidate - &one;
    // n - 1 = d * 2^s with d odd
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, candidate);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, candidate);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

//! Paillier key generation.

use num_bigint::BigUint;
use num_traits::One;
use rand::{thread_rng, Rng};
use tracing::{debug, error, info};

use super::math::{generate_coprime, get_mu, lcm};
use super::prime::{generate_prime, MIN_PRIME_BITS};
use crate::errors::{ArithmeticError, KeyGenError};

/// Default modulus size in bits.
pub const DEFAULT_KEY_SIZE: usize = 2048;

/// Smallest modulus size accepted by [`KeyGen`].
pub const MIN_KEY_SIZE: usize = 2 * MIN_PRIME_BITS;

/// How many times `q` is redrawn when it equals `p`.
pub const MAX_DISTINCT_PRIME_REDRAWS: usize = 16;

/// How many generators are tried before the key is declared faulty.
pub const MAX_GENERATOR_DRAWS: usize = 16;

/// A Paillier public key.
///
/// Only key generation builds one, so `n_squared` always matches `n`. The fields can't be
/// changed afterwards:
///
/// ```compile_fail
/// use num_bigint::BigUint;
/// use paillier_pet::paillier::Keypair;
///
/// let mut keypair = Keypair::generate(64).unwrap();
/// keypair.public.n = BigUint::from(15u32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    n: BigUint,
    g: BigUint,
    n_squared: BigUint,
}

impl PublicKey {
    fn new(n: BigUint, g: BigUint) -> Self {
        let n_squared = &n * &n;
        PublicKey { n, g, n_squared }
    }

    /// The modulus `n = p * q`.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// The ciphertext modulus `n^2`.
    pub fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }
}

/// A Paillier secret key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    lambda: BigUint,
    mu: BigUint,
}

impl SecretKey {
    pub fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    pub fn mu(&self) -> &BigUint {
        &self.mu
    }
}

/// A matching public and secret key.
#[derive(Clone, Debug)]
pub struct Keypair {
    public: PublicKey,
    secret: SecretKey,
}

impl Keypair {
    /// Generate a keypair with a modulus of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self, KeyGenError> {
        let (public, secret) = KeyGen::generate(bits)?;
        Ok(Keypair { public, secret })
    }

    /// Generate a keypair deterministically from `rng`.
    pub fn generate_with_rng<R: Rng + ?Sized>(bits: usize, rng: &mut R) -> Result<Self, KeyGenError> {
        let (public, secret) = generate_with_rng(bits, rng)?;
        Ok(Keypair { public, secret })
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

/// Paillier key generator.
pub struct KeyGen;

impl KeyGen {
    /// Generate a keypair with a modulus of `bits` bits using the thread rng.
    pub fn generate(bits: usize) -> Result<(PublicKey, SecretKey), KeyGenError> {
        validate_key_size(bits)?;
        let (p, q) = draw_primes(bits / 2)?;
        assemble(p, q, &mut thread_rng())
    }
}

/// Generate a keypair deterministically from `rng`.
pub fn generate_with_rng<R: Rng + ?Sized>(
    bits: usize,
    rng: &mut R,
) -> Result<(PublicKey, SecretKey), KeyGenError> {
    validate_key_size(bits)?;
    let p = generate_prime(bits / 2, rng)?;
    let q = generate_prime(bits / 2, rng)?;
    debug!(bits = bits / 2, "generated primes p and q");
    let q = distinct_from(&p, q, || generate_prime(bits / 2, rng))?;
    assemble(p, q, rng)
}

fn validate_key_size(bits: usize) -> Result<(), KeyGenError> {
    if bits % 2 != 0 || bits < MIN_KEY_SIZE {
        return Err(KeyGenError::InvalidKeySize(bits, MIN_KEY_SIZE));
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn draw_primes(prime_bits: usize) -> Result<(BigUint, BigUint), KeyGenError> {
    let (p, q) = rayon::join(
        || generate_prime(prime_bits, &mut thread_rng()),
        || generate_prime(prime_bits, &mut thread_rng()),
    );
    let p = p?;
    debug!(bits = prime_bits, "generated primes p and q");
    let q = distinct_from(&p, q?, || generate_prime(prime_bits, &mut thread_rng()))?;
    Ok((p, q))
}

#[cfg(not(feature = "parallel"))]
fn draw_primes(prime_bits: usize) -> Result<(BigUint, BigUint), KeyGenError> {
    let mut rng = thread_rng();
    let p = generate_prime(prime_bits, &mut rng)?;
    let q = generate_prime(prime_bits, &mut rng)?;
    debug!(bits = prime_bits, "generated primes p and q");
    let q = distinct_from(&p, q, || generate_prime(prime_bits, &mut rng))?;
    Ok((p, q))
}

fn distinct_from<F>(p: &BigUint, mut q: BigUint, mut redraw: F) -> Result<BigUint, KeyGenError>
where
    F: FnMut() -> Result<BigUint, KeyGenError>,
{
    for _ in 0..MAX_DISTINCT_PRIME_REDRAWS {
        if q != *p {
            return Ok(q);
        }
        debug!("p == q, redrawing q");
        q = redraw()?;
    }
    if q != *p {
        Ok(q)
    } else {
        Err(KeyGenError::IdenticalPrimes)
    }
}

fn assemble<R: Rng + ?Sized>(
    p: BigUint,
    q: BigUint,
    rng: &mut R,
) -> Result<(PublicKey, SecretKey), KeyGenError> {
    let one = BigUint::one();
    let n = &p * &q;
    let lambda = lcm(&(&p - &one), &(&q - &one));
    let n_squared = &n * &n;

    let mut last_err = ArithmeticError::NoInverse;
    for _ in 0..MAX_GENERATOR_DRAWS {
        let g = generate_coprime(&n_squared, rng);
        match get_mu(&g, &lambda, &n) {
            Ok(mu) => {
                info!(bits = n.bits(), "generated paillier keypair");
                return Ok((PublicKey::new(n, g), SecretKey { lambda, mu }));
            }
            Err(e) => {
                debug!("generator has no mu, redrawing g");
                last_err = e;
            }
        }
    }
    error!("internal consistency fault: no valid generator for modulus");
    Err(KeyGenError::Arithmetic(last_err))
}

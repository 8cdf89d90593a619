//! Paillier encryption, decryption and homomorphic operations.
//!
//! Decrypting a value that is in range but was not produced by [`encrypt`] under the same key
//! yields an arbitrary (deterministic) plaintext; Paillier has no way to detect it.

use num_bigint::BigUint;
use num_traits::One;
use rand::{thread_rng, Rng};

use super::keys::{PublicKey, SecretKey};
use super::math::{generate_coprime, l_function};
use crate::errors::CipherError;

/// A Paillier ciphertext, an integer in `[0, n^2)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext(BigUint);

impl Ciphertext {
    /// Wrap a raw value received from elsewhere, checking it against the key's ciphertext space.
    pub fn from_raw(pk: &PublicKey, c: BigUint) -> Result<Self, CipherError> {
        if c >= *pk.n_squared() {
            return Err(CipherError::CiphertextOutOfRange);
        }
        Ok(Ciphertext(c))
    }

    /// The raw ciphertext value.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Big-endian bytes, as sent over the wire.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

/// Encrypt `m` under `pk` using the thread rng.
pub fn encrypt(pk: &PublicKey, m: &BigUint) -> Result<Ciphertext, CipherError> {
    encrypt_with_rng(pk, m, &mut thread_rng())
}

/// Encrypt `m` under `pk`: `c = g^m * r^n mod n^2`.
pub fn encrypt_with_rng<R: Rng + ?Sized>(
    pk: &PublicKey,
    m: &BigUint,
    rng: &mut R,
) -> Result<Ciphertext, CipherError> {
    if m >= pk.n() {
        return Err(CipherError::PlaintextOutOfRange);
    }
    let n_squared = pk.n_squared();
    let r = generate_coprime(pk.n(), rng);
    let c = pk.g().modpow(m, n_squared) * r.modpow(pk.n(), n_squared) % n_squared;
    Ok(Ciphertext(c))
}

/// Decrypt `c`: `m = L(c^lambda mod n^2) * mu mod n`.
pub fn decrypt(pk: &PublicKey, sk: &SecretKey, c: &Ciphertext) -> Result<BigUint, CipherError> {
    let n_squared = pk.n_squared();
    if c.0 >= *n_squared {
        return Err(CipherError::CiphertextOutOfRange);
    }
    let u = c.0.modpow(sk.lambda(), n_squared);
    if u < BigUint::one() {
        // Only reachable for c = 0, which is not a ciphertext.
        return Ok(BigUint::default());
    }
    Ok(l_function(&u, pk.n()) * sk.mu() % pk.n())
}

/// `Enc(m1 + m2)` from `Enc(m1)` and `Enc(m2)`.
pub fn add(pk: &PublicKey, c1: &Ciphertext, c2: &Ciphertext) -> Ciphertext {
    Ciphertext(&c1.0 * &c2.0 % pk.n_squared())
}

/// `Enc(m1 - m2 mod n)` from `Enc(m1)` and `Enc(m2)`.
pub fn sub(pk: &PublicKey, c1: &Ciphertext, c2: &Ciphertext) -> Ciphertext {
    add(pk, c1, &negate(pk, c2))
}

/// `Enc(-m mod n)` from `Enc(m)`.
pub fn negate(pk: &PublicKey, c: &Ciphertext) -> Ciphertext {
    Ciphertext(c.0.modpow(&(pk.n() - BigUint::one()), pk.n_squared()))
}

/// `Enc(m + k mod n)` from `Enc(m)` and a plaintext `k`.
pub fn add_plain(pk: &PublicKey, c: &Ciphertext, k: &BigUint) -> Ciphertext {
    let n_squared = pk.n_squared();
    let gk = pk.g().modpow(&(k % pk.n()), n_squared);
    Ciphertext(&c.0 * gk % n_squared)
}

/// `Enc(m * k mod n)` from `Enc(m)` and a plaintext `k`.
pub fn mul_plain(pk: &PublicKey, c: &Ciphertext, k: &BigUint) -> Ciphertext {
    Ciphertext(c.0.modpow(&(k % pk.n()), pk.n_squared()))
}

/// Multiply by a fresh `r^n`, giving an unlinkable encryption of the same plaintext.
pub fn rerandomize<R: Rng + ?Sized>(pk: &PublicKey, c: &Ciphertext, rng: &mut R) -> Ciphertext {
    let n_squared = pk.n_squared();
    let r = generate_coprime(pk.n(), rng);
    Ciphertext(&c.0 * r.modpow(pk.n(), n_squared) % n_squared)
}

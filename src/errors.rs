//! Error types for key generation, the cipher and the equality protocol.

use thiserror::Error;

/// Internal arithmetic faults.
///
/// These indicate a broken invariant rather than bad user input: correctly generated keys never
/// produce them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    /// `L(g^lambda mod n^2)` has no inverse modulo `n`.
    #[error("no modular inverse exists for L(g^lambda mod n^2) modulo n")]
    NoInverse,
}

/// Errors raised while generating a Paillier keypair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyGenError {
    /// The modulus size is odd or too small to hold two primes.
    #[error("invalid key size {0}: must be even and at least {1} bits")]
    InvalidKeySize(usize, usize),

    /// The requested prime is shorter than the supported minimum.
    #[error("prime bit length {0} is below the minimum of {1}")]
    PrimeTooSmall(usize, usize),

    /// No prime was found within the retry budget.
    #[error("no prime of {bits} bits found after {attempts} candidates")]
    PrimeSearchExhausted { bits: usize, attempts: usize },

    /// `q` kept colliding with `p`.
    #[error("could not draw two distinct primes")]
    IdenticalPrimes,

    /// The generator never yielded an invertible `mu`.
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// Errors raised by encryption and decryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The plaintext is not in `[0, n)`.
    #[error("plaintext out of range: must be below the public modulus")]
    PlaintextOutOfRange,

    /// The ciphertext is not in `[0, n^2)`.
    #[error("ciphertext out of range: must be below the squared public modulus")]
    CiphertextOutOfRange,
}

/// Session configuration problems, detected before any cryptographic work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolOptionsError {
    /// The statistical security parameter must be positive.
    #[error("kappa must be greater than zero")]
    ZeroKappa,

    /// The key size can't be used for Paillier keys.
    #[error("invalid key size {0}: must be even and at least {1} bits")]
    KeySize(usize, usize),

    /// The masked comparison value would not fit under the modulus.
    #[error("inputs need {needed} bits of plaintext space but the key only provides {available}")]
    InputTooLarge { needed: usize, available: usize },
}

/// Errors raised by the equality protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The result was requested before a successful run.
    #[error("start hasn't been called or protocol failed")]
    NotCompleted,

    /// The session options are invalid.
    #[error(transparent)]
    Options(#[from] ProtocolOptionsError),

    /// Key generation for the session failed.
    #[error("key generation failed: {0}")]
    KeyGen(#[from] KeyGenError),

    /// A cipher operation failed.
    #[error("cipher operation failed: {0}")]
    Cipher(#[from] CipherError),

    /// A protocol step observed inconsistent state.
    #[error("step {step} failed: {reason}")]
    Step { step: &'static str, reason: String },

    /// The decrypted outcome disagrees with the plaintext comparison.
    #[error("protocol outcome mismatch: decrypted {decrypted}, expected {expected}")]
    OutcomeMismatch { decrypted: bool, expected: bool },
}

impl ProtocolError {
    pub(crate) fn step(step: &'static str, reason: impl Into<String>) -> Self {
        Self::Step { step, reason: reason.into() }
    }
}

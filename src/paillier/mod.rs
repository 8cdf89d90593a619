//! Paillier cryptosystem: key generation, encryption, decryption and homomorphic operations.

pub mod cipher;
pub mod keys;
pub mod math;
pub mod prime;

pub use cipher::{decrypt, encrypt, Ciphertext};
pub use keys::{KeyGen, Keypair, PublicKey, SecretKey};

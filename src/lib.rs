//! Paillier cryptosystem and a two-party private equality test built on top of it.
//!
//! ```no_run
//! use paillier_pet::protocol::Protocol;
//!
//! let mut protocol = Protocol::new(42u32, 42u32, 40, 2048)?;
//! protocol.start()?;
//! assert!(protocol.decrypted_result()?);
//! # Ok::<(), paillier_pet::errors::ProtocolError>(())
//! ```

pub mod errors;
pub mod paillier;
pub mod protocol;
pub mod server;

pub use errors::{ArithmeticError, CipherError, KeyGenError, ProtocolError, ProtocolOptionsError};
pub use paillier::{decrypt, encrypt, Ciphertext, KeyGen, Keypair, PublicKey, SecretKey};
pub use protocol::{Protocol, ProtocolOptions};

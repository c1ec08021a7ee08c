//! Cryptographic primitive bindings for an IKEv2 session
//!
//! `ike-wire` owns the wire shapes; this crate turns negotiated algorithm
//! choices plus nonces/DH shared secrets into actual key bytes, and performs
//! the encrypt/decrypt and MAC operations the session needs to open and seal
//! the Encrypted payload. No session or retransmission state lives here.
#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

pub mod aead;
pub mod channel;
pub mod cipher;
pub mod dh;
pub mod eap_prf;
pub mod integrity;
pub mod keys;
pub mod prf;

pub use channel::{Direction, SecuredChannel};
pub use dh::DhPrivateKey;
pub use eap_prf::{derive_aka_keys, AkaKeys};
pub use keys::{derive_child_sa_keys, derive_keys, ChildSaKeyMaterial, DirectionalKeys, IkeSaKeys, KeySchedule};

/// Everything that can go wrong in key derivation, encryption, or integrity checking
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The peer's DH public value failed the `1 < y < p-1` validation
    #[error("invalid key exchange: public value out of range")]
    InvalidKeyExchange,
    /// A computed or supplied ICV/MAC did not match
    #[error("integrity check failed")]
    IntegrityFailure,
    /// AEAD or CBC decryption failed (bad tag, bad padding)
    #[error("decryption failed")]
    DecryptionFailure,
    /// A key or nonce was the wrong length for the algorithm requesting it
    #[error("invalid key material length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Length the algorithm requires
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },
    /// An algorithm combination this crate does not implement was requested
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(&'static str),
}

//! Wire format: parsing and generation of IKEv2 messages, see RFC 7296
//!
//! This crate owns the data model (header, payloads, SA/Proposal/Transform,
//! traffic selectors, identities) and the codec between that model and raw
//! octets. It knows nothing about cryptography or session state; the
//! Encrypted payload is handed back and forth as opaque ciphertext (see
//! [message::EncryptedPayload]) for `ike-crypto`/`ike-session` to decrypt.
#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod delete;
pub mod generator;
pub mod header;
pub mod identification;
pub mod message;
pub mod negotiation;
pub mod notify;
pub mod params;
pub mod parser;
pub mod sa;
pub mod traffic_selector;

pub use message::{EncryptedPayload, IkeMessage, Payload};
pub use parser::ParserError;
pub use sa::{Proposal, SecurityAssociation, Transform};

/// Why a numeric IANA parameter could not be turned into a typed enum value
///
/// Mirrors the classification IANA itself uses for unassigned ranges in the
/// IKEv2 parameters registry, so a caller can tell "the peer sent something
/// reserved" apart from "the peer sent something we just don't recognize yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UnparseableParameter {
    /// Value is in a range the RFC marks reserved
    #[error("value is in a reserved range")]
    Reserved,
    /// Value is in a range IANA has not assigned yet
    #[error("value is not assigned by IANA")]
    Unassigned,
    /// Value is in a vendor/private-use range
    #[error("value is reserved for private use")]
    PrivateUse,
    /// Value is numerically out of range for this field's bit width
    #[error("value is out of range for this parameter")]
    OutOfRange,
}

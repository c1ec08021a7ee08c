//! Aggregate error taxonomy for the session layer.
//!
//! Every lower layer's error rolls up into one of these variants through
//! `#[from]` so callers driving an [`crate::session::IkeSession`] only ever
//! need to match one type.

/// Everything that can cause an `IkeSession` operation to fail
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The peer sent bytes that don't parse as an IKE message
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] ike_wire::parser::ParserError),
    /// An outbound message could not be encoded
    #[error("could not encode outbound message: {0}")]
    Encoding(#[from] ike_wire::generator::GeneratorError),
    /// A cryptographic primitive failed: key derivation, AEAD seal/open, DH
    #[error("cryptographic failure: {0}")]
    Crypto(#[from] ike_crypto::CryptoError),
    /// The EAP layer failed to decode a message or step its state machine
    #[error("EAP failure: {0}")]
    Eap(#[from] ike_eap::EapError),
    /// None of the peer's offered or returned proposals survived negotiation
    #[error("no acceptable proposal in the peer's SA payload")]
    NoAcceptableProposal,
    /// The peer's final AUTH payload, or an EAP method's authenticity check,
    /// did not verify
    #[error("authentication failed")]
    AuthenticationFailed,
    /// A [`crate::collab::CredentialStore`] had no local identity or signing
    /// material to offer
    #[error("local identity is unavailable")]
    IdentityUnavailable,
    /// A message was syntactically well-formed but invalid for this exchange
    /// (wrong payload set, missing mandatory payload, SPI mismatch)
    #[error("invalid syntax: {0}")]
    InvalidSyntax(&'static str),
    /// A message arrived, or an API call was made, that isn't valid in the
    /// session's current state
    #[error("unexpected state for this event")]
    UnexpectedState,
    /// Retransmission was exhausted without a response from the peer
    #[error("retransmission exhausted, no response received")]
    Timeout,
    /// The transport collaborator reported a send/receive failure
    #[error("transport error: {0}")]
    TransportError(String),
    /// An invariant internal to this crate was violated
    #[error("internal error: {0}")]
    Internal(&'static str),
}

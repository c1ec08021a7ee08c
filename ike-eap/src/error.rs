//! Error taxonomy for EAP attribute decoding and method state machines

/// Everything that can go wrong decoding an EAP message or driving a method
/// state machine forward
#[derive(Debug, thiserror::Error)]
pub enum EapError {
    /// The EAP header or type-data could not be decoded
    #[error("malformed EAP message")]
    MalformedMessage,
    /// A recognized but non-skippable attribute type carried an invalid encoding
    #[error("invalid syntax: {0}")]
    InvalidSyntax(&'static str),
    /// An unrecognized attribute with type < 128 (non-skippable) was present
    #[error("unsupported attribute type {0}")]
    UnsupportedAttribute(u8),
    /// The identity-store or UICC collaborator had no identity to offer
    #[error("identity unavailable")]
    IdentityUnavailable,
    /// AT_MAC verification, AKA'/MSCHAPv2 response verification, or a
    /// similar authenticity check failed
    #[error("authentication failed")]
    AuthenticationFailed,
    /// A message arrived that is not valid in the method's current state
    #[error("unexpected method state")]
    UnexpectedState,
    /// A collaborator call failed
    #[error("collaborator call failed: {0}")]
    Collaborator(String),
    /// An invariant internal to this crate was violated
    #[error("internal error: {0}")]
    Internal(&'static str),
    /// A cryptographic primitive failed
    #[error(transparent)]
    Crypto(#[from] ike_crypto::CryptoError),
}

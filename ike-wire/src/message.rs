//! Top level IKE message data model, see RFC 7296 sections 3.1-3.2
//!
//! An [IkeMessage] is a header plus an ordered list of [Payload]s. The
//! Encrypted payload (SK) is deliberately left in its ciphertext form here:
//! decryption needs key material this crate has no notion of, so the
//! boundary between "a message with an SK payload" and "a message with the
//! payloads that were inside it" is a decrypt/encrypt step performed by
//! callers that hold the session keys (see `ike-crypto` and `ike-session`).

use crate::config::ConfigurationPayload;
use crate::delete::DeletePayload;
use crate::identification::IkeIdentification;
use crate::notify::NotifyPayload;
use crate::params::{AuthenticationMethod, CertificateEncoding, DiffieHellmanGroup, ExchangeType};
use crate::sa::SecurityAssociation;
use crate::traffic_selector::IkeTrafficSelector;

/// An encrypted payload's ciphertext, still wrapped in its IV/ICV framing
///
/// Layout per RFC 7296 section 3.14: `IV || ciphertext || [ICV]`. For AEAD
/// transforms the ICV is part of the AEAD output and `icv` is empty here;
/// the caller handling decryption is responsible for knowing which applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Initialization vector, length fixed by the negotiated encryption transform
    pub iv: Vec<u8>,
    /// Ciphertext, including any AEAD tag for combined-mode transforms
    pub ciphertext: Vec<u8>,
    /// The Encrypted payload's own generic-header Next Payload field, which
    /// RFC 7296 section 3.14 repurposes (since SK is always the last payload
    /// in the outer chain) to name the type of the *first* payload inside the
    /// decrypted inner chain.
    pub first_inner_payload_type: u8,
}

/// A single payload inside an [IkeMessage]
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Payload {
    SecurityAssociation(SecurityAssociation),
    KeyExchange {
        group: DiffieHellmanGroup,
        public_value: Vec<u8>,
    },
    IdentificationInitiator(IkeIdentification),
    IdentificationResponder(IkeIdentification),
    Certificate {
        encoding: CertificateEncoding,
        data: Vec<u8>,
    },
    CertificateRequest {
        encoding: CertificateEncoding,
        certificate_authority: Vec<u8>,
    },
    Authentication {
        method: AuthenticationMethod,
        data: Vec<u8>,
    },
    Nonce(Vec<u8>),
    Notify(NotifyPayload),
    Delete(DeletePayload),
    VendorId(Vec<u8>),
    TrafficSelectorInitiator(Vec<IkeTrafficSelector>),
    TrafficSelectorResponder(Vec<IkeTrafficSelector>),
    Encrypted(EncryptedPayload),
    Configuration(ConfigurationPayload),
    /// Raw EAP message bytes, decoded by `ike-eap`
    ExtensibleAuthentication(Vec<u8>),
}

impl Payload {
    /// The [crate::params::PayloadType] this payload is encoded as
    pub fn payload_type(&self) -> crate::params::PayloadType {
        use crate::params::PayloadType;
        match self {
            Payload::SecurityAssociation(_) => PayloadType::SecurityAssociation,
            Payload::KeyExchange { .. } => PayloadType::KeyExchange,
            Payload::IdentificationInitiator(_) => PayloadType::IdentificationInitiator,
            Payload::IdentificationResponder(_) => PayloadType::IdentificationResponder,
            Payload::Certificate { .. } => PayloadType::Certificate,
            Payload::CertificateRequest { .. } => PayloadType::CertificateRequest,
            Payload::Authentication { .. } => PayloadType::Authentication,
            Payload::Nonce(_) => PayloadType::Nonce,
            Payload::Notify(_) => PayloadType::Notify,
            Payload::Delete(_) => PayloadType::Delete,
            Payload::VendorId(_) => PayloadType::VendorID,
            Payload::TrafficSelectorInitiator(_) => PayloadType::TrafficSelectorInitiator,
            Payload::TrafficSelectorResponder(_) => PayloadType::TrafficSelectorResponder,
            Payload::Encrypted(_) => PayloadType::EncryptedAndAuthenticated,
            Payload::Configuration(_) => PayloadType::Configuration,
            Payload::ExtensibleAuthentication(_) => PayloadType::ExtensibleAuthentication,
        }
    }
}

/// A full IKE message: header plus ordered payloads, see RFC 7296 section 3.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IkeMessage {
    /// SPI chosen by the initiator
    pub initiator_spi: u64,
    /// SPI chosen by the responder; zero before the responder has replied
    pub responder_spi: u64,
    /// Exchange type driving which payloads are expected
    pub exchange_type: ExchangeType,
    /// Set on messages sent by the IKE SA's original initiator
    pub initiator_flag: bool,
    /// Set on responses, clear on requests
    pub response_flag: bool,
    /// Message ID, used for matching requests to responses and replay protection
    pub message_id: u32,
    /// Payloads in wire order
    pub payloads: Vec<Payload>,
}

impl IkeMessage {
    /// Construct a message, leaving payloads empty for the caller to push onto
    pub fn new(
        initiator_spi: u64,
        responder_spi: u64,
        exchange_type: ExchangeType,
        initiator_flag: bool,
        response_flag: bool,
        message_id: u32,
    ) -> Self {
        Self {
            initiator_spi,
            responder_spi,
            exchange_type,
            initiator_flag,
            response_flag,
            message_id,
            payloads: Vec::new(),
        }
    }

    /// Whether this message carries an Encrypted (SK) payload, which per RFC
    /// 7296 section 3.14 must be the last payload if present
    pub fn has_encrypted_payload(&self) -> bool {
        matches!(self.payloads.last(), Some(Payload::Encrypted(_)))
    }
}

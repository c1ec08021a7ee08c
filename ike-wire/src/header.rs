//! Network-level header structs for pieces of the protocol
//!
//! These are `repr(C, packed)` views over the wire bytes, decoded with
//! [`zerocopy::FromBytes::ref_from_prefix`] and encoded with
//! [`zerocopy::AsBytes::as_bytes`]. None of these carry variable-length
//! bodies; the surrounding parser/generator code slices those separately.

use zerocopy::network_endian::{U16, U32, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

/// The 28 byte IKEv2 header, see RFC 7296 section 3.1
///
///                          1                   2                   3
///      0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                       IKE SA Initiator's SPI                 |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                       IKE SA Responder's SPI                 |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |  Next Payload | MjVer | MnVer | Exchange Type |     Flags     |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                          Message ID                          |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     |                            Length                            |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct Header {
    /// SPI chosen by the initiator, never zero once negotiated
    pub initiator_spi: U64,
    /// SPI chosen by the responder, zero in the first IKE_SA_INIT request
    pub responder_spi: U64,
    /// Type of the first payload that follows the header
    pub next_payload: u8,
    /// High nibble major version (2), low nibble minor version (0)
    pub version: u8,
    /// Type of exchange, see [crate::params::ExchangeType]
    pub exchange_type: u8,
    /// Bit flags: initiator, version, response; see [crate::params::FLAG_INITIATOR] et al.
    pub flags: u8,
    /// Monotonically increasing per direction; echoed by the responder
    pub message_id: U32,
    /// Total length of the message, header included
    pub length: U32,
}

/// Generic 4 byte payload header shared by every payload, see RFC 7296 section 3.2
///
///                          1                   2                   3
///      0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///     | Next Payload  |C|  RESERVED   |         Payload Length        |
///     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct GenericPayloadHeader {
    /// Type of the payload following this one
    pub next_payload: u8,
    /// Top bit is the critical flag; remaining 7 bits are reserved and must be zero
    pub reserved: u8,
    /// Length in octets of the current payload, header included
    pub payload_length: U16,
}

/// Bit mask for the critical flag inside [GenericPayloadHeader::reserved]
pub const FLAG_CRITICAL: u8 = 0b1000_0000;

/// Protocol header for a Proposal, see RFC 7296 section 3.3.1
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct ProposalHeader {
    /// 0 for the last proposal in a Security Association, 2 for any other
    pub last_substruct: u8,
    /// Reserved, must be zero
    pub reserved: u8,
    /// Length in octets of the current Proposal, header included
    pub proposal_length: U16,
    /// 1 for the first Proposal, incremented by one for each following Proposal
    pub proposal_num: u8,
    /// See [crate::params::SecurityProtocol]
    pub protocol_id: u8,
    /// Size of the SPI in octets; 0 for an initial IKE_SA_INIT proposal
    pub spi_size: u8,
    /// Number of Transforms following the SPI
    pub num_transforms: u8,
}

/// Protocol header for a Transform, see RFC 7296 section 3.3.2
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct TransformHeader {
    /// 0 for the last Transform in a Proposal, 3 for any other
    pub last_substruct: u8,
    /// Reserved, must be zero
    pub reserved: u8,
    /// Length in octets of the current Transform, header included
    pub transform_length: U16,
    /// See [crate::params::TransformType]
    pub transform_type: u8,
    /// Reserved, must be zero
    pub reserved2: u8,
    /// Meaning depends on `transform_type`
    pub transform_id: U16,
}

/// Fixed-length (TV) Transform Attribute, see RFC 7296 section 3.3.5
///
/// Only the Key Length attribute (type 14) is recognized; it is always
/// encoded in TV form (AF bit set).
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct AttributeHeaderTv {
    /// Top bit (AF) set to 1 for TV form; low 15 bits are the attribute type
    pub attribute_type: U16,
    /// The attribute value itself (TV form carries the value inline)
    pub attribute_value: U16,
}

/// Protocol header for a Key Exchange payload, see RFC 7296 section 3.4
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct KeyExchangeHeader {
    /// DH group the key exchange data was computed in, see [crate::params::DiffieHellmanGroup]
    pub dh_group_num: U16,
    /// Reserved, must be zero
    pub reserved: U16,
}

/// Protocol header for a Notify payload, see RFC 7296 section 3.10
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct NotifyHeader {
    /// See [crate::params::SecurityProtocol]; zero if the SPI field is empty
    pub protocol_id: u8,
    /// Length in octets of the SPI; zero for notifications about the IKE SA
    pub spi_size: u8,
    /// Error or status type, see [crate::params::NotifyErrorType] / [crate::params::NotifyStatusType]
    pub notify_message_type: U16,
}

impl NotifyHeader {
    /// Types below 16384 report errors; types at or above report status
    pub fn is_error(&self) -> bool {
        self.notify_message_type.get() < 16384
    }
}

/// Protocol header for a Delete payload, see RFC 7296 section 3.11
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct DeleteHeader {
    /// See [crate::params::SecurityProtocol]
    pub protocol_id: u8,
    /// Length in octets of each SPI that follows
    pub spi_size: u8,
    /// Number of SPIs that follow
    pub num_spis: U16,
}

/// Protocol header for an Identification payload, see RFC 7296 section 3.5
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct IdentificationHeader {
    /// See [crate::params::IdentificationType]
    pub id_type: u8,
    /// Reserved, must be zero
    pub reserved: [u8; 3],
}

/// Protocol header for a Certificate or Certificate Request payload, see RFC 7296 sections 3.6/3.7
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct CertificateHeader {
    /// See [crate::params::CertificateEncoding]
    pub cert_encoding: u8,
}

/// Protocol header for an Authentication payload, see RFC 7296 section 3.8
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct AuthenticationHeader {
    /// See [crate::params::AuthenticationMethod]
    pub auth_method: u8,
    /// Reserved, must be zero
    pub reserved: [u8; 3],
}

/// Protocol header for a single Traffic Selector, see RFC 7296 section 3.13.1
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct TrafficSelectorHeader {
    /// See [crate::params::TrafficSelectorType]
    pub ts_type: u8,
    /// 0 means any protocol; otherwise an IP protocol number (e.g. 6 = TCP, 17 = UDP)
    pub ip_protocol_id: u8,
    /// Total length of this selector, header included: 16 for v4, 40 for v6
    pub selector_length: U16,
    /// Inclusive lower bound of the port range
    pub start_port: U16,
    /// Inclusive upper bound of the port range
    pub end_port: U16,
}

/// Protocol header for the Traffic Selector payload's count prefix, see RFC 7296 section 3.13
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct TrafficSelectorPayloadHeader {
    /// Number of Traffic Selectors that follow
    pub num_ts: u8,
    /// Reserved, must be zero
    pub reserved: [u8; 3],
}

/// Protocol header for the Configuration payload, see RFC 7296 section 3.15
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct ConfigurationHeader {
    /// See [crate::params::ConfigType]
    pub cfg_type: u8,
    /// Reserved, must be zero
    pub reserved: [u8; 3],
}

/// Protocol header for a single Configuration Attribute, see RFC 7296 section 3.15.1
#[derive(Debug, FromBytes, FromZeroes, AsBytes, Unaligned, Copy, Clone)]
#[repr(C, packed)]
pub struct ConfigAttributeHeader {
    /// Top bit reserved (must be 0), low 15 bits are the attribute type
    pub attribute_type: U16,
    /// Length in octets of the value that follows
    pub length: U16,
}

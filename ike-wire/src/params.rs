//! IKEv2 parameters and their parsers as defined in the IANA IKEv2 list
//! found at <https://www.iana.org/assignments/ikev2-parameters/ikev2-parameters.xhtml>

use crate::UnparseableParameter;

/// Type of the exchange being used
///
/// This constrains the payloads sent in each message in an exchange.
/// Only the four exchange types this client drives are implemented;
/// everything else is out of scope (see crate root docs).
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum ExchangeType {
    /// RFC 7296
    IkeSaInit = 34,
    /// RFC 7296
    IkeAuth = 35,
    /// RFC 7296
    CreateChildSa = 36,
    /// RFC 7296
    Informational = 37,
}

impl TryFrom<u8> for ExchangeType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=33 => Err(UnparseableParameter::Reserved),
            34 => Ok(ExchangeType::IkeSaInit),
            35 => Ok(ExchangeType::IkeAuth),
            36 => Ok(ExchangeType::CreateChildSa),
            37 => Ok(ExchangeType::Informational),
            38..=239 => Err(UnparseableParameter::Unassigned),
            240..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Type of the payload being carried, i.e. the "next payload" field
///
/// Notably, values 1-32 are reserved, 55-127 are currently unassigned
/// and 128-255 reserved for private use.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PayloadType {
    NoNextPayload = 0,
    SecurityAssociation = 33,
    KeyExchange = 34,
    IdentificationInitiator = 35,
    IdentificationResponder = 36,
    Certificate = 37,
    CertificateRequest = 38,
    Authentication = 39,
    Nonce = 40,
    Notify = 41,
    Delete = 42,
    VendorID = 43,
    TrafficSelectorInitiator = 44,
    TrafficSelectorResponder = 45,
    EncryptedAndAuthenticated = 46,
    Configuration = 47,
    ExtensibleAuthentication = 48,
}

impl TryFrom<u8> for PayloadType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PayloadType::NoNextPayload),
            1..=32 => Err(UnparseableParameter::Reserved),
            33 => Ok(PayloadType::SecurityAssociation),
            34 => Ok(PayloadType::KeyExchange),
            35 => Ok(PayloadType::IdentificationInitiator),
            36 => Ok(PayloadType::IdentificationResponder),
            37 => Ok(PayloadType::Certificate),
            38 => Ok(PayloadType::CertificateRequest),
            39 => Ok(PayloadType::Authentication),
            40 => Ok(PayloadType::Nonce),
            41 => Ok(PayloadType::Notify),
            42 => Ok(PayloadType::Delete),
            43 => Ok(PayloadType::VendorID),
            44 => Ok(PayloadType::TrafficSelectorInitiator),
            45 => Ok(PayloadType::TrafficSelectorResponder),
            46 => Ok(PayloadType::EncryptedAndAuthenticated),
            47 => Ok(PayloadType::Configuration),
            48 => Ok(PayloadType::ExtensibleAuthentication),
            49..=127 => Err(UnparseableParameter::Unassigned),
            128..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Protocol identifier of a Proposal, see RFC 7296 section 3.3.1
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum SecurityProtocol {
    /// IKE itself
    InternetKeyExchange = 1,
    /// Authentication Header child SA
    AuthenticationHeader = 2,
    /// ESP child SA
    EncapsulatingSecurityPayload = 3,
}

impl TryFrom<u8> for SecurityProtocol {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SecurityProtocol::InternetKeyExchange),
            2 => Ok(SecurityProtocol::AuthenticationHeader),
            3 => Ok(SecurityProtocol::EncapsulatingSecurityPayload),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Type of a Transform inside a Proposal, see RFC 7296 section 3.3.2
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum TransformType {
    /// ENCR
    EncryptionAlgorithm = 1,
    /// PRF
    PseudoRandomFunction = 2,
    /// INTEG
    IntegrityAlgorithm = 3,
    /// D-H / KE
    DiffieHellmanGroup = 4,
    /// ESN
    ExtendedSequenceNumbers = 5,
}

impl TryFrom<u8> for TransformType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(TransformType::EncryptionAlgorithm),
            2 => Ok(TransformType::PseudoRandomFunction),
            3 => Ok(TransformType::IntegrityAlgorithm),
            4 => Ok(TransformType::DiffieHellmanGroup),
            5 => Ok(TransformType::ExtendedSequenceNumbers),
            6..=240 => Err(UnparseableParameter::Unassigned),
            241..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Transform Type 1 - Encryption Algorithm Transform IDs (subset this client offers/accepts)
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum EncryptionAlgorithm {
    /// 3DES-CBC, fixed 192 bit (168 effective) key
    TripleDesCbc = 3,
    /// AES-CBC, key length carried as attribute (128/192/256)
    AesCbc = 12,
    /// AES-GCM with an 8 octet ICV
    AesGcm8 = 18,
    /// AES-GCM with a 12 octet ICV
    AesGcm12 = 19,
    /// AES-GCM with a 16 octet ICV
    AesGcm16 = 20,
}

impl EncryptionAlgorithm {
    /// Whether this algorithm is a combined (AEAD) mode, i.e. INTEG must be absent when selected
    pub fn is_aead(self) -> bool {
        matches!(
            self,
            EncryptionAlgorithm::AesGcm8 | EncryptionAlgorithm::AesGcm12 | EncryptionAlgorithm::AesGcm16
        )
    }

    /// Whether this algorithm accepts a Key Length attribute
    pub fn accepts_key_length(self) -> bool {
        !matches!(self, EncryptionAlgorithm::TripleDesCbc)
    }
}

impl TryFrom<u16> for EncryptionAlgorithm {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(EncryptionAlgorithm::TripleDesCbc),
            12 => Ok(EncryptionAlgorithm::AesCbc),
            18 => Ok(EncryptionAlgorithm::AesGcm8),
            19 => Ok(EncryptionAlgorithm::AesGcm12),
            20 => Ok(EncryptionAlgorithm::AesGcm16),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Transform Type 2 - Pseudorandom Function Transform IDs
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum PseudorandomFunction {
    /// PRF_HMAC_SHA1
    HmacSha1 = 2,
    /// PRF_AES128_XCBC
    Aes128Xcbc = 4,
    /// PRF_HMAC_SHA2_256
    HmacSha2_256 = 5,
    /// PRF_HMAC_SHA2_384
    HmacSha2_384 = 6,
    /// PRF_HMAC_SHA2_512
    HmacSha2_512 = 7,
}

impl TryFrom<u16> for PseudorandomFunction {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(PseudorandomFunction::HmacSha1),
            4 => Ok(PseudorandomFunction::Aes128Xcbc),
            5 => Ok(PseudorandomFunction::HmacSha2_256),
            6 => Ok(PseudorandomFunction::HmacSha2_384),
            7 => Ok(PseudorandomFunction::HmacSha2_512),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Transform Type 3 - Integrity Algorithm Transform IDs
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum IntegrityAlgorithm {
    /// No integrity, only legal alongside an AEAD encryption transform
    None = 0,
    /// AUTH_HMAC_SHA1_96
    HmacSha1_96 = 2,
    /// AUTH_AES_XCBC_96
    AesXcbc96 = 5,
    /// AUTH_HMAC_SHA2_256_128
    HmacSha2_256_128 = 12,
    /// AUTH_HMAC_SHA2_384_192
    HmacSha2_384_192 = 13,
    /// AUTH_HMAC_SHA2_512_256
    HmacSha2_512_256 = 14,
}

impl IntegrityAlgorithm {
    /// Length in bytes of the truncated checksum this algorithm produces
    pub fn checksum_len(self) -> usize {
        match self {
            IntegrityAlgorithm::None => 0,
            IntegrityAlgorithm::HmacSha1_96 | IntegrityAlgorithm::AesXcbc96 => 12,
            IntegrityAlgorithm::HmacSha2_256_128 => 16,
            IntegrityAlgorithm::HmacSha2_384_192 => 24,
            IntegrityAlgorithm::HmacSha2_512_256 => 32,
        }
    }
}

impl TryFrom<u16> for IntegrityAlgorithm {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IntegrityAlgorithm::None),
            2 => Ok(IntegrityAlgorithm::HmacSha1_96),
            5 => Ok(IntegrityAlgorithm::AesXcbc96),
            12 => Ok(IntegrityAlgorithm::HmacSha2_256_128),
            13 => Ok(IntegrityAlgorithm::HmacSha2_384_192),
            14 => Ok(IntegrityAlgorithm::HmacSha2_512_256),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Transform Type 4 - Diffie-Hellman Group Transform IDs (MODP groups only)
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum DiffieHellmanGroup {
    /// No key exchange, only legal for a Child SA without PFS
    None = 0,
    /// 1024-bit MODP
    Modp1024 = 2,
    /// 2048-bit MODP
    Modp2048 = 14,
}

impl DiffieHellmanGroup {
    /// Size in bytes of the public value / private exponent for this group
    pub fn public_value_len(self) -> usize {
        match self {
            DiffieHellmanGroup::None => 0,
            DiffieHellmanGroup::Modp1024 => 128,
            DiffieHellmanGroup::Modp2048 => 256,
        }
    }
}

impl TryFrom<u16> for DiffieHellmanGroup {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DiffieHellmanGroup::None),
            2 => Ok(DiffieHellmanGroup::Modp1024),
            14 => Ok(DiffieHellmanGroup::Modp2048),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Transform Type 5 - Extended Sequence Numbers Transform IDs
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum ExtendedSequenceNumbers {
    /// Classic 32 bit sequence numbers
    NoExtendedSequenceNumbers = 0,
    /// 64 bit extended sequence numbers
    ExtendedSequenceNumbers = 1,
}

impl TryFrom<u16> for ExtendedSequenceNumbers {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ExtendedSequenceNumbers::NoExtendedSequenceNumbers),
            1 => Ok(ExtendedSequenceNumbers::ExtendedSequenceNumbers),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Notify Message Types that report an error, see RFC 7296 section 3.10.1
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum NotifyErrorType {
    UnsupportedCriticalPayload = 1,
    InvalidIkeSpi = 4,
    InvalidMajorVersion = 5,
    InvalidSyntax = 7,
    InvalidMessageId = 9,
    InvalidSpi = 11,
    NoProposalChosen = 14,
    InvalidKeyExchangePayload = 17,
    AuthenticationFailed = 24,
    SinglePairRequired = 34,
    NoAdditionalSas = 35,
    InternalAddressFailure = 36,
    FailedCpRequired = 37,
    TsUnacceptable = 38,
    InvalidSelectors = 39,
    TemporaryFailure = 43,
    ChildSaNotFound = 44,
}

impl TryFrom<u16> for NotifyErrorType {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(NotifyErrorType::UnsupportedCriticalPayload),
            4 => Ok(NotifyErrorType::InvalidIkeSpi),
            5 => Ok(NotifyErrorType::InvalidMajorVersion),
            7 => Ok(NotifyErrorType::InvalidSyntax),
            9 => Ok(NotifyErrorType::InvalidMessageId),
            11 => Ok(NotifyErrorType::InvalidSpi),
            14 => Ok(NotifyErrorType::NoProposalChosen),
            17 => Ok(NotifyErrorType::InvalidKeyExchangePayload),
            24 => Ok(NotifyErrorType::AuthenticationFailed),
            34 => Ok(NotifyErrorType::SinglePairRequired),
            35 => Ok(NotifyErrorType::NoAdditionalSas),
            36 => Ok(NotifyErrorType::InternalAddressFailure),
            37 => Ok(NotifyErrorType::FailedCpRequired),
            38 => Ok(NotifyErrorType::TsUnacceptable),
            39 => Ok(NotifyErrorType::InvalidSelectors),
            43 => Ok(NotifyErrorType::TemporaryFailure),
            44 => Ok(NotifyErrorType::ChildSaNotFound),
            16384..=65535 => Err(UnparseableParameter::OutOfRange),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Notify Message Types that report status, see RFC 7296 section 3.10.1
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum NotifyStatusType {
    InitialContact = 16384,
    SetWindowSize = 16385,
    AdditionalTsPossible = 16386,
    RekeySa = 16393,
    MobikeSupported = 16396,
    EapOnlyAuthentication = 16417,
}

impl TryFrom<u16> for NotifyStatusType {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            16384 => Ok(NotifyStatusType::InitialContact),
            16385 => Ok(NotifyStatusType::SetWindowSize),
            16386 => Ok(NotifyStatusType::AdditionalTsPossible),
            16393 => Ok(NotifyStatusType::RekeySa),
            16396 => Ok(NotifyStatusType::MobikeSupported),
            16417 => Ok(NotifyStatusType::EapOnlyAuthentication),
            0..=16383 => Err(UnparseableParameter::OutOfRange),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Identification payload ID Types, see RFC 7296 section 3.5
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum IdentificationType {
    Ipv4Addr = 1,
    Fqdn = 2,
    Rfc822Addr = 3,
    Ipv6Addr = 5,
    DerAsn1Dn = 9,
    KeyId = 11,
}

impl TryFrom<u8> for IdentificationType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(IdentificationType::Ipv4Addr),
            2 => Ok(IdentificationType::Fqdn),
            3 => Ok(IdentificationType::Rfc822Addr),
            5 => Ok(IdentificationType::Ipv6Addr),
            9 => Ok(IdentificationType::DerAsn1Dn),
            11 => Ok(IdentificationType::KeyId),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Traffic Selector Types, see RFC 7296 section 3.13.1
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum TrafficSelectorType {
    /// IPv4 address range selector, 16 bytes total
    Ipv4AddrRange = 7,
    /// IPv6 address range selector, 40 bytes total. Not encoded by this client;
    /// offers of this type are rejected rather than silently accepted.
    Ipv6AddrRange = 8,
}

impl TryFrom<u8> for TrafficSelectorType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(TrafficSelectorType::Ipv4AddrRange),
            8 => Ok(TrafficSelectorType::Ipv6AddrRange),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Configuration Payload CFG Types, see RFC 7296 section 3.15
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum ConfigType {
    /// Request from the initiator
    Request = 1,
    /// Reply from the responder
    Reply = 2,
}

impl TryFrom<u8> for ConfigType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ConfigType::Request),
            2 => Ok(ConfigType::Reply),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Configuration Payload Attribute Types this client understands, see RFC 7296 section 3.15.1
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum ConfigAttributeType {
    InternalIp4Address = 1,
    InternalIp4Netmask = 2,
    InternalIp4Dns = 3,
    InternalIp6Address = 8,
    InternalIp6Dns = 10,
}

impl TryFrom<u16> for ConfigAttributeType {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ConfigAttributeType::InternalIp4Address),
            2 => Ok(ConfigAttributeType::InternalIp4Netmask),
            3 => Ok(ConfigAttributeType::InternalIp4Dns),
            8 => Ok(ConfigAttributeType::InternalIp6Address),
            10 => Ok(ConfigAttributeType::InternalIp6Dns),
            _ => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Certificate Encodings, see RFC 7296 section 3.6
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CertificateEncoding {
    Pkcs7WrappedX509Certificate = 1,
    PgpCertificate = 2,
    DnsSignedKey = 3,
    X509CertificateSignature = 4,
    KerberosToken = 6,
    CertificateRevocationList = 7,
    AuthorityRevocationList = 8,
    Spki = 9,
    X509CertificateAttribute = 10,
    RawRsaKey = 11,
    HashAndUrlOfX509Certificate = 12,
    HashAndUrlOfX509Bundle = 13,
}

impl TryFrom<u8> for CertificateEncoding {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(CertificateEncoding::Pkcs7WrappedX509Certificate),
            2 => Ok(CertificateEncoding::PgpCertificate),
            3 => Ok(CertificateEncoding::DnsSignedKey),
            4 => Ok(CertificateEncoding::X509CertificateSignature),
            5 => Err(UnparseableParameter::Reserved),
            6 => Ok(CertificateEncoding::KerberosToken),
            7 => Ok(CertificateEncoding::CertificateRevocationList),
            8 => Ok(CertificateEncoding::AuthorityRevocationList),
            9 => Ok(CertificateEncoding::Spki),
            10 => Ok(CertificateEncoding::X509CertificateAttribute),
            11 => Ok(CertificateEncoding::RawRsaKey),
            12 => Ok(CertificateEncoding::HashAndUrlOfX509Certificate),
            13 => Ok(CertificateEncoding::HashAndUrlOfX509Bundle),
            14..=200 => Err(UnparseableParameter::Unassigned),
            201..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Authentication Method, see RFC 7296 section 3.8
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AuthenticationMethod {
    RsaDigitalSignature = 1,
    SharedKeyMessageIntegrityCode = 2,
    DssDigitalSignature = 3,
}

impl TryFrom<u8> for AuthenticationMethod {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(AuthenticationMethod::RsaDigitalSignature),
            2 => Ok(AuthenticationMethod::SharedKeyMessageIntegrityCode),
            3 => Ok(AuthenticationMethod::DssDigitalSignature),
            4..=200 => Err(UnparseableParameter::Unassigned),
            201..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Header flag bit for the Initiator flag, see RFC 7296 section 3.1
pub const FLAG_INITIATOR: u8 = 0b0000_1000;
/// Header flag bit for the Version flag
pub const FLAG_VERSION: u8 = 0b0001_0000;
/// Header flag bit for the Response flag
pub const FLAG_RESPONSE: u8 = 0b0010_0000;

/// Top bit of a Transform Attribute Type that distinguishes the TV (fixed-length)
/// form from the TLV (variable-length) form, see RFC 7296 section 3.3.5
pub const FLAG_ATTRIBUTE_FORMAT: u16 = 0x8000;

/// Constant value for IKEv2 in the IKE header, as `<major>.<minor>` in 4 bits each
pub const IKE_2_VERSION_VALUE: u8 = 0b0010_0000;

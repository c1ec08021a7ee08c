//! Identification payload data model, see RFC 7296 section 3.5

use std::net::{Ipv4Addr, Ipv6Addr};

/// An IKE identity, tagged by the form it takes on the wire
///
/// Only the forms this client actually sends or needs to match against a
/// peer's identity are modeled; `DerAsn1Dn` and other certificate-bound
/// forms are out of scope (see crate root docs on certificate authentication).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IkeIdentification {
    /// ID_IPV4_ADDR
    Ipv4Addr(Ipv4Addr),
    /// ID_IPV6_ADDR
    Ipv6Addr(Ipv6Addr),
    /// ID_FQDN, ASCII, no trailing NUL
    Fqdn(String),
    /// ID_RFC822_ADDR, ASCII, no trailing NUL
    Rfc822Addr(String),
    /// ID_KEY_ID, an opaque octet string
    KeyId(Vec<u8>),
}

impl IkeIdentification {
    /// The raw identification data, i.e. everything after the 4 byte
    /// [crate::header::IdentificationHeader]
    pub fn body(&self) -> Vec<u8> {
        match self {
            IkeIdentification::Ipv4Addr(a) => a.octets().to_vec(),
            IkeIdentification::Ipv6Addr(a) => a.octets().to_vec(),
            IkeIdentification::Fqdn(s) => s.as_bytes().to_vec(),
            IkeIdentification::Rfc822Addr(s) => s.as_bytes().to_vec(),
            IkeIdentification::KeyId(b) => b.clone(),
        }
    }

    /// The [crate::params::IdentificationType] tag for this identity
    pub fn id_type(&self) -> crate::params::IdentificationType {
        use crate::params::IdentificationType;
        match self {
            IkeIdentification::Ipv4Addr(_) => IdentificationType::Ipv4Addr,
            IkeIdentification::Ipv6Addr(_) => IdentificationType::Ipv6Addr,
            IkeIdentification::Fqdn(_) => IdentificationType::Fqdn,
            IkeIdentification::Rfc822Addr(_) => IdentificationType::Rfc822Addr,
            IkeIdentification::KeyId(_) => IdentificationType::KeyId,
        }
    }
}

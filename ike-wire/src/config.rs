//! Configuration payload data model, see RFC 7296 section 3.15

use std::net::Ipv4Addr;

use crate::params::ConfigType;

/// A single Configuration Attribute
///
/// Only the attributes needed to request and receive an internal IPv4
/// address, netmask and DNS server are modeled; IPv6 and the remaining
/// INTERNAL_* attributes are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAttribute {
    /// Request form carries no value; reply form carries the assigned address
    InternalIp4Address(Option<Ipv4Addr>),
    /// Request form carries no value; reply form carries the netmask
    InternalIp4Netmask(Option<Ipv4Addr>),
    /// Request form carries no value; reply form carries a DNS server address
    InternalIp4Dns(Option<Ipv4Addr>),
}

impl ConfigAttribute {
    /// The [crate::params::ConfigAttributeType] tag for this attribute
    pub fn attribute_type(&self) -> crate::params::ConfigAttributeType {
        use crate::params::ConfigAttributeType;
        match self {
            ConfigAttribute::InternalIp4Address(_) => ConfigAttributeType::InternalIp4Address,
            ConfigAttribute::InternalIp4Netmask(_) => ConfigAttributeType::InternalIp4Netmask,
            ConfigAttribute::InternalIp4Dns(_) => ConfigAttributeType::InternalIp4Dns,
        }
    }

    /// Value bytes, empty when this is a request-form attribute
    pub fn value(&self) -> Vec<u8> {
        match self {
            ConfigAttribute::InternalIp4Address(v)
            | ConfigAttribute::InternalIp4Netmask(v)
            | ConfigAttribute::InternalIp4Dns(v) => {
                v.map(|a| a.octets().to_vec()).unwrap_or_default()
            }
        }
    }
}

/// A decoded Configuration payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationPayload {
    /// Whether this is a request or a reply
    pub cfg_type: ConfigType,
    /// The attributes carried
    pub attributes: Vec<ConfigAttribute>,
}

impl ConfigurationPayload {
    /// The typical CP(CFG_REQUEST) sent alongside IKE_AUTH to ask for an
    /// internal address, netmask and DNS server
    pub fn request_address() -> Self {
        Self {
            cfg_type: ConfigType::Request,
            attributes: vec![
                ConfigAttribute::InternalIp4Address(None),
                ConfigAttribute::InternalIp4Netmask(None),
                ConfigAttribute::InternalIp4Dns(None),
            ],
        }
    }
}

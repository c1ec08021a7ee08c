//! Traffic Selector data model and validation, see RFC 7296 section 3.13
//!
//! Only IPv4 address-range selectors are encoded by this client; IPv6 is
//! parsed far enough to be rejected cleanly rather than silently.

use std::net::Ipv4Addr;

use crate::ParserError;

/// A single Traffic Selector entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkeTrafficSelector {
    /// 0 = any, otherwise an IP protocol number (6 = TCP, 17 = UDP, ...)
    pub ip_protocol_id: u8,
    /// Inclusive lower bound of the port range
    pub start_port: u16,
    /// Inclusive upper bound of the port range
    pub end_port: u16,
    /// Inclusive lower bound of the address range
    pub start_address: Ipv4Addr,
    /// Inclusive upper bound of the address range
    pub end_address: Ipv4Addr,
}

impl IkeTrafficSelector {
    /// Construct a selector, validating the invariants from the data model:
    /// `start_port <= end_port` and `start_address <= end_address` byte-wise.
    pub fn new(
        ip_protocol_id: u8,
        start_port: u16,
        end_port: u16,
        start_address: Ipv4Addr,
        end_address: Ipv4Addr,
    ) -> Result<Self, ParserError> {
        if start_port > end_port {
            return Err(ParserError::InvalidSyntax("traffic selector port range reversed"));
        }
        if start_address.octets() > end_address.octets() {
            return Err(ParserError::InvalidSyntax(
                "traffic selector address range reversed",
            ));
        }
        Ok(Self {
            ip_protocol_id,
            start_port,
            end_port,
            start_address,
            end_address,
        })
    }

    /// A selector matching the full port range and a single host address,
    /// the common case for a client requesting its own tunnel traffic.
    pub fn host(address: Ipv4Addr) -> Self {
        Self {
            ip_protocol_id: 0,
            start_port: 0,
            end_port: 65535,
            start_address: address,
            end_address: address,
        }
    }

    /// A selector matching all traffic, used to request a default-route tunnel
    pub fn any() -> Self {
        Self {
            ip_protocol_id: 0,
            start_port: 0,
            end_port: 65535,
            start_address: Ipv4Addr::new(0, 0, 0, 0),
            end_address: Ipv4Addr::new(255, 255, 255, 255),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reversed_port_range() {
        assert!(IkeTrafficSelector::new(
            0,
            100,
            50,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 1),
        )
        .is_err());
    }

    #[test]
    fn rejects_reversed_address_range() {
        assert!(IkeTrafficSelector::new(
            0,
            0,
            65535,
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 0, 1),
        )
        .is_err());
    }

    #[test]
    fn accepts_well_formed_range() {
        let ts = IkeTrafficSelector::new(
            6,
            1024,
            2048,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 254),
        )
        .unwrap();
        assert_eq!(ts.ip_protocol_id, 6);
    }
}

//! Delete payload data model, see RFC 7296 section 3.11

use crate::params::SecurityProtocol;

/// A decoded Delete payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePayload {
    /// Protocol whose SAs are being deleted
    pub protocol: SecurityProtocol,
    /// Size in octets of each SPI in `spis`; 0 for an IKE SA delete
    pub spi_size: u8,
    /// SPIs of the SAs to delete. Empty for an IKE SA delete, which implicitly
    /// deletes all of its Child SAs as well.
    pub spis: Vec<Vec<u8>>,
}

impl DeletePayload {
    /// A Delete payload for the IKE SA itself, which carries no SPI list
    pub fn ike_sa() -> Self {
        Self {
            protocol: SecurityProtocol::InternetKeyExchange,
            spi_size: 0,
            spis: Vec::new(),
        }
    }

    /// A Delete payload for one or more Child SAs, identified by their
    /// 4 byte ESP/AH SPIs
    pub fn child_sas(protocol: SecurityProtocol, spis: Vec<[u8; 4]>) -> Self {
        Self {
            protocol,
            spi_size: 4,
            spis: spis.into_iter().map(|spi| spi.to_vec()).collect(),
        }
    }
}

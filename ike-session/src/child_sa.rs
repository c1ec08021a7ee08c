//! Child SA data model: created by an AUTH
//! or CREATE_CHILD_SA exchange, closed by a Delete payload.

use ike_crypto::keys::ChildSaKeyMaterial;
use ike_wire::params::SecurityProtocol;
use ike_wire::sa::Proposal;
use ike_wire::traffic_selector::IkeTrafficSelector;

/// Transport-vs-tunnel mode a Child SA protects traffic in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSaMode {
    /// Protects traffic between the two endpoints themselves
    Transport,
    /// Protects traffic the endpoints forward on behalf of other hosts
    Tunnel,
}

/// One established Child SA, from this peer's own perspective
#[derive(Debug)]
pub struct ChildSa {
    /// ESP or AH
    pub protocol: SecurityProtocol,
    /// SPI this peer chose, carried in packets the peer receives
    pub inbound_spi: [u8; 4],
    /// SPI the remote peer chose, carried in packets this peer sends
    pub outbound_spi: [u8; 4],
    /// The proposal negotiated for this Child SA
    pub proposal: Proposal,
    /// Traffic selectors narrowing what this peer will send/accept locally
    pub local_ts: Vec<IkeTrafficSelector>,
    /// Traffic selectors narrowing what the remote peer will send/accept
    pub remote_ts: Vec<IkeTrafficSelector>,
    /// Transport or tunnel mode
    pub mode: ChildSaMode,
    /// Derived keying material for both directions
    pub keys: ChildSaKeyMaterial,
}

impl ChildSa {
    /// Whether `spi` names this Child SA's inbound SPI, the form Delete
    /// payloads and rekey notifications reference it by
    pub fn matches_inbound_spi(&self, spi: &[u8]) -> bool {
        spi.len() == 4 && spi == self.inbound_spi
    }
}

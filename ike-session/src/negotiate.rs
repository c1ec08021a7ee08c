//! SA negotiation orchestration: wraps the pure predicates in
//! [`ike_wire::negotiation`] with the error mapping the state machine
//! requires (a rejected proposal is [`SessionError::NoAcceptableProposal`],
//! not a silently empty option).

use ike_wire::negotiation;
use ike_wire::sa::{Proposal, SecurityAssociation};

use crate::error::SessionError;

/// Validate the peer's single selected proposal against the `SecurityAssociation`
/// this peer offered, returning the selected [`Proposal`] on success.
pub fn negotiate<'a>(
    offered: &SecurityAssociation,
    response: &'a SecurityAssociation,
) -> Result<&'a Proposal, SessionError> {
    if !negotiation::response_is_negotiated_from(offered, response) {
        return Err(SessionError::NoAcceptableProposal);
    }
    response
        .proposals
        .first()
        .ok_or(SessionError::NoAcceptableProposal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ike_wire::params::{
        DiffieHellmanGroup, EncryptionAlgorithm, IntegrityAlgorithm, PseudorandomFunction,
        SecurityProtocol,
    };
    use ike_wire::sa::Transform;

    fn offer() -> SecurityAssociation {
        let mut p = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None);
        p.add([
            Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
            Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha2_256),
            Transform::Integrity(IntegrityAlgorithm::HmacSha2_256_128),
            Transform::KeyExchange(DiffieHellmanGroup::Modp2048),
        ]);
        SecurityAssociation { proposals: vec![p] }
    }

    #[test]
    fn accepts_a_subset_selection() {
        let offered = offer();
        let response = offered.clone();
        assert!(negotiate(&offered, &response).is_ok());
    }

    #[test]
    fn rejects_unoffered_transform() {
        let offered = offer();
        let mut selected = offered.proposals[0].clone();
        selected.encryption_algorithms = vec![(EncryptionAlgorithm::AesGcm16, None)];
        selected.integrity_algorithms = vec![];
        let response = SecurityAssociation { proposals: vec![selected] };
        assert!(matches!(
            negotiate(&offered, &response),
            Err(SessionError::NoAcceptableProposal)
        ));
    }
}

//! Pure proposal-acceptance predicates, kept free of any session state so
//! they can be unit tested without a running session.

use crate::params::SecurityProtocol;
use crate::sa::{Proposal, SecurityAssociation};

/// Whether `selected` is a valid negotiation result from `offered`
///
/// Per RFC 7296 section 3.3: the responder must pick exactly one transform
/// of each type that was offered for the same transform type, and must not
/// invent a transform that was never offered. An offered type with zero
/// entries must also be absent (cardinality zero) from the selection; an
/// offered type is otherwise selected with cardinality exactly one.
pub fn is_negotiated_from(offered: &Proposal, selected: &Proposal) -> bool {
    if offered.protocol != selected.protocol {
        return false;
    }

    fn subset_singleton<T: PartialEq + Copy>(offered: &[T], selected: &[T]) -> bool {
        match selected.len() {
            0 => offered.is_empty(),
            1 => offered.contains(&selected[0]),
            _ => false,
        }
    }

    // Encryption carries an attribute, so compare the full (algorithm, key length) pair.
    if !subset_singleton(&offered.encryption_algorithms, &selected.encryption_algorithms) {
        return false;
    }
    if !subset_singleton(
        &offered.pseudo_random_functions,
        &selected.pseudo_random_functions,
    ) {
        return false;
    }
    if !subset_singleton(&offered.integrity_algorithms, &selected.integrity_algorithms) {
        return false;
    }
    if !subset_singleton(&offered.key_exchange_methods, &selected.key_exchange_methods) {
        return false;
    }
    if !subset_singleton(&offered.sequence_numbers, &selected.sequence_numbers) {
        return false;
    }

    is_internally_consistent(selected)
}

/// Combined-mode consistency: if the selected ENCR is AEAD, INTEG must be absent;
/// for IKE, a non-AEAD ENCR requires exactly one INTEG and exactly one PRF.
pub fn is_internally_consistent(selected: &Proposal) -> bool {
    let aead = selected
        .encryption_algorithms
        .first()
        .is_some_and(|(a, _)| a.is_aead());

    let integ_ok = if aead {
        selected.integrity_algorithms.is_empty()
    } else {
        selected.integrity_algorithms.len() == 1
    };
    if !integ_ok {
        return false;
    }

    if selected.protocol == Some(SecurityProtocol::InternetKeyExchange) {
        selected.pseudo_random_functions.len() == 1
    } else {
        true
    }
}

/// Find, within `offered`, the proposal whose `proposal_num` (1-indexed position)
/// matches the responder's single selected proposal, and check it was negotiated from it.
///
/// Returns `true` only if the responder chose exactly one proposal and it is a
/// valid negotiation of the initiator's offer at that position.
pub fn response_is_negotiated_from(offered: &SecurityAssociation, response: &SecurityAssociation) -> bool {
    let [selected] = response.proposals.as_slice() else {
        return false;
    };
    let Some(offer) = offered.proposals.first() else {
        return false;
    };
    is_negotiated_from(offer, selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{
        DiffieHellmanGroup, EncryptionAlgorithm, IntegrityAlgorithm, PseudorandomFunction,
        SecurityProtocol,
    };

    fn full_offer() -> Proposal {
        let mut p = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None);
        p.add([
            crate::sa::Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
            crate::sa::Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha2_256),
            crate::sa::Transform::Integrity(IntegrityAlgorithm::HmacSha2_256_128),
            crate::sa::Transform::KeyExchange(DiffieHellmanGroup::Modp2048),
        ]);
        p
    }

    #[test]
    fn accepts_exact_single_selection() {
        let offer = full_offer();
        let selected = offer.clone();
        assert!(is_negotiated_from(&offer, &selected));
    }

    #[test]
    fn rejects_unoffered_encryption() {
        let offer = full_offer();
        let mut selected = offer.clone();
        selected.encryption_algorithms = vec![(EncryptionAlgorithm::AesGcm16, None)];
        selected.integrity_algorithms = vec![]; // AEAD implies no INTEG
        assert!(!is_negotiated_from(&offer, &selected));
    }

    #[test]
    fn rejects_aead_with_integrity() {
        let mut offer = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None);
        offer.add([
            crate::sa::Transform::Encryption(EncryptionAlgorithm::AesGcm16, None),
            crate::sa::Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha2_256),
            crate::sa::Transform::Integrity(IntegrityAlgorithm::HmacSha2_256_128),
            crate::sa::Transform::KeyExchange(DiffieHellmanGroup::Modp2048),
        ]);
        assert!(!is_internally_consistent(&offer));
    }

    #[test]
    fn rejects_multiple_selected_per_type() {
        let offer = full_offer();
        let mut selected = offer.clone();
        selected
            .pseudo_random_functions
            .push(PseudorandomFunction::HmacSha2_384);
        assert!(!is_negotiated_from(&offer, &selected));
    }
}

//! End-to-end scenario tests matching the literal examples: an `IKE_SA_INIT`
//! round trip and proposal rejection at the session layer, and the codec/EAP
//! scenarios that don't need a live session (traffic selector validity,
//! EAP-AKA identity, EAP-AKA synchronization failure, EAP-AKA' network-name
//! mismatch) against the crates `ike-session` is built on.

use std::net::Ipv4Addr;

use ike_crypto::dh::DhPrivateKey;
use ike_eap::collab::{AkaAuthType, IdentityError, IdentityStore, UiccError, UiccOracle};
use ike_eap::{AkaMethod, Collaborators, EapCode, EapMessage, EapMethod, EapType, StepOutcome};
use ike_session::collab::CredentialError;
use ike_session::config::SessionConfig;
use ike_session::error::SessionError;
use ike_session::session::IkeSession;
use ike_wire::identification::IkeIdentification;
use ike_wire::params::{
    DiffieHellmanGroup, EncryptionAlgorithm, ExchangeType, IntegrityAlgorithm, PseudorandomFunction,
    SecurityProtocol,
};
use ike_wire::sa::{Proposal, SecurityAssociation, Transform};
use ike_wire::traffic_selector::IkeTrafficSelector;
use ike_wire::{generator, parser};

struct FixedCredentials;

impl ike_session::collab::CredentialStore for FixedCredentials {
    fn local_identity(&self) -> IkeIdentification {
        IkeIdentification::Fqdn("client.example.org".to_string())
    }

    fn sign(&self, _signed_octets: &[u8]) -> Result<Vec<u8>, CredentialError> {
        Ok(vec![0u8; 32])
    }

    fn verify_peer_auth(&self, _signed_octets: &[u8], _received_auth: &[u8]) -> Result<bool, CredentialError> {
        Ok(true)
    }
}

fn literal_ike_proposal() -> Proposal {
    let mut p = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None);
    p.add([
        Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
        Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha2_256),
        Transform::Integrity(IntegrityAlgorithm::HmacSha2_256_128),
        Transform::KeyExchange(DiffieHellmanGroup::Modp2048),
    ]);
    p
}

fn child_proposal() -> Proposal {
    let mut p = Proposal::new_empty(SecurityProtocol::EncapsulatingSecurityPayload, Some(vec![1, 2, 3, 4]));
    p.add([
        Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
        Transform::Integrity(IntegrityAlgorithm::HmacSha2_256_128),
    ]);
    p
}

fn config() -> SessionConfig {
    SessionConfig::new(vec![literal_ike_proposal()], vec![child_proposal()])
}

/// Scenario 1: an `IKE_SA_INIT` request offering IKE/ENCR_AES_CBC-256/
/// PRF_HMAC_SHA2_256/INTEG_HMAC_SHA2_256_128/DH_2048 round-trips through the
/// wire codec, and a responder reply selecting exactly those four transforms
/// is accepted, driving the session on into `IKE_AUTH`.
#[test]
fn sa_init_round_trip_and_accepted_proposal_advances_to_ike_auth() {
    let credentials = FixedCredentials;
    let mut session = IkeSession::new(config(), &credentials, None, None);

    let effects = session.open().expect("open");
    let raw_request = effects
        .into_iter()
        .find_map(|effect| match effect {
            ike_session::effect::Effect::Send(bytes) => Some(bytes),
            _ => None,
        })
        .expect("open() sends a datagram");

    let decoded_request = parser::parse_message(&raw_request).expect("request decodes");
    assert_eq!(decoded_request.exchange_type, ExchangeType::IkeSaInit);
    assert!(!decoded_request.response_flag);
    assert_eq!(decoded_request.message_id, 0);

    // round-trip law: encoding the decoded structure reproduces the bytes
    let reencoded = generator::encode_message(&decoded_request).expect("re-encode");
    assert_eq!(reencoded, raw_request);

    let offered_sa = ike_wire::message::Payload::SecurityAssociation(SecurityAssociation {
        proposals: vec![literal_ike_proposal()],
    });
    assert!(decoded_request.payloads.contains(&offered_sa));

    let (group, initiator_public) = decoded_request
        .payloads
        .iter()
        .find_map(|p| match p {
            ike_wire::message::Payload::KeyExchange { group, public_value } => {
                Some((*group, public_value.clone()))
            }
            _ => None,
        })
        .expect("KE payload");
    assert_eq!(group, DiffieHellmanGroup::Modp2048);

    // Build the "gateway" side of the exchange: its own DH keypair for the
    // same group, and a response selecting exactly the one transform of
    // each required type the initiator offered.
    let mut rng = rand::rng();
    let responder_dh = DhPrivateKey::generate(DiffieHellmanGroup::Modp2048, &mut rng).expect("responder dh");
    assert!(responder_dh.shared_secret(&initiator_public).is_ok());

    let selected = literal_ike_proposal();
    assert!(ike_wire::negotiation::response_is_negotiated_from(
        &SecurityAssociation { proposals: vec![literal_ike_proposal()] },
        &SecurityAssociation { proposals: vec![selected.clone()] },
    ));

    let mut response = ike_wire::message::IkeMessage::new(
        decoded_request.initiator_spi,
        0x0A0B0C0D0E0F1011,
        ExchangeType::IkeSaInit,
        true,
        true,
        0,
    );
    response.payloads.push(ike_wire::message::Payload::SecurityAssociation(SecurityAssociation {
        proposals: vec![selected],
    }));
    response
        .payloads
        .push(ike_wire::message::Payload::KeyExchange { group, public_value: responder_dh.public_value() });
    response.payloads.push(ike_wire::message::Payload::Nonce(vec![0x42; 32]));
    let raw_response = generator::encode_message(&response).expect("encode response");

    let effects = session.handle_inbound(&raw_response).expect("accepted response");
    assert!(matches!(session.state(), ike_session::state::SessionState::IkeAuthSent { eap: None }));
    assert!(effects.iter().any(|e| matches!(e, ike_session::effect::Effect::Send(_))));
}

/// Scenario 2: a response proposing `ENCR_AES_GCM_16` while the request
/// offered only `ENCR_AES_CBC` is rejected with `NoAcceptableProposal`.
#[test]
fn proposal_rejection_when_responder_selects_unoffered_transform() {
    let credentials = FixedCredentials;
    let mut session = IkeSession::new(config(), &credentials, None, None);
    let effects = session.open().expect("open");
    let raw_request = effects
        .into_iter()
        .find_map(|effect| match effect {
            ike_session::effect::Effect::Send(bytes) => Some(bytes),
            _ => None,
        })
        .expect("open() sends a datagram");
    let decoded_request = parser::parse_message(&raw_request).expect("request decodes");
    let (group, _) = decoded_request
        .payloads
        .iter()
        .find_map(|p| match p {
            ike_wire::message::Payload::KeyExchange { group, public_value } => {
                Some((*group, public_value.clone()))
            }
            _ => None,
        })
        .expect("KE payload");

    let mut rng = rand::rng();
    let responder_dh = DhPrivateKey::generate(group, &mut rng).expect("responder dh");

    let mut bad_proposal = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None);
    bad_proposal.add([
        Transform::Encryption(EncryptionAlgorithm::AesGcm16, None),
        Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha2_256),
        Transform::KeyExchange(group),
    ]);

    let mut response = ike_wire::message::IkeMessage::new(
        decoded_request.initiator_spi,
        0x0A0B0C0D0E0F1011,
        ExchangeType::IkeSaInit,
        true,
        true,
        0,
    );
    response.payloads.push(ike_wire::message::Payload::SecurityAssociation(SecurityAssociation {
        proposals: vec![bad_proposal],
    }));
    response
        .payloads
        .push(ike_wire::message::Payload::KeyExchange { group, public_value: responder_dh.public_value() });
    response.payloads.push(ike_wire::message::Payload::Nonce(vec![0x24; 32]));
    let raw_response = generator::encode_message(&response).expect("encode response");

    let result = session.handle_inbound(&raw_response);
    assert!(matches!(result, Err(SessionError::NoAcceptableProposal)));
}

/// Scenario 3: decoding a v4 traffic selector with start=10.0.0.5,
/// end=10.0.0.1 (a reversed range) is rejected.
#[test]
fn traffic_selector_rejects_reversed_address_range() {
    let result = IkeTrafficSelector::new(0, 0, 65535, Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 1));
    assert!(result.is_err());
}

struct MockUicc {
    imsi: Option<String>,
}

impl UiccOracle for MockUicc {
    fn imsi(&self) -> Option<String> {
        self.imsi.clone()
    }

    fn authenticate(&self, _auth_type: AkaAuthType, _challenge: &[u8]) -> Result<Vec<u8>, UiccError> {
        Err(UiccError::Failed("not used in this scenario".to_string()))
    }
}

struct UnusedIdentityStore;

impl IdentityStore for UnusedIdentityStore {
    fn username(&self) -> String {
        String::new()
    }

    fn nt_password_hash(&self) -> Result<[u8; 16], IdentityError> {
        Err(IdentityError::Unavailable)
    }

    fn peer_challenge(&self) -> [u8; 16] {
        [0u8; 16]
    }
}

fn identity_request_type_data() -> Vec<u8> {
    let attrs = vec![ike_eap::attributes::Attribute::PermanentIdReq];
    let mut type_data = vec![5u8, 0, 0]; // SUBTYPE_IDENTITY, reserved
    type_data.extend_from_slice(&ike_eap::attributes::encode_attributes(&attrs));
    type_data
}

/// Scenario 4: a request with only AT_PERMANENT_ID_REQ and IMSI
/// "208930000000001" yields response AT_IDENTITY value bytes
/// "0208930000000001".
#[test]
fn eap_aka_identity_round_emits_prefixed_imsi() {
    let mut method = AkaMethod::new(AkaAuthType::Aka, None);
    let uicc = MockUicc { imsi: Some("208930000000001".to_string()) };
    let identity_store = UnusedIdentityStore;
    let collab = Collaborators { uicc: Some(&uicc), identity_store: Some(&identity_store) };

    let request = EapMessage {
        code: EapCode::Request,
        identifier: 1,
        eap_type: Some(EapType::Aka),
        type_data: identity_request_type_data(),
    };

    let outcome = method.handle_request(&request, &collab).expect("identity step succeeds");
    let StepOutcome::Reply(reply) = outcome else { panic!("expected a Reply") };
    let attrs = ike_eap::attributes::parse_attributes(&reply.type_data[3..]).expect("attrs parse");
    assert_eq!(
        attrs,
        vec![ike_eap::attributes::Attribute::Identity(b"0208930000000001".to_vec())]
    );
}

/// Scenario 5: a UICC response `DC 0E <14 bytes AUTS>` produces an
/// EAP-Response/AKA-Synchronization-Failure carrying AT_AUTS with those 14
/// bytes; the method stays in the Challenge phase (it accepts another
/// Challenge request afterward rather than erroring as `Created`/`Identity`
/// would).
#[test]
fn eap_aka_synchronization_failure_carries_auts_and_stays_in_challenge() {
    struct SyncFailureUicc {
        auts: [u8; 14],
    }
    impl UiccOracle for SyncFailureUicc {
        fn imsi(&self) -> Option<String> {
            None
        }
        fn authenticate(&self, _auth_type: AkaAuthType, _challenge: &[u8]) -> Result<Vec<u8>, UiccError> {
            let mut out = vec![0xDCu8, self.auts.len() as u8];
            out.extend_from_slice(&self.auts);
            Ok(out)
        }
    }

    let auts = [0x5Au8; 14];
    let uicc = SyncFailureUicc { auts };
    let identity_store = UnusedIdentityStore;
    let collab = Collaborators { uicc: Some(&uicc), identity_store: Some(&identity_store) };

    // Drive through Identity first so the method has a stored identity, as
    // a real peer requires before a Challenge round.
    let mut method = AkaMethod::new(AkaAuthType::Aka, None);
    let identity_request = EapMessage {
        code: EapCode::Request,
        identifier: 1,
        eap_type: Some(EapType::Aka),
        type_data: identity_request_type_data(),
    };
    method.handle_request(&identity_request, &collab).expect("identity step succeeds");

    let attrs = vec![
        ike_eap::attributes::Attribute::Rand(vec![[0x01; 16]]),
        ike_eap::attributes::Attribute::Autn([0x02; 16]),
        ike_eap::attributes::Attribute::Mac([0u8; 16]),
    ];
    let mut type_data = vec![1u8, 0, 0]; // SUBTYPE_CHALLENGE, reserved
    type_data.extend_from_slice(&ike_eap::attributes::encode_attributes(&attrs));
    let challenge_request =
        EapMessage { code: EapCode::Request, identifier: 2, eap_type: Some(EapType::Aka), type_data };

    let outcome = method.handle_request(&challenge_request, &collab).expect("challenge step succeeds");
    let StepOutcome::Reply(reply) = outcome else { panic!("expected a Reply") };
    let attrs = ike_eap::attributes::parse_attributes(&reply.type_data[3..]).expect("attrs parse");
    assert_eq!(attrs, vec![ike_eap::attributes::Attribute::Auts(auts)]);

    // still in Challenge: handle_success is rejected since no successful
    // challenge has completed yet
    assert!(method.handle_success().is_err());
}

/// Scenario 6: with peer="WLAN", server="3GPP:WLAN" and mismatch
/// disallowed, the challenge is rejected with an authentication failure
/// rather than silently accepted.
#[test]
fn aka_prime_network_name_mismatch_is_rejected() {
    let mut method = AkaMethod::new(AkaAuthType::AkaPrime, Some("WLAN".to_string()));
    let uicc = MockUicc { imsi: Some("208930000000001".to_string()) };
    let identity_store = UnusedIdentityStore;
    let collab = Collaborators { uicc: Some(&uicc), identity_store: Some(&identity_store) };

    let identity_request = EapMessage {
        code: EapCode::Request,
        identifier: 1,
        eap_type: Some(EapType::AkaPrime),
        type_data: identity_request_type_data(),
    };
    method.handle_request(&identity_request, &collab).expect("identity step succeeds");

    let attrs = vec![
        ike_eap::attributes::Attribute::Rand(vec![[0x01; 16]]),
        ike_eap::attributes::Attribute::Autn([0x02; 16]),
        ike_eap::attributes::Attribute::Mac([0u8; 16]),
        ike_eap::attributes::Attribute::Kdf(1),
        ike_eap::attributes::Attribute::KdfInput(b"3GPP:WLAN".to_vec()),
    ];
    let mut type_data = vec![1u8, 0, 0];
    type_data.extend_from_slice(&ike_eap::attributes::encode_attributes(&attrs));
    let challenge_request =
        EapMessage { code: EapCode::Request, identifier: 2, eap_type: Some(EapType::AkaPrime), type_data };

    let result = method.handle_request(&challenge_request, &collab);
    assert!(result.is_err());
}

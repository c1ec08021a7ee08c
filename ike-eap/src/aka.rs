//! EAP-AKA (RFC 4187) and EAP-AKA' (RFC 5448) method state machine:
//! `Created -> {Identity, Challenge} -> Final`, section 4.5's completion of
//! the distilled state diagram.
//!
//! AKA-Notification may arrive in any phase and is answered at most once;
//! anything else unrecognized in the current phase gets an AKA-Client-Error
//! response rather than tearing the method down, mirroring RFC 4187 section
//! 6.4.

use ike_crypto::derive_aka_keys;
use subtle::ConstantTimeEq;

use crate::attributes::{encode_attributes, Attribute};
use crate::collab::AkaAuthType;
use crate::error::EapError;
use crate::mac;
use crate::message::{EapCode, EapMessage, EapType};
use crate::network_name::network_name_matches;
use crate::state::{Collaborators, EapMethod, ExportedKeys, StepOutcome};

const SUBTYPE_CHALLENGE: u8 = 1;
const SUBTYPE_SYNCHRONIZATION_FAILURE: u8 = 4;
const SUBTYPE_IDENTITY: u8 = 5;
const SUBTYPE_NOTIFICATION: u8 = 12;
const SUBTYPE_CLIENT_ERROR: u8 = 14;

const UICC_SUCCESS_TAG: u8 = 0xDB;
const UICC_SYNC_FAILURE_TAG: u8 = 0xDC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Identity,
    Challenge,
    Final,
}

/// EAP-AKA/AKA' inner authentication, driven by a [crate::collab::UiccOracle]
pub struct AkaMethod {
    auth_type: AkaAuthType,
    /// Locally configured network name to match against AT_KDF_INPUT,
    /// AKA' only. `None` or empty accepts any network name.
    network_name: Option<String>,
    phase: Phase,
    had_notification: bool,
    had_successful_challenge: bool,
    identity: Option<Vec<u8>>,
    msk: Option<[u8; 64]>,
    emsk: Option<[u8; 64]>,
}

impl AkaMethod {
    /// Build a fresh method instance. `network_name` is only consulted for
    /// [AkaAuthType::AkaPrime].
    pub fn new(auth_type: AkaAuthType, network_name: Option<String>) -> Self {
        Self {
            auth_type,
            network_name,
            phase: Phase::Created,
            had_notification: false,
            had_successful_challenge: false,
            identity: None,
            msk: None,
            emsk: None,
        }
    }

    fn wire_type(&self) -> EapType {
        match self.auth_type {
            AkaAuthType::Aka => EapType::Aka,
            AkaAuthType::AkaPrime => EapType::AkaPrime,
            AkaAuthType::Gsm => unreachable!("AkaMethod is only ever constructed with Aka/AkaPrime"),
        }
    }

    fn step(&mut self, request: &EapMessage, collab: &Collaborators) -> Result<StepOutcome, EapError> {
        if request.code != EapCode::Request {
            return Err(EapError::UnexpectedState);
        }
        if request.eap_type != Some(self.wire_type()) {
            return Err(EapError::UnexpectedState);
        }
        if request.type_data.len() < 3 {
            return Err(EapError::MalformedMessage);
        }
        let subtype = request.type_data[0];
        let attrs = crate::attributes::parse_attributes(&request.type_data[3..])?;

        match subtype {
            SUBTYPE_NOTIFICATION => self.handle_notification(request),
            SUBTYPE_IDENTITY if self.phase == Phase::Created => self.handle_identity(request, &attrs, collab),
            SUBTYPE_CHALLENGE if matches!(self.phase, Phase::Created | Phase::Identity) => {
                self.handle_challenge(request, &attrs, collab)
            }
            _ => self.client_error(request),
        }
    }

    fn handle_identity(
        &mut self,
        request: &EapMessage,
        attrs: &[Attribute],
        collab: &Collaborators,
    ) -> Result<StepOutcome, EapError> {
        let id_request_count = attrs
            .iter()
            .filter(|a| matches!(a, Attribute::PermanentIdReq | Attribute::AnyIdReq | Attribute::FullauthIdReq))
            .count();
        if id_request_count != 1 {
            return Err(EapError::InvalidSyntax(
                "AKA-Identity must carry exactly one of AT_PERMANENT_ID_REQ/AT_ANY_ID_REQ/AT_FULLAUTH_ID_REQ",
            ));
        }
        if attrs
            .iter()
            .any(|a| matches!(a, Attribute::Mac(_) | Attribute::Iv(_) | Attribute::EncrData(_)))
        {
            return Err(EapError::InvalidSyntax(
                "AKA-Identity must not carry AT_MAC/AT_IV/AT_ENCR_DATA",
            ));
        }

        let uicc = collab.uicc.ok_or(EapError::Internal("AKA method requires a UiccOracle"))?;
        let imsi = uicc.imsi().ok_or(EapError::IdentityUnavailable)?;
        let prefix = match self.auth_type {
            AkaAuthType::Aka => '0',
            AkaAuthType::AkaPrime => '6',
            AkaAuthType::Gsm => unreachable!("AkaMethod is only ever constructed with Aka/AkaPrime"),
        };
        let identity = format!("{prefix}{imsi}").into_bytes();
        self.identity = Some(identity.clone());
        self.phase = Phase::Identity;

        let type_data = build_type_data(SUBTYPE_IDENTITY, &[Attribute::Identity(identity)]);
        Ok(StepOutcome::Reply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(self.wire_type()),
            type_data,
        }))
    }

    fn handle_challenge(
        &mut self,
        request: &EapMessage,
        attrs: &[Attribute],
        collab: &Collaborators,
    ) -> Result<StepOutcome, EapError> {
        let rand = attrs
            .iter()
            .find_map(|a| if let Attribute::Rand(r) = a { Some(r) } else { None })
            .ok_or(EapError::InvalidSyntax("AKA-Challenge missing AT_RAND"))?;
        if rand.len() != 1 {
            return Err(EapError::InvalidSyntax("AKA-Challenge must carry exactly one RAND"));
        }
        let autn = attrs
            .iter()
            .find_map(|a| if let Attribute::Autn(v) = a { Some(*v) } else { None })
            .ok_or(EapError::InvalidSyntax("AKA-Challenge missing AT_AUTN"))?;
        let peer_mac = attrs
            .iter()
            .find_map(|a| if let Attribute::Mac(v) = a { Some(*v) } else { None })
            .ok_or(EapError::InvalidSyntax("AKA-Challenge missing AT_MAC"))?;

        if self.auth_type == AkaAuthType::AkaPrime {
            let kdf = attrs
                .iter()
                .find_map(|a| if let Attribute::Kdf(v) = a { Some(*v) } else { None })
                .ok_or(EapError::InvalidSyntax("AKA'-Challenge missing AT_KDF"))?;
            if kdf != 1 {
                return Err(EapError::InvalidSyntax("unsupported AT_KDF value, only 1 is defined"));
            }
            let kdf_input = attrs
                .iter()
                .find_map(|a| if let Attribute::KdfInput(v) = a { Some(v.clone()) } else { None })
                .ok_or(EapError::InvalidSyntax("AKA'-Challenge missing AT_KDF_INPUT"))?;
            let network_name = String::from_utf8(kdf_input)
                .map_err(|_| EapError::InvalidSyntax("AT_KDF_INPUT is not valid UTF-8"))?;
            let local = self.network_name.as_deref().unwrap_or("");
            if !network_name_matches(local, &network_name) {
                return Err(EapError::AuthenticationFailed);
            }
        }

        let identity = self.identity.clone().ok_or(EapError::UnexpectedState)?;
        let uicc = collab.uicc.ok_or(EapError::Internal("AKA method requires a UiccOracle"))?;

        let mut challenge = Vec::with_capacity(2 + 16 + 2 + 16);
        challenge.push(16u8);
        challenge.extend_from_slice(&rand[0]);
        challenge.push(16u8);
        challenge.extend_from_slice(&autn);

        let uicc_response = uicc
            .authenticate(self.auth_type, &challenge)
            .map_err(|e| EapError::Collaborator(e.to_string()))?;

        match uicc_response.first() {
            Some(&UICC_SUCCESS_TAG) => {
                let (res, ik, ck) = parse_success_body(&uicc_response[1..])?;
                let keys = derive_aka_keys(&identity, &ik, &ck)?;

                let mut zeroed = request.clone();
                mac::zero_mac_attribute(&mut zeroed.type_data)?;
                let expected = mac::compute_mac(&keys.k_aut, &zeroed.encode())?;
                if expected[..].ct_eq(&peer_mac[..]).unwrap_u8() == 0 {
                    return Err(EapError::AuthenticationFailed);
                }

                self.msk = Some(keys.msk);
                self.emsk = Some(keys.emsk);
                self.had_successful_challenge = true;
                self.phase = Phase::Challenge;

                let type_data = build_type_data(SUBTYPE_CHALLENGE, &[Attribute::Res(res), Attribute::Mac([0u8; 16])]);
                let mut reply = EapMessage {
                    code: EapCode::Response,
                    identifier: request.identifier,
                    eap_type: Some(self.wire_type()),
                    type_data,
                };
                mac::sign_message(&mut reply, &keys.k_aut)?;
                Ok(StepOutcome::Reply(reply))
            }
            Some(&UICC_SYNC_FAILURE_TAG) => {
                let auts = parse_sync_failure_body(&uicc_response[1..])?;
                self.phase = Phase::Challenge;
                let type_data = build_type_data(SUBTYPE_SYNCHRONIZATION_FAILURE, &[Attribute::Auts(auts)]);
                Ok(StepOutcome::Reply(EapMessage {
                    code: EapCode::Response,
                    identifier: request.identifier,
                    eap_type: Some(self.wire_type()),
                    type_data,
                }))
            }
            _ => Err(EapError::Collaborator("unrecognized UICC response tag".to_string())),
        }
    }

    fn handle_notification(&mut self, request: &EapMessage) -> Result<StepOutcome, EapError> {
        if self.had_notification {
            return Err(EapError::UnexpectedState);
        }
        self.had_notification = true;
        let type_data = build_type_data(SUBTYPE_NOTIFICATION, &[]);
        Ok(StepOutcome::Reply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(self.wire_type()),
            type_data,
        }))
    }

    fn client_error(&mut self, request: &EapMessage) -> Result<StepOutcome, EapError> {
        let type_data = build_type_data(SUBTYPE_CLIENT_ERROR, &[Attribute::ClientErrorCode(0)]);
        Ok(StepOutcome::Reply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(self.wire_type()),
            type_data,
        }))
    }
}

impl EapMethod for AkaMethod {
    fn eap_type(&self) -> EapType {
        self.wire_type()
    }

    fn handle_request(&mut self, request: &EapMessage, collab: &Collaborators) -> Result<StepOutcome, EapError> {
        self.step(request, collab)
    }

    fn handle_success(&mut self) -> Result<Option<ExportedKeys>, EapError> {
        if !self.had_successful_challenge {
            return Err(EapError::UnexpectedState);
        }
        let msk = self.msk.ok_or(EapError::UnexpectedState)?;
        let emsk = self.emsk.ok_or(EapError::UnexpectedState)?;
        self.phase = Phase::Final;
        Ok(Some(ExportedKeys { msk, emsk }))
    }
}

fn build_type_data(subtype: u8, attrs: &[Attribute]) -> Vec<u8> {
    let mut out = vec![subtype, 0, 0];
    out.extend_from_slice(&encode_attributes(attrs));
    out
}

fn malformed_uicc_response() -> EapError {
    EapError::Collaborator("malformed UICC authenticate() response".to_string())
}

fn parse_success_body(body: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), EapError> {
    let mut cursor = 0usize;
    let res_len = *body.get(cursor).ok_or_else(malformed_uicc_response)? as usize;
    cursor += 1;
    let res = body.get(cursor..cursor + res_len).ok_or_else(malformed_uicc_response)?.to_vec();
    cursor += res_len;

    let ik_len = *body.get(cursor).ok_or_else(malformed_uicc_response)? as usize;
    cursor += 1;
    let ik = body.get(cursor..cursor + ik_len).ok_or_else(malformed_uicc_response)?.to_vec();
    cursor += ik_len;

    let ck_len = *body.get(cursor).ok_or_else(malformed_uicc_response)? as usize;
    cursor += 1;
    let ck = body.get(cursor..cursor + ck_len).ok_or_else(malformed_uicc_response)?.to_vec();

    Ok((res, ik, ck))
}

fn parse_sync_failure_body(body: &[u8]) -> Result<[u8; 14], EapError> {
    let auts_len = *body.first().ok_or_else(malformed_uicc_response)? as usize;
    let auts = body.get(1..1 + auts_len).ok_or_else(malformed_uicc_response)?;
    if auts.len() != 14 {
        return Err(EapError::Collaborator("AUTS must be 14 bytes".to_string()));
    }
    let mut fixed = [0u8; 14];
    fixed.copy_from_slice(auts);
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{UiccError, UiccOracle};

    struct MockUicc {
        imsi: Option<String>,
        response: Vec<u8>,
    }

    impl UiccOracle for MockUicc {
        fn imsi(&self) -> Option<String> {
            self.imsi.clone()
        }

        fn authenticate(&self, _auth_type: AkaAuthType, _challenge: &[u8]) -> Result<Vec<u8>, UiccError> {
            Ok(self.response.clone())
        }
    }

    fn identity_request(identifier: u8, wire_type: EapType) -> EapMessage {
        let type_data = build_type_data(SUBTYPE_IDENTITY, &[Attribute::AnyIdReq]);
        EapMessage { code: EapCode::Request, identifier, eap_type: Some(wire_type), type_data }
    }

    #[test]
    fn identity_phase_emits_prefixed_imsi() {
        let mut method = AkaMethod::new(AkaAuthType::Aka, None);
        let uicc = MockUicc { imsi: Some("001010000000001".to_string()), response: Vec::new() };
        let collab = Collaborators { uicc: Some(&uicc), identity_store: None };

        let outcome = method.step(&identity_request(1, EapType::Aka), &collab).unwrap();
        let StepOutcome::Reply(reply) = outcome else { panic!("expected Reply") };
        let attrs = crate::attributes::parse_attributes(&reply.type_data[3..]).unwrap();
        assert_eq!(attrs, vec![Attribute::Identity(b"0001010000000001".to_vec())]);
    }

    #[test]
    fn identity_phase_rejects_missing_id_request() {
        let mut method = AkaMethod::new(AkaAuthType::Aka, None);
        let uicc = MockUicc { imsi: Some("001010000000001".to_string()), response: Vec::new() };
        let collab = Collaborators { uicc: Some(&uicc), identity_store: None };
        let type_data = build_type_data(SUBTYPE_IDENTITY, &[]);
        let request = EapMessage { code: EapCode::Request, identifier: 1, eap_type: Some(EapType::Aka), type_data };
        assert!(method.step(&request, &collab).is_err());
    }

    #[test]
    fn challenge_success_yields_msk_after_eap_success() {
        let mut method = AkaMethod::new(AkaAuthType::Aka, None);
        method.identity = Some(b"0001010000000001".to_vec());
        method.phase = Phase::Identity;

        let mut response_body = vec![4u8];
        response_body.extend_from_slice(&[0xAA; 4]); // RES
        response_body.push(16);
        response_body.extend_from_slice(&[0x11; 16]); // IK
        response_body.push(16);
        response_body.extend_from_slice(&[0x22; 16]); // CK
        let mut uicc_response = vec![UICC_SUCCESS_TAG];
        uicc_response.extend_from_slice(&response_body);
        let uicc = MockUicc { imsi: None, response: uicc_response };
        let collab = Collaborators { uicc: Some(&uicc), identity_store: None };

        let type_data = build_type_data(
            SUBTYPE_CHALLENGE,
            &[Attribute::Rand(vec![[0x01; 16]]), Attribute::Autn([0x02; 16]), Attribute::Mac([0u8; 16])],
        );
        let mut request = EapMessage { code: EapCode::Request, identifier: 2, eap_type: Some(EapType::Aka), type_data };
        // sign with the same keys the server would derive, so AT_MAC verification passes
        let identity = method.identity.clone().unwrap();
        let keys = derive_aka_keys(&identity, &[0x11; 16], &[0x22; 16]).unwrap();
        mac::sign_message(&mut request, &keys.k_aut).unwrap();

        let outcome = method.step(&request, &collab).unwrap();
        assert!(matches!(outcome, StepOutcome::Reply(_)));
        assert!(method.had_successful_challenge);

        let exported = method.handle_success().unwrap().unwrap();
        assert_eq!(exported.msk, keys.msk);
    }

    #[test]
    fn success_before_challenge_is_rejected() {
        let mut method = AkaMethod::new(AkaAuthType::Aka, None);
        assert!(method.handle_success().is_err());
    }

    #[test]
    fn aka_prime_rejects_network_name_mismatch() {
        let mut method = AkaMethod::new(AkaAuthType::AkaPrime, Some("wlan.mnc001.mcc001.3gppnetwork.org".to_string()));
        method.identity = Some(b"6001010000000001".to_vec());
        method.phase = Phase::Identity;
        let uicc = MockUicc { imsi: None, response: Vec::new() };
        let collab = Collaborators { uicc: Some(&uicc), identity_store: None };

        let type_data = build_type_data(
            SUBTYPE_CHALLENGE,
            &[
                Attribute::Rand(vec![[0x01; 16]]),
                Attribute::Autn([0x02; 16]),
                Attribute::Kdf(1),
                Attribute::KdfInput(b"some.other.network".to_vec()),
                Attribute::Mac([0u8; 16]),
            ],
        );
        let request = EapMessage { code: EapCode::Request, identifier: 3, eap_type: Some(EapType::AkaPrime), type_data };
        assert!(matches!(method.step(&request, &collab), Err(EapError::AuthenticationFailed)));
    }
}

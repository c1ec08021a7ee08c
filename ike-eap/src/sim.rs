//! EAP-SIM (RFC 4186) method state machine: `Created -> Start -> Challenge ->
//! Final`. Kept as a sibling of [crate::aka] rather than folded into it:
//! EAP-SIM runs 2-3 independent GSM triplets instead of one USIM
//! authentication vector, and builds its master key from a different input
//! (RFC 4186 section 7), but shares the attribute TLV codec, AT_MAC
//! machinery and FIPS 186-2 key-derivation ladder.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::attributes::{encode_attributes, Attribute};
use crate::collab::{AkaAuthType, UiccOracle};
use crate::error::EapError;
use crate::mac;
use crate::message::{EapCode, EapMessage, EapType};
use crate::state::{Collaborators, EapMethod, ExportedKeys, StepOutcome};

const SUBTYPE_START: u8 = 10;
const SUBTYPE_CHALLENGE: u8 = 11;
const SUBTYPE_NOTIFICATION: u8 = 12;
const SUBTYPE_CLIENT_ERROR: u8 = 14;

const VERSION_1: u16 = 1;
const UICC_SUCCESS_TAG: u8 = 0xDB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Start,
    Challenge,
    Final,
}

/// EAP-SIM inner authentication, driven by a [UiccOracle] run in GSM
/// triplet mode
pub struct SimMethod {
    phase: Phase,
    had_notification: bool,
    had_successful_challenge: bool,
    identity: Option<Vec<u8>>,
    nonce_mt: Option<[u8; 16]>,
    msk: Option<[u8; 64]>,
    emsk: Option<[u8; 64]>,
}

impl Default for SimMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl SimMethod {
    /// Build a fresh method instance
    pub fn new() -> Self {
        Self {
            phase: Phase::Created,
            had_notification: false,
            had_successful_challenge: false,
            identity: None,
            nonce_mt: None,
            msk: None,
            emsk: None,
        }
    }

    fn step(&mut self, request: &EapMessage, collab: &Collaborators) -> Result<StepOutcome, EapError> {
        if request.code != EapCode::Request || request.eap_type != Some(EapType::Sim) {
            return Err(EapError::UnexpectedState);
        }
        if request.type_data.len() < 3 {
            return Err(EapError::MalformedMessage);
        }
        let subtype = request.type_data[0];
        let attrs = crate::attributes::parse_attributes(&request.type_data[3..])?;

        match subtype {
            SUBTYPE_NOTIFICATION => self.handle_notification(request),
            SUBTYPE_START if self.phase == Phase::Created => self.handle_start(request, &attrs, collab),
            SUBTYPE_CHALLENGE if self.phase == Phase::Start => self.handle_challenge(request, &attrs, collab),
            _ => self.client_error(request),
        }
    }

    fn handle_start(
        &mut self,
        request: &EapMessage,
        attrs: &[Attribute],
        collab: &Collaborators,
    ) -> Result<StepOutcome, EapError> {
        let version_list = attrs
            .iter()
            .find_map(|a| if let Attribute::VersionList(v) = a { Some(v.clone()) } else { None })
            .ok_or(EapError::InvalidSyntax("SIM-Start missing AT_VERSION_LIST"))?;
        if !version_list.contains(&VERSION_1) {
            return Err(EapError::InvalidSyntax("no supported version in AT_VERSION_LIST"));
        }

        let uicc = collab.uicc.ok_or(EapError::Internal("SIM method requires a UiccOracle"))?;
        let imsi = uicc.imsi().ok_or(EapError::IdentityUnavailable)?;
        let identity = format!("1{imsi}").into_bytes();
        self.identity = Some(identity.clone());

        let mut nonce = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::rng(), &mut nonce);
        self.nonce_mt = Some(nonce);
        self.phase = Phase::Start;

        let type_data = build_type_data(
            SUBTYPE_START,
            &[
                Attribute::Identity(identity),
                Attribute::NonceMt(nonce),
                Attribute::SelectedVersion(VERSION_1),
            ],
        );
        Ok(StepOutcome::Reply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(EapType::Sim),
            type_data,
        }))
    }

    fn handle_challenge(
        &mut self,
        request: &EapMessage,
        attrs: &[Attribute],
        collab: &Collaborators,
    ) -> Result<StepOutcome, EapError> {
        let rands = attrs
            .iter()
            .find_map(|a| if let Attribute::Rand(r) = a { Some(r.clone()) } else { None })
            .ok_or(EapError::InvalidSyntax("SIM-Challenge missing AT_RAND"))?;
        if !(2..=3).contains(&rands.len()) {
            return Err(EapError::InvalidSyntax("SIM-Challenge must carry 2 or 3 RANDs"));
        }
        let peer_mac = attrs
            .iter()
            .find_map(|a| if let Attribute::Mac(v) = a { Some(*v) } else { None })
            .ok_or(EapError::InvalidSyntax("SIM-Challenge missing AT_MAC"))?;

        let identity = self.identity.clone().ok_or(EapError::UnexpectedState)?;
        let nonce_mt = self.nonce_mt.ok_or(EapError::UnexpectedState)?;
        let uicc = collab.uicc.ok_or(EapError::Internal("SIM method requires a UiccOracle"))?;

        let mut kcs: Vec<[u8; 8]> = Vec::with_capacity(rands.len());
        for rand in &rands {
            let response = uicc
                .authenticate(AkaAuthType::Gsm, rand)
                .map_err(|e| EapError::Collaborator(e.to_string()))?;
            let (_sres, kc) = parse_gsm_triplet(&response)?;
            kcs.push(kc);
        }

        let mk = compute_master_key(&identity, &kcs, &nonce_mt, VERSION_1, VERSION_1);
        let keymat = ike_crypto::eap_prf::fips186_2_prf(&mk, 16 + 16 + 64 + 64);
        let mut k_aut = [0u8; 16];
        let mut msk = [0u8; 64];
        let mut emsk = [0u8; 64];
        k_aut.copy_from_slice(&keymat[16..32]);
        msk.copy_from_slice(&keymat[32..96]);
        emsk.copy_from_slice(&keymat[96..160]);

        let mut zeroed = request.clone();
        mac::zero_mac_attribute(&mut zeroed.type_data)?;
        let expected = mac::compute_mac(&k_aut, &zeroed.encode())?;
        if expected[..].ct_eq(&peer_mac[..]).unwrap_u8() == 0 {
            return Err(EapError::AuthenticationFailed);
        }

        self.msk = Some(msk);
        self.emsk = Some(emsk);
        self.had_successful_challenge = true;
        self.phase = Phase::Challenge;

        let type_data = build_type_data(SUBTYPE_CHALLENGE, &[Attribute::Mac([0u8; 16])]);
        let mut reply = EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(EapType::Sim),
            type_data,
        };
        mac::sign_message(&mut reply, &k_aut)?;
        Ok(StepOutcome::Reply(reply))
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
            eap_type: Some(EapType::Sim),
            type_data,
        }))
    }

    fn client_error(&mut self, request: &EapMessage) -> Result<StepOutcome, EapError> {
        let type_data = build_type_data(SUBTYPE_CLIENT_ERROR, &[Attribute::ClientErrorCode(0)]);
        Ok(StepOutcome::Reply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(EapType::Sim),
            type_data,
        }))
    }
}

impl EapMethod for SimMethod {
    fn eap_type(&self) -> EapType {
        EapType::Sim
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

/// `MK = SHA1(Identity | Kc_1 | ... | Kc_n | NONCE_MT | Version List |
/// Selected Version)`, RFC 4186 section 7
fn compute_master_key(identity: &[u8], kcs: &[[u8; 8]], nonce_mt: &[u8; 16], version_list: u16, selected_version: u16) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(identity);
    for kc in kcs {
        hasher.update(kc);
    }
    hasher.update(nonce_mt);
    hasher.update(version_list.to_be_bytes());
    hasher.update(selected_version.to_be_bytes());
    hasher.finalize().into()
}

fn build_type_data(subtype: u8, attrs: &[Attribute]) -> Vec<u8> {
    let mut out = vec![subtype, 0, 0];
    out.extend_from_slice(&encode_attributes(attrs));
    out
}

fn parse_gsm_triplet(response: &[u8]) -> Result<([u8; 4], [u8; 8]), EapError> {
    let malformed = || EapError::Collaborator("malformed GSM triplet response".to_string());
    if response.first() != Some(&UICC_SUCCESS_TAG) {
        return Err(malformed());
    }
    let body = &response[1..];
    let sres_len = *body.first().ok_or_else(malformed)? as usize;
    let sres_bytes = body.get(1..1 + sres_len).ok_or_else(malformed)?;
    if sres_bytes.len() != 4 {
        return Err(malformed());
    }
    let kc_len = *body.get(1 + sres_len).ok_or_else(malformed)? as usize;
    let kc_bytes = body.get(2 + sres_len..2 + sres_len + kc_len).ok_or_else(malformed)?;
    if kc_bytes.len() != 8 {
        return Err(malformed());
    }
    let mut sres = [0u8; 4];
    sres.copy_from_slice(sres_bytes);
    let mut kc = [0u8; 8];
    kc.copy_from_slice(kc_bytes);
    Ok((sres, kc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::UiccError;

    struct MockUicc {
        imsi: Option<String>,
    }

    impl UiccOracle for MockUicc {
        fn imsi(&self) -> Option<String> {
            self.imsi.clone()
        }

        fn authenticate(&self, _auth_type: AkaAuthType, rand: &[u8]) -> Result<Vec<u8>, UiccError> {
            let mut response = vec![UICC_SUCCESS_TAG, 4];
            response.extend_from_slice(&rand[..4]);
            response.push(8);
            response.extend_from_slice(&[0x5Au8; 8]);
            Ok(response)
        }
    }

    #[test]
    fn start_phase_derives_identity_with_sim_prefix() {
        let mut method = SimMethod::new();
        let uicc = MockUicc { imsi: Some("001010000000002".to_string()) };
        let collab = Collaborators { uicc: Some(&uicc), identity_store: None };
        let type_data = build_type_data(SUBTYPE_START, &[Attribute::VersionList(vec![VERSION_1])]);
        let request = EapMessage { code: EapCode::Request, identifier: 1, eap_type: Some(EapType::Sim), type_data };

        let outcome = method.step(&request, &collab).unwrap();
        let StepOutcome::Reply(reply) = outcome else { panic!("expected Reply") };
        let attrs = crate::attributes::parse_attributes(&reply.type_data[3..]).unwrap();
        assert!(attrs.contains(&Attribute::Identity(b"1001010000000002".to_vec())));
        assert_eq!(method.phase, Phase::Start);
    }

    #[test]
    fn challenge_requires_two_or_three_rands() {
        let mut method = SimMethod::new();
        method.phase = Phase::Start;
        method.identity = Some(b"1001010000000002".to_vec());
        method.nonce_mt = Some([0x01u8; 16]);
        let uicc = MockUicc { imsi: None };
        let collab = Collaborators { uicc: Some(&uicc), identity_store: None };

        let type_data = build_type_data(SUBTYPE_CHALLENGE, &[Attribute::Rand(vec![[0x02; 16]]), Attribute::Mac([0u8; 16])]);
        let request = EapMessage { code: EapCode::Request, identifier: 2, eap_type: Some(EapType::Sim), type_data };
        assert!(method.step(&request, &collab).is_err());
    }
}

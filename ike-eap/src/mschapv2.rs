//! EAP-MSCHAPv2 (RFC 2759, carried over EAP per RFC 2548) method state
//! machine: `Created -> ResponseSent -> Final`.
//!
//! A `Created -> ChallengeSent -> ResponseSent -> Final` shape would name
//! four phases, but the synchronous request/response handler emits the
//! Response in the same step it consumes the Challenge — there is no
//! externally observable state between "Challenge received" and "Response
//! sent", so this implementation collapses them into one `ResponseSent`
//! phase.
//!
//! MS-CHAPv2 alone yields no keying material usable as an IKE AUTH shared
//! secret (RFC 2759 defines none); [MsChapV2Method::handle_success] always
//! returns `Ok(None)`. `ike-session` rejects this method at construction
//! time when the configured policy requires MSK-bearing inner auth.

use sha1::{Digest, Sha1};

use crate::collab::IdentityStore;
use crate::error::EapError;
use crate::message::{EapCode, EapMessage, EapType};
use crate::state::{Collaborators, EapMethod, ExportedKeys, StepOutcome};

const OPCODE_CHALLENGE: u8 = 1;
const OPCODE_RESPONSE: u8 = 2;
const OPCODE_SUCCESS: u8 = 3;
const OPCODE_FAILURE: u8 = 4;

const MAGIC1: &[u8] = b"Magic server to client signing constant";
const MAGIC2: &[u8] = b"Pad to make it do more than one iteration";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    ResponseSent,
    Final,
}

/// EAP-MSCHAPv2 inner authentication, driven by an [IdentityStore]
pub struct MsChapV2Method {
    phase: Phase,
    ms_chap_id: u8,
    peer_challenge: Option<[u8; 16]>,
    authenticator_challenge: Option<[u8; 16]>,
    nt_response: Option<[u8; 24]>,
    expected_authenticator_response: Option<String>,
}

impl Default for MsChapV2Method {
    fn default() -> Self {
        Self::new()
    }
}

impl MsChapV2Method {
    /// Build a fresh method instance
    pub fn new() -> Self {
        Self {
            phase: Phase::Created,
            ms_chap_id: 0,
            peer_challenge: None,
            authenticator_challenge: None,
            nt_response: None,
            expected_authenticator_response: None,
        }
    }

    fn step(&mut self, request: &EapMessage, collab: &Collaborators) -> Result<StepOutcome, EapError> {
        if request.code != EapCode::Request || request.eap_type != Some(EapType::MsChapV2) {
            return Err(EapError::UnexpectedState);
        }
        if request.type_data.len() < 4 {
            return Err(EapError::MalformedMessage);
        }
        let opcode = request.type_data[0];

        match (self.phase, opcode) {
            (Phase::Created, OPCODE_CHALLENGE) => self.handle_challenge(request, collab),
            (Phase::ResponseSent, OPCODE_SUCCESS) => self.handle_success_request(request),
            (Phase::ResponseSent, OPCODE_FAILURE) => Err(EapError::AuthenticationFailed),
            _ => Err(EapError::UnexpectedState),
        }
    }

    fn handle_challenge(&mut self, request: &EapMessage, collab: &Collaborators) -> Result<StepOutcome, EapError> {
        let data = &request.type_data;
        self.ms_chap_id = data[1];
        if data.len() < 5 || data[4] as usize != 16 {
            return Err(EapError::InvalidSyntax("MSCHAPv2 Challenge has unexpected Value-Size"));
        }
        let challenge_bytes = data.get(5..21).ok_or(EapError::MalformedMessage)?;
        let mut authenticator_challenge = [0u8; 16];
        authenticator_challenge.copy_from_slice(challenge_bytes);
        self.authenticator_challenge = Some(authenticator_challenge);

        let identity_store = collab
            .identity_store
            .ok_or(EapError::Internal("MSCHAPv2 method requires an IdentityStore"))?;
        let username = identity_store.username();
        let peer_challenge = identity_store.peer_challenge();
        let nt_password_hash = identity_store
            .nt_password_hash()
            .map_err(|e| EapError::Collaborator(e.to_string()))?;

        let challenge = challenge_hash(&peer_challenge, &authenticator_challenge, username.as_bytes());
        let nt_response = challenge_response(&challenge, &nt_password_hash);
        let password_hash_hash = md4_digest(&nt_password_hash);
        self.expected_authenticator_response = Some(authenticator_response(
            &password_hash_hash,
            &nt_response,
            &peer_challenge,
            &authenticator_challenge,
            username.as_bytes(),
        ));

        self.peer_challenge = Some(peer_challenge);
        self.nt_response = Some(nt_response);
        self.phase = Phase::ResponseSent;

        let mut value = Vec::with_capacity(49);
        value.extend_from_slice(&peer_challenge);
        value.extend_from_slice(&[0u8; 8]); // Reserved
        value.extend_from_slice(&nt_response);
        value.push(0u8); // Flags

        let mut body = vec![49u8];
        body.extend_from_slice(&value);
        body.extend_from_slice(username.as_bytes());
        let type_data = build_packet(OPCODE_RESPONSE, self.ms_chap_id, &body);

        Ok(StepOutcome::Reply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(EapType::MsChapV2),
            type_data,
        }))
    }

    fn handle_success_request(&mut self, request: &EapMessage) -> Result<StepOutcome, EapError> {
        let message = &request.type_data[4..];
        let message_str = std::str::from_utf8(message).map_err(|_| EapError::InvalidSyntax("MSCHAPv2 Success message is not UTF-8"))?;
        let server_response = extract_authenticator_response(message_str)
            .ok_or(EapError::InvalidSyntax("MSCHAPv2 Success message missing S= field"))?;

        let expected = self
            .expected_authenticator_response
            .as_deref()
            .ok_or(EapError::UnexpectedState)?;
        if !server_response.eq_ignore_ascii_case(expected) {
            return Err(EapError::AuthenticationFailed);
        }

        self.phase = Phase::Final;
        let type_data = build_packet(OPCODE_SUCCESS, self.ms_chap_id, &[]);
        Ok(StepOutcome::FinalReply(EapMessage {
            code: EapCode::Response,
            identifier: request.identifier,
            eap_type: Some(EapType::MsChapV2),
            type_data,
        }))
    }
}

impl EapMethod for MsChapV2Method {
    fn eap_type(&self) -> EapType {
        EapType::MsChapV2
    }

    fn handle_request(&mut self, request: &EapMessage, collab: &Collaborators) -> Result<StepOutcome, EapError> {
        self.step(request, collab)
    }

    fn handle_success(&mut self) -> Result<Option<ExportedKeys>, EapError> {
        if self.phase != Phase::Final {
            return Err(EapError::UnexpectedState);
        }
        Ok(None)
    }
}

fn build_packet(opcode: u8, ms_chap_id: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![opcode, ms_chap_id, 0, 0];
    out.extend_from_slice(body);
    let len = out.len() as u16;
    out[2..4].copy_from_slice(&len.to_be_bytes());
    out
}

fn extract_authenticator_response(message: &str) -> Option<String> {
    let marker = "S=";
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest.find(' ').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// `Challenge = SHA1(PeerChallenge | AuthenticatorChallenge | UserName)[0..8]`, RFC 2759 section 8.2
fn challenge_hash(peer_challenge: &[u8; 16], authenticator_challenge: &[u8; 16], username: &[u8]) -> [u8; 8] {
    let mut hasher = Sha1::new();
    hasher.update(peer_challenge);
    hasher.update(authenticator_challenge);
    hasher.update(username);
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// `NTResponse = DesEncrypt(ZPasswordHash, Challenge)` in three 7-byte key
/// segments, RFC 2759 section 8.3/8.5
fn challenge_response(challenge: &[u8; 8], password_hash: &[u8; 16]) -> [u8; 24] {
    let mut padded = [0u8; 21];
    padded[..16].copy_from_slice(password_hash);

    let mut response = [0u8; 24];
    for (i, chunk) in padded.chunks(7).enumerate() {
        let mut key56 = [0u8; 7];
        key56.copy_from_slice(chunk);
        let des_key = expand_des_key(&key56);
        let block = des_ecb_encrypt(&des_key, challenge);
        response[i * 8..i * 8 + 8].copy_from_slice(&block);
    }
    response
}

/// Expand a 56-bit (7-byte) key into the 8-byte form DES expects, RFC 2759 section 8.4
fn expand_des_key(key56: &[u8; 7]) -> [u8; 8] {
    [
        key56[0],
        (key56[0] << 7) | (key56[1] >> 1),
        (key56[1] << 6) | (key56[2] >> 2),
        (key56[2] << 5) | (key56[3] >> 3),
        (key56[3] << 4) | (key56[4] >> 4),
        (key56[4] << 3) | (key56[5] >> 5),
        (key56[5] << 2) | (key56[6] >> 6),
        key56[6] << 1,
    ]
}

fn des_ecb_encrypt(key: &[u8; 8], block: &[u8; 8]) -> [u8; 8] {
    use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
    let cipher = des::Des::new(GenericArray::from_slice(key));
    let mut buf = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut buf);
    let mut out = [0u8; 8];
    out.copy_from_slice(&buf);
    out
}

fn md4_digest(input: &[u8]) -> [u8; 16] {
    use md4::Digest as Md4Digest;
    let mut hasher = md4::Md4::new();
    hasher.update(input);
    let out = hasher.finalize();
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&out);
    digest
}

/// `AuthenticatorResponse = "S=" + Hex(SHA1(SHA1(PasswordHashHash | NTResponse | Magic1) | Challenge | Magic2))`,
/// RFC 2759 section 8.7
fn authenticator_response(
    password_hash_hash: &[u8; 16],
    nt_response: &[u8; 24],
    peer_challenge: &[u8; 16],
    authenticator_challenge: &[u8; 16],
    username: &[u8],
) -> String {
    let mut first = Sha1::new();
    first.update(password_hash_hash);
    first.update(nt_response);
    first.update(MAGIC1);
    let digest = first.finalize();

    let challenge = challenge_hash(peer_challenge, authenticator_challenge, username);

    let mut second = Sha1::new();
    second.update(digest);
    second.update(challenge);
    second.update(MAGIC2);
    let final_digest = second.finalize();

    let mut hex = String::with_capacity(40);
    for byte in final_digest.iter() {
        hex.push_str(&format!("{byte:02X}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::IdentityError;

    struct MockStore {
        username: String,
        nt_password_hash: [u8; 16],
        peer_challenge: [u8; 16],
    }

    impl IdentityStore for MockStore {
        fn username(&self) -> String {
            self.username.clone()
        }

        fn nt_password_hash(&self) -> Result<[u8; 16], IdentityError> {
            Ok(self.nt_password_hash)
        }

        fn peer_challenge(&self) -> [u8; 16] {
            self.peer_challenge
        }
    }

    fn store() -> MockStore {
        MockStore { username: "alice".to_string(), nt_password_hash: [0x42u8; 16], peer_challenge: [0x11u8; 16] }
    }

    #[test]
    fn challenge_round_trip_produces_matching_authenticator_response() {
        let mut method = MsChapV2Method::new();
        let store = store();
        let collab = Collaborators { uicc: None, identity_store: Some(&store) };

        let mut body = vec![16u8];
        body.extend_from_slice(&[0x22u8; 16]);
        let type_data = build_packet(OPCODE_CHALLENGE, 7, &body);
        let request = EapMessage { code: EapCode::Request, identifier: 1, eap_type: Some(EapType::MsChapV2), type_data };

        let outcome = method.step(&request, &collab).unwrap();
        let StepOutcome::Reply(reply) = outcome else { panic!("expected Reply") };
        assert_eq!(reply.type_data[0], OPCODE_RESPONSE);
        assert_eq!(method.phase, Phase::ResponseSent);

        let expected = method.expected_authenticator_response.clone().unwrap();
        let success_message = format!("S={expected} M=Welcome");
        let mut success_data = vec![OPCODE_SUCCESS, 7, 0, 0];
        success_data.extend_from_slice(success_message.as_bytes());
        let len = success_data.len() as u16;
        success_data[2..4].copy_from_slice(&len.to_be_bytes());
        let success_request =
            EapMessage { code: EapCode::Request, identifier: 2, eap_type: Some(EapType::MsChapV2), type_data: success_data };

        let outcome = method.step(&success_request, &collab).unwrap();
        assert!(matches!(outcome, StepOutcome::FinalReply(_)));
        assert!(method.handle_success().unwrap().is_none());
    }

    #[test]
    fn success_before_response_is_rejected() {
        let mut method = MsChapV2Method::new();
        assert!(method.handle_success().is_err());
    }

    #[test]
    fn des_key_expansion_matches_known_vector() {
        // RFC 2759 Appendix A test vector building block: zero key expands to zero DES key
        let expanded = expand_des_key(&[0u8; 7]);
        assert_eq!(expanded, [0u8; 8]);
    }
}

//! The IKEv2 client state machine: an effects-based
//! `(state, event) -> (state, [Effect])` driver over `IKE_SA_INIT`,
//! `IKE_AUTH` (with an inner EAP sub-exchange), `CREATE_CHILD_SA` and
//! `INFORMATIONAL`.
//!
//! [`IkeSession`] never touches a socket or a clock itself. Every public
//! method returns `Vec<Effect>`; the embedding application executes those
//! effects against its own [`crate::collab::DatagramTransport`] and
//! [`crate::collab::Clock`], then calls [`IkeSession::handle_inbound`] or
//! [`IkeSession::handle_timer`] with whatever comes back.

use std::time::Instant;

use rand::RngCore;
use subtle::ConstantTimeEq;

use ike_crypto::channel::{Direction, SecuredChannel};
use ike_crypto::dh::DhPrivateKey;
use ike_crypto::keys::{IkeSaKeys, KeySchedule};
use ike_crypto::prf;

use ike_eap::collab::{IdentityStore, UiccOracle};
use ike_eap::{Collaborators, EapCode, EapMessage, EapMethod, EapType, StepOutcome};

use ike_wire::config::ConfigurationPayload;
use ike_wire::delete::DeletePayload;
use ike_wire::generator;
use ike_wire::identification::IkeIdentification;
use ike_wire::message::{EncryptedPayload, IkeMessage, Payload};
use ike_wire::notify::{NotifyMessageType, NotifyPayload};
use ike_wire::params::{
    AuthenticationMethod, DiffieHellmanGroup, ExchangeType, NotifyErrorType, NotifyStatusType,
    PayloadType, PseudorandomFunction, SecurityProtocol,
};
use ike_wire::sa::{Proposal, SecurityAssociation};
use ike_wire::traffic_selector::IkeTrafficSelector;

use crate::child_sa::{ChildSa, ChildSaMode};
use crate::collab::{CredentialStore, TimerToken};
use crate::config::{AuthMode, SessionConfig};
use crate::eap_driver::ActiveMethod;
use crate::effect::Effect;
use crate::error::SessionError;
use crate::negotiate;
use crate::retransmit::{PendingRequest, ResponseCache};
use crate::state::{EapProgress, SessionState};

/// Strip IKEv2's 4-byte all-zero "non-ESP marker", RFC 7296 section 2.23,
/// prepended on port-4500 datagrams to disambiguate them from ESP traffic
pub fn strip_non_esp_marker(datagram: &[u8]) -> &[u8] {
    match datagram {
        [0, 0, 0, 0, rest @ ..] => rest,
        other => other,
    }
}

/// What an in-flight request this peer sent during `Established`/`Rekeying`
/// will resolve to once its matching response arrives
#[derive(Debug)]
enum PendingAction {
    CreateChildSa {
        local_ts: Vec<IkeTrafficSelector>,
        remote_ts: Vec<IkeTrafficSelector>,
    },
    RekeyChildSa {
        old_inbound_spi: [u8; 4],
    },
    RekeyIkeSa,
    DeleteChildSa {
        spis: Vec<[u8; 4]>,
    },
    DeleteIkeSa,
    Dpd,
}

/// An IKEv2 client session: negotiates, authenticates (by signature or EAP),
/// establishes a Child SA, and drives rekey/delete/DPD afterward.
///
/// This peer always plays the IKE SA's original initiator role; acting as a
/// responder to an unsolicited `IKE_SA_INIT` is out of scope for this crate.
/// Once established, the session still answers
/// peer-initiated `INFORMATIONAL` requests (Delete, DPD probes), since
/// message exchanges are bidirectional within an IKE SA regardless of which
/// side originally initiated the SA itself.
pub struct IkeSession<'a> {
    config: SessionConfig,
    credentials: &'a dyn CredentialStore,
    uicc: Option<&'a dyn UiccOracle>,
    identity_store: Option<&'a dyn IdentityStore>,

    state: SessionState,

    initiator_spi: u64,
    responder_spi: u64,
    next_local_message_id: u32,
    next_peer_message_id: u32,
    next_timer_token: u64,

    pending_request: Option<PendingRequest>,
    pending_action: Option<PendingAction>,
    response_cache: Option<ResponseCache>,
    close_timer: Option<TimerToken>,
    ke_retried: bool,

    dh_private: Option<DhPrivateKey>,
    ni: Vec<u8>,
    nr: Vec<u8>,
    ike_schedule: Option<KeySchedule>,
    ike_keys: Option<IkeSaKeys>,
    exported_msk: Option<[u8; 64]>,

    sa_init_request_bytes: Option<Vec<u8>>,
    sa_init_response_bytes: Option<Vec<u8>>,

    pending_child_spi: Option<[u8; 4]>,
    pending_child_ni: Option<Vec<u8>>,
    pending_ike_rekey_ni: Option<Vec<u8>>,
    pending_ike_rekey_dh: Option<DhPrivateKey>,

    child_sas: Vec<ChildSa>,
    established_at: Option<Instant>,
}

impl<'a> IkeSession<'a> {
    /// Build a session, not yet opened. `uicc`/`identity_store` may be
    /// omitted when no configured inner EAP method needs them.
    pub fn new(
        config: SessionConfig,
        credentials: &'a dyn CredentialStore,
        uicc: Option<&'a dyn UiccOracle>,
        identity_store: Option<&'a dyn IdentityStore>,
    ) -> Self {
        Self {
            config,
            credentials,
            uicc,
            identity_store,
            state: SessionState::Initial,
            initiator_spi: 0,
            responder_spi: 0,
            next_local_message_id: 1,
            next_peer_message_id: 0,
            next_timer_token: 0,
            pending_request: None,
            pending_action: None,
            response_cache: None,
            close_timer: None,
            ke_retried: false,
            dh_private: None,
            ni: Vec::new(),
            nr: Vec::new(),
            ike_schedule: None,
            ike_keys: None,
            exported_msk: None,
            sa_init_request_bytes: None,
            sa_init_response_bytes: None,
            pending_child_spi: None,
            pending_child_ni: None,
            pending_ike_rekey_ni: None,
            pending_ike_rekey_dh: None,
            child_sas: Vec::new(),
            established_at: None,
        }
    }

    /// Current session phase, for diagnostics
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The Child SAs currently established on this session
    pub fn child_sas(&self) -> &[ChildSa] {
        &self.child_sas
    }

    /// Begin the exchange: send `IKE_SA_INIT`
    pub fn open(&mut self) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Initial) {
            return Err(SessionError::UnexpectedState);
        }
        let mut rng = rand::rng();
        let mut spi_bytes = [0u8; 8];
        rng.fill_bytes(&mut spi_bytes);
        self.initiator_spi = u64::from_be_bytes(spi_bytes) | 1;

        let group = self.preferred_group()?;
        let dh = DhPrivateKey::generate(group, &mut rng)?;
        let mut ni = vec![0u8; 32];
        rng.fill_bytes(&mut ni);

        let raw = self.build_sa_init_request(group, &dh, &ni)?;
        self.dh_private = Some(dh);
        self.ni = ni;
        self.sa_init_request_bytes = Some(raw.clone());
        self.state = SessionState::IkeInitSent;

        tracing::debug!(state = self.state.name(), "sending IKE_SA_INIT");
        Ok(self.send_with_retransmit(0, raw))
    }

    fn preferred_group(&self) -> Result<DiffieHellmanGroup, SessionError> {
        self.config
            .ike_proposals
            .first()
            .and_then(|p| p.key_exchange_methods.first().copied())
            .ok_or(SessionError::InvalidSyntax("no DH group offered in ike_proposals"))
    }

    fn build_sa_init_request(
        &self,
        group: DiffieHellmanGroup,
        dh: &DhPrivateKey,
        ni: &[u8],
    ) -> Result<Vec<u8>, SessionError> {
        let sa = SecurityAssociation { proposals: self.config.ike_proposals.clone() };
        let payloads = vec![
            Payload::SecurityAssociation(sa),
            Payload::KeyExchange { group, public_value: dh.public_value() },
            Payload::Nonce(ni.to_vec()),
        ];
        let message = IkeMessage {
            initiator_spi: self.initiator_spi,
            responder_spi: 0,
            exchange_type: ExchangeType::IkeSaInit,
            initiator_flag: true,
            response_flag: false,
            message_id: 0,
            payloads,
        };
        Ok(generator::encode_message(&message)?)
    }

    /// Feed one inbound datagram (after de-NAT-T framing, still possibly
    /// carrying the non-ESP marker) into the state machine
    pub fn handle_inbound(&mut self, datagram: &[u8]) -> Result<Vec<Effect>, SessionError> {
        let raw = strip_non_esp_marker(datagram);
        let message = ike_wire::parser::parse_message(raw)?;
        tracing::debug!(state = self.state.name(), exchange = ?message.exchange_type, "handling inbound datagram");

        match self.state {
            SessionState::IkeInitSent => self.handle_ike_sa_init_response(raw, message),
            SessionState::IkeAuthSent { .. } => self.handle_ike_auth_message(raw, message),
            SessionState::Established | SessionState::Rekeying => {
                self.handle_established_message(raw, message)
            }
            SessionState::Deleting => self.handle_deleting_message(message),
            SessionState::Initial | SessionState::Closed => Err(SessionError::UnexpectedState),
        }
    }

    /// A previously scheduled timer fired
    pub fn handle_timer(&mut self, token: TimerToken) -> Result<Vec<Effect>, SessionError> {
        if Some(token) == self.close_timer {
            self.close_timer = None;
            let mut effects = Vec::new();
            effects.extend(self.cancel_pending());
            self.state = SessionState::Closed;
            effects.push(Effect::SessionClosed);
            return Ok(effects);
        }

        let Some(pending) = &self.pending_request else { return Ok(Vec::new()) };
        if pending.timer != token {
            return Ok(Vec::new());
        }
        if pending.attempts_exhausted(&self.config) {
            self.pending_request = None;
            return Err(SessionError::Timeout);
        }

        let raw = pending.raw.clone();
        let after = pending.next_backoff(&self.config);
        let new_token = self.next_timer_token();
        if let Some(p) = &mut self.pending_request {
            p.attempt += 1;
            p.timer = new_token;
        }
        Ok(vec![Effect::Send(raw), Effect::ScheduleTimer { token: new_token, after }])
    }

    // ---- IKE_SA_INIT ------------------------------------------------

    fn handle_ike_sa_init_response(
        &mut self,
        raw: &[u8],
        message: IkeMessage,
    ) -> Result<Vec<Effect>, SessionError> {
        if !message.response_flag || message.message_id != 0 || message.initiator_spi != self.initiator_spi {
            return Err(SessionError::UnexpectedState);
        }
        let mut effects = Vec::new();
        effects.extend(self.cancel_pending());

        if let Some(notify) = find_error_notify(&message.payloads) {
            if let Some(retry_effects) = self.retry_ike_sa_init_for_ke(notify)? {
                effects.extend(retry_effects);
                return Ok(effects);
            }
            return Err(map_error_notify(notify));
        }

        self.responder_spi = message.responder_spi;
        self.sa_init_response_bytes = Some(raw.to_vec());

        let offered = SecurityAssociation { proposals: self.config.ike_proposals.clone() };
        let response_sa = find_sa(&message.payloads)
            .ok_or(SessionError::InvalidSyntax("IKE_SA_INIT response missing SA payload"))?;
        let selected = negotiate::negotiate(&offered, &response_sa)?.clone();

        let (group, peer_public) = find_ke(&message.payloads)
            .ok_or(SessionError::InvalidSyntax("IKE_SA_INIT response missing KE payload"))?;
        let nr = find_nonce(&message.payloads)
            .ok_or(SessionError::InvalidSyntax("IKE_SA_INIT response missing Nonce payload"))?;

        let dh = self.dh_private.take().ok_or(SessionError::Internal("no DH private key pending"))?;
        if group != dh.group() {
            return Err(SessionError::InvalidSyntax("responder KE group does not match offer"));
        }
        let shared_secret = dh.shared_secret(&peer_public)?;

        let schedule = key_schedule_for(&selected)?;
        let keys = ike_crypto::keys::derive_keys(
            schedule,
            &self.ni,
            &nr,
            &shared_secret,
            self.initiator_spi,
            self.responder_spi,
        )?;

        self.nr = nr;
        self.ike_schedule = Some(schedule);
        self.ike_keys = Some(keys);

        let request = self.build_ike_auth_request()?;
        self.state = SessionState::IkeAuthSent { eap: None };
        tracing::debug!("IKE_SA_INIT negotiated, sending IKE_AUTH");
        effects.extend(self.send_with_retransmit(self.next_local_message_id, request));
        self.next_local_message_id += 1;
        Ok(effects)
    }

    fn retry_ike_sa_init_for_ke(
        &mut self,
        notify: &NotifyPayload,
    ) -> Result<Option<Vec<Effect>>, SessionError> {
        if self.ke_retried {
            return Ok(None);
        }
        let NotifyMessageType::Error(NotifyErrorType::InvalidKeyExchangePayload) = notify.message_type else {
            return Ok(None);
        };
        if notify.data.len() != 2 {
            return Ok(None);
        }
        self.ke_retried = true;
        let group = DiffieHellmanGroup::try_from(u16::from_be_bytes([notify.data[0], notify.data[1]]))
            .map_err(|_| SessionError::InvalidSyntax("responder suggested an unsupported DH group"))?;

        let mut rng = rand::rng();
        let dh = DhPrivateKey::generate(group, &mut rng)?;
        let mut ni = vec![0u8; 32];
        rng.fill_bytes(&mut ni);
        let raw = self.build_sa_init_request(group, &dh, &ni)?;

        self.dh_private = Some(dh);
        self.ni = ni;
        self.sa_init_request_bytes = Some(raw.clone());
        Ok(Some(self.send_with_retransmit(0, raw)))
    }

    // ---- IKE_AUTH -----------------------------------------------------

    fn build_ike_auth_request(&mut self) -> Result<Vec<u8>, SessionError> {
        let idi = self.credentials.local_identity();
        let mut inner = vec![Payload::IdentificationInitiator(idi.clone())];

        if let AuthMode::Signature(method) = self.config.auth_mode {
            let signed_octets = self.our_signed_octets(&idi)?;
            let auth_value = self
                .credentials
                .sign(&signed_octets)
                .map_err(|_| SessionError::IdentityUnavailable)?;
            inner.push(Payload::Authentication { method, data: auth_value });
        }

        let mut rng = rand::rng();
        let mut child_spi = [0u8; 4];
        rng.fill_bytes(&mut child_spi);
        let mut child_proposals = self.config.child_proposals.clone();
        for p in &mut child_proposals {
            p.spi = child_spi.to_vec();
        }
        self.pending_child_spi = Some(child_spi);

        inner.push(Payload::SecurityAssociation(SecurityAssociation { proposals: child_proposals }));
        inner.push(Payload::TrafficSelectorInitiator(vec![IkeTrafficSelector::any()]));
        inner.push(Payload::TrafficSelectorResponder(vec![IkeTrafficSelector::any()]));
        inner.push(Payload::Configuration(ConfigurationPayload::request_address()));

        let channel = self.channel()?;
        seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::IkeAuth,
            true,
            false,
            self.next_local_message_id,
            &inner,
            &mut rng,
        )
    }

    fn handle_ike_auth_message(
        &mut self,
        raw: &[u8],
        message: IkeMessage,
    ) -> Result<Vec<Effect>, SessionError> {
        if !message.response_flag
            || message.initiator_spi != self.initiator_spi
            || message.responder_spi != self.responder_spi
        {
            return Err(SessionError::UnexpectedState);
        }
        let mut effects = Vec::new();
        effects.extend(self.cancel_pending());

        let encrypted = last_encrypted(&message.payloads)
            .ok_or(SessionError::InvalidSyntax("IKE_AUTH response is not encrypted"))?;
        let channel = self.channel()?;
        let inner = open_inner(&channel, Direction::ResponderToInitiator, raw, encrypted)?;

        if let Some(notify) = find_error_notify(&inner) {
            return Err(map_error_notify(notify));
        }

        if let Some(eap_bytes) = find_eap(&inner) {
            effects.extend(self.handle_eap_request(eap_bytes)?);
            return Ok(effects);
        }

        let auth = find_auth(&inner)
            .ok_or(SessionError::InvalidSyntax("IKE_AUTH final response missing AUTH"))?;
        let idr = inner
            .iter()
            .find_map(|p| match p {
                Payload::IdentificationResponder(id) => Some(id.clone()),
                _ => None,
            })
            .ok_or(SessionError::InvalidSyntax("IKE_AUTH final response missing IDr"))?;

        self.verify_peer_auth(&idr, &auth)?;
        effects.extend(self.finish_establishing(&inner)?);
        Ok(effects)
    }

    fn handle_eap_request(&mut self, eap_bytes: Vec<u8>) -> Result<Vec<Effect>, SessionError> {
        let request = EapMessage::decode(&eap_bytes)?;

        match request.code {
            EapCode::Request => self.handle_eap_method_request(request),
            EapCode::Success => self.handle_eap_success(),
            EapCode::Failure => Err(SessionError::AuthenticationFailed),
            EapCode::Response => Err(SessionError::InvalidSyntax("peer sent an EAP-Response")),
        }
    }

    fn handle_eap_method_request(&mut self, request: EapMessage) -> Result<Vec<Effect>, SessionError> {
        let SessionState::IkeAuthSent { eap } = &mut self.state else {
            return Err(SessionError::UnexpectedState);
        };

        let response = if eap.is_none() && request.eap_type == Some(EapType::Identity) {
            let identity = self.credentials.local_identity();
            EapMessage {
                code: EapCode::Response,
                identifier: request.identifier,
                eap_type: Some(EapType::Identity),
                type_data: identity.body(),
            }
        } else {
            let eap_type = request
                .eap_type
                .ok_or(SessionError::InvalidSyntax("EAP-Request missing type"))?;
            if eap.is_none() {
                let method = ActiveMethod::for_type(eap_type, self.config.aka_prime_network_name.clone())
                    .ok_or(SessionError::InvalidSyntax("unsupported inner EAP method"))?;
                if !method.exports_msk() && self.config.require_msk_bearing_inner_auth {
                    return Err(SessionError::UnexpectedState);
                }
                *eap = Some(EapProgress { method, last_identifier: request.identifier });
            }
            let progress = eap.as_mut().ok_or(SessionError::Internal("eap progress missing"))?;
            progress.last_identifier = request.identifier;
            let collab = Collaborators { uicc: self.uicc, identity_store: self.identity_store };
            match progress.method.method().handle_request(&request, &collab)? {
                StepOutcome::Reply(msg) | StepOutcome::FinalReply(msg) => msg,
            }
        };

        self.send_ike_auth_follow_up(vec![Payload::ExtensibleAuthentication(response.encode())])
    }

    fn handle_eap_success(&mut self) -> Result<Vec<Effect>, SessionError> {
        let SessionState::IkeAuthSent { eap } = &mut self.state else {
            return Err(SessionError::UnexpectedState);
        };
        let progress = eap.as_mut().ok_or(SessionError::UnexpectedState)?;
        let exported = progress.method.method().handle_success()?;

        let msk = match exported {
            Some(keys) => keys.msk,
            None if self.config.require_msk_bearing_inner_auth => {
                return Err(SessionError::UnexpectedState)
            }
            None => [0u8; 64],
        };
        self.exported_msk = Some(msk);

        let idi = self.credentials.local_identity();
        let signed_octets = self.our_signed_octets(&idi)?;
        let schedule = self.ike_schedule.ok_or(SessionError::Internal("no ike schedule"))?;
        let auth_value = eap_auth_value(schedule.prf, &msk, &signed_octets)?;

        self.send_ike_auth_follow_up(vec![Payload::Authentication {
            method: AuthenticationMethod::SharedKeyMessageIntegrityCode,
            data: auth_value,
        }])
    }

    fn send_ike_auth_follow_up(&mut self, payloads: Vec<Payload>) -> Result<Vec<Effect>, SessionError> {
        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::IkeAuth,
            true,
            false,
            message_id,
            &payloads,
            &mut rand::rng(),
        )?;
        self.next_local_message_id += 1;
        Ok(self.send_with_retransmit(message_id, raw))
    }

    fn finish_establishing(&mut self, inner: &[Payload]) -> Result<Vec<Effect>, SessionError> {
        let response_sa = find_sa(inner)
            .ok_or(SessionError::InvalidSyntax("IKE_AUTH final response missing SAi2"))?;
        let offered = SecurityAssociation { proposals: self.config.child_proposals.clone() };
        let selected = negotiate::negotiate(&offered, &response_sa)?.clone();

        let tsi = find_tsi(inner).unwrap_or_default();
        let tsr = find_tsr(inner).unwrap_or_default();

        let child_schedule = key_schedule_for(&selected)?;
        let sk_d = self.ike_keys.as_ref().ok_or(SessionError::Internal("no ike keys"))?.sk_d.clone();
        let key_material =
            ike_crypto::keys::derive_child_sa_keys(child_schedule, &sk_d, &self.ni, &self.nr, None)?;

        let protocol = selected.protocol.ok_or(SessionError::InvalidSyntax("child proposal missing protocol"))?;
        let outbound_spi = spi4(&selected.spi)?;
        let inbound_spi = self.pending_child_spi.take().ok_or(SessionError::Internal("no pending child SPI"))?;

        self.child_sas.push(ChildSa {
            protocol,
            inbound_spi,
            outbound_spi,
            proposal: selected,
            local_ts: tsi,
            remote_ts: tsr,
            mode: ChildSaMode::Tunnel,
            keys: key_material,
        });
        self.state = SessionState::Established;
        self.established_at = Some(Instant::now());
        tracing::info!("IKE SA and first Child SA established");

        Ok(vec![Effect::Established, Effect::ChildSaEstablished { spi: inbound_spi }])
    }

    // ---- AUTH signed-octets, RFC 7296 section 2.15/2.16 ----------------

    fn our_signed_octets(&self, idi: &IkeIdentification) -> Result<Vec<u8>, SessionError> {
        let real_message1 = self
            .sa_init_request_bytes
            .as_ref()
            .ok_or(SessionError::Internal("missing IKE_SA_INIT request bytes"))?;
        let keys = self.ike_keys.as_ref().ok_or(SessionError::Internal("no ike keys"))?;
        let schedule = self.ike_schedule.ok_or(SessionError::Internal("no ike schedule"))?;
        let mac = prf::prf(schedule.prf, &keys.sk_pi, &id_payload_body(idi))?;

        let mut out = Vec::with_capacity(real_message1.len() + self.nr.len() + mac.len());
        out.extend_from_slice(real_message1);
        out.extend_from_slice(&self.nr);
        out.extend_from_slice(&mac);
        Ok(out)
    }

    fn peer_signed_octets(&self, idr: &IkeIdentification) -> Result<Vec<u8>, SessionError> {
        let real_message2 = self
            .sa_init_response_bytes
            .as_ref()
            .ok_or(SessionError::Internal("missing IKE_SA_INIT response bytes"))?;
        let keys = self.ike_keys.as_ref().ok_or(SessionError::Internal("no ike keys"))?;
        let schedule = self.ike_schedule.ok_or(SessionError::Internal("no ike schedule"))?;
        let mac = prf::prf(schedule.prf, &keys.sk_pr, &id_payload_body(idr))?;

        let mut out = Vec::with_capacity(real_message2.len() + self.ni.len() + mac.len());
        out.extend_from_slice(real_message2);
        out.extend_from_slice(&self.ni);
        out.extend_from_slice(&mac);
        Ok(out)
    }

    fn verify_peer_auth(&self, idr: &IkeIdentification, auth: &[u8]) -> Result<(), SessionError> {
        let signed_octets = self.peer_signed_octets(idr)?;
        match self.config.auth_mode {
            AuthMode::Signature(_) => {
                let ok = self
                    .credentials
                    .verify_peer_auth(&signed_octets, auth)
                    .map_err(|_| SessionError::AuthenticationFailed)?;
                if !ok {
                    return Err(SessionError::AuthenticationFailed);
                }
            }
            AuthMode::Eap => {
                let msk = self.exported_msk.ok_or(SessionError::UnexpectedState)?;
                let schedule = self.ike_schedule.ok_or(SessionError::Internal("no ike schedule"))?;
                let expected = eap_auth_value(schedule.prf, &msk, &signed_octets)?;
                let matches: bool = expected.as_slice().ct_eq(auth).into();
                if !matches {
                    return Err(SessionError::AuthenticationFailed);
                }
            }
        }
        Ok(())
    }

    // ---- Established: CREATE_CHILD_SA / INFORMATIONAL, we initiate -----

    /// Negotiate an additional Child SA beyond the one bundled with `IKE_AUTH`
    pub fn create_child_sa(
        &mut self,
        local_ts: Vec<IkeTrafficSelector>,
        remote_ts: Vec<IkeTrafficSelector>,
    ) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Established) {
            return Err(SessionError::UnexpectedState);
        }
        let mut rng = rand::rng();
        let mut ni = vec![0u8; 32];
        rng.fill_bytes(&mut ni);
        let mut child_spi = [0u8; 4];
        rng.fill_bytes(&mut child_spi);
        let mut proposals = self.config.child_proposals.clone();
        for p in &mut proposals {
            p.spi = child_spi.to_vec();
        }

        let payloads = vec![
            Payload::SecurityAssociation(SecurityAssociation { proposals }),
            Payload::Nonce(ni.clone()),
            Payload::TrafficSelectorInitiator(local_ts.clone()),
            Payload::TrafficSelectorResponder(remote_ts.clone()),
        ];

        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::CreateChildSa,
            true,
            false,
            message_id,
            &payloads,
            &mut rng,
        )?;
        self.next_local_message_id += 1;

        self.pending_child_ni = Some(ni);
        self.pending_child_spi = Some(child_spi);
        self.pending_action = Some(PendingAction::CreateChildSa { local_ts, remote_ts });
        Ok(self.send_with_retransmit(message_id, raw))
    }

    /// Rekey an existing Child SA, identified by its inbound SPI
    pub fn rekey_child_sa(&mut self, old_inbound_spi: [u8; 4]) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Established) {
            return Err(SessionError::UnexpectedState);
        }
        let old = self
            .child_sas
            .iter()
            .find(|c| c.inbound_spi == old_inbound_spi)
            .ok_or(SessionError::InvalidSyntax("no such child SA to rekey"))?;
        let protocol = old.protocol;
        let local_ts = old.local_ts.clone();
        let remote_ts = old.remote_ts.clone();

        let mut rng = rand::rng();
        let mut ni = vec![0u8; 32];
        rng.fill_bytes(&mut ni);
        let mut child_spi = [0u8; 4];
        rng.fill_bytes(&mut child_spi);
        let mut proposals = self.config.child_proposals.clone();
        for p in &mut proposals {
            p.spi = child_spi.to_vec();
        }

        let rekey_notify = NotifyPayload {
            protocol: Some(protocol),
            spi: old_inbound_spi.to_vec(),
            message_type: NotifyMessageType::Status(NotifyStatusType::RekeySa),
            data: Vec::new(),
        };
        let payloads = vec![
            Payload::Notify(rekey_notify),
            Payload::SecurityAssociation(SecurityAssociation { proposals }),
            Payload::Nonce(ni.clone()),
            Payload::TrafficSelectorInitiator(local_ts),
            Payload::TrafficSelectorResponder(remote_ts),
        ];

        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::CreateChildSa,
            true,
            false,
            message_id,
            &payloads,
            &mut rng,
        )?;
        self.next_local_message_id += 1;

        self.pending_child_ni = Some(ni);
        self.pending_child_spi = Some(child_spi);
        self.pending_action = Some(PendingAction::RekeyChildSa { old_inbound_spi });
        self.state = SessionState::Rekeying;
        Ok(self.send_with_retransmit(message_id, raw))
    }

    /// Rekey the IKE SA itself
    pub fn rekey_ike_sa(&mut self) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Established) {
            return Err(SessionError::UnexpectedState);
        }
        let group = self.preferred_group()?;
        let mut rng = rand::rng();
        let dh = DhPrivateKey::generate(group, &mut rng)?;
        let mut ni = vec![0u8; 32];
        rng.fill_bytes(&mut ni);

        let payloads = vec![
            Payload::SecurityAssociation(SecurityAssociation { proposals: self.config.ike_proposals.clone() }),
            Payload::KeyExchange { group, public_value: dh.public_value() },
            Payload::Nonce(ni.clone()),
        ];

        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::CreateChildSa,
            true,
            false,
            message_id,
            &payloads,
            &mut rng,
        )?;
        self.next_local_message_id += 1;

        self.pending_ike_rekey_ni = Some(ni);
        self.pending_ike_rekey_dh = Some(dh);
        self.pending_action = Some(PendingAction::RekeyIkeSa);
        self.state = SessionState::Rekeying;
        Ok(self.send_with_retransmit(message_id, raw))
    }

    /// Delete one or more Child SAs by their inbound SPI
    pub fn delete_child_sas(&mut self, spis: Vec<[u8; 4]>) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Established) {
            return Err(SessionError::UnexpectedState);
        }
        let protocol = self
            .child_sas
            .iter()
            .find(|c| spis.contains(&c.inbound_spi))
            .map(|c| c.protocol)
            .ok_or(SessionError::InvalidSyntax("no such child SA to delete"))?;
        let payloads = vec![Payload::Delete(DeletePayload::child_sas(protocol, spis.clone()))];

        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::Informational,
            true,
            false,
            message_id,
            &payloads,
            &mut rand::rng(),
        )?;
        self.next_local_message_id += 1;

        self.pending_action = Some(PendingAction::DeleteChildSa { spis });
        Ok(self.send_with_retransmit(message_id, raw))
    }

    /// Send a Dead Peer Detection probe: a true empty `INFORMATIONAL` request
    pub fn send_dpd(&mut self) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Established) {
            return Err(SessionError::UnexpectedState);
        }
        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::Informational,
            true,
            false,
            message_id,
            &[],
            &mut rand::rng(),
        )?;
        self.next_local_message_id += 1;

        self.pending_action = Some(PendingAction::Dpd);
        Ok(self.send_with_retransmit(message_id, raw))
    }

    /// Begin closing the IKE SA: send a Delete(IKE SA) request and wait
    /// [`SessionConfig::close_grace_period`] for the peer's acknowledgment
    pub fn close(&mut self) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.state, SessionState::Established | SessionState::Rekeying) {
            return Err(SessionError::UnexpectedState);
        }
        let payloads = vec![Payload::Delete(DeletePayload::ike_sa())];
        let message_id = self.next_local_message_id;
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::Informational,
            true,
            false,
            message_id,
            &payloads,
            &mut rand::rng(),
        )?;
        self.next_local_message_id += 1;

        self.pending_action = Some(PendingAction::DeleteIkeSa);
        self.state = SessionState::Deleting;
        let mut effects = self.send_with_retransmit(message_id, raw);
        let token = self.next_timer_token();
        self.close_timer = Some(token);
        effects.push(Effect::ScheduleTimer { token, after: self.config.close_grace_period });
        Ok(effects)
    }

    /// Whether the IKE SA's age has crossed its configured rekey threshold
    pub fn ike_sa_due_for_rekey(&self, now: Instant) -> bool {
        match (self.established_at, self.config.ike_rekey_policy.max_age) {
            (Some(since), Some(max_age)) => now.saturating_duration_since(since) >= max_age,
            _ => false,
        }
    }

    fn handle_established_message(
        &mut self,
        raw: &[u8],
        message: IkeMessage,
    ) -> Result<Vec<Effect>, SessionError> {
        if message.initiator_spi != self.initiator_spi || message.responder_spi != self.responder_spi {
            return Err(SessionError::UnexpectedState);
        }
        let encrypted = last_encrypted(&message.payloads)
            .ok_or(SessionError::InvalidSyntax("established-phase message is not encrypted"))?;
        let channel = self.channel()?;
        let inner = open_inner(&channel, Direction::ResponderToInitiator, raw, encrypted)?;

        if message.response_flag {
            self.handle_our_request_response(message.message_id, message.exchange_type, &inner)
        } else {
            self.handle_peer_initiated_request(message.message_id, message.exchange_type, &inner)
        }
    }

    fn handle_our_request_response(
        &mut self,
        message_id: u32,
        exchange_type: ExchangeType,
        inner: &[Payload],
    ) -> Result<Vec<Effect>, SessionError> {
        let Some(pending) = &self.pending_request else { return Ok(Vec::new()) };
        if pending.message_id != message_id {
            return Ok(Vec::new());
        }
        let mut effects = Vec::new();
        effects.extend(self.cancel_pending());

        if let Some(notify) = find_error_notify(inner) {
            self.state = SessionState::Established;
            return Err(map_error_notify(notify));
        }

        let action = self.pending_action.take();
        match (exchange_type, action) {
            (ExchangeType::CreateChildSa, Some(PendingAction::CreateChildSa { local_ts, remote_ts })) => {
                effects.extend(self.finish_create_child_sa(inner, local_ts, remote_ts)?);
                self.state = SessionState::Established;
            }
            (ExchangeType::CreateChildSa, Some(PendingAction::RekeyChildSa { old_inbound_spi })) => {
                effects.extend(self.finish_rekey_child_sa(inner, old_inbound_spi)?);
            }
            (ExchangeType::CreateChildSa, Some(PendingAction::RekeyIkeSa)) => {
                effects.extend(self.finish_rekey_ike_sa(inner)?);
            }
            (ExchangeType::Informational, Some(PendingAction::DeleteChildSa { spis })) => {
                for spi in &spis {
                    self.child_sas.retain(|c| c.inbound_spi != *spi);
                    effects.push(Effect::ChildSaDeleted { spi: *spi });
                }
                self.state = SessionState::Established;
            }
            (ExchangeType::Informational, Some(PendingAction::Dpd)) => {
                self.state = SessionState::Established;
            }
            _ => return Err(SessionError::UnexpectedState),
        }
        Ok(effects)
    }

    fn finish_create_child_sa(
        &mut self,
        inner: &[Payload],
        local_ts: Vec<IkeTrafficSelector>,
        remote_ts: Vec<IkeTrafficSelector>,
    ) -> Result<Vec<Effect>, SessionError> {
        let response_sa = find_sa(inner)
            .ok_or(SessionError::InvalidSyntax("CREATE_CHILD_SA response missing SA"))?;
        let offered = SecurityAssociation { proposals: self.config.child_proposals.clone() };
        let selected = negotiate::negotiate(&offered, &response_sa)?.clone();

        let nr = find_nonce(inner)
            .ok_or(SessionError::InvalidSyntax("CREATE_CHILD_SA response missing Nonce"))?;
        let ni = self.pending_child_ni.take().ok_or(SessionError::Internal("no pending child nonce"))?;
        let inbound_spi = self.pending_child_spi.take().ok_or(SessionError::Internal("no pending child SPI"))?;
        let outbound_spi = spi4(&selected.spi)?;

        let child_schedule = key_schedule_for(&selected)?;
        let sk_d = self.ike_keys.as_ref().ok_or(SessionError::Internal("no ike keys"))?.sk_d.clone();
        let key_material = ike_crypto::keys::derive_child_sa_keys(child_schedule, &sk_d, &ni, &nr, None)?;
        let protocol = selected.protocol.ok_or(SessionError::InvalidSyntax("child proposal missing protocol"))?;

        self.child_sas.push(ChildSa {
            protocol,
            inbound_spi,
            outbound_spi,
            proposal: selected,
            local_ts,
            remote_ts,
            mode: ChildSaMode::Tunnel,
            keys: key_material,
        });
        Ok(vec![Effect::ChildSaEstablished { spi: inbound_spi }])
    }

    fn finish_rekey_child_sa(
        &mut self,
        inner: &[Payload],
        old_inbound_spi: [u8; 4],
    ) -> Result<Vec<Effect>, SessionError> {
        let (local_ts, remote_ts) = {
            let old = self
                .child_sas
                .iter()
                .find(|c| c.inbound_spi == old_inbound_spi)
                .ok_or(SessionError::Internal("rekeyed child SA vanished"))?;
            (old.local_ts.clone(), old.remote_ts.clone())
        };
        let mut effects = self.finish_create_child_sa(inner, local_ts, remote_ts)?;
        self.child_sas.retain(|c| c.inbound_spi != old_inbound_spi);
        effects.push(Effect::ChildSaDeleted { spi: old_inbound_spi });
        self.state = SessionState::Established;
        Ok(effects)
    }

    fn finish_rekey_ike_sa(&mut self, inner: &[Payload]) -> Result<Vec<Effect>, SessionError> {
        let response_sa = find_sa(inner)
            .ok_or(SessionError::InvalidSyntax("CREATE_CHILD_SA (IKE rekey) response missing SA"))?;
        let offered = SecurityAssociation { proposals: self.config.ike_proposals.clone() };
        let selected = negotiate::negotiate(&offered, &response_sa)?.clone();

        let (group, peer_public) = find_ke(inner)
            .ok_or(SessionError::InvalidSyntax("CREATE_CHILD_SA (IKE rekey) response missing KE"))?;
        let nr = find_nonce(inner)
            .ok_or(SessionError::InvalidSyntax("CREATE_CHILD_SA (IKE rekey) response missing Nonce"))?;

        let dh = self
            .pending_ike_rekey_dh
            .take()
            .ok_or(SessionError::Internal("no pending IKE rekey DH key"))?;
        if group != dh.group() {
            return Err(SessionError::InvalidSyntax("responder KE group does not match IKE rekey offer"));
        }
        let shared_secret = dh.shared_secret(&peer_public)?;
        let ni = self
            .pending_ike_rekey_ni
            .take()
            .ok_or(SessionError::Internal("no pending IKE rekey nonce"))?;

        let schedule = key_schedule_for(&selected)?;
        let old_sk_d = self.ike_keys.as_ref().ok_or(SessionError::Internal("no ike keys"))?.sk_d.clone();
        let new_keys = ike_crypto::keys::derive_rekeyed_keys(
            schedule,
            &old_sk_d,
            &ni,
            &nr,
            &shared_secret,
            self.initiator_spi,
            self.responder_spi,
        )?;

        self.ike_schedule = Some(schedule);
        self.ike_keys = Some(new_keys);
        self.ni = ni;
        self.nr = nr;
        self.state = SessionState::Established;
        tracing::info!("IKE SA rekeyed");
        Ok(Vec::new())
    }

    // ---- Established: peer-initiated INFORMATIONAL ----------------------

    fn handle_peer_initiated_request(
        &mut self,
        message_id: u32,
        exchange_type: ExchangeType,
        inner: &[Payload],
    ) -> Result<Vec<Effect>, SessionError> {
        if let Some(cached) = self.response_cache.as_ref().and_then(|c| c.lookup(message_id)) {
            return Ok(vec![Effect::Send(cached.to_vec())]);
        }
        if message_id != self.next_peer_message_id {
            return Err(SessionError::InvalidSyntax("out-of-window peer request message ID"));
        }
        match exchange_type {
            ExchangeType::Informational => self.handle_peer_informational(message_id, inner),
            _ => Err(SessionError::UnexpectedState),
        }
    }

    fn handle_peer_informational(
        &mut self,
        message_id: u32,
        inner: &[Payload],
    ) -> Result<Vec<Effect>, SessionError> {
        let delete = inner.iter().find_map(|p| match p {
            Payload::Delete(d) => Some(d.clone()),
            _ => None,
        });

        let Some(delete) = delete else {
            let response = self.encode_and_cache_informational_response(message_id, Vec::new())?;
            self.next_peer_message_id += 1;
            return Ok(vec![Effect::Send(response)]);
        };

        if delete.protocol == SecurityProtocol::InternetKeyExchange {
            let response = self.encode_and_cache_informational_response(message_id, Vec::new())?;
            self.next_peer_message_id += 1;
            self.state = SessionState::Closed;
            return Ok(vec![Effect::Send(response), Effect::SessionClosed]);
        }

        let mut confirmed = Vec::new();
        for spi in &delete.spis {
            if let Ok(spi4) = <[u8; 4]>::try_from(spi.as_slice()) {
                if self.child_sas.iter().any(|c| c.inbound_spi == spi4) {
                    confirmed.push(spi4);
                }
            }
        }
        self.child_sas.retain(|c| !confirmed.contains(&c.inbound_spi));

        let response_payloads = vec![Payload::Delete(DeletePayload::child_sas(delete.protocol, confirmed.clone()))];
        let response = self.encode_and_cache_informational_response(message_id, response_payloads)?;
        self.next_peer_message_id += 1;

        let mut effects: Vec<Effect> = confirmed.iter().map(|spi| Effect::ChildSaDeleted { spi: *spi }).collect();
        effects.push(Effect::Send(response));
        Ok(effects)
    }

    fn encode_and_cache_informational_response(
        &mut self,
        message_id: u32,
        payloads: Vec<Payload>,
    ) -> Result<Vec<u8>, SessionError> {
        let channel = self.channel()?;
        let raw = seal_inner(
            &channel,
            Direction::InitiatorToResponder,
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::Informational,
            true,
            true,
            message_id,
            &payloads,
            &mut rand::rng(),
        )?;
        self.response_cache = Some(ResponseCache::new(message_id, raw.clone()));
        Ok(raw)
    }

    fn handle_deleting_message(&mut self, message: IkeMessage) -> Result<Vec<Effect>, SessionError> {
        if !message.response_flag
            || message.initiator_spi != self.initiator_spi
            || message.responder_spi != self.responder_spi
        {
            return Ok(Vec::new());
        }
        let Some(pending) = &self.pending_request else { return Ok(Vec::new()) };
        if pending.message_id != message.message_id {
            return Ok(Vec::new());
        }

        let mut effects = Vec::new();
        effects.extend(self.cancel_pending());
        if let Some(token) = self.close_timer.take() {
            effects.push(Effect::CancelTimer(token));
        }
        self.state = SessionState::Closed;
        effects.push(Effect::SessionClosed);
        Ok(effects)
    }

    // ---- shared helpers --------------------------------------------------

    fn channel(&self) -> Result<SecuredChannel<'_>, SessionError> {
        let schedule = self.ike_schedule.ok_or(SessionError::Internal("no ike schedule"))?;
        let keys = self.ike_keys.as_ref().ok_or(SessionError::Internal("no ike keys"))?;
        Ok(SecuredChannel::new(schedule, keys))
    }

    fn next_timer_token(&mut self) -> TimerToken {
        let token = TimerToken(self.next_timer_token);
        self.next_timer_token += 1;
        token
    }

    fn cancel_pending(&mut self) -> Option<Effect> {
        self.pending_request.take().map(|p| Effect::CancelTimer(p.timer))
    }

    fn send_with_retransmit(&mut self, message_id: u32, raw: Vec<u8>) -> Vec<Effect> {
        let token = self.next_timer_token();
        let request = PendingRequest::new(message_id, raw.clone(), token);
        let after = request.next_backoff(&self.config);
        self.pending_request = Some(request);
        vec![Effect::Send(raw), Effect::ScheduleTimer { token, after }]
    }
}

fn key_schedule_for(proposal: &Proposal) -> Result<KeySchedule, SessionError> {
    let (encryption, encryption_key_bits) = proposal
        .encryption_algorithms
        .first()
        .copied()
        .ok_or(SessionError::InvalidSyntax("selected proposal missing encryption transform"))?;
    let prf = proposal
        .pseudo_random_functions
        .first()
        .copied()
        .ok_or(SessionError::InvalidSyntax("selected proposal missing PRF transform"))?;
    let integrity = proposal
        .integrity_algorithms
        .first()
        .copied()
        .unwrap_or(ike_wire::params::IntegrityAlgorithm::None);
    Ok(KeySchedule { prf, encryption, encryption_key_bits, integrity })
}

fn spi4(spi: &[u8]) -> Result<[u8; 4], SessionError> {
    spi.try_into().map_err(|_| SessionError::InvalidSyntax("child SA SPI is not 4 bytes"))
}

fn id_payload_body(id: &IkeIdentification) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + id.body().len());
    out.push(id.id_type() as u8);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend(id.body());
    out
}

fn eap_auth_value(prf_alg: PseudorandomFunction, msk: &[u8], signed_octets: &[u8]) -> Result<Vec<u8>, SessionError> {
    let pad_key = prf::prf(prf_alg, msk, b"Key Pad for IKEv2")?;
    Ok(prf::prf(prf_alg, &pad_key, signed_octets)?)
}

fn find_error_notify(payloads: &[Payload]) -> Option<&NotifyPayload> {
    payloads.iter().find_map(|p| match p {
        Payload::Notify(n) if matches!(n.message_type, NotifyMessageType::Error(_)) => Some(n),
        _ => None,
    })
}

fn map_error_notify(notify: &NotifyPayload) -> SessionError {
    match notify.message_type {
        NotifyMessageType::Error(NotifyErrorType::AuthenticationFailed) => SessionError::AuthenticationFailed,
        NotifyMessageType::Error(_) => SessionError::NoAcceptableProposal,
        NotifyMessageType::Status(_) => SessionError::Internal("status notify treated as error"),
    }
}

fn find_sa(payloads: &[Payload]) -> Option<SecurityAssociation> {
    payloads.iter().find_map(|p| match p {
        Payload::SecurityAssociation(sa) => Some(sa.clone()),
        _ => None,
    })
}

fn find_ke(payloads: &[Payload]) -> Option<(DiffieHellmanGroup, Vec<u8>)> {
    payloads.iter().find_map(|p| match p {
        Payload::KeyExchange { group, public_value } => Some((*group, public_value.clone())),
        _ => None,
    })
}

fn find_nonce(payloads: &[Payload]) -> Option<Vec<u8>> {
    payloads.iter().find_map(|p| match p {
        Payload::Nonce(n) => Some(n.clone()),
        _ => None,
    })
}

fn find_tsi(payloads: &[Payload]) -> Option<Vec<IkeTrafficSelector>> {
    payloads.iter().find_map(|p| match p {
        Payload::TrafficSelectorInitiator(ts) => Some(ts.clone()),
        _ => None,
    })
}

fn find_tsr(payloads: &[Payload]) -> Option<Vec<IkeTrafficSelector>> {
    payloads.iter().find_map(|p| match p {
        Payload::TrafficSelectorResponder(ts) => Some(ts.clone()),
        _ => None,
    })
}

fn find_auth(payloads: &[Payload]) -> Option<Vec<u8>> {
    payloads.iter().find_map(|p| match p {
        Payload::Authentication { data, .. } => Some(data.clone()),
        _ => None,
    })
}

fn find_eap(payloads: &[Payload]) -> Option<Vec<u8>> {
    payloads.iter().find_map(|p| match p {
        Payload::ExtensibleAuthentication(bytes) => Some(bytes.clone()),
        _ => None,
    })
}

fn last_encrypted(payloads: &[Payload]) -> Option<&EncryptedPayload> {
    match payloads.last() {
        Some(Payload::Encrypted(encrypted)) => Some(encrypted),
        _ => None,
    }
}

/// Decrypt an Encrypted payload's body, returning its inner payload chain.
/// The associated data is the raw datagram bytes preceding the ciphertext
/// (the outer header plus the SK payload's own generic header), RFC 7296
/// section 5.3.
fn open_inner(
    channel: &SecuredChannel,
    direction: Direction,
    raw: &[u8],
    encrypted: &EncryptedPayload,
) -> Result<Vec<Payload>, SessionError> {
    let aad_len = raw
        .len()
        .checked_sub(encrypted.ciphertext.len())
        .ok_or(SessionError::InvalidSyntax("Encrypted payload ciphertext longer than datagram"))?;
    let aad = &raw[..aad_len];
    let plaintext = channel.open(direction, aad, &encrypted.ciphertext)?;
    Ok(ike_wire::parser::parse_payload_chain(encrypted.first_inner_payload_type, &plaintext)?)
}

/// Seal an inner payload chain (or, if empty, a true empty body) into a full
/// wire-ready datagram: header, SK generic payload header, `IV || ciphertext
/// [|| ICV]`.
///
/// Builds a placeholder message with a correctly sized but zeroed Encrypted
/// payload body first, since the associated data RFC 7296 section 5.3
/// requires (the header plus SK generic header) depends on the total message
/// length, which in turn depends on the sealed body's length -- known up
/// front from [`SecuredChannel::sealed_body_len`] without sealing anything.
#[allow(clippy::too_many_arguments)]
fn seal_inner(
    channel: &SecuredChannel,
    direction: Direction,
    initiator_spi: u64,
    responder_spi: u64,
    exchange_type: ExchangeType,
    initiator_flag: bool,
    response_flag: bool,
    message_id: u32,
    inner_payloads: &[Payload],
    rng: &mut impl RngCore,
) -> Result<Vec<u8>, SessionError> {
    if inner_payloads.is_empty() {
        return seal_plaintext(
            channel,
            direction,
            initiator_spi,
            responder_spi,
            exchange_type,
            initiator_flag,
            response_flag,
            message_id,
            PayloadType::NoNextPayload as u8,
            &[],
            rng,
        );
    }
    let (first_inner_payload_type, plaintext) = generator::encode_payload_chain(inner_payloads)?;
    seal_plaintext(
        channel,
        direction,
        initiator_spi,
        responder_spi,
        exchange_type,
        initiator_flag,
        response_flag,
        message_id,
        first_inner_payload_type,
        &plaintext,
        rng,
    )
}

#[allow(clippy::too_many_arguments)]
fn seal_plaintext(
    channel: &SecuredChannel,
    direction: Direction,
    initiator_spi: u64,
    responder_spi: u64,
    exchange_type: ExchangeType,
    initiator_flag: bool,
    response_flag: bool,
    message_id: u32,
    first_inner_payload_type: u8,
    plaintext: &[u8],
    rng: &mut impl RngCore,
) -> Result<Vec<u8>, SessionError> {
    let sealed_len = channel.sealed_body_len(plaintext.len());
    let placeholder = IkeMessage {
        initiator_spi,
        responder_spi,
        exchange_type,
        initiator_flag,
        response_flag,
        message_id,
        payloads: vec![Payload::Encrypted(EncryptedPayload {
            iv: Vec::new(),
            ciphertext: vec![0u8; sealed_len],
            first_inner_payload_type,
        })],
    };
    let with_placeholder = generator::encode_message(&placeholder)?;
    let aad_len = with_placeholder.len() - sealed_len;
    let aad = &with_placeholder[..aad_len];

    let mut iv = vec![0u8; channel.required_iv_len()];
    rng.fill_bytes(&mut iv);
    let sealed_body = channel.seal(direction, aad, &iv, plaintext)?;

    let mut out = Vec::with_capacity(aad_len + sealed_body.len());
    out.extend_from_slice(aad);
    out.extend_from_slice(&sealed_body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_non_esp_marker_removes_leading_zeros() {
        let datagram = [0u8, 0, 0, 0, 1, 2, 3];
        assert_eq!(strip_non_esp_marker(&datagram), &[1, 2, 3]);
    }

    #[test]
    fn strip_non_esp_marker_is_a_no_op_without_the_marker() {
        let datagram = [1u8, 2, 3, 4, 5];
        assert_eq!(strip_non_esp_marker(&datagram), &datagram[..]);
    }

    #[test]
    fn strip_non_esp_marker_leaves_short_datagrams_alone() {
        let datagram = [0u8, 0];
        assert_eq!(strip_non_esp_marker(&datagram), &datagram[..]);
    }

    #[test]
    fn new_session_starts_in_initial_state() {
        struct NullCredentials;
        impl CredentialStore for NullCredentials {
            fn local_identity(&self) -> IkeIdentification {
                IkeIdentification::KeyId(vec![1, 2, 3])
            }
            fn sign(&self, _signed_octets: &[u8]) -> Result<Vec<u8>, crate::collab::CredentialError> {
                Ok(Vec::new())
            }
            fn verify_peer_auth(
                &self,
                _signed_octets: &[u8],
                _received_auth: &[u8],
            ) -> Result<bool, crate::collab::CredentialError> {
                Ok(true)
            }
        }

        let config = SessionConfig::new(Vec::new(), Vec::new());
        let credentials = NullCredentials;
        let session = IkeSession::new(config, &credentials, None, None);
        assert!(matches!(session.state(), SessionState::Initial));
    }
}

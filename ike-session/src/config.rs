//! Immutable session configuration: the proposals this peer offers, its
//! rekey policy, and the retransmission/close timing knobs.

use ike_wire::params::AuthenticationMethod;
use ike_wire::sa::Proposal;
use std::time::Duration;

/// How this peer authenticates itself in IKE_AUTH, the
/// "send IDi, ..., AUTH or EAP" branch. The responder's own authentication
/// (its AUTH payload, verified via [`crate::collab::CredentialStore::verify_peer_auth`])
/// is unaffected by this choice; only the initiator's side differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Omit AUTH from the first IKE_AUTH request, driving the peer's
    /// EAP method to completion before sending a final AUTH payload
    /// seeded from the exported MSK (RFC 7296 section 2.16), or no AUTH at
    /// all when the responder advertises `EAP_ONLY_AUTHENTICATION` (RFC 5998)
    Eap,
    /// Sign the first IKE_AUTH request's AUTH payload directly via
    /// [`crate::collab::CredentialStore::sign`], the pre-shared-key or
    /// certificate path
    Signature(AuthenticationMethod),
}

/// When to initiate a rekey of the SA this policy is attached to. All
/// thresholds that are `Some` are checked; the first one crossed wins.
/// `None` across the board means "never rekey proactively" — the peer may
/// still rekey us.
#[derive(Debug, Clone, Default)]
pub struct RekeyPolicy {
    /// Rekey once this many bytes have been protected under the current keys
    pub max_bytes: Option<u64>,
    /// Rekey once this many packets have been protected under the current keys
    pub max_packets: Option<u64>,
    /// Rekey once the SA has been established this long
    pub max_age: Option<Duration>,
}

impl RekeyPolicy {
    /// A conservative default: rekey by age alone, every 4 hours, matching
    /// common strongSwan/charon defaults for an IKE SA's reauth interval
    pub fn time_based(max_age: Duration) -> Self {
        Self {
            max_bytes: None,
            max_packets: None,
            max_age: Some(max_age),
        }
    }
}

/// Everything an [`crate::session::IkeSession`] needs to know up front and
/// never changes for the life of the session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Proposals offered in SAi1 (IKE_SA_INIT)
    pub ike_proposals: Vec<Proposal>,
    /// Proposals offered in SAi2 (IKE_AUTH / CREATE_CHILD_SA)
    pub child_proposals: Vec<Proposal>,
    /// How this peer authenticates itself
    pub auth_mode: AuthMode,
    /// Rekey policy applied to the IKE SA itself
    pub ike_rekey_policy: RekeyPolicy,
    /// Rekey policy applied to each Child SA
    pub child_rekey_policy: RekeyPolicy,
    /// Delay before the first retransmission of an unanswered request
    pub retransmit_initial_backoff: Duration,
    /// Number of retransmission attempts before giving up with
    /// [`crate::error::SessionError::Timeout`]; the delay doubles after
    /// every attempt
    pub retransmit_max_attempts: u32,
    /// How long to wait for a peer's acknowledgment of a Delete request
    /// before closing the session locally regardless
    pub close_grace_period: Duration,
    /// Whether an EAP-AKA' network name mismatch (RFC 5448 section 4, the
    /// server's AT_KDF_INPUT not matching the locally configured name) is
    /// tolerated rather than failing the exchange
    pub allow_aka_prime_network_name_mismatch: bool,
    /// Reject at construction time any inner EAP method that cannot export
    /// an MSK/EMSK (EAP-MSCHAPv2 alone, without being tunneled in something
    /// that does), since this session has no other source of SK_pi/SK_pr
    /// signing material for the final AUTH payload
    pub require_msk_bearing_inner_auth: bool,
    /// Locally configured network name matched against an EAP-AKA' server's
    /// AT_KDF_INPUT, RFC 5448 section 4. `None` accepts any network name.
    pub aka_prime_network_name: Option<String>,
}

impl SessionConfig {
    /// Construct a config with the given proposals and house defaults for
    /// everything else: no proactive rekeying, 500ms/doubling/8 attempts
    /// retransmission, a 500ms close grace
    /// period, network name mismatches rejected, and MSK-bearing inner auth
    /// required.
    pub fn new(ike_proposals: Vec<Proposal>, child_proposals: Vec<Proposal>) -> Self {
        Self {
            ike_proposals,
            child_proposals,
            auth_mode: AuthMode::Eap,
            ike_rekey_policy: RekeyPolicy::default(),
            child_rekey_policy: RekeyPolicy::default(),
            retransmit_initial_backoff: Duration::from_millis(500),
            retransmit_max_attempts: 8,
            close_grace_period: Duration::from_millis(500),
            allow_aka_prime_network_name_mismatch: false,
            require_msk_bearing_inner_auth: true,
            aka_prime_network_name: None,
        }
    }
}

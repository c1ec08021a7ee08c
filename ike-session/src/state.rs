//! Session state machine: `Initial -> IkeInitSent -> IkeAuthSent`
//! (with an `EapInProgress` sub-state) `-> Established -> Rekeying -> Deleting
//! -> Closed`.

use crate::eap_driver::ActiveMethod;

/// Where an in-progress inner EAP exchange currently stands inside
/// [`SessionState::IkeAuthSent`]
#[derive(Debug)]
pub struct EapProgress {
    /// The inner method the peer's first non-Identity `EAP-Request` selected
    pub method: ActiveMethod,
    /// Identifier carried on the last `EAP-Request` received, echoed back on
    /// this peer's next `EAP-Response` per RFC 3748 section 4
    pub last_identifier: u8,
}

/// The IKE session's current phase
#[derive(Debug)]
pub enum SessionState {
    /// No messages exchanged yet
    Initial,
    /// `IKE_SA_INIT` request sent, awaiting the responder's reply
    IkeInitSent,
    /// `IKE_AUTH` exchange in progress. `eap` is `Some` once the peer has
    /// selected an inner method (the `EapInProgress` sub-state); it stays
    /// `None` while only the generic `EAP-Request/Identity` round, or a
    /// signature-mode `AUTH` payload, has been exchanged so far.
    IkeAuthSent {
        /// Present once an inner EAP method has started
        eap: Option<EapProgress>,
    },
    /// The IKE SA and its first Child SA are up
    Established,
    /// A `CREATE_CHILD_SA` rekey (of the IKE SA or of a Child SA) is in flight
    Rekeying,
    /// An `INFORMATIONAL` Delete for the IKE SA was sent; waiting for the
    /// peer's acknowledgment or the close grace period to elapse
    Deleting,
    /// The IKE SA no longer exists; the session object should be dropped
    Closed,
}

impl SessionState {
    /// Short tag for diagnostics/log fields, not used for control flow
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Initial => "initial",
            SessionState::IkeInitSent => "ike_init_sent",
            SessionState::IkeAuthSent { eap: None } => "ike_auth_sent",
            SessionState::IkeAuthSent { eap: Some(_) } => "ike_auth_sent/eap",
            SessionState::Established => "established",
            SessionState::Rekeying => "rekeying",
            SessionState::Deleting => "deleting",
            SessionState::Closed => "closed",
        }
    }
}

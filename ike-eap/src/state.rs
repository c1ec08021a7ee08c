//! Method-agnostic scaffolding shared by the EAP-AKA(')/SIM/MSCHAPv2 state
//! machines: the collaborator bundle a method is driven with, the outcome
//! of a single request/response step, and the `EapMethod` trait tying the
//! sibling method state machines to one interface `ike-session` drives
//! without knowing method internals.

use crate::collab::{IdentityStore, UiccOracle};
use crate::error::EapError;
use crate::message::{EapMessage, EapType};

/// The collaborators a method may call out to while handling one request.
/// A given method only uses the ones relevant to it; AKA(')/SIM use `uicc`,
/// MSCHAPv2 uses `identity_store`.
pub struct Collaborators<'a> {
    /// UICC/AKA oracle, used by EAP-AKA(')/SIM
    pub uicc: Option<&'a dyn UiccOracle>,
    /// Credential store, used by EAP-MSCHAPv2
    pub identity_store: Option<&'a dyn IdentityStore>,
}

/// Keying material a method exports to seed the final IKE_AUTH payload,
/// RFC 5998. `MSK`/`EMSK` are both 64 bytes for every method that produces
/// them at all.
#[derive(Clone)]
pub struct ExportedKeys {
    /// Master Session Key
    pub msk: [u8; 64],
    /// Extended Master Session Key
    pub emsk: [u8; 64],
}

impl std::fmt::Debug for ExportedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedKeys").finish_non_exhaustive()
    }
}

/// Result of feeding one EAP-Request into a method state machine
#[derive(Debug)]
pub enum StepOutcome {
    /// Emit this EAP-Response and stay in the method
    Reply(EapMessage),
    /// Emit this EAP-Response and consider the method's peer-visible work
    /// done; the IKE layer still waits for the server's own EAP-Success
    /// before calling [EapMethod::handle_success]
    FinalReply(EapMessage),
}

/// Interface every inner-authentication method state machine implements
///
/// Collaborator calls are synchronous (see `collab` module docs); the
/// embedding session awaits whatever I/O it needs before calling in.
pub trait EapMethod {
    /// The [EapType] this method answers `EAP-Request`s for
    fn eap_type(&self) -> EapType;

    /// Advance the state machine with one `EAP-Request`, producing the
    /// `EAP-Response` to send back
    fn handle_request(
        &mut self,
        request: &EapMessage,
        collab: &Collaborators,
    ) -> Result<StepOutcome, EapError>;

    /// Called when the peer's final `EAP-Success` arrives. Returns the
    /// exported keys if the method produces any (`Ok(None)` for methods
    /// like MSCHAPv2 that authenticate but derive no MSK/EMSK); fails with
    /// [EapError::UnexpectedState] if success arrives before the method's
    /// own challenge step succeeded.
    fn handle_success(&mut self) -> Result<Option<ExportedKeys>, EapError>;
}

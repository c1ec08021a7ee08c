//! Collaborator traits the embedding application implements: everything an
//! [`crate::session::IkeSession`] needs from the outside world but cannot
//! reasonably own itself (the network socket, wall-clock time, SIM/USIM
//! access, local credentials).
//!
//! The UICC and MSCHAPv2 identity collaborators are [`ike_eap`]'s own traits,
//! re-exported unchanged: a session only ever forwards them to whichever
//! [`ike_eap::EapMethod`] the peer selected, so there is no reason to wrap
//! them again here. `DatagramTransport` and `Clock` are genuinely new at
//! this layer and genuinely asynchronous (network I/O, timer delivery),
//! unlike the synchronous UICC/identity calls, so they are modeled as
//! `async fn`s in a trait used as a generic bound rather than a `dyn` object
//! — `async fn` in a trait is not dyn-safe, and a session is monomorphized
//! over one transport and one clock for its whole lifetime anyway.

pub use ike_eap::collab::{AkaAuthType, IdentityError, IdentityStore, UiccError, UiccOracle};
pub use ike_eap::{Collaborators, EapMethod};

use ike_wire::identification::IkeIdentification;
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Failure signing or verifying an AUTH payload
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No local identity/key material is configured
    #[error("no local credentials available")]
    Unavailable,
    /// The signing or verification operation itself failed
    #[error("credential operation failed: {0}")]
    Operation(String),
}

/// Local identity and AUTH-payload signing, kept distinct from
/// [`IdentityStore`] above: that trait is MSCHAPv2's inner-auth credential
/// (username/NT hash/peer challenge), this one is the outer IKE_AUTH
/// exchange's own identity and signing key. A session that also runs
/// MSCHAPv2 will usually implement both traits on different objects.
pub trait CredentialStore {
    /// The identity this peer asserts in its IDi payload
    fn local_identity(&self) -> IkeIdentification;

    /// Produce this peer's AUTH payload value over the signed octets RFC
    /// 7296 section 2.15/2.16 defines for the exchange in progress (the
    /// EAP-authenticated case signs with a key derived from the EAP MSK;
    /// implementations own that derivation).
    fn sign(&self, signed_octets: &[u8]) -> Result<Vec<u8>, CredentialError>;

    /// Verify the peer's AUTH payload value over the same signed octets
    fn verify_peer_auth(
        &self,
        signed_octets: &[u8],
        received_auth: &[u8],
    ) -> Result<bool, CredentialError>;
}

/// Opaque handle identifying one scheduled timer, echoed back through
/// [`crate::session::IkeSession::handle_timer`] when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// Wall-clock access and timer scheduling, abstracted so session logic is
/// deterministic and testable without real sleeps
pub trait Clock {
    /// The current time
    fn now(&self) -> Instant;

    /// Ask to be woken with [`crate::session::IkeSession::handle_timer`] and
    /// this token after `after` elapses
    fn schedule(&self, after: Duration, token: TimerToken);

    /// Cancel a previously scheduled timer; a no-op if it already fired
    fn cancel(&self, token: TimerToken);
}

/// Datagram send/receive, addressed the way UDP/4500 framing requires
pub trait DatagramTransport {
    /// Send one UDP datagram, no-ESP marker already applied by the caller
    fn send(&self, bytes: &[u8], to: SocketAddr) -> impl Future<Output = std::io::Result<()>> + Send;

    /// Receive the next datagram destined for this session
    fn recv(&self) -> impl Future<Output = std::io::Result<(Vec<u8>, SocketAddr)>> + Send;
}

//! IKEv2 client session orchestration: negotiates an IKE SA, authenticates
//! (by signature or by driving an inner EAP method to completion),
//! establishes a Child SA, and handles rekey, delete and DPD afterward.
//!
//! This crate drives only the IKE SA's original-initiator role. It never
//! acts as an IKE responder to an unsolicited `IKE_SA_INIT`; once the IKE SA
//! is up it does answer peer-initiated `INFORMATIONAL` requests (Delete,
//! DPD), since message exchanges are bidirectional regardless of which side
//! originally initiated the SA.
//!
//! [`session::IkeSession`] is a synchronous effects-based state machine: it
//! never touches a socket or a clock. Every public method returns
//! `Vec<effect::Effect>`; the embedding application executes those effects
//! against its own [`collab::DatagramTransport`]/[`collab::Clock`] and feeds
//! results back through [`session::IkeSession::handle_inbound`] or
//! [`session::IkeSession::handle_timer`].
#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

pub mod child_sa;
pub mod collab;
pub mod config;
pub mod eap_driver;
pub mod effect;
pub mod error;
pub mod negotiate;
pub mod retransmit;
pub mod session;
pub mod state;

pub use child_sa::{ChildSa, ChildSaMode};
pub use config::{AuthMode, RekeyPolicy, SessionConfig};
pub use effect::Effect;
pub use error::SessionError;
pub use session::IkeSession;
pub use state::SessionState;

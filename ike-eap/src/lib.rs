//! EAP framing and inner authentication method state machines for IKEv2's
//! EAP-based `IKE_AUTH` exchange, RFC 3748 plus RFC 4187 (EAP-AKA), RFC 5448
//! (EAP-AKA'), RFC 4186 (EAP-SIM) and RFC 2759/2548 (EAP-MSCHAPv2).
//!
//! `ike-session` drives whichever method the peer selects entirely through
//! the [EapMethod] trait, without knowing the method's internal state.
#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

pub mod aka;
pub mod attributes;
pub mod collab;
pub mod error;
pub mod mac;
pub mod message;
pub mod mschapv2;
pub mod network_name;
pub mod sim;
pub mod state;

pub use aka::AkaMethod;
pub use error::EapError;
pub use message::{EapCode, EapMessage, EapType};
pub use mschapv2::MsChapV2Method;
pub use sim::SimMethod;
pub use state::{Collaborators, EapMethod, ExportedKeys, StepOutcome};

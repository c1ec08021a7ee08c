//! Dispatches the peer's inner `EAP-Request`s to the right [`EapMethod`]
//! implementation, chosen from the type the server's first non-Identity
//! request carries.
//!
//! The generic `EAP-Request/Identity` round (RFC 3748 section 5.1) is
//! answered directly by [`crate::session::IkeSession`] rather than through
//! this dispatcher: it carries no method-specific type data, so there is no
//! method state machine to hand it to yet.

use ike_eap::collab::AkaAuthType;
use ike_eap::{AkaMethod, EapMethod, EapType, MsChapV2Method, SimMethod};

/// The inner method currently driving an in-progress EAP exchange
pub enum ActiveMethod {
    /// RFC 4187
    Aka(AkaMethod),
    /// RFC 5448
    AkaPrime(AkaMethod),
    /// RFC 4186
    Sim(SimMethod),
    /// RFC 2759/2548
    MsChapV2(MsChapV2Method),
}

impl ActiveMethod {
    /// Construct the method state machine the peer's `eap_type` selects, or
    /// `None` for types this dispatcher doesn't own (Identity, Notification)
    pub fn for_type(eap_type: EapType, aka_prime_network_name: Option<String>) -> Option<Self> {
        match eap_type {
            EapType::Aka => Some(ActiveMethod::Aka(AkaMethod::new(AkaAuthType::Aka, None))),
            EapType::AkaPrime => Some(ActiveMethod::AkaPrime(AkaMethod::new(
                AkaAuthType::AkaPrime,
                aka_prime_network_name,
            ))),
            EapType::Sim => Some(ActiveMethod::Sim(SimMethod::new())),
            EapType::MsChapV2 => Some(ActiveMethod::MsChapV2(MsChapV2Method::new())),
            EapType::Identity | EapType::Notification => None,
        }
    }

    /// Whether this method, on success, exports an MSK/EMSK usable to seed
    /// the final IKE_AUTH AUTH payload
    pub fn exports_msk(&self) -> bool {
        !matches!(self, ActiveMethod::MsChapV2(_))
    }

    /// Borrow the underlying state machine through the shared [`EapMethod`] interface
    pub fn method(&mut self) -> &mut dyn EapMethod {
        match self {
            ActiveMethod::Aka(m) | ActiveMethod::AkaPrime(m) => m,
            ActiveMethod::Sim(m) => m,
            ActiveMethod::MsChapV2(m) => m,
        }
    }
}

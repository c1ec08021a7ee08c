//! Notify payload data model, see RFC 7296 section 3.10

use crate::params::{NotifyErrorType, NotifyStatusType, SecurityProtocol};

/// The message type a Notify payload carries, either an error or a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMessageType {
    /// Below 16384
    Error(NotifyErrorType),
    /// At or above 16384
    Status(NotifyStatusType),
}

impl NotifyMessageType {
    /// Raw IANA value of the wrapped type
    pub fn value(self) -> u16 {
        match self {
            NotifyMessageType::Error(e) => e as u16,
            NotifyMessageType::Status(s) => s as u16,
        }
    }
}

/// A decoded Notify payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPayload {
    /// Protocol the notification concerns; `None` for IKE SA-wide notifications
    pub protocol: Option<SecurityProtocol>,
    /// SPI this notification concerns; empty for IKE SA-wide notifications
    pub spi: Vec<u8>,
    /// Error or status type
    pub message_type: NotifyMessageType,
    /// Type-specific data, e.g. the responder's nonce in `COOKIE` or the
    /// accepted lifetime in a rekey hint. Empty for most error notifications.
    pub data: Vec<u8>,
}

impl NotifyPayload {
    /// An IKE SA-wide error notification carrying no data, the common case
    /// for aborting an exchange (e.g. NO_PROPOSAL_CHOSEN, AUTHENTICATION_FAILED)
    pub fn error(error: NotifyErrorType) -> Self {
        Self {
            protocol: None,
            spi: Vec::new(),
            message_type: NotifyMessageType::Error(error),
            data: Vec::new(),
        }
    }

    /// An IKE SA-wide status notification, e.g. REKEY_SA on the new Child SA's
    /// IKE_AUTH request referencing the SPI being replaced
    pub fn status(status: NotifyStatusType, data: Vec<u8>) -> Self {
        Self {
            protocol: None,
            spi: Vec::new(),
            message_type: NotifyMessageType::Status(status),
            data,
        }
    }
}

//! Effects a state-machine step produces, following an effects-based design:
//! `(state, event) -> (state, [effects])`. Every
//! public entry point on [`crate::session::IkeSession`] returns
//! `Vec<Effect>` instead of performing I/O itself, so the state machine
//! stays synchronous and trivially testable; the caller (or the thin
//! `tokio`-based driver a real application writes around it) is the only
//! thing that ever touches a [`crate::collab::DatagramTransport`] or
//! [`crate::collab::Clock`].

use crate::collab::TimerToken;
use std::time::Duration;

/// One thing the embedding application must do in response to a state
/// machine step
#[derive(Debug)]
pub enum Effect {
    /// Send this already-encoded datagram to the peer
    Send(Vec<u8>),
    /// Ask the [`crate::collab::Clock`] to schedule a wakeup
    ScheduleTimer {
        /// Token to echo back through `handle_timer`
        token: TimerToken,
        /// Delay from now
        after: Duration,
    },
    /// Ask the [`crate::collab::Clock`] to cancel a previously scheduled timer
    CancelTimer(TimerToken),
    /// The IKE SA (and its first Child SA) finished establishing
    Established,
    /// A Child SA finished establishing; carries its inbound SPI
    ChildSaEstablished {
        /// SPI this peer chose for inbound traffic on the new Child SA
        spi: [u8; 4],
    },
    /// A Child SA was torn down, locally or by the peer; carries its inbound SPI
    ChildSaDeleted {
        /// SPI of the Child SA that no longer exists
        spi: [u8; 4],
    },
    /// The IKE SA itself is gone; the session object should be dropped
    SessionClosed,
}

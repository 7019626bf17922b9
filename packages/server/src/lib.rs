//! Banter chat server library.
//!
//! Authoritative side of the protocol: the session registry, the
//! per-connection protocol state machine, broadcast fan-out with the
//! periodic roster push, the durable history log, and the TCP transport.

pub mod broadcast;
pub mod console;
pub mod error;
pub mod handler;
pub mod history;
pub mod registry;
pub mod state;
pub mod transport;

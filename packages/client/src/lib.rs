//! Banter chat client library.
//!
//! The client keeps a local mirror of server state (roster, history,
//! connection phase), renders incoming packets to the terminal, and
//! feeds stdin lines back to the server as chat messages.

pub mod defaults;
pub mod error;
pub mod formatter;
pub mod mirror;
pub mod session;

//! Shared protocol library for the Banter chat application.
//!
//! This crate holds everything the server and client binaries agree on:
//! the binary wire codec, the packet model, the common data types with
//! their validation rules, and the document persistence collaborator.

pub mod codec;
pub mod framing;
pub mod logger;
pub mod packet;
pub mod store;
pub mod types;

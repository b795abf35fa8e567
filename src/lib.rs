//! Client side RADIUS transaction engine
//!
//! Builds Access-Request & Accounting-Request packets, obscures User-Password, verifies replies,
//! retransmits on timeout and fails over across an ordered pool of RADIUS Servers.
//!
//! `protocol` holds everything about the wire format and its hashing, `client` holds the engine
//! and a ready to use UDP Client. If you want to see how to build a RADIUS Client, a good starting
//! point is to look inside `demos/` and `tests/`


#![deny(
    missing_docs,
    rust_2018_idioms,
    unused_imports
)]


pub mod client;
pub mod protocol;
pub mod tools;

// Optional features
pub mod features {
    #![cfg_attr(feature = "async-radius",      doc = "## Enable Future based RADIUS Client")]
    #![cfg_attr(not(feature = "async-radius"), doc = "## Disable Future based RADIUS Client")]
}

//! Protocol implementation
//!
//! `dictionary` module - represents built-in RADIUS dictionary with attributes a NAS needs for
//! authentication & accounting
//! `radius_packet` module - represents RADIUS packet & attribute and their wire encoding
//! `crypto` module - Request/Response Authenticator, User-Password obscuring and
//! Message-Authenticator hashing
//! `builder` module - turns request code, identifier & attributes into final wire bytes
//! `validator` module - verifies replies against the request they answer
//! `error` module - represents custom errors defined for `radius-engine` crate


pub mod builder;
pub mod crypto;
pub mod dictionary;
pub mod error;
pub mod radius_packet;
pub mod validator;

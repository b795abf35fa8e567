//! RADIUS Client transaction engine
//!
//! `server` & `pool` modules - RADIUS Servers a NAS talks to and the ordered pools used for
//! failover
//! `session` module - single request/response exchange, including its retries and failovers
//! `manager` module - owns Connections & Sessions, matches replies and drives retry timers
//! `udp` module - connected UDP socket per Connection, driven by `mio`
//! `client` module - ready to use Client, that runs the engine on a dispatcher thread
//!
//! The engine itself never touches sockets: anything implementing [`Transport`] can carry its
//! packets, which is how tests drive it with a manual clock


pub mod client;
pub mod manager;
pub mod pool;
pub mod server;
pub mod session;
pub mod udp;

mod connection;

pub use client::Client;
pub use manager::{ EngineConfig, SessionManager };
pub use pool::ServerPool;
pub use server::Server;
pub use session::{ Outcome, SessionHandle, SessionInfo, SessionState };
pub use udp::UdpTransport;

use crate::protocol::error::RadiusError;

use std::fmt;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Opaque handle of a transport binding; the engine hands it out, transport keys its sockets by it
pub struct ConnectionId(pub usize);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Remote address a Connection is bound to
pub struct Endpoint {
    host: String,
    port: u16
}

impl Endpoint {
    /// Creates Endpoint for given hostname/IP address & port
    pub fn new(host: &str, port: u16) -> Endpoint {
        Endpoint { host: host.to_string(), port }
    }

    /// Returns hostname/IP address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns port
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}


/// Carries packets of [`SessionManager`] to RADIUS Servers
///
/// Delivery is neither reliable nor ordered. Incoming datagrams are handed back to the engine via
/// [`SessionManager::handle_datagram`] and receive errors via
/// [`SessionManager::connection_failed`]
pub trait Transport {
    /// Binds `connection` to `endpoint`; called once per Connection, before any `send`
    ///
    /// Called without the engine lock held, so it may resolve names and block
    fn open(&self, connection: ConnectionId, endpoint: &Endpoint) -> Result<(), RadiusError>;

    /// Sends one datagram over `connection`
    fn send(&self, connection: ConnectionId, bytes: &[u8]) -> Result<(), RadiusError>;

    /// Releases `connection`; no `send` follows
    fn close(&self, connection: ConnectionId);
}

//! RADIUS Server a NAS sends its requests to


use super::Endpoint;
use crate::protocol::error::RadiusError;
use crate::protocol::radius_packet::{ RadiusMsgType, TypeCode };

use std::fmt;
use std::time::Duration;


/// Default port for Access-Request
pub const DEFAULT_AUTH_PORT: u16      = 1812;
/// Default port for Accounting-Request
pub const DEFAULT_ACCT_PORT: u16      = 1813;
/// Default time to wait for a reply before retransmitting
pub const DEFAULT_TIMEOUT:   Duration = Duration::from_secs(3);
/// Default number of retransmissions before moving on to the next Server
pub const DEFAULT_RETRIES:   u16      = 2;


#[derive(Clone)]
/// Represents RADIUS Server with its shared secret, ports and retry settings
///
/// Built once and registered in a [`ServerPool`](super::ServerPool); immutable afterwards, so any
/// number of transactions may refer to one Server at the same time
pub struct Server {
    name:      String,
    host:      String,
    auth_port: u16,
    acct_port: u16,
    secret:    Vec<u8>,
    timeout:   Duration,
    retries:   u16
}

impl Server {
    /// Initialises Server with default ports (1812/1813), timeout (3s) and retries (2)
    ///
    /// Server is named after its host, unless *set_name()* is used
    pub fn new(host: &str, secret: &[u8]) -> Server {
        Server {
            name:      host.to_string(),
            host:      host.to_string(),
            auth_port: DEFAULT_AUTH_PORT,
            acct_port: DEFAULT_ACCT_PORT,
            secret:    secret.to_vec(),
            timeout:   DEFAULT_TIMEOUT,
            retries:   DEFAULT_RETRIES
        }
    }

    // Setters
    /// **Optional**
    ///
    /// Sets the name Server is known by within its pool
    pub fn set_name(mut self, name: &str) -> Server {
        self.name = name.to_string();
        self
    }

    /// **Optional**
    ///
    /// Sets remote port, that responsible for specific RADIUS Message Type
    pub fn set_port(mut self, msg_type: RadiusMsgType, port: u16) -> Server {
        match msg_type {
            RadiusMsgType::AUTH => self.auth_port = port,
            RadiusMsgType::ACCT => self.acct_port = port
        }
        self
    }

    /// **Optional**
    ///
    /// Sets time to wait for a reply to each attempt
    pub fn set_timeout(mut self, timeout: Duration) -> Server {
        self.timeout = timeout;
        self
    }

    /// **Optional**
    ///
    /// Sets number of retransmissions to this Server before failing over
    pub fn set_retries(mut self, retries: u16) -> Server {
        self.retries = retries;
        self
    }
    // ===================

    /// Returns Server name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns hostname/IP address of Server
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns port of RADIUS server, that receives given type of RADIUS message/packet
    pub fn port(&self, code: &TypeCode) -> u16 {
        match code.msg_type() {
            RadiusMsgType::AUTH => self.auth_port,
            RadiusMsgType::ACCT => self.acct_port
        }
    }

    /// Returns remote address for given type of RADIUS message/packet
    pub fn endpoint(&self, code: &TypeCode) -> Endpoint {
        Endpoint::new(&self.host, self.port(code))
    }

    /// Returns shared secret
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Returns per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns retries
    pub fn retries(&self) -> u16 {
        self.retries
    }

    /// Checks that Server can be talked to
    pub fn validate(&self) -> Result<(), RadiusError> {
        if self.name.is_empty() {
            return Err( RadiusError::ConfigurationError { error: String::from("Server name cannot be empty") } )
        }
        if self.host.is_empty() {
            return Err( RadiusError::ConfigurationError { error: format!("Server '{}' has no host", self.name) } )
        }
        if self.secret.is_empty() {
            return Err( RadiusError::ConfigurationError { error: format!("Server '{}' secret cannot be empty", self.name) } )
        }
        if self.timeout == Duration::from_secs(0) {
            return Err( RadiusError::ConfigurationError { error: format!("Server '{}' timeout cannot be 0", self.name) } )
        }
        if self.auth_port == 0 || self.acct_port == 0 {
            return Err( RadiusError::ConfigurationError { error: format!("Server '{}' port cannot be 0", self.name) } )
        }
        Ok(())
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("name",      &self.name)
            .field("host",      &self.host)
            .field("auth_port", &self.auth_port)
            .field("acct_port", &self.acct_port)
            .field("secret",    &"<redacted>")
            .field("timeout",   &self.timeout)
            .field("retries",   &self.retries)
            .finish()
    }
}

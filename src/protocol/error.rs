//! Custom errors that are used across `radius-engine`


use thiserror::Error;


/// Represents all errors generated by this library
#[derive(Debug, Error)]
pub enum RadiusError {
    /// Error happens, when Radius Packet cannot be parsed or built
    #[error("Radius packet is malformed: {error}")]
    MalformedPacketError {
        /// Error details
        error: String
    },
    /// Error happens, when attribute value does not fit its type or wire limits
    #[error("Attribute in Radius packet is malformed: {error}")]
    MalformedAttributeError {
        /// Error details
        error: String
    },
    /// Error happens, when a reply is well formed but does not answer the request in flight
    #[error("Verification failed for incoming Radius packet: {error}")]
    ValidationError {
        /// Error details
        error: String
    },
    /// Error happens, when authenticator or Message-Authenticator of a reply does not match
    #[error("Authentication failed for incoming Radius packet: {error}")]
    AuthenticationFailure {
        /// Error details
        error: String
    },
    /// Error happens, when a new transaction cannot be admitted on a connection
    #[error("Transaction is not admitted: {error}")]
    AdmissionError {
        /// Error details
        error: String
    },
    /// Error happens, when servers or pools are registered with invalid settings
    #[error("Invalid configuration: {error}")]
    ConfigurationError {
        /// Error details
        error: String
    },
    /// Error happens, when a transaction is dropped before it reached a terminal outcome
    #[error("Transaction was cancelled before completion")]
    TransactionCancelled,
    /// Error happens, when there is some sort of connection error for sockets
    #[error("Socket connection error: {0}")]
    SocketConnectionError(#[from] std::io::Error),
    /// Error happens, when socket cannot parse given hostname/IP address
    #[error("Invalid socket connection: {0}")]
    SocketAddrParseError(#[from] std::net::AddrParseError),
    /// Error happens, when data is requested for a connection that is not open
    #[error("Invalid socket connection: {error}")]
    SocketInvalidConnectionError {
        /// Error details
        error: String
    },
}

impl RadiusError {
    /// Whether the error makes an incoming datagram get dropped silently
    ///
    /// Malformed and unauthenticated replies are indistinguishable from packet loss for the
    /// transaction they would have matched
    pub fn is_discard(&self) -> bool {
        matches!(self,
            RadiusError::MalformedPacketError { .. }
            | RadiusError::MalformedAttributeError { .. }
            | RadiusError::ValidationError { .. }
            | RadiusError::AuthenticationFailure { .. })
    }
}

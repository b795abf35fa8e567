//! Connected UDP socket per Connection, registered with a `mio` poll


use super::{ ConnectionId, Endpoint, Transport };
use crate::protocol::error::RadiusError;

use log::{ debug, warn };
use mio::{ Interest, Registry, Token };
use mio::net::UdpSocket;
use std::collections::HashMap;
use std::net::{ SocketAddr, ToSocketAddrs };
use std::sync::{ Mutex, MutexGuard };


/// Transport over UDP, as RFC 2865 defines it
///
/// Every socket gets registered for READABLE under `Token(connection)`, so whoever polls the
/// registry can tell which Connection a datagram arrived on
pub struct UdpTransport {
    registry: Registry,
    sockets:  Mutex<HashMap<ConnectionId, UdpSocket>>
}

impl UdpTransport {
    /// Initialises transport; sockets are registered with `registry`
    pub fn new(registry: Registry) -> UdpTransport {
        UdpTransport {
            registry,
            sockets: Mutex::new(HashMap::new())
        }
    }

    fn sockets(&self) -> MutexGuard<'_, HashMap<ConnectionId, UdpSocket>> {
        self.sockets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads one datagram received on `connection`
    ///
    /// `WouldBlock` comes back as `SocketConnectionError` once the socket is drained
    pub fn recv(&self, connection: ConnectionId, buffer: &mut [u8]) -> Result<usize, RadiusError> {
        let sockets = self.sockets();
        let socket  = sockets.get(&connection).ok_or_else(|| RadiusError::SocketInvalidConnectionError { error: format!("{} is not open", connection) })?;

        Ok(socket.recv(buffer)?)
    }

    /// Returns local address `connection` is bound to
    pub fn local_addr(&self, connection: ConnectionId) -> Result<SocketAddr, RadiusError> {
        let sockets = self.sockets();
        let socket  = sockets.get(&connection).ok_or_else(|| RadiusError::SocketInvalidConnectionError { error: format!("{} is not open", connection) })?;

        Ok(socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn open(&self, connection: ConnectionId, endpoint: &Endpoint) -> Result<(), RadiusError> {
        let remote = (endpoint.host(), endpoint.port()).to_socket_addrs()?
            .next()
            .ok_or_else(|| RadiusError::SocketInvalidConnectionError { error: format!("{} does not resolve to any address", endpoint) })?;
        let local_bind: SocketAddr = (if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" }).parse()?;

        let mut socket = UdpSocket::bind(local_bind)?;
        socket.connect(remote)?;
        self.registry.register(&mut socket, Token(connection.0), Interest::READABLE)?;

        debug!("{} bound to {}, connected to {}", connection, socket.local_addr()?, remote);
        self.sockets().insert(connection, socket);
        Ok(())
    }

    fn send(&self, connection: ConnectionId, bytes: &[u8]) -> Result<(), RadiusError> {
        let sockets = self.sockets();
        let socket  = sockets.get(&connection).ok_or_else(|| RadiusError::SocketInvalidConnectionError { error: format!("{} is not open", connection) })?;

        let sent = socket.send(bytes)?;
        if sent != bytes.len() {
            return Err( RadiusError::SocketInvalidConnectionError { error: format!("{} sent {} of {} bytes", connection, sent, bytes.len()) } )
        }
        Ok(())
    }

    fn close(&self, connection: ConnectionId) {
        if let Some(mut socket) = self.sockets().remove(&connection) {
            if let Err(error) = self.registry.deregister(&mut socket) {
                warn!("Failed to deregister {}: {}", connection, error);
            }
        }
    }
}

//! Ready to use RADIUS Client
//!
//! Runs [`SessionManager`] over [`UdpTransport`] with one dispatcher thread, which polls every
//! socket, hands datagrams to the engine and fires deadlines at least once per tick


use super::manager::{ EngineConfig, SessionManager };
use super::pool::ServerPool;
use super::session::{ Outcome, SessionHandle };
use super::udp::UdpTransport;
use super::ConnectionId;
use crate::protocol::error::RadiusError;
use crate::protocol::radius_packet::{ RadiusAttribute, TypeCode, MAX_PACKET_LENGTH };

use log::{ debug, error, warn };
use mio::{ Events, Poll, Token, Waker };
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::mpsc;
use std::thread::{ self, JoinHandle };
use std::time::Instant;

#[cfg(feature = "async-radius")]
use futures::channel::oneshot;


const WAKER: Token = Token(usize::MAX - 1);


/// Represents RADIUS client instance
///
/// Dropping Client stops its dispatcher and drops every pending transaction. Client may be dropped
/// from inside a completion callback; the dispatcher then winds down on its own instead of being
/// joined
pub struct Client {
    manager:    Arc<SessionManager<UdpTransport>>,
    waker:      Waker,
    running:    Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>
}

impl Client {
    /// Initialise RADIUS client instance and starts its dispatcher thread
    pub fn initialise_client(config: EngineConfig) -> Result<Client, RadiusError> {
        let socket_poll = Poll::new()?;
        let waker       = Waker::new(socket_poll.registry(), WAKER)?;
        let transport   = UdpTransport::new(socket_poll.registry().try_clone()?);
        let manager     = Arc::new(SessionManager::new(transport, config));
        let running     = Arc::new(AtomicBool::new(true));

        let dispatcher = {
            let manager = Arc::clone(&manager);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(String::from("radius-dispatcher"))
                .spawn(move || dispatch(socket_poll, manager, running))?
        };

        Ok(Client { manager, waker, running, dispatcher: Some(dispatcher) })
    }

    /// Returns engine Client runs
    pub fn manager(&self) -> &SessionManager<UdpTransport> {
        &self.manager
    }

    /// Starts transaction; `on_complete` runs on the dispatcher thread
    pub fn start_transaction<F>(&self, pool: &ServerPool, code: TypeCode, attributes: Vec<RadiusAttribute>, on_complete: F) -> Result<SessionHandle, RadiusError>
    where F: FnOnce(Outcome) + Send + 'static {
        let handle = self.manager.start_transaction(pool, code, attributes, on_complete)?;
        // Deadline of the new Session may be closer than the one dispatcher sleeps towards
        Ok(woken(handle, self.waker.wake()))
    }

    /// Cancels pending transaction; its callback never runs
    pub fn cancel(&self, handle: SessionHandle) -> bool {
        self.manager.cancel(handle)
    }

    /// Sends request and blocks until the transaction completes
    ///
    /// `TransactionCancelled` is returned if the transaction is cancelled from another thread
    pub fn send_and_receive(&self, pool: &ServerPool, code: TypeCode, attributes: Vec<RadiusAttribute>) -> Result<Outcome, RadiusError> {
        let (sender, receiver) = mpsc::channel();

        self.start_transaction(pool, code, attributes, move |outcome| {
            let _ = sender.send(outcome);
        })?;
        receiver.recv().map_err(|_| RadiusError::TransactionCancelled)
    }

    #[cfg(feature = "async-radius")]
    /// Sends request and resolves once the transaction completes
    pub async fn send_async(&self, pool: &ServerPool, code: TypeCode, attributes: Vec<RadiusAttribute>) -> Result<Outcome, RadiusError> {
        let (sender, receiver) = oneshot::channel();

        self.start_transaction(pool, code, attributes, move |outcome| {
            let _ = sender.send(outcome);
        })?;
        receiver.await.map_err(|_| RadiusError::TransactionCancelled)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Err(error) = self.waker.wake() {
            warn!("Failed to wake RADIUS dispatcher: {}", error);
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.thread().id() == thread::current().id() {
                debug!("RADIUS Client dropped on its dispatcher, leaving it to stop");
            } else if dispatcher.join().is_err() {
                error!("RADIUS dispatcher panicked");
            }
        }
        self.manager.shutdown();
    }
}

/// A failed wake-up only delays the new Session until the next tick; it is still in flight
fn woken(handle: SessionHandle, wake: std::io::Result<()>) -> SessionHandle {
    if let Err(error) = wake {
        warn!("Failed to wake RADIUS dispatcher for {}: {}", handle, error);
    }
    handle
}

fn dispatch(mut socket_poll: Poll, manager: Arc<SessionManager<UdpTransport>>, running: Arc<AtomicBool>) {
    let mut events = Events::with_capacity(1024);
    let mut buffer = [0u8; MAX_PACKET_LENGTH];
    let tick       = manager.config().tick();

    while running.load(Ordering::Acquire) {
        let timeout = match manager.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(tick),
            None           => tick
        };

        if let Err(poll_error) = socket_poll.poll(&mut events, Some(timeout)) {
            if poll_error.kind() != ErrorKind::Interrupted {
                error!("RADIUS dispatcher stopped: {}", poll_error);
                break;
            }
        }

        for event in events.iter() {
            if event.token() == WAKER {
                continue;
            }
            drain(&manager, ConnectionId(event.token().0), &mut buffer);
        }

        manager.poll_timeouts(Instant::now());
    }
}

/// Reads every datagram queued on `connection`
fn drain(manager: &SessionManager<UdpTransport>, connection: ConnectionId, buffer: &mut [u8]) {
    loop {
        match manager.transport().recv(connection, buffer) {
            Ok(amount) => match manager.handle_datagram(connection, &buffer[..amount]) {
                Ok(handle) => debug!("Reply on {} completed {}", connection, handle),
                Err(error) => debug!("Dropped datagram on {}: {}", connection, error)
            },
            Err(RadiusError::SocketConnectionError(error)) if error.kind() == ErrorKind::WouldBlock => break,
            Err(RadiusError::SocketConnectionError(error))                                          => {
                warn!("Receive on {} failed: {}", connection, error);
                manager.connection_failed(connection, Instant::now());
                break;
            },
            Err(error)                                                                              => {
                debug!("Event for {} ignored: {}", connection, error);
                break;
            }
        }
    }
}

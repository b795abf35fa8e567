//! Transaction engine: owns Connections and Sessions, matches replies to requests and drives
//! retransmissions and failover
//!
//! The engine is sans-IO. Datagrams come in through [`SessionManager::handle_datagram`], time
//! comes in through [`SessionManager::poll_timeouts`] and packets go out through a [`Transport`].
//! All mutable state sits behind one lock, so a reply racing a retransmission for the same Session
//! completes it at most once. Completion callbacks always run after that lock is released.
//!
//! Retransmission policy: an attempt against the same Server resends the retained bytes verbatim,
//! keeping the Request Authenticator and obscured User-Password. Moving on to the next Server
//! builds a new packet, with a new identifier, a fresh authenticator and that Server's secret


use super::{ ConnectionId, Endpoint, Transport };
use super::connection::Connection;
use super::pool::ServerPool;
use super::server::Server;
use super::session::{ Completion, Outcome, Session, SessionHandle, SessionInfo, SessionState };
use crate::protocol::builder::{ RequestBuilder, WirePacket };
use crate::protocol::error::RadiusError;
use crate::protocol::radius_packet::{ RadiusAttribute, TypeCode, RADIUS_HEADER_LENGTH };
use crate::protocol::validator::verify_reply;

use log::{ debug, info, warn };
use std::collections::HashMap;
use std::sync::{ Arc, Mutex, MutexGuard };
use std::time::{ Duration, Instant };


/// Identifiers available on a single Connection
pub const MAX_OUTSTANDING: usize = 256;


#[derive(Debug, Clone)]
/// Engine wide settings
pub struct EngineConfig {
    message_authenticator: bool,
    max_outstanding:       usize,
    tick:                  Duration
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            message_authenticator: true,
            max_outstanding:       MAX_OUTSTANDING,
            tick:                  Duration::from_millis(200)
        }
    }
}

impl EngineConfig {
    /// **Optional**
    ///
    /// Whether Access-Requests carry Message-Authenticator; on by default
    pub fn set_message_authenticator(mut self, enabled: bool) -> EngineConfig {
        self.message_authenticator = enabled;
        self
    }

    /// **Optional**
    ///
    /// Limits transactions in flight on one Connection; clamped to 1..=256
    pub fn set_max_outstanding(mut self, max_outstanding: usize) -> EngineConfig {
        self.max_outstanding = max_outstanding.max(1).min(MAX_OUTSTANDING);
        self
    }

    /// **Optional**
    ///
    /// Sets the longest time a driver waits before checking deadlines again
    pub fn set_tick(mut self, tick: Duration) -> EngineConfig {
        self.tick = tick;
        self
    }

    /// Returns whether Access-Requests carry Message-Authenticator
    pub fn message_authenticator(&self) -> bool {
        self.message_authenticator
    }

    /// Returns limit of transactions in flight on one Connection
    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding
    }

    /// Returns driver tick
    pub fn tick(&self) -> Duration {
        self.tick
    }
}


#[derive(Default)]
struct Registry {
    connections:     HashMap<ConnectionId, Connection>,
    by_endpoint:     HashMap<Endpoint, ConnectionId>,
    sessions:        HashMap<SessionHandle, Session>,
    next_connection: usize,
    next_handle:     u64,
    closed:          bool
}

/// Attempt that was built and registered, but not yet handed to transport
struct Attempt {
    connection: ConnectionId,
    identifier: u8,
    packet:     WirePacket
}

type Finished = (Completion, Outcome);

/// What is left to do for a Session whose attempt ended
enum Step {
    /// Resent, moved on to another Server or gone
    Settled,
    /// Outcome reached, callback still to run
    Finished(Finished),
    /// Detached, waiting for a Connection to the next Server to open
    Relocate(SessionHandle, Endpoint, Arc<Server>)
}


/// Owns every Connection and Session of one engine instance
///
/// Created with [`SessionManager::new`] and torn down with [`SessionManager::shutdown`]; nothing
/// lives in process-wide statics. [`Transport::open`] is never called with the engine lock held,
/// so a slow name lookup for one Server does not stall replies and deadlines of the others
pub struct SessionManager<T: Transport> {
    transport: T,
    config:    EngineConfig,
    registry:  Mutex<Registry>
}

impl<T: Transport> SessionManager<T> {
    /// Initialises engine on top of given transport
    pub fn new(transport: T, config: EngineConfig) -> SessionManager<T> {
        SessionManager {
            transport,
            config,
            registry: Mutex::new(Registry::default())
        }
    }

    /// Returns transport engine sends its packets through
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts transaction against the first Server of `pool`
    ///
    /// `on_complete` runs exactly once with the outcome, unless the transaction gets cancelled or
    /// the engine shut down first. Fails fast, without sending anything, when the request cannot
    /// be built, the Connection cannot be opened or no identifier is free on it
    pub fn start_transaction<F>(&self, pool: &ServerPool, code: TypeCode, attributes: Vec<RadiusAttribute>, on_complete: F) -> Result<SessionHandle, RadiusError>
    where F: FnOnce(Outcome) + Send + 'static {
        self.start_transaction_at(pool, code, attributes, on_complete, Instant::now())
    }

    /// Same as [`start_transaction`](Self::start_transaction), with the clock supplied by caller
    pub fn start_transaction_at<F>(&self, pool: &ServerPool, code: TypeCode, attributes: Vec<RadiusAttribute>, on_complete: F, now: Instant) -> Result<SessionHandle, RadiusError>
    where F: FnOnce(Outcome) + Send + 'static {
        if !code.is_request() {
            return Err( RadiusError::MalformedPacketError { error: format!("{:?} is not a request a client can send", code) } )
        }
        let server     = pool.first().ok_or_else(|| RadiusError::ConfigurationError { error: format!("Pool '{}' has no servers", pool.name()) })?;
        let connection = self.open_connection(&server.endpoint(&code))?;

        let mut guard = self.registry();
        let registry  = &mut *guard;

        if registry.closed {
            return Err( RadiusError::AdmissionError { error: String::from("engine is shut down") } )
        }

        let handle = SessionHandle::new(registry.next_handle);
        registry.next_handle += 1;

        let attempt = self.attach(registry, handle, code, &attributes, &server, connection)?;
        let mut session = Session {
            code,
            attributes,
            pool:          pool.clone(),
            server,
            connection:    attempt.connection,
            identifier:    attempt.identifier,
            authenticator: *attempt.packet.authenticator(),
            packet:        attempt.packet.into_bytes(),
            retries_left:  0,
            deadline:      now,
            state:         SessionState::Created,
            attempts:      0,
            failovers:     0,
            detached:      false,
            on_complete:   Some(Box::new(on_complete))
        };
        session.retries_left = session.server.retries();

        self.transmit(handle, &mut session, SessionState::Sent, now);
        registry.sessions.insert(handle, session);

        Ok(handle)
    }

    /// Cancels pending transaction; its callback never runs
    ///
    /// Returns false if the transaction is unknown or already completed
    pub fn cancel(&self, handle: SessionHandle) -> bool {
        let mut guard = self.registry();
        let registry  = &mut *guard;

        match registry.sessions.remove(&handle) {
            Some(session) => {
                release(registry, &session, handle);
                debug!("Cancelled {} in state {:?}", handle, session.state);
                true
            },
            None          => false
        }
    }

    /// Hands datagram received on `connection` to the Session waiting for it
    ///
    /// Returns the completed Session. Errors mean the datagram was dropped: it was malformed, did
    /// not match any pending identifier or failed verification. The pending Session, if any, keeps
    /// its deadline as if nothing arrived
    pub fn handle_datagram(&self, connection: ConnectionId, bytes: &[u8]) -> Result<SessionHandle, RadiusError> {
        let (handle, finished) = {
            let mut guard = self.registry();
            let registry  = &mut *guard;

            if bytes.len() < RADIUS_HEADER_LENGTH {
                return Err( RadiusError::MalformedPacketError { error: format!("datagram of {} bytes is shorter than header", bytes.len()) } )
            }
            let identifier = bytes[1];

            let handle = registry.connections.get(&connection)
                .ok_or_else(|| RadiusError::SocketInvalidConnectionError { error: format!("{} is not open", connection) })?
                .lookup(identifier)
                .ok_or_else(|| RadiusError::AuthenticationFailure { error: format!("no transaction awaits identifier {} on {}", identifier, connection) })?;

            let reply = {
                let session = registry.sessions.get(&handle)
                    .ok_or_else(|| RadiusError::AuthenticationFailure { error: format!("{} is no longer pending", handle) })?;
                verify_reply(&session.code, identifier, &session.authenticator, session.server.secret(), bytes)?
            };
            let (state, outcome) = Outcome::from_reply(reply)?;

            let mut session = match registry.sessions.remove(&handle) {
                Some(session) => session,
                None          => return Err( RadiusError::AuthenticationFailure { error: format!("{} is no longer pending", handle) } )
            };
            release(registry, &session, handle);
            session.state = state;

            debug!("{} completed as {:?} by {} after {} attempt(s)", handle, state, session.server.name(), session.attempts);
            (handle, session.on_complete.take().map(|on_complete| (on_complete, outcome)))
        };

        complete(finished.into_iter());
        Ok(handle)
    }

    /// Acts on every deadline reached at `now`: retransmits, fails over or exhausts
    ///
    /// Returns the number of Sessions whose deadline fired. Drivers call it at least once per tick
    pub fn poll_timeouts(&self, now: Instant) -> usize {
        let (fired, steps) = {
            let mut guard = self.registry();
            let registry  = &mut *guard;

            let mut due = Vec::new();
            for (handle, session) in registry.sessions.iter_mut() {
                if session.is_due(now) {
                    due.push(*handle);
                } else if !session.detached && matches!(session.state, SessionState::Sent | SessionState::Retrying | SessionState::FailedOver) {
                    session.state = SessionState::AwaitingResponse;
                }
            }
            due.sort();

            let steps: Vec<Step> = due.iter().map(|handle| self.expire(registry, *handle, now)).collect();
            (due.len(), steps)
        };

        complete(self.settle(steps, now).into_iter());
        fired
    }

    /// Reports that `connection` failed to deliver (e.g. ICMP port unreachable)
    ///
    /// Every Session on it counts its current attempt as timed out right away, consuming a retry.
    /// Returns the number of Sessions affected
    pub fn connection_failed(&self, connection: ConnectionId, now: Instant) -> usize {
        let (affected, steps) = {
            let mut guard = self.registry();
            let registry  = &mut *guard;

            let mut affected: Vec<SessionHandle> = registry.sessions.iter()
                .filter(|(_, session)| session.connection == connection && !session.detached)
                .map(|(handle, _)| *handle)
                .collect();
            affected.sort();

            warn!("{} failed, {} transaction(s) affected", connection, affected.len());
            let steps: Vec<Step> = affected.iter().map(|handle| self.expire(registry, *handle, now)).collect();
            (affected.len(), steps)
        };

        complete(self.settle(steps, now).into_iter());
        affected
    }

    /// Returns the earliest deadline among pending Sessions
    pub fn next_deadline(&self) -> Option<Instant> {
        self.registry().sessions.values()
            .filter(|session| !session.detached)
            .map(|session| session.deadline)
            .min()
    }

    /// Returns snapshot of pending Session
    pub fn session_info(&self, handle: SessionHandle) -> Option<SessionInfo> {
        self.registry().sessions.get(&handle).map(|session| session.info())
    }

    /// Returns number of pending Sessions
    pub fn outstanding(&self) -> usize {
        self.registry().sessions.len()
    }

    /// Drops every pending Session without running its callback and closes every Connection
    ///
    /// Engine refuses new transactions afterwards. Returns the number of Sessions dropped
    pub fn shutdown(&self) -> usize {
        let dropped: Vec<Session> = {
            let mut guard = self.registry();
            let registry  = &mut *guard;

            registry.closed = true;
            for (_, connection) in registry.connections.drain() {
                debug!("Closing {} to {} with {} transaction(s) in flight", connection.id(), connection.endpoint(), connection.outstanding());
                self.transport.close(connection.id());
            }
            registry.by_endpoint.clear();
            registry.sessions.drain().map(|(_, session)| session).collect()
        };

        if !dropped.is_empty() {
            info!("Engine shut down, {} pending transaction(s) dropped", dropped.len());
        }
        dropped.len()
    }

    /// Returns Connection to `endpoint`, opening it on first use
    ///
    /// Takes the engine lock only around bookkeeping; `Transport::open` runs unlocked. If two
    /// callers open the same endpoint at once, the later one closes its socket and shares the
    /// Connection of the first
    fn open_connection(&self, endpoint: &Endpoint) -> Result<ConnectionId, RadiusError> {
        let connection = {
            let mut registry = self.registry();

            if registry.closed {
                return Err( RadiusError::AdmissionError { error: String::from("engine is shut down") } )
            }
            if let Some(connection) = registry.by_endpoint.get(endpoint) {
                return Ok(*connection)
            }
            let connection = ConnectionId(registry.next_connection);
            registry.next_connection += 1;
            connection
        };

        self.transport.open(connection, endpoint)?;

        let committed = {
            let mut guard = self.registry();
            let registry  = &mut *guard;

            if registry.closed {
                Err( RadiusError::AdmissionError { error: String::from("engine is shut down") } )
            } else if let Some(existing) = registry.by_endpoint.get(endpoint) {
                Ok(*existing)
            } else {
                registry.connections.insert(connection, Connection::new(connection, endpoint.clone(), self.config.max_outstanding));
                registry.by_endpoint.insert(endpoint.clone(), connection);
                Ok(connection)
            }
        };

        match committed {
            Ok(committed) if committed == connection => {
                info!("Opened {} to {}", connection, endpoint);
                Ok(connection)
            },
            Ok(existing)                             => {
                debug!("{} to {} lost the race to {}", connection, endpoint, existing);
                self.transport.close(connection);
                Ok(existing)
            },
            Err(error)                               => {
                self.transport.close(connection);
                Err(error)
            }
        }
    }

    /// Reserves identifier on `connection` and builds the packet for `server`
    fn attach(&self, registry: &mut Registry, handle: SessionHandle, code: TypeCode, attributes: &[RadiusAttribute], server: &Server, connection: ConnectionId) -> Result<Attempt, RadiusError> {
        let identifier = registry.connections.get_mut(&connection)
            .ok_or_else(|| RadiusError::SocketInvalidConnectionError { error: format!("{} is not open", connection) })?
            .allocate(handle)?;

        let packet = RequestBuilder::new(code, identifier, attributes)
            .set_message_authenticator(self.config.message_authenticator)
            .build(server.secret());

        match packet {
            Ok(packet) => Ok(Attempt { connection, identifier, packet }),
            Err(error) => {
                if let Some(connection) = registry.connections.get_mut(&connection) {
                    connection.release(identifier, handle);
                }
                Err(error)
            }
        }
    }

    /// Hands current packet of `session` to transport and arms its deadline
    ///
    /// A send error counts as an attempt that timed out immediately
    fn transmit(&self, handle: SessionHandle, session: &mut Session, state: SessionState, now: Instant) {
        session.state     = state;
        session.attempts += 1;
        session.deadline  = now + session.server.timeout();

        debug!("Sending {} ({:?}, id {}) to {} over {}, attempt {}", handle, session.code, session.identifier, session.server.name(), session.connection, session.attempts);
        if let Err(error) = self.transport.send(session.connection, &session.packet) {
            warn!("Failed to send {} to {}: {}", handle, session.server.name(), error);
            session.deadline = now;
        }
    }

    /// Moves Session whose deadline fired on to its next step
    fn expire(&self, registry: &mut Registry, handle: SessionHandle, now: Instant) -> Step {
        let session = match registry.sessions.get_mut(&handle) {
            Some(session) => session,
            None          => return Step::Settled
        };

        if session.retries_left > 0 {
            session.retries_left -= 1;
            self.transmit(handle, session, SessionState::Retrying, now);
            return Step::Settled
        }

        let session = match registry.sessions.remove(&handle) {
            Some(session) => session,
            None          => return Step::Settled
        };
        release(registry, &session, handle);

        let current = Arc::clone(&session.server);
        self.fail_over(registry, handle, session, &current, now)
    }

    /// Rebuilds Session for the first usable Server after `after`, or exhausts it
    ///
    /// A Server without an open Connection leaves the Session detached in the registry; the
    /// Connection gets opened once the lock is released
    fn fail_over(&self, registry: &mut Registry, handle: SessionHandle, mut session: Session, after: &Server, now: Instant) -> Step {
        let mut candidate = session.pool.next(after);

        while let Some(server) = candidate {
            let endpoint   = server.endpoint(&session.code);
            let connection = match registry.by_endpoint.get(&endpoint).copied() {
                Some(connection) => connection,
                None             => {
                    session.detached = true;
                    registry.sessions.insert(handle, session);
                    return Step::Relocate(handle, endpoint, server)
                }
            };

            match self.attach(registry, handle, session.code, &session.attributes, &server, connection) {
                Ok(attempt) => {
                    self.move_to(handle, &mut session, server, attempt, now);
                    registry.sessions.insert(handle, session);
                    return Step::Settled
                },
                Err(error)  => {
                    warn!("{} cannot fail over to {}: {}", handle, server.name(), error);
                    candidate = session.pool.next(&server);
                }
            }
        }

        info!("{} exhausted every server of pool '{}' after {} attempt(s)", handle, session.pool.name(), session.attempts);
        session.state = SessionState::Exhausted;
        match session.on_complete.take() {
            Some(on_complete) => Step::Finished((on_complete, Outcome::Exhausted)),
            None              => Step::Settled
        }
    }

    /// Points Session at `server` and sends the attempt built for it
    fn move_to(&self, handle: SessionHandle, session: &mut Session, server: Arc<Server>, attempt: Attempt, now: Instant) {
        info!("{} failing over from {} to {}", handle, session.server.name(), server.name());

        session.retries_left  = server.retries();
        session.server        = server;
        session.connection    = attempt.connection;
        session.identifier    = attempt.identifier;
        session.authenticator = *attempt.packet.authenticator();
        session.packet        = attempt.packet.into_bytes();
        session.failovers    += 1;
        session.detached      = false;

        self.transmit(handle, session, SessionState::FailedOver, now);
    }

    /// Opens the Connection a detached Session waits for, then moves the Session over
    ///
    /// Must be called without the engine lock held
    fn relocate(&self, handle: SessionHandle, mut endpoint: Endpoint, mut server: Arc<Server>, now: Instant) -> Option<Finished> {
        loop {
            let opened = self.open_connection(&endpoint);

            let mut guard = self.registry();
            let registry  = &mut *guard;
            // gone if cancelled or shut down while the Connection was opening
            let mut session = registry.sessions.remove(&handle)?;

            let attached = opened.and_then(|connection| self.attach(registry, handle, session.code, &session.attributes, &server, connection));
            match attached {
                Ok(attempt) => {
                    self.move_to(handle, &mut session, server, attempt, now);
                    registry.sessions.insert(handle, session);
                    return None
                },
                Err(error)  => warn!("{} cannot fail over to {}: {}", handle, server.name(), error)
            }

            match self.fail_over(registry, handle, session, &server, now) {
                Step::Settled                               => return None,
                Step::Finished(finished)                    => return Some(finished),
                Step::Relocate(_, next_endpoint, next_server) => {
                    endpoint = next_endpoint;
                    server   = next_server;
                }
            }
        }
    }

    /// Finishes every Step outside the lock, collecting the outcomes reached
    fn settle(&self, steps: Vec<Step>, now: Instant) -> Vec<Finished> {
        steps.into_iter()
            .filter_map(|step| match step {
                Step::Settled                         => None,
                Step::Finished(finished)              => Some(finished),
                Step::Relocate(handle, endpoint, server) => self.relocate(handle, endpoint, server, now)
            })
            .collect()
    }
}

/// Frees identifier held by `session`
fn release(registry: &mut Registry, session: &Session, handle: SessionHandle) {
    if let Some(connection) = registry.connections.get_mut(&session.connection) {
        connection.release(session.identifier, handle);
    }
}

fn complete(finished: impl Iterator<Item = Finished>) {
    for (on_complete, outcome) in finished {
        on_complete(outcome);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(ConnectionId, Vec<u8>)>>
    }

    impl Transport for Recorder {
        fn open(&self, _connection: ConnectionId, _endpoint: &Endpoint) -> Result<(), RadiusError> {
            Ok(())
        }

        fn send(&self, connection: ConnectionId, bytes: &[u8]) -> Result<(), RadiusError> {
            self.sent.lock().unwrap().push((connection, bytes.to_vec()));
            Ok(())
        }

        fn close(&self, _connection: ConnectionId) {}
    }

    fn pool() -> ServerPool {
        let mut pool = ServerPool::new("auth");
        pool.add_server(Server::new("127.0.0.1", b"testing123").set_timeout(Duration::from_secs(1)).set_retries(1)).unwrap();
        pool
    }

    #[test]
    fn test_engine_config() {
        let config = EngineConfig::default();
        assert!(config.message_authenticator());
        assert_eq!(256,                        config.max_outstanding());
        assert_eq!(Duration::from_millis(200), config.tick());

        let config = EngineConfig::default().set_max_outstanding(1000).set_message_authenticator(false);
        assert_eq!(256, config.max_outstanding());
        assert!(!config.message_authenticator());
        assert_eq!(1,   EngineConfig::default().set_max_outstanding(0).max_outstanding());
    }

    #[test]
    fn test_states_follow_deadlines() {
        let manager = SessionManager::new(Recorder::default(), EngineConfig::default());
        let start   = Instant::now();
        let handle  = manager.start_transaction_at(&pool(), TypeCode::AccessRequest, Vec::new(), |_| {}, start).unwrap();

        assert_eq!(SessionState::Sent,             manager.session_info(handle).unwrap().state);
        assert_eq!(Some(start + Duration::from_secs(1)), manager.next_deadline());

        assert_eq!(0, manager.poll_timeouts(start + Duration::from_millis(500)));
        assert_eq!(SessionState::AwaitingResponse, manager.session_info(handle).unwrap().state);

        assert_eq!(1, manager.poll_timeouts(start + Duration::from_secs(1)));
        let info = manager.session_info(handle).unwrap();
        assert_eq!(SessionState::Retrying, info.state);
        assert_eq!(0,                      info.retries_left);
        assert_eq!(2,                      info.attempts);

        assert_eq!(1, manager.poll_timeouts(start + Duration::from_secs(2)));
        assert!(manager.session_info(handle).is_none());
        assert_eq!(0, manager.outstanding());
    }

    #[test]
    fn test_retransmission_reuses_bytes() {
        let manager = SessionManager::new(Recorder::default(), EngineConfig::default());
        let start   = Instant::now();
        manager.start_transaction_at(&pool(), TypeCode::AccessRequest, Vec::new(), |_| {}, start).unwrap();
        manager.poll_timeouts(start + Duration::from_secs(1));

        let sent = manager.transport().sent.lock().unwrap();
        assert_eq!(2,          sent.len());
        assert_eq!(sent[0].1, sent[1].1);
    }

    #[test]
    fn test_start_rejects_reply_codes_and_empty_pool() {
        let manager = SessionManager::new(Recorder::default(), EngineConfig::default());

        assert!(manager.start_transaction(&pool(), TypeCode::AccessAccept, Vec::new(), |_| {}).is_err());
        assert!(manager.start_transaction(&ServerPool::new("empty"), TypeCode::AccessRequest, Vec::new(), |_| {}).is_err());
        assert_eq!(0, manager.outstanding());
    }

    #[test]
    fn test_short_datagram_is_malformed() {
        let manager = SessionManager::new(Recorder::default(), EngineConfig::default());

        match manager.handle_datagram(ConnectionId(0), &[2, 1, 0]) {
            Err(error) => assert!(error.is_discard()),
            Ok(_)      => panic!("short datagram accepted")
        }
    }
}

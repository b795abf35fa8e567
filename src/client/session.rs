//! Single request/response exchange, tracked across its retransmissions and failovers


use super::ConnectionId;
use super::pool::ServerPool;
use super::server::Server;
use crate::protocol::error::RadiusError;
use crate::protocol::radius_packet::{ Authenticator, RadiusAttribute, RadiusPacket, TypeCode };

use std::fmt;
use std::sync::Arc;
use std::time::Instant;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Engine-wide token of a Session
///
/// Wire identifiers are reused every 256 requests on a Connection; the handle never is
pub struct SessionHandle(u64);

impl SessionHandle {
    pub(crate) fn new(token: u64) -> SessionHandle {
        SessionHandle(token)
    }

    /// Returns raw token value
    pub fn token(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle of a Session
pub enum SessionState {
    /// Registered, packet not handed to transport yet
    Created,
    /// First attempt handed to transport
    Sent,
    /// Attempt in flight and its deadline not reached yet
    AwaitingResponse,
    /// Deadline passed, packet retransmitted to the same Server
    Retrying,
    /// Retries used up, packet rebuilt for the next Server of the pool
    FailedOver,
    /// Access-Accept or Accounting-Response received
    Accepted,
    /// Access-Reject received
    Rejected,
    /// Access-Challenge received
    Challenged,
    /// Every Server of the pool used up its retries
    Exhausted
}

impl SessionState {
    /// Whether Session has reached its outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Accepted | SessionState::Rejected | SessionState::Challenged | SessionState::Exhausted)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal result of a transaction, handed to its completion callback exactly once
pub enum Outcome {
    /// Access-Accept or Accounting-Response, with reply attributes
    Accepted(Vec<RadiusAttribute>),
    /// Access-Reject, with reply attributes
    Rejected(Vec<RadiusAttribute>),
    /// Access-Challenge, with reply attributes
    Challenged(Vec<RadiusAttribute>),
    /// No Server of the pool replied in time
    Exhausted
}

impl Outcome {
    /// Maps verified reply onto the outcome it completes
    pub(crate) fn from_reply(reply: RadiusPacket) -> Result<(SessionState, Outcome), RadiusError> {
        let code = *reply.code();

        match code {
            TypeCode::AccessAccept | TypeCode::AccountingResponse => Ok((SessionState::Accepted,   Outcome::Accepted(reply.into_attributes()))),
            TypeCode::AccessReject                                => Ok((SessionState::Rejected,   Outcome::Rejected(reply.into_attributes()))),
            TypeCode::AccessChallenge                             => Ok((SessionState::Challenged, Outcome::Challenged(reply.into_attributes()))),
            _                                                     => Err( RadiusError::ValidationError { error: format!("{:?} does not complete a transaction", code) } )
        }
    }

    /// Returns reply attributes; None for `Exhausted`
    pub fn attributes(&self) -> Option<&[RadiusAttribute]> {
        match self {
            Outcome::Accepted(attributes) | Outcome::Rejected(attributes) | Outcome::Challenged(attributes) => Some(attributes.as_slice()),
            Outcome::Exhausted                                                                              => None
        }
    }
}


/// Continuation a Session completes
pub type Completion = Box<dyn FnOnce(Outcome) + Send + 'static>;


#[derive(Debug, Clone, PartialEq, Eq)]
/// Snapshot of a pending Session
pub struct SessionInfo {
    /// Current state
    pub state:        SessionState,
    /// Name of the Server the current attempt went to
    pub server:       String,
    /// Connection the current attempt went over
    pub connection:   ConnectionId,
    /// Wire identifier of the current attempt
    pub identifier:   u8,
    /// Packets handed to transport so far, across all Servers
    pub attempts:     u32,
    /// Retransmissions left before moving on to the next Server
    pub retries_left: u16,
    /// Times the Session moved on to the next Server
    pub failovers:    u32,
    /// When the current attempt times out
    pub deadline:     Instant
}


pub(crate) struct Session {
    pub(crate) code:          TypeCode,
    pub(crate) attributes:    Vec<RadiusAttribute>,
    pub(crate) pool:          ServerPool,
    pub(crate) server:        Arc<Server>,
    pub(crate) connection:    ConnectionId,
    pub(crate) identifier:    u8,
    pub(crate) packet:        Vec<u8>,
    pub(crate) authenticator: Authenticator,
    pub(crate) retries_left:  u16,
    pub(crate) deadline:      Instant,
    pub(crate) state:         SessionState,
    pub(crate) attempts:      u32,
    pub(crate) failovers:     u32,
    /// Identifier released, waiting for a Connection to the next Server to open
    pub(crate) detached:      bool,
    pub(crate) on_complete:   Option<Completion>
}

impl Session {
    pub(crate) fn info(&self) -> SessionInfo {
        SessionInfo {
            state:        self.state,
            server:       self.server.name().to_string(),
            connection:   self.connection,
            identifier:   self.identifier,
            attempts:     self.attempts,
            retries_left: self.retries_left,
            failovers:    self.failovers,
            deadline:     self.deadline
        }
    }

    /// Whether the current attempt timed out at `now`
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        !self.detached && self.deadline <= now
    }
}

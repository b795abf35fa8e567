use super::{ ConnectionId, Endpoint };
use super::session::SessionHandle;
use crate::protocol::error::RadiusError;

use rand::Rng;


const IDENTIFIERS: usize = 256;


/// Transport binding to one Endpoint and the table of wire identifiers in use on it
#[derive(Debug)]
pub(crate) struct Connection {
    id:              ConnectionId,
    endpoint:        Endpoint,
    slots:           [Option<SessionHandle>; IDENTIFIERS],
    next_identifier: u8,
    outstanding:     usize,
    max_outstanding: usize
}

impl Connection {
    /// Starts identifier sequence at a random value
    pub(crate) fn new(id: ConnectionId, endpoint: Endpoint, max_outstanding: usize) -> Connection {
        Connection {
            id,
            endpoint,
            slots:           [None; IDENTIFIERS],
            next_identifier: rand::thread_rng().gen(),
            outstanding:     0,
            max_outstanding: max_outstanding.max(1).min(IDENTIFIERS)
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of identifiers currently held by pending Sessions
    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Reserves a free identifier for `session`
    ///
    /// Identifiers are handed out cyclically, so a released one is not reused before the other
    /// 255 had their turn
    pub(crate) fn allocate(&mut self, session: SessionHandle) -> Result<u8, RadiusError> {
        if self.outstanding >= self.max_outstanding {
            return Err( RadiusError::AdmissionError { error: format!("{} to {} already has {} transactions in flight", self.id, self.endpoint, self.outstanding) } )
        }

        for offset in 0..IDENTIFIERS {
            let identifier = self.next_identifier.wrapping_add(offset as u8);
            let slot       = &mut self.slots[identifier as usize];

            if slot.is_none() {
                *slot                = Some(session);
                self.next_identifier = identifier.wrapping_add(1);
                self.outstanding    += 1;
                return Ok(identifier)
            }
        }

        Err( RadiusError::AdmissionError { error: format!("{} to {} has no free identifier", self.id, self.endpoint) } )
    }

    /// Frees `identifier`, if it is still held by `session`
    pub(crate) fn release(&mut self, identifier: u8, session: SessionHandle) -> bool {
        let slot = &mut self.slots[identifier as usize];

        if *slot == Some(session) {
            *slot             = None;
            self.outstanding -= 1;
            true
        } else {
            false
        }
    }

    /// Returns Session waiting for a reply with given identifier
    pub(crate) fn lookup(&self, identifier: u8) -> Option<SessionHandle> {
        self.slots[identifier as usize]
    }
}

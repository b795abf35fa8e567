//! Ordered pools of RADIUS Servers
//!
//! Order of registration is the order of failover: there is no re-ranking by load or health


use super::server::Server;
use crate::protocol::error::RadiusError;

use std::sync::Arc;


#[derive(Debug, Clone)]
/// Represents ordered set of Servers serving one logical service
///
/// Transactions take a snapshot of the pool when they start, so administrative changes only
/// affect transactions started afterwards
pub struct ServerPool {
    name:    String,
    servers: Vec<Arc<Server>>
}

impl ServerPool {
    /// Initialises empty pool
    pub fn new(name: &str) -> ServerPool {
        ServerPool {
            name:    name.to_string(),
            servers: Vec::new()
        }
    }

    /// Appends Server to the end of failover order
    ///
    /// Fails if Server is invalid or another Server with the same name is already registered
    pub fn add_server(&mut self, server: Server) -> Result<(), RadiusError> {
        server.validate()?;

        if self.servers.iter().any(|registered| registered.name() == server.name()) {
            return Err( RadiusError::ConfigurationError { error: format!("Server '{}' is already registered in pool '{}'", server.name(), self.name) } )
        }

        self.servers.push(Arc::new(server));
        Ok(())
    }

    /// Removes Server with given name, returning it if it was registered
    pub fn remove_server(&mut self, name: &str) -> Option<Arc<Server>> {
        let position = self.servers.iter().position(|server| server.name() == name)?;
        Some(self.servers.remove(position))
    }

    /// Returns pool name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns Servers in failover order
    pub fn servers(&self) -> &[Arc<Server>] {
        &self.servers
    }

    /// Returns Server every transaction starts with
    pub fn first(&self) -> Option<Arc<Server>> {
        self.servers.first().cloned()
    }

    /// Returns Server that follows `after` in failover order
    ///
    /// None if `after` is the last one or is not registered in this pool
    pub fn next(&self, after: &Server) -> Option<Arc<Server>> {
        let position = self.servers.iter().position(|server| server.name() == after.name())?;
        self.servers.get(position + 1).cloned()
    }

    /// Returns number of registered Servers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether no Server is registered
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(names: &[&str]) -> ServerPool {
        let mut pool = ServerPool::new("auth");
        for name in names {
            pool.add_server(Server::new("127.0.0.1", b"testing123").set_name(name)).unwrap();
        }
        pool
    }

    #[test]
    fn test_next_follows_registration_order() {
        let pool   = pool_of(&["a", "b", "c"]);
        let first  = pool.first().unwrap();
        let second = pool.next(&first).unwrap();
        let third  = pool.next(&second).unwrap();

        assert_eq!("a", first.name());
        assert_eq!("b", second.name());
        assert_eq!("c", third.name());
        assert!(pool.next(&third).is_none());
    }

    #[test]
    fn test_add_server_rejects_duplicates() {
        let mut pool = pool_of(&["a"]);

        match pool.add_server(Server::new("10.0.0.1", b"another").set_name("a")) {
            Err(RadiusError::ConfigurationError { .. }) => {},
            other                                       => panic!("unexpected result: {:?}", other)
        }
        assert_eq!(1, pool.len());
    }

    #[test]
    fn test_add_server_rejects_invalid() {
        let mut pool = ServerPool::new("auth");

        assert!(pool.add_server(Server::new("127.0.0.1", b"")).is_err());
        assert!(pool.is_empty());
        assert!(pool.first().is_none());
    }

    #[test]
    fn test_remove_server() {
        let mut pool = pool_of(&["a", "b", "c"]);
        let removed  = pool.remove_server("b").unwrap();

        assert_eq!("b", removed.name());
        assert_eq!("c", pool.next(&pool.first().unwrap()).unwrap().name());
        assert!(pool.next(&removed).is_none());
        assert!(pool.remove_server("b").is_none());
    }
}

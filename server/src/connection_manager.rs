//! Live connection tracking for the concert server
//!
//! This module keeps a roster of the sessions currently being served:
//! - Connection ids handed out at accept time
//! - Peer address and connection age for logging
//! - Per-connection request tallies
//! - Capacity enforcement against the configured maximum
//!
//! The roster is bookkeeping only. Sessions never consult it for protocol
//! decisions beyond the capacity check made when they are accepted.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Live count of requests handled on one connection, shared between the
/// roster and the connection's task.
#[derive(Debug, Clone, Default)]
pub struct RequestCounter(Arc<AtomicU64>);

impl RequestCounter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Represents one accepted transport connection
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Peer address of the client
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Requests handled on this connection, updated as each one is answered
    pub requests: RequestCounter,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            requests: RequestCounter::default(),
        }
    }

    pub fn requests_handled(&self) -> u64 {
        self.requests.get()
    }

    /// How long this connection has been open
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Manages all live connections
///
/// Connection ids start from 1 and are never reused while the server runs,
/// which keeps log lines for different sessions distinguishable.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Live connections indexed by their id
    connections: HashMap<u32, Connection>,
    /// Next available connection id
    next_connection_id: u32,
    /// Maximum number of concurrent sessions allowed
    max_connections: usize,
}

impl ConnectionManager {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
            max_connections,
        }
    }

    /// Registers a newly accepted connection
    ///
    /// Returns Some(connection_id) if there is room, None if the server is at
    /// capacity. A refused connection does not consume an id.
    pub fn add_connection(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        info!("Connection {} accepted from {}", connection_id, addr);
        self.connections
            .insert(connection_id, Connection::new(connection_id, addr));

        Some(connection_id)
    }

    /// Removes a connection once its session has ended
    ///
    /// Returns true if the connection was found and removed.
    pub fn remove_connection(&mut self, connection_id: u32) -> bool {
        if let Some(connection) = self.connections.remove(&connection_id) {
            info!(
                "Connection {} from {} closed after {:?} ({} requests)",
                connection.id,
                connection.addr,
                connection.age(),
                connection.requests_handled()
            );
            true
        } else {
            false
        }
    }

    /// Counter the connection's task bumps for every request it answers
    pub fn counter(&self, connection_id: u32) -> Option<RequestCounter> {
        self.connections
            .get(&connection_id)
            .map(|connection| connection.requests.clone())
    }

    pub fn get(&self, connection_id: u32) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Snapshot of all live connections
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.values().cloned().collect()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_connection_creation() {
        let addr = test_addr();
        let connection = Connection::new(1, addr);

        assert_eq!(connection.id, 1);
        assert_eq!(connection.addr, addr);
        assert_eq!(connection.requests_handled(), 0);
        assert!(connection.age() < Duration::from_secs(5));
    }

    #[test]
    fn test_manager_creation() {
        let manager = ConnectionManager::new(5);
        assert_eq!(manager.max_connections(), 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_connections() {
        let mut manager = ConnectionManager::new(3);

        let id1 = manager.add_connection(test_addr()).unwrap();
        let id2 = manager.add_connection(test_addr2()).unwrap();

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_add_connection_max_capacity() {
        let mut manager = ConnectionManager::new(1);

        assert!(manager.add_connection(test_addr()).is_some());
        assert!(manager.add_connection(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_refused_connection_does_not_consume_id() {
        let mut manager = ConnectionManager::new(1);

        let first = manager.add_connection(test_addr()).unwrap();
        assert!(manager.add_connection(test_addr2()).is_none());
        manager.remove_connection(first);

        assert_eq!(manager.add_connection(test_addr2()), Some(2));
    }

    #[test]
    fn test_remove_connection() {
        let mut manager = ConnectionManager::new(2);
        let id = manager.add_connection(test_addr()).unwrap();

        assert!(manager.remove_connection(id));
        assert!(!manager.remove_connection(id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_counter_is_live() {
        let mut manager = ConnectionManager::new(2);
        let id = manager.add_connection(test_addr()).unwrap();
        assert!(manager.counter(999).is_none());

        let counter = manager.counter(id).unwrap();
        counter.increment();
        counter.increment();
        assert_eq!(manager.get(id).map(|c| c.requests_handled()), Some(2));

        counter.increment();
        let snapshot = manager.connections();
        assert_eq!(snapshot[0].requests_handled(), 3);
    }

    #[test]
    fn test_connections_snapshot() {
        let mut manager = ConnectionManager::new(4);
        manager.add_connection(test_addr());
        manager.add_connection(test_addr2());

        let mut addrs: Vec<SocketAddr> = manager.connections().iter().map(|c| c.addr).collect();
        addrs.sort();
        assert_eq!(addrs, vec![test_addr(), test_addr2()]);
    }
}

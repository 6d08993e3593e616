//! Client connection tracking for the UDP front end
//!
//! This module keeps the server-side view of every connected client:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Routing of inbound packets to the client's connection task
//! - Connection health monitoring and automatic cleanup
//! - Client capacity management and address tracking
//!
//! Dropping a client drops the sending half of its inbox, which is how its
//! connection task learns that the client is gone.

use log::info;
use shared::Packet;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Represents a connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Queue feeding the client's connection task
    pub inbox: mpsc::Sender<Packet>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, inbox: mpsc::Sender<Packet>) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            inbox,
        }
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if no packets have been received from this client
    /// within the specified timeout duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Result of handing a packet to a client's connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No client is registered for the address.
    Unknown,
    /// The inbox is full; the packet was dropped.
    Dropped,
    /// The connection task has already exited.
    Closed,
}

/// Manages all connected clients
///
/// Enforces the server's capacity limit and maps source addresses to
/// client ids so the receive loop can route every datagram.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, inbox: mpsc::Sender<Packet>) -> Option<u32> {
        // Enforce server capacity limits
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let client = Client::new(client_id, addr, inbox);
        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, client);

        Some(client_id)
    }

    /// Removes a client from the server
    ///
    /// Returns true if the client was found and removed, false if they were
    /// already gone. This handles explicit disconnections, timeouts and
    /// malformed traffic alike.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Routes a packet to the connection task of the client at `addr`
    ///
    /// Any packet counts as a sign of life and refreshes the client's
    /// last seen time.
    pub fn deliver(&mut self, addr: SocketAddr, packet: Packet) -> Delivery {
        let Some(client) = self.clients.values_mut().find(|client| client.addr == addr) else {
            return Delivery::Unknown;
        };

        client.last_seen = Instant::now();
        match client.inbox.try_send(packet) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed client IDs so the caller can log or clean up.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        // Remove timed-out clients
        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

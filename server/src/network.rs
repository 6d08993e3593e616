//! Server network layer handling UDP communications
//!
//! Three background tasks share one socket:
//! - a receiver that decodes datagrams and feeds the main loop
//! - a sender that encodes and writes queued packets
//! - a timeout checker that drops silent clients
//!
//! The main loop owns connection setup and teardown and routes every other
//! packet to the owning client's connection task.

use crate::client_manager::{ClientManager, Delivery};
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::registry::MatchRegistry;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    /// A datagram that did not decode as a packet.
    Malformed { addr: SocketAddr },
    ClientTimeout { client_id: u32 },
}

/// Messages sent from connection tasks to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server coordinating the socket, clients and the match registry
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    registry: MatchRegistry,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            registry: MatchRegistry::new(config.matches.clone()),
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn registry(&self) -> &MatchRegistry {
        &self.registry
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let message = match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) => ServerMessage::PacketReceived { packet, addr },
                            Err(e) => {
                                warn!("Failed to deserialize packet from {}: {}", addr, e);
                                ServerMessage::Malformed { addr }
                            }
                        };
                        if let Err(e) = server_tx.send(message) {
                            error!("Failed to send packet to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            warn!("Sender task already running");
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Registers the sender and starts its connection task
    async fn connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            let reason = format!(
                "Protocol version {} not supported, expected {}",
                client_version, PROTOCOL_VERSION
            );
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        }

        // Remove existing connection if present
        self.drop_client_at(addr).await;

        let (inbox_tx, inbox_rx) = mpsc::channel(self.config.inbox_capacity);
        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr, inbox_tx)
        };

        match client_id {
            Some(client_id) => {
                let connection =
                    Connection::new(client_id, addr, self.registry.clone(), self.game_tx.clone());
                tokio::spawn(connection.run(inbox_rx));
                self.send_packet(Packet::Connected { client_id }, addr);
            }
            None => {
                let reason = "Server full".to_string();
                self.send_packet(Packet::Disconnected { reason }, addr);
            }
        }
    }

    /// Forgets the client at `addr`, closing its connection task's inbox
    async fn drop_client_at(&self, addr: SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        match clients.find_client_by_addr(addr) {
            Some(client_id) => clients.remove_client(&client_id),
            None => false,
        }
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => self.connect(client_version, addr).await,

            Packet::Disconnect => {
                self.drop_client_at(addr).await;
            }

            packet => {
                let delivery = {
                    let mut clients = self.clients.write().await;
                    clients.deliver(addr, packet)
                };

                match delivery {
                    Delivery::Delivered => {}
                    Delivery::Unknown => {
                        debug!("Packet from unconnected address {}", addr);
                        let reason = "Not connected".to_string();
                        self.send_packet(Packet::Disconnected { reason }, addr);
                    }
                    Delivery::Dropped => {
                        debug!("Inbox full for {}, packet dropped", addr);
                    }
                    Delivery::Closed => {
                        self.drop_client_at(addr).await;
                    }
                }
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::Malformed { addr } => {
                    if self.drop_client_at(addr).await {
                        let reason = "Malformed packet".to_string();
                        self.send_packet(Packet::Disconnected { reason }, addr);
                    }
                }
                ServerMessage::ClientTimeout { client_id } => {
                    info!("Client {} timed out", client_id);
                }
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}

/// Encodes a packet, refusing payloads that cannot fit in one datagram
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    if data.len() > MAX_DATAGRAM_SIZE {
        return Err(format!(
            "packet of {} bytes exceeds the {} byte datagram limit",
            data.len(),
            MAX_DATAGRAM_SIZE
        )
        .into());
    }
    Ok(data)
}

async fn send_packet_impl(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = match encode_packet(packet) {
        Ok(data) => data,
        Err(e) => {
            warn!("Dropping packet for {}: {}", addr, e);
            return Ok(());
        }
    };
    socket.send_to(&data, addr).await?;
    Ok(())
}

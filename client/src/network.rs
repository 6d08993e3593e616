//! UDP link to the server
//!
//! The render loop is driven by macroquad, so the socket lives on a small
//! tokio runtime in a background thread. Packets cross between the two over
//! unbounded channels; the render loop only ever polls.

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Keeps the server from timing the client out while nothing else is sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct NetworkClient {
    outgoing: mpsc::UnboundedSender<Packet>,
    incoming: mpsc::UnboundedReceiver<Packet>,
    worker: Option<JoinHandle<()>>,
}

impl NetworkClient {
    /// Binds a local socket, starts the link thread and sends `Connect`
    pub fn connect(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr: SocketAddr = server_addr.parse()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let socket = runtime.block_on(async {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(server_addr).await?;
            Ok::<_, std::io::Error>(socket)
        })?;
        info!("Connecting to {} from {}", server_addr, socket.local_addr()?);

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        outgoing_tx.send(Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })?;

        let worker = std::thread::Builder::new()
            .name("network".to_string())
            .spawn(move || runtime.block_on(run_link(socket, outgoing_rx, incoming_tx)))?;

        Ok(Self {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
            worker: Some(worker),
        })
    }

    pub fn send(&self, packet: Packet) {
        if self.outgoing.send(packet).is_err() {
            warn!("Network thread stopped, packet dropped");
        }
    }

    /// Drains every packet received since the last call
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.incoming.try_recv() {
            packets.push(packet);
        }
        packets
    }

    /// Sends `Disconnect` and waits for the link thread to flush it
    pub fn shutdown(mut self) {
        self.send(Packet::Disconnect);
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Closing the queue ends the link after the pending sends
        drop(self.outgoing);
        if worker.join().is_err() {
            error!("Network thread panicked");
        }
    }
}

async fn run_link(
    socket: UdpSocket,
    mut outgoing: mpsc::UnboundedReceiver<Packet>,
    incoming: mpsc::UnboundedSender<Packet>,
) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let start = tokio::time::Instant::now() + HEARTBEAT_INTERVAL;
    let mut heartbeat = tokio::time::interval_at(start, HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            packet = outgoing.recv() => match packet {
                Some(packet) => send_packet(&socket, &packet).await,
                None => break,
            },

            result = socket.recv(&mut buffer) => match result {
                Ok(len) => match deserialize::<Packet>(&buffer[..len]) {
                    Ok(packet) => {
                        if incoming.send(packet).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                },
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            },

            _ = heartbeat.tick() => send_packet(&socket, &Packet::Heartbeat).await,
        }
    }

    debug!("Network link closed");
}

async fn send_packet(socket: &UdpSocket, packet: &Packet) {
    let data = match serialize(packet) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to serialize packet: {}", e);
            return;
        }
    };
    if let Err(e) = socket.send(&data).await {
        error!("Failed to send packet: {}", e);
    }
}

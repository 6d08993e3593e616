//! Per-client session task
//!
//! Each connected client gets one task that owns its seat (if any). The task
//! turns lobby requests into registry calls, relays steering to the match
//! engine and forwards the seat's frames and final outcome back out as
//! packets. When the inbox closes the seat is released.

use crate::game::{MatchEvent, MatchHandle, Outcome, PlayerLink};
use crate::network::GameMessage;
use crate::registry::MatchRegistry;
use log::{debug, info, warn};
use shared::{Direction, Packet};
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};

/// A seat held by this connection.
struct Seated {
    handle: MatchHandle,
    slot: usize,
    events: Option<mpsc::Receiver<MatchEvent>>,
    outcome: oneshot::Receiver<Outcome>,
}

pub struct Connection {
    client_id: u32,
    addr: SocketAddr,
    registry: MatchRegistry,
    outbound: mpsc::UnboundedSender<GameMessage>,
    seat: Option<Seated>,
}

impl Connection {
    pub fn new(
        client_id: u32,
        addr: SocketAddr,
        registry: MatchRegistry,
        outbound: mpsc::UnboundedSender<GameMessage>,
    ) -> Self {
        Self {
            client_id,
            addr,
            registry,
            outbound,
            seat: None,
        }
    }

    /// Serves the client until its inbox is closed by the network layer.
    pub async fn run(mut self, mut inbox: mpsc::Receiver<Packet>) {
        loop {
            let (events, outcome) = match self.seat.as_mut() {
                Some(seat) => (seat.events.as_mut(), Some(&mut seat.outcome)),
                None => (None, None),
            };

            tokio::select! {
                packet = inbox.recv() => match packet {
                    Some(packet) => self.handle_packet(packet).await,
                    None => break,
                },
                event = next_event(events) => match event {
                    Some(event) => self.forward(event),
                    None => {
                        if let Some(seat) = self.seat.as_mut() {
                            seat.events = None;
                        }
                    }
                },
                result = next_outcome(outcome) => self.finish(result),
            }
        }

        if let Some(seat) = self.seat.take() {
            seat.handle.disconnect(seat.slot).await;
        }
        debug!("Connection task for client {} finished", self.client_id);
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::CreateMatch {
                height,
                width,
                required,
            } => match self.registry.create(height, width, required).await {
                Ok(handle) => self.send(Packet::MatchCreated {
                    match_id: handle.id().to_string(),
                }),
                Err(e) => self.reject(e.to_string()),
            },

            Packet::ListMatches => {
                let matches = self.registry.list().await;
                self.send(Packet::MatchList { matches });
            }

            Packet::JoinMatch { match_id } => self.join(&match_id).await,

            Packet::Move { direction } => self.steer(direction).await,

            Packet::Heartbeat => {}

            other => {
                warn!(
                    "Unexpected packet from client {}: {:?}",
                    self.client_id, other
                );
            }
        }
    }

    async fn join(&mut self, match_id: &str) {
        if self.seat.is_some() {
            self.reject("already seated in a match".to_string());
            return;
        }

        match self.registry.join(match_id).await {
            Ok((handle, link)) => {
                let PlayerLink {
                    slot,
                    color,
                    events,
                    outcome,
                } = link;
                info!(
                    "Client {} took slot {} in {}",
                    self.client_id,
                    slot,
                    handle.id()
                );
                self.send(Packet::Joined {
                    match_id: handle.id().to_string(),
                    slot,
                    height: handle.height(),
                    width: handle.width(),
                    color: color.to_string(),
                });
                self.seat = Some(Seated {
                    handle,
                    slot,
                    events: Some(events),
                    outcome,
                });
            }
            Err(e) => self.reject(e.to_string()),
        }
    }

    async fn steer(&self, direction: Direction) {
        let Some(seat) = self.seat.as_ref() else {
            debug!("Client {} steered outside a match", self.client_id);
            return;
        };

        let ack = seat.handle.send_direction(seat.slot, direction).await;
        debug!(
            "Client {} turn {:?} in {}: {:?}",
            self.client_id,
            direction,
            seat.handle.id(),
            ack
        );
    }

    fn forward(&self, event: MatchEvent) {
        let packet = match event {
            MatchEvent::Countdown { starts_in } => Packet::Countdown {
                starts_in_ms: starts_in.as_millis() as u64,
            },
            MatchEvent::Frame { tick, trails } => Packet::Frame {
                tick,
                trails: (*trails).clone(),
            },
        };
        self.send(packet);
    }

    fn finish(&mut self, result: Result<Outcome, oneshot::error::RecvError>) {
        // The seat is spent either way
        let Some(seat) = self.seat.take() else {
            return;
        };

        match result {
            Ok(Outcome { victory, score }) => {
                info!(
                    "Client {} finished {} (victory: {}, score: {})",
                    self.client_id,
                    seat.handle.id(),
                    victory,
                    score
                );
                self.send(Packet::MatchOver { victory, score });
            }
            Err(_) => debug!(
                "Client {} lost its seat in {}",
                self.client_id,
                seat.handle.id()
            ),
        }
    }

    fn reject(&self, reason: String) {
        debug!("Rejecting request from client {}: {}", self.client_id, reason);
        self.send(Packet::Rejected { reason });
    }

    fn send(&self, packet: Packet) {
        let message = GameMessage::SendPacket {
            packet,
            addr: self.addr,
        };
        if self.outbound.send(message).is_err() {
            warn!("Sender task gone, dropping packet for client {}", self.client_id);
        }
    }
}

async fn next_event(events: Option<&mut mpsc::Receiver<MatchEvent>>) -> Option<MatchEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_outcome(
    outcome: Option<&mut oneshot::Receiver<Outcome>>,
) -> Result<Outcome, oneshot::error::RecvError> {
    match outcome {
        Some(outcome) => outcome.await,
        None => std::future::pending().await,
    }
}

//! Headless bot that plays one match against the server.
//!
//! Creates a match (or joins an existing one), then steers away from walls
//! and trails, picking randomly among the safe turns.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use shared::{Coordinate, Direction, Packet, Trails, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,
    /// Match to join; a new one is created when omitted
    #[clap(short, long)]
    join: Option<String>,
    /// Grid height for a new match
    #[clap(long, default_value = "40")]
    height: u32,
    /// Grid width for a new match
    #[clap(long, default_value = "40")]
    width: u32,
    /// Players required for a new match
    #[clap(long, default_value = "2")]
    players: usize,
}

/// What the bot knows about its own seat.
struct Seat {
    slot: usize,
    height: u32,
    width: u32,
    heading: Option<Direction>,
}

impl Seat {
    /// Picks a heading that keeps the bot alive for at least one more tick.
    fn choose(&self, trails: &Trails) -> Option<Direction> {
        let head = *trails.get(&self.slot)?.coordinates.last()?;
        let blocked: HashSet<Coordinate> = trails
            .values()
            .flat_map(|trail| trail.coordinates.iter().copied())
            .collect();

        let safe = |direction: Direction| {
            let next = head.step(direction);
            next.x >= 0
                && next.y >= 0
                && (next.x as u32) < self.width
                && (next.y as u32) < self.height
                && !blocked.contains(&next)
        };

        // Keep going straight when possible
        if let Some(heading) = self.heading {
            if safe(heading) {
                return None;
            }
        }

        let options: Vec<Direction> = [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
        .into_iter()
        .filter(|direction| Some(*direction) != self.heading && safe(*direction))
        .collect();
        options.choose(&mut rand::thread_rng()).copied()
    }
}

/// Infers the current heading from the last two cells of the bot's path.
fn heading_of(trails: &Trails, slot: usize) -> Option<Direction> {
    let cells = &trails.get(&slot)?.coordinates;
    let [.., previous, head] = cells.as_slice() else {
        return None;
    };
    match (head.x - previous.x, head.y - previous.y) {
        (0, -1) => Some(Direction::Up),
        (0, 1) => Some(Direction::Down),
        (-1, 0) => Some(Direction::Left),
        (1, 0) => Some(Direction::Right),
        _ => None,
    }
}

async fn send(socket: &UdpSocket, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
    socket.send(&serialize(packet)?).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(args.server).await?;
    info!("Bot bound to {}", socket.local_addr()?);

    send(
        &socket,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        },
    )
    .await?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
    let mut seat: Option<Seat> = None;

    loop {
        let len = tokio::select! {
            received = socket.recv(&mut buf) => received?,
            _ = heartbeat.tick() => {
                send(&socket, &Packet::Heartbeat).await?;
                continue;
            }
        };

        let packet = match deserialize::<Packet>(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Failed to deserialize packet: {}", e);
                continue;
            }
        };

        match packet {
            Packet::Connected { client_id } => {
                info!("Connected as client {}", client_id);
                let request = match &args.join {
                    Some(match_id) => Packet::JoinMatch {
                        match_id: match_id.clone(),
                    },
                    None => Packet::CreateMatch {
                        height: args.height,
                        width: args.width,
                        required: args.players,
                    },
                };
                send(&socket, &request).await?;
            }
            Packet::MatchCreated { match_id } => {
                info!("Created match {}", match_id);
                send(&socket, &Packet::JoinMatch { match_id }).await?;
            }
            Packet::Joined {
                match_id,
                slot,
                height,
                width,
                color,
            } => {
                info!(
                    "Joined {} in slot {} ({}x{}, {})",
                    match_id, slot, height, width, color
                );
                seat = Some(Seat {
                    slot,
                    height,
                    width,
                    heading: None,
                });
            }
            Packet::Countdown { starts_in_ms } => {
                info!("Match starts in {}ms", starts_in_ms);
            }
            Packet::Frame { tick, trails } => {
                let Some(seat) = seat.as_mut() else {
                    continue;
                };
                seat.heading = heading_of(&trails, seat.slot);
                if let Some(direction) = seat.choose(&trails) {
                    debug!("Tick {}: turning {:?}", tick, direction);
                    send(&socket, &Packet::Move { direction }).await?;
                }
            }
            Packet::MatchOver { victory, score } => {
                info!("Match over (victory: {}, score: {})", victory, score);
                break;
            }
            Packet::Rejected { reason } => {
                warn!("Request rejected: {}", reason);
                break;
            }
            Packet::Disconnected { reason } => {
                warn!("Disconnected by server: {}", reason);
                return Ok(());
            }
            other => debug!("Ignoring {:?}", other),
        }
    }

    send(&socket, &Packet::Disconnect).await?;
    Ok(())
}

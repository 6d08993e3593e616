//! Client-side view of the lobby and the current match

use log::{debug, info, warn};
use shared::{Coordinate, MatchSummary, Packet, Trails};
use std::time::{Duration, Instant};

/// How the client should find a match once connected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Open a new match and take its first seat
    Create {
        height: u32,
        width: u32,
        players: usize,
    },
    /// Join a known match id
    Join(String),
    /// Show open matches and let the player pick one
    Browse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Connecting,
    Lobby,
    /// Seated, waiting for the lobby to fill
    Waiting,
    Countdown { until: Instant },
    Playing,
    Over { victory: bool, score: u64 },
    Disconnected { reason: String },
}

/// The seat this client holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub match_id: String,
    pub slot: usize,
    pub height: u32,
    pub width: u32,
    pub color: String,
}

pub struct ClientGameState {
    pub mode: LaunchMode,
    pub phase: Phase,
    pub client_id: Option<u32>,
    pub seat: Option<Seat>,
    pub tick: u64,
    pub trails: Trails,
    pub lobby: Vec<MatchSummary>,
    /// Last rejection reason, shown until the next successful request
    pub notice: Option<String>,
}

impl ClientGameState {
    pub fn new(mode: LaunchMode) -> Self {
        Self {
            mode,
            phase: Phase::Connecting,
            client_id: None,
            seat: None,
            tick: 0,
            trails: Trails::new(),
            lobby: Vec::new(),
            notice: None,
        }
    }

    /// Applies a server packet and returns the requests it triggers
    pub fn apply(&mut self, packet: Packet) -> Vec<Packet> {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.phase = Phase::Lobby;
                vec![self.first_request()]
            }

            Packet::MatchCreated { match_id } => {
                info!("Created match {}", match_id);
                vec![Packet::JoinMatch { match_id }]
            }

            Packet::MatchList { matches } => {
                self.lobby = matches;
                Vec::new()
            }

            Packet::Joined {
                match_id,
                slot,
                height,
                width,
                color,
            } => {
                info!("Joined {} in slot {}", match_id, slot);
                self.seat = Some(Seat {
                    match_id,
                    slot,
                    height,
                    width,
                    color,
                });
                self.trails.clear();
                self.tick = 0;
                self.notice = None;
                self.phase = Phase::Waiting;
                Vec::new()
            }

            Packet::Countdown { starts_in_ms } => {
                self.phase = Phase::Countdown {
                    until: Instant::now() + Duration::from_millis(starts_in_ms),
                };
                Vec::new()
            }

            Packet::Frame { tick, trails } => {
                // Frames can arrive out of order over UDP
                if tick > self.tick {
                    self.tick = tick;
                    self.trails = trails;
                    self.phase = Phase::Playing;
                } else {
                    debug!("Stale frame {} (have {})", tick, self.tick);
                }
                Vec::new()
            }

            Packet::MatchOver { victory, score } => {
                info!("Match over (victory: {}, score: {})", victory, score);
                self.phase = Phase::Over { victory, score };
                Vec::new()
            }

            Packet::Rejected { reason } => {
                warn!("Request rejected: {}", reason);
                self.notice = Some(reason);
                if self.seat.is_none() {
                    self.phase = Phase::Lobby;
                }
                Vec::new()
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.client_id = None;
                self.seat = None;
                self.phase = Phase::Disconnected { reason };
                Vec::new()
            }

            other => {
                warn!("Unexpected packet type: {:?}", other);
                Vec::new()
            }
        }
    }

    fn first_request(&self) -> Packet {
        match &self.mode {
            LaunchMode::Create {
                height,
                width,
                players,
            } => Packet::CreateMatch {
                height: *height,
                width: *width,
                required: *players,
            },
            LaunchMode::Join(match_id) => Packet::JoinMatch {
                match_id: match_id.clone(),
            },
            LaunchMode::Browse => Packet::ListMatches,
        }
    }

    /// Request for the n-th listed match, if it exists
    pub fn pick(&self, index: usize) -> Option<Packet> {
        if self.phase != Phase::Lobby {
            return None;
        }
        self.lobby.get(index).map(|summary| Packet::JoinMatch {
            match_id: summary.match_id.clone(),
        })
    }

    /// Steering is only meaningful while seated in a running match
    pub fn can_steer(&self) -> bool {
        matches!(self.phase, Phase::Countdown { .. } | Phase::Playing)
    }

    /// Head of this client's light cycle in the latest frame
    pub fn own_head(&self) -> Option<Coordinate> {
        let seat = self.seat.as_ref()?;
        self.trails.get(&seat.slot)?.coordinates.last().copied()
    }

    /// Status line for the overlay
    pub fn status(&self) -> String {
        match &self.phase {
            Phase::Connecting => "Connecting...".to_string(),
            Phase::Lobby => match &self.notice {
                Some(reason) => format!("Rejected: {}", reason),
                None if self.lobby.is_empty() => "No open matches (R to refresh)".to_string(),
                None => "Press 1-9 to join a match (R to refresh)".to_string(),
            },
            Phase::Waiting => match &self.seat {
                Some(seat) => format!("Waiting for players in {}", seat.match_id),
                None => "Waiting for players".to_string(),
            },
            Phase::Countdown { until } => {
                let left = until.saturating_duration_since(Instant::now());
                format!("Starting in {:.1}s", left.as_secs_f32())
            }
            Phase::Playing => format!("Tick {}", self.tick),
            Phase::Over { victory: true, score } => format!("Victory! Score {}", score),
            Phase::Over { victory: false, score } => format!("Crashed. Score {}", score),
            Phase::Disconnected { reason } => format!("Disconnected: {}", reason),
        }
    }
}

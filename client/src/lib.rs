//! # Light Trails Client Library
//!
//! This library provides the player-facing side of a light-trail match. The
//! server is fully authoritative: the client never simulates movement, it
//! only renders the trails from the latest frame and sends steering requests.
//!
//! ## Architecture Overview
//!
//! ### Render Loop
//! macroquad drives one loop per screen frame. Each iteration drains received
//! packets into the game state, turns key presses into requests and draws the
//! board.
//!
//! ### Network Thread
//! The UDP socket runs on a tokio runtime in its own thread and talks to the
//! render loop through channels. It also sends a heartbeat every second so an
//! idle player is not timed out while waiting in a lobby.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Lobby and match phases, the seat this client holds and the latest trails.
//! Packets are applied here and may produce follow-up requests, for example
//! joining a match right after creating it.
//!
//! ### Input Module (`input`)
//! Arrow keys and WASD for steering, number keys to pick a listed match.
//!
//! ### Network Module (`network`)
//! Background UDP link with bincode-encoded packets.
//!
//! ### Rendering Module (`rendering`)
//! Grid, trails in their slot colors and the status line.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::{ClientGameState, LaunchMode};
//! use client::network::NetworkClient;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut network = NetworkClient::connect("127.0.0.1:8080")?;
//! let mut state = ClientGameState::new(LaunchMode::Browse);
//!
//! for packet in network.poll() {
//!     for request in state.apply(packet) {
//!         network.send(request);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;

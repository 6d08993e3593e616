//! # Light Trails Server Library
//!
//! This library hosts the authoritative light-trail matches. Each match is a
//! rectangular grid on which up to four players move one cell per tick and
//! leave a solid trail behind them; touching a wall, a trail or another head
//! removes a player, and the last one standing wins.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every running match is owned by a single engine task. Direction changes,
//! removals and ticks are applied one at a time, so the grid and roster are
//! never touched concurrently.
//!
//! ### Matchmaking
//! An explicit registry holds the matches still waiting for players. Joining
//! the last free seat starts the match and takes it out of the registry.
//!
//! ### Client Management
//! Handles the lifecycle of client connections:
//! - Connection establishment and protocol version checks
//! - One session task per client that owns its seat
//! - Disconnection and timeout cleanup that releases the seat
//!
//! ## Module Organization
//!
//! ### Grid and Player (`grid`, `player`)
//! Occupancy bitmap with axis-correct bounds checks, and the per-player
//! heading, head position and trail queue.
//!
//! ### Game Module (`game`)
//! The match engine, its lobby and the cloneable [`game::MatchHandle`]:
//! - Seat assignment and the per-seat frame and outcome channels
//! - Collision resolution and trail eviction per tick
//! - The engine task with its countdown and tick timer
//!
//! ### Registry Module (`registry`)
//! Creation, lookup and listing of matches awaiting players.
//!
//! ### Network Modules (`network`, `connection`, `client_manager`)
//! UDP transport with bincode-encoded packets:
//! - Receiver, sender and timeout checker tasks around one socket
//! - Address to client routing with bounded per-client inboxes
//! - Session tasks translating packets into registry and match calls
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!
//!     // Serves clients until the process is stopped
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! Matches can also be driven directly without the network layer:
//!
//! ```rust,no_run
//! use server::registry::MatchRegistry;
//! use shared::Direction;
//!
//! # async fn demo() -> Result<(), server::error::MatchError> {
//! let registry = MatchRegistry::default();
//! let handle = registry.create(20, 20, 2).await?;
//! let (_, mut first) = registry.join(handle.id()).await?;
//! let (_, _second) = registry.join(handle.id()).await?;
//!
//! handle.send_direction(first.slot, Direction::Left).await;
//! while let Some(event) = first.events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client_manager;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod grid;
pub mod network;
pub mod player;
pub mod registry;

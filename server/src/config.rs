//! Tunables for matches and the UDP front end.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Fixed simulation step.
    pub tick_duration: Duration,
    /// Once the tick counter passes this value every surviving trail drops
    /// its oldest cell each tick. `None` keeps trails forever.
    pub trail_limit: Option<u64>,
    /// Pause between the lobby filling up and the first tick.
    pub start_delay: Duration,
    /// Per-player frame queue; frames beyond it are dropped for that player.
    pub frame_buffer: usize,
    /// Upper bound on either grid side.
    pub max_grid_side: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_millis(10),
            trail_limit: Some(100),
            start_delay: Duration::from_secs(3),
            frame_buffer: 64,
            max_grid_side: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// Clients silent for longer than this are disconnected.
    pub client_timeout: Duration,
    /// Packets queued per connection before further ones are dropped.
    pub inbox_capacity: usize,
    pub matches: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_clients: 64,
            client_timeout: Duration::from_secs(5),
            inbox_capacity: 64,
            matches: MatchConfig::default(),
        }
    }
}

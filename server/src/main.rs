use clap::Parser;
use log::{error, info};
use server::config::{MatchConfig, ServerConfig};
use server::game::check_frame_size;
use server::network::Server;
use shared::MAX_PLAYERS;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Milliseconds per simulation tick
    #[clap(short, long, default_value = "10")]
    tick_ms: u64,
    /// Tick after which trails start shrinking from the tail
    #[clap(long, default_value = "100")]
    trail_limit: u64,
    /// Keep every trail cell for the whole match
    #[clap(long)]
    unbounded_trails: bool,
    /// Largest grid side a match may request
    #[clap(long, default_value = "256")]
    max_grid_side: u32,
    /// Countdown between a full lobby and the first tick
    #[clap(long, default_value = "3000")]
    start_delay_ms: u64,
    /// Maximum number of connected clients
    #[clap(short, long, default_value = "64")]
    max_clients: usize,
    /// Seconds of silence before a client is dropped
    #[clap(long, default_value = "5")]
    client_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            max_clients: self.max_clients,
            client_timeout: Duration::from_secs(self.client_timeout_secs),
            matches: MatchConfig {
                tick_duration: Duration::from_millis(self.tick_ms),
                trail_limit: (!self.unbounded_trails).then_some(self.trail_limit),
                start_delay: Duration::from_millis(self.start_delay_ms),
                max_grid_side: self.max_grid_side,
                ..MatchConfig::default()
            },
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Args::parse().into_config();

    // The largest allowed match must still fit its frames in one datagram
    let side = config.matches.max_grid_side;
    if let Err(e) = check_frame_size(side, side, MAX_PLAYERS, &config.matches) {
        error!("{}; lower --max-grid-side or --trail-limit", e);
        return Err(e.into());
    }
    info!(
        "Starting server on {} ({}ms ticks, trail limit {:?})",
        config.bind_addr,
        config.matches.tick_duration.as_millis(),
        config.matches.trail_limit
    );

    let mut server = Server::new(config).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

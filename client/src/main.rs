use clap::Parser;
use client::game::{ClientGameState, LaunchMode};
use client::input::{Action, InputManager};
use client::network::NetworkClient;
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::*;
use shared::Packet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Create a new match instead of browsing open ones
    #[arg(short = 'c', long)]
    create: bool,

    /// Join the match with this id
    #[arg(short = 'j', long, conflicts_with = "create")]
    join: Option<String>,

    /// Grid height of a created match
    #[arg(long, default_value = "40")]
    height: u32,

    /// Grid width of a created match
    #[arg(short = 'w', long, default_value = "40")]
    width: u32,

    /// Players required to start a created match
    #[arg(short = 'p', long, default_value = "2")]
    players: usize,

    /// Pixels per grid cell
    #[arg(long, default_value = "15")]
    cell_size: f32,
}

impl Args {
    fn launch_mode(&self) -> LaunchMode {
        match (&self.join, self.create) {
            (Some(match_id), _) => LaunchMode::Join(match_id.clone()),
            (None, true) => LaunchMode::Create {
                height: self.height,
                width: self.width,
                players: self.players,
            },
            (None, false) => LaunchMode::Browse,
        }
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Light Trails".to_owned(),
        window_width: 640,
        window_height: 480,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Controls: arrows/WASD to steer, 1-9 to join, R to refresh, Esc to quit");

    let mut network = match NetworkClient::connect(&args.server) {
        Ok(network) => network,
        Err(e) => {
            error!("Failed to connect to {}: {}", args.server, e);
            return;
        }
    };

    let mut state = ClientGameState::new(args.launch_mode());
    let mut input = InputManager::new();
    let renderer = Renderer::new(args.cell_size);
    let mut sized_for: Option<String> = None;

    'frames: loop {
        for packet in network.poll() {
            for request in state.apply(packet) {
                network.send(request);
            }
        }

        // Fit the window to the grid once per match
        if let Some(seat) = &state.seat {
            if sized_for.as_deref() != Some(seat.match_id.as_str()) {
                let (width, height) = renderer.window_size(seat.height, seat.width);
                request_new_screen_size(width.max(320.0), height);
                sized_for = Some(seat.match_id.clone());
                input.reset();
            }
        }

        for action in input.update() {
            match action {
                Action::Steer(direction) => {
                    if state.can_steer() {
                        network.send(Packet::Move { direction });
                    }
                }
                Action::Pick(index) => {
                    if let Some(request) = state.pick(index) {
                        network.send(request);
                    }
                }
                Action::Refresh => network.send(Packet::ListMatches),
                Action::Quit => break 'frames,
            }
        }

        renderer.render(&state);
        next_frame().await;
    }

    network.shutdown();
}

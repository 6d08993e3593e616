//! Authoritative match engine
//!
//! Every match is owned by exactly one task once it starts. That task selects
//! over the command channel and the tick timer and applies one event at a time
//! to the grid and roster, so no other task ever touches match state:
//!
//! - Lobby: players join through [`MatchHandle::join`] under the lobby lock.
//!   The join that fills the lobby flips the state to `InProgress`, sends the
//!   countdown notice and spawns the engine task while still holding the lock.
//! - Running: [`MatchEngine::handle`] processes direction changes, removals and
//!   ticks. Collisions remove players; the match ends when a removal leaves at
//!   most one player.
//! - Ended: queued commands are answered with [`DirectionAck::NotRunning`] and
//!   the task exits.

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::grid::Grid;
use crate::player::{initial_slot_position, Player};
use crate::registry::Deregister;
use log::{debug, info, warn};
use shared::{
    slot_color, Coordinate, Direction, MatchSummary, Packet, TrailInfo, Trails, MAX_DATAGRAM_SIZE,
    MAX_PLAYERS,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub type MatchId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Initializing,
    InProgress,
    Ended,
}

/// Output stream for a single seat.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// Sent once when the lobby fills, before the first tick.
    Countdown { starts_in: Duration },
    Frame { tick: u64, trails: Arc<Trails> },
}

/// Final result for a seat, delivered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub victory: bool,
    pub score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionAck {
    Applied,
    /// Same-axis request; heading unchanged.
    Ignored,
    UnknownSlot,
    NotRunning,
}

#[derive(Debug)]
pub enum EngineCommand {
    ChangeDirection {
        slot: usize,
        direction: Direction,
        reply: oneshot::Sender<DirectionAck>,
    },
    Remove {
        slot: usize,
    },
}

#[derive(Debug)]
pub enum EngineEvent {
    Command(EngineCommand),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Running,
    Ended { winner: Option<usize> },
}

/// Receiving side of a seat, handed to the connection that joined.
#[derive(Debug)]
pub struct PlayerLink {
    pub slot: usize,
    pub color: &'static str,
    pub events: mpsc::Receiver<MatchEvent>,
    pub outcome: oneshot::Receiver<Outcome>,
}

struct Seat {
    player: Player,
    events: mpsc::Sender<MatchEvent>,
    outcome: Option<oneshot::Sender<Outcome>>,
}

impl Seat {
    fn finish(&mut self, victory: bool) {
        if let Some(outcome) = self.outcome.take() {
            // Receiver is gone if the connection closed first
            let _ = outcome.send(Outcome {
                victory,
                score: self.player.score,
            });
        }
    }

    fn notify(&self, match_id: &str, event: MatchEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("{}: slot {} is lagging, frame dropped", match_id, self.player.slot);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("{}: slot {} stopped listening", match_id, self.player.slot);
            }
        }
    }
}

/// Grid and roster of one match plus the rules that mutate them.
pub struct MatchEngine {
    id: MatchId,
    grid: Grid,
    /// Live seats ordered by slot.
    roster: Vec<Seat>,
    tick: u64,
    trail_limit: Option<u64>,
    frame_buffer: usize,
    status: MatchStatus,
}

impl MatchEngine {
    pub fn new(id: MatchId, height: usize, width: usize, config: &MatchConfig) -> Self {
        Self {
            id,
            grid: Grid::new(height, width),
            roster: Vec::with_capacity(MAX_PLAYERS),
            tick: 0,
            trail_limit: config.trail_limit,
            frame_buffer: config.frame_buffer.max(1),
            status: MatchStatus::Running,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.roster.iter().map(|seat| &seat.player)
    }

    pub fn player(&self, slot: usize) -> Option<&Player> {
        self.players().find(|player| player.slot == slot)
    }

    /// Seats a new player on the lowest free slot whose starting cell is free.
    pub fn add_player(&mut self) -> Result<PlayerLink, MatchError> {
        if self.roster.len() >= MAX_PLAYERS {
            return Err(MatchError::MaxPlayers);
        }

        let (height, width) = (self.grid.height(), self.grid.width());
        let (slot, position, heading) = (0..MAX_PLAYERS)
            .filter(|slot| self.player(*slot).is_none())
            .filter_map(|slot| {
                initial_slot_position(slot, height, width)
                    .map(|(position, heading)| (slot, position, heading))
            })
            .find(|(_, position, _)| !self.grid.occupied(*position))
            .ok_or(MatchError::NoFreeSlot)?;

        self.grid.set(position, true);

        let (events_tx, events_rx) = mpsc::channel(self.frame_buffer);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let seat = Seat {
            player: Player::new(slot, position, heading),
            events: events_tx,
            outcome: Some(outcome_tx),
        };
        let index = self.roster.partition_point(|seat| seat.player.slot < slot);
        self.roster.insert(index, seat);

        Ok(PlayerLink {
            slot,
            color: slot_color(slot),
            events: events_rx,
            outcome: outcome_rx,
        })
    }

    /// Frees a seat before the match starts. Returns false for unknown slots.
    pub fn remove_waiting(&mut self, slot: usize) -> bool {
        self.take_seat(slot).is_some()
    }

    pub fn announce(&self, starts_in: Duration) {
        for seat in &self.roster {
            seat.notify(&self.id, MatchEvent::Countdown { starts_in });
        }
    }

    /// Applies a single event and reports whether the match is still running.
    pub fn handle(&mut self, event: EngineEvent) -> MatchStatus {
        if self.status != MatchStatus::Running {
            if let EngineEvent::Command(command) = event {
                reject(command);
            }
            return self.status;
        }

        match event {
            EngineEvent::Command(EngineCommand::ChangeDirection {
                slot,
                direction,
                reply,
            }) => {
                let ack = self.change_direction(slot, direction);
                let _ = reply.send(ack);
            }
            EngineEvent::Command(EngineCommand::Remove { slot }) => self.remove(slot),
            EngineEvent::Tick => self.step(),
        }

        self.status
    }

    fn change_direction(&mut self, slot: usize, direction: Direction) -> DirectionAck {
        let Some(seat) = self.roster.iter_mut().find(|seat| seat.player.slot == slot) else {
            debug!("{}: direction change for unknown slot {}", self.id, slot);
            return DirectionAck::UnknownSlot;
        };

        if seat.player.turn(direction) {
            DirectionAck::Applied
        } else {
            DirectionAck::Ignored
        }
    }

    fn remove(&mut self, slot: usize) {
        let Some(mut seat) = self.take_seat(slot) else {
            debug!("{}: removal for unknown slot {}", self.id, slot);
            return;
        };

        seat.finish(false);
        info!(
            "{}: slot {} disconnected at tick {}",
            self.id, slot, self.tick
        );

        if self.roster.len() <= 1 {
            self.end();
        }
    }

    fn take_seat(&mut self, slot: usize) -> Option<Seat> {
        let index = self
            .roster
            .iter()
            .position(|seat| seat.player.slot == slot)?;
        let seat = self.roster.remove(index);
        self.clear(&seat.player);
        Some(seat)
    }

    fn clear(&mut self, player: &Player) {
        for cell in player.occupied_cells() {
            self.grid.set(cell, false);
        }
    }

    /// Advances every live player by one cell.
    ///
    /// Moves are checked against the grid as it stood when the tick began, and
    /// two players entering the same cell both crash, so roster order never
    /// decides who survives a head-on meeting.
    fn step(&mut self) {
        self.tick += 1;

        let targets: Vec<Coordinate> = self.roster.iter().map(|seat| seat.player.advance()).collect();
        let crashed: Vec<bool> = targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                !self.grid.in_bounds(*target)
                    || self.grid.occupied(*target)
                    || targets
                        .iter()
                        .enumerate()
                        .any(|(j, other)| i != j && other == target)
            })
            .collect();

        let mut survivors = Vec::with_capacity(self.roster.len());
        let mut removed = false;
        for (mut seat, crashed) in std::mem::take(&mut self.roster).into_iter().zip(crashed) {
            if !crashed {
                survivors.push(seat);
                continue;
            }

            self.clear(&seat.player);
            seat.finish(false);
            removed = true;
            info!(
                "{}: slot {} crashed at tick {} with score {}",
                self.id, seat.player.slot, self.tick, seat.player.score
            );
        }

        let evict = self.trail_limit.is_some_and(|limit| self.tick > limit);
        for seat in &mut survivors {
            let head = seat.player.step();
            self.grid.set(head, true);
            seat.player.score += 1;

            if evict {
                if let Some(oldest) = seat.player.trail.pop_front() {
                    self.grid.set(oldest, false);
                }
            }
        }
        self.roster = survivors;

        if removed && self.roster.len() <= 1 {
            self.end();
            return;
        }

        self.broadcast();
    }

    /// Render payload for the current state, keyed by slot.
    pub fn trails(&self) -> Trails {
        self.players()
            .map(|player| {
                (
                    player.slot,
                    TrailInfo {
                        coordinates: player.visible_path(),
                        color: slot_color(player.slot).to_string(),
                    },
                )
            })
            .collect()
    }

    fn broadcast(&self) {
        let trails = Arc::new(self.trails());
        for seat in &self.roster {
            seat.notify(
                &self.id,
                MatchEvent::Frame {
                    tick: self.tick,
                    trails: Arc::clone(&trails),
                },
            );
        }
    }

    fn end(&mut self) {
        let winner = self.roster.first_mut().map(|seat| {
            seat.finish(true);
            seat.player.slot
        });
        self.status = MatchStatus::Ended { winner };

        match winner {
            Some(slot) => info!("{}: ended at tick {}, slot {} wins", self.id, self.tick, slot),
            None => info!("{}: ended at tick {} without a winner", self.id, self.tick),
        }
    }
}

fn reject(command: EngineCommand) {
    if let EngineCommand::ChangeDirection { reply, .. } = command {
        let _ = reply.send(DirectionAck::NotRunning);
    }
}

pub fn validate(
    height: u32,
    width: u32,
    required: usize,
    config: &MatchConfig,
) -> Result<(), MatchError> {
    let side = 1..=config.max_grid_side;
    if !side.contains(&height) || !side.contains(&width) {
        return Err(MatchError::InvalidDimensions {
            height,
            width,
            max: config.max_grid_side,
        });
    }
    if required == 0 {
        return Err(MatchError::NoPlayers);
    }
    if required > MAX_PLAYERS {
        return Err(MatchError::MaxPlayers);
    }

    let mut starts = Vec::with_capacity(required);
    for slot in 0..required {
        match initial_slot_position(slot, height as usize, width as usize) {
            Some((cell, _)) if !starts.contains(&cell) => starts.push(cell),
            _ => {
                return Err(MatchError::GridTooSmall {
                    height,
                    width,
                    required,
                })
            }
        }
    }

    check_frame_size(height, width, required, config)
}

/// Refuses match shapes whose largest frame cannot travel in one datagram.
///
/// Live cells never exceed the grid, and with a trail limit each player holds
/// at most `trail_limit + 1` of them.
pub fn check_frame_size(
    height: u32,
    width: u32,
    required: usize,
    config: &MatchConfig,
) -> Result<(), MatchError> {
    let size = max_frame_size(height, width, required, config.trail_limit);
    if size > MAX_DATAGRAM_SIZE as u64 {
        return Err(MatchError::FrameTooLarge {
            height,
            width,
            size,
        });
    }
    Ok(())
}

/// Encoded size of the largest frame a match of this shape can broadcast.
pub fn max_frame_size(height: u32, width: u32, required: usize, trail_limit: Option<u64>) -> u64 {
    let grid_cells = u64::from(height) * u64::from(width);
    let cells = match trail_limit {
        Some(limit) => grid_cells.min((required as u64).saturating_mul(limit.saturating_add(1))),
        None => grid_cells,
    };

    let trails: Trails = (0..required)
        .map(|slot| {
            let info = TrailInfo {
                coordinates: Vec::new(),
                color: slot_color(slot).to_string(),
            };
            (slot, info)
        })
        .collect();
    let empty = Packet::Frame {
        tick: u64::MAX,
        trails,
    };

    let envelope = bincode::serialized_size(&empty).unwrap_or(u64::MAX);
    let per_cell = bincode::serialized_size(&Coordinate::new(0, 0)).unwrap_or(u64::MAX);
    envelope.saturating_add(cells.saturating_mul(per_cell))
}

struct Lobby {
    state: MatchState,
    joined: usize,
    /// Present until the engine task takes ownership.
    engine: Option<MatchEngine>,
    commands: Option<mpsc::UnboundedReceiver<EngineCommand>>,
    deregister: Option<Deregister>,
}

struct MatchShared {
    id: MatchId,
    height: u32,
    width: u32,
    required: usize,
    config: MatchConfig,
    lobby: Mutex<Lobby>,
    commands: mpsc::UnboundedSender<EngineCommand>,
}

/// Cloneable handle to a match, shared by the registry and every connection
/// seated in it.
#[derive(Clone)]
pub struct MatchHandle {
    shared: Arc<MatchShared>,
}

impl std::fmt::Debug for MatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchHandle")
            .field("id", &self.shared.id)
            .field("required", &self.shared.required)
            .finish()
    }
}

impl MatchHandle {
    pub fn new(
        id: MatchId,
        height: u32,
        width: u32,
        required: usize,
        config: MatchConfig,
    ) -> Result<Self, MatchError> {
        Self::build(id, height, width, required, config, None)
    }

    pub(crate) fn build(
        id: MatchId,
        height: u32,
        width: u32,
        required: usize,
        config: MatchConfig,
        deregister: Option<Deregister>,
    ) -> Result<Self, MatchError> {
        validate(height, width, required, &config)?;

        let engine = MatchEngine::new(id.clone(), height as usize, width as usize, &config);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        Ok(Self {
            shared: Arc::new(MatchShared {
                id,
                height,
                width,
                required,
                config,
                lobby: Mutex::new(Lobby {
                    state: MatchState::Initializing,
                    joined: 0,
                    engine: Some(engine),
                    commands: Some(commands_rx),
                    deregister,
                }),
                commands: commands_tx,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn height(&self) -> u32 {
        self.shared.height
    }

    pub fn width(&self) -> u32 {
        self.shared.width
    }

    pub fn required(&self) -> usize {
        self.shared.required
    }

    pub async fn state(&self) -> MatchState {
        self.shared.lobby.lock().await.state
    }

    pub async fn summary(&self) -> MatchSummary {
        let joined = self.shared.lobby.lock().await.joined;
        MatchSummary {
            match_id: self.shared.id.clone(),
            height: self.shared.height,
            width: self.shared.width,
            joined,
            required: self.shared.required,
        }
    }

    /// Takes a seat. The join that fills the lobby starts the match.
    pub async fn join(&self) -> Result<PlayerLink, MatchError> {
        let mut lobby = self.shared.lobby.lock().await;
        if lobby.state != MatchState::Initializing {
            return Err(MatchError::InProgress);
        }

        let (link, seated) = {
            let engine = lobby.engine.as_mut().ok_or(MatchError::InProgress)?;
            let link = engine.add_player()?;
            (link, engine.len())
        };
        lobby.joined = seated;
        info!(
            "{}: slot {} joined ({}/{})",
            self.shared.id, link.slot, seated, self.shared.required
        );

        if seated >= self.shared.required {
            self.start(&mut lobby);
        }

        Ok(link)
    }

    fn start(&self, lobby: &mut Lobby) {
        let (Some(engine), Some(commands)) = (lobby.engine.take(), lobby.commands.take()) else {
            warn!("{}: start requested twice", self.shared.id);
            return;
        };

        lobby.state = MatchState::InProgress;
        engine.announce(self.shared.config.start_delay);

        let deregister = lobby.deregister.take();
        tokio::spawn(run_engine(
            Arc::clone(&self.shared),
            engine,
            commands,
            deregister,
        ));
    }

    /// Requests a heading change and waits until the engine has applied or
    /// refused it.
    pub async fn send_direction(&self, slot: usize, direction: Direction) -> DirectionAck {
        if self.state().await != MatchState::InProgress {
            return DirectionAck::NotRunning;
        }

        let (reply, ack) = oneshot::channel();
        let command = EngineCommand::ChangeDirection {
            slot,
            direction,
            reply,
        };
        if self.shared.commands.send(command).is_err() {
            return DirectionAck::NotRunning;
        }

        ack.await.unwrap_or(DirectionAck::NotRunning)
    }

    /// Releases a seat. Before the start this frees the slot for someone else;
    /// afterwards it removes the player from the running match.
    pub async fn disconnect(&self, slot: usize) {
        let mut lobby = self.shared.lobby.lock().await;
        match lobby.state {
            MatchState::Initializing => {
                let left = lobby
                    .engine
                    .as_mut()
                    .map(|engine| (engine.remove_waiting(slot), engine.len()));
                if let Some((true, seated)) = left {
                    lobby.joined = seated;
                    info!("{}: slot {} left the lobby", self.shared.id, slot);
                }
            }
            MatchState::InProgress => {
                if self
                    .shared
                    .commands
                    .send(EngineCommand::Remove { slot })
                    .is_err()
                {
                    debug!("{}: engine already stopped", self.shared.id);
                }
            }
            MatchState::Ended => {}
        }
    }
}

async fn run_engine(
    shared: Arc<MatchShared>,
    mut engine: MatchEngine,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    deregister: Option<Deregister>,
) {
    if let Some(deregister) = deregister {
        deregister.run().await;
    }

    info!("{}: starting main game loop", engine.id());

    let period = shared.config.tick_duration.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + shared.config.start_delay, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            Some(command) = commands.recv() => EngineEvent::Command(command),
            _ = ticker.tick() => EngineEvent::Tick,
        };

        if let MatchStatus::Ended { .. } = engine.handle(event) {
            break;
        }
    }

    commands.close();
    while let Ok(command) = commands.try_recv() {
        reject(command);
    }

    shared.lobby.lock().await.state = MatchState::Ended;
}

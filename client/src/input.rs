//! Keyboard input mapped to steering and lobby actions

use macroquad::prelude::*;
use shared::Direction;

/// Something the player asked for during this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Steer(Direction),
    /// Join the n-th listed match
    Pick(usize),
    Refresh,
    Quit,
}

const PICK_KEYS: [KeyCode; 9] = [
    KeyCode::Key1,
    KeyCode::Key2,
    KeyCode::Key3,
    KeyCode::Key4,
    KeyCode::Key5,
    KeyCode::Key6,
    KeyCode::Key7,
    KeyCode::Key8,
    KeyCode::Key9,
];

/// Steering for arrow keys and WASD
pub fn direction_for(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Up | KeyCode::W => Some(Direction::Up),
        KeyCode::Down | KeyCode::S => Some(Direction::Down),
        KeyCode::Left | KeyCode::A => Some(Direction::Left),
        KeyCode::Right | KeyCode::D => Some(Direction::Right),
        _ => None,
    }
}

/// Collects key presses and filters out repeats of the last steering request
pub struct InputManager {
    last_direction: Option<Direction>,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            last_direction: None,
        }
    }

    /// Forget the last steering request, e.g. when a new match starts
    pub fn reset(&mut self) {
        self.last_direction = None;
    }

    /// Actions for the keys pressed since the previous frame
    pub fn update(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        for key in get_keys_pressed() {
            if let Some(direction) = direction_for(key) {
                if let Some(action) = self.steer(direction) {
                    actions.push(action);
                }
            } else if let Some(index) = PICK_KEYS.iter().position(|pick| *pick == key) {
                actions.push(Action::Pick(index));
            } else if key == KeyCode::R {
                actions.push(Action::Refresh);
            } else if key == KeyCode::Escape {
                actions.push(Action::Quit);
            }
        }

        actions
    }

    fn steer(&mut self, direction: Direction) -> Option<Action> {
        if self.last_direction == Some(direction) {
            return None;
        }
        self.last_direction = Some(direction);
        Some(Action::Steer(direction))
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_and_wasd_keys() {
        assert_eq!(direction_for(KeyCode::Up), Some(Direction::Up));
        assert_eq!(direction_for(KeyCode::W), Some(Direction::Up));
        assert_eq!(direction_for(KeyCode::S), Some(Direction::Down));
        assert_eq!(direction_for(KeyCode::A), Some(Direction::Left));
        assert_eq!(direction_for(KeyCode::Right), Some(Direction::Right));
        assert_eq!(direction_for(KeyCode::Space), None);
    }

    #[test]
    fn test_repeated_steering_is_filtered() {
        let mut input = InputManager::new();
        assert_eq!(
            input.steer(Direction::Left),
            Some(Action::Steer(Direction::Left))
        );
        assert_eq!(input.steer(Direction::Left), None);
        assert_eq!(
            input.steer(Direction::Up),
            Some(Action::Steer(Direction::Up))
        );

        input.reset();
        assert_eq!(
            input.steer(Direction::Up),
            Some(Action::Steer(Direction::Up))
        );
    }
}

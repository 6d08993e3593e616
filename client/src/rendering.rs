use crate::game::{ClientGameState, Phase};
use macroquad::prelude::*;
use shared::{Coordinate, MatchSummary};

const BACKGROUND: Color = Color::new(0.1, 0.1, 0.1, 1.0);
const BOARD: Color = Color::new(0.16, 0.16, 0.16, 1.0);
const STATUS_HEIGHT: f32 = 30.0;

/// Parses `#rrggbb` into a macroquad color
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    Some(Color::from_rgba(
        channel(0..2)?,
        channel(2..4)?,
        channel(4..6)?,
        255,
    ))
}

pub struct Renderer {
    cell_size: f32,
}

impl Renderer {
    pub fn new(cell_size: f32) -> Self {
        Self { cell_size }
    }

    /// Screen rectangle of a grid cell, below the status bar
    pub fn cell_rect(&self, cell: Coordinate) -> Rect {
        Rect::new(
            cell.x as f32 * self.cell_size,
            STATUS_HEIGHT + cell.y as f32 * self.cell_size,
            self.cell_size,
            self.cell_size,
        )
    }

    /// Window size needed for a grid
    pub fn window_size(&self, height: u32, width: u32) -> (f32, f32) {
        (
            width as f32 * self.cell_size,
            STATUS_HEIGHT + height as f32 * self.cell_size,
        )
    }

    pub fn render(&self, state: &ClientGameState) {
        clear_background(BACKGROUND);

        match (&state.phase, &state.seat) {
            (Phase::Connecting | Phase::Lobby | Phase::Disconnected { .. }, _) | (_, None) => {
                self.draw_lobby(&state.lobby);
            }
            (_, Some(seat)) => {
                self.draw_board(seat.height, seat.width);
                self.draw_trails(state);
            }
        }

        self.draw_status(state);
    }

    fn draw_board(&self, height: u32, width: u32) {
        let (w, h) = self.window_size(height, width);
        draw_rectangle(0.0, STATUS_HEIGHT, w, h - STATUS_HEIGHT, BOARD);
        draw_rectangle_lines(0.0, STATUS_HEIGHT, w, h - STATUS_HEIGHT, 1.0, GRAY);
    }

    fn draw_trails(&self, state: &ClientGameState) {
        let own_slot = state.seat.as_ref().map(|seat| seat.slot);

        for (slot, trail) in &state.trails {
            let color = parse_hex_color(&trail.color).unwrap_or(WHITE);
            for cell in &trail.coordinates {
                let rect = self.cell_rect(*cell);
                draw_rectangle(rect.x, rect.y, rect.w, rect.h, color);
            }

            // Outline the head
            if let Some(head) = trail.coordinates.last() {
                let rect = self.cell_rect(*head);
                let outline = if Some(*slot) == own_slot { YELLOW } else { WHITE };
                draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, outline);
            }
        }
    }

    fn draw_lobby(&self, lobby: &[MatchSummary]) {
        for (i, summary) in lobby.iter().take(9).enumerate() {
            let line = format!(
                "{}: {} ({}x{}) {}/{} players",
                i + 1,
                summary.match_id,
                summary.height,
                summary.width,
                summary.joined,
                summary.required
            );
            draw_text(&line, 10.0, STATUS_HEIGHT + 24.0 + i as f32 * 22.0, 20.0, WHITE);
        }
    }

    fn draw_status(&self, state: &ClientGameState) {
        if let Some(seat) = &state.seat {
            let color = parse_hex_color(&seat.color).unwrap_or(WHITE);
            draw_rectangle(8.0, 8.0, 14.0, 14.0, color);
        }
        draw_text(&state.status(), 30.0, 21.0, 20.0, WHITE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_palette_colors() {
        for color in shared::PALETTE {
            assert!(parse_hex_color(color).is_some());
        }
        let red = parse_hex_color("#ff0000").unwrap();
        assert_eq!((red.r, red.g, red.b, red.a), (1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_parse_rejects_bad_colors() {
        assert!(parse_hex_color("ff0000").is_none());
        assert!(parse_hex_color("#fff").is_none());
        assert!(parse_hex_color("#gg0000").is_none());
    }

    #[test]
    fn test_cell_layout() {
        let renderer = Renderer::new(10.0);
        let rect = renderer.cell_rect(Coordinate::new(2, 3));
        assert_eq!((rect.x, rect.y), (20.0, STATUS_HEIGHT + 30.0));
        assert_eq!((rect.w, rect.h), (10.0, 10.0));
        assert_eq!(renderer.window_size(5, 8), (80.0, STATUS_HEIGHT + 50.0));
    }
}

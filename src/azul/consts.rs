//! Fixed constants and small value types shared across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of distinct tile colors in a game of Azul.
pub const NUM_COLORS: usize = 5;

/// Size of one side of the wall grid (and the number of pattern lines).
pub const WALL_SIZE: usize = 5;

/// Capacity of a single factory display.
pub const FACTORY_CAPACITY: usize = 4;

/// Maximum number of entries (tiles + marker) a floor line can hold before
/// further drafted tiles spill to discard.
pub const FLOOR_CAPACITY: usize = 7;

/// Per-position floor-line penalties, indexed 0..FLOOR_CAPACITY.
pub const FLOOR_PENALTIES: [i32; FLOOR_CAPACITY] = [-1, -1, -2, -2, -2, -3, -3];

/// Capacity of pattern line `i` (0-indexed) is `i + 1`.
pub const PATTERN_LINE_CAPACITY: [u8; WALL_SIZE] = [1, 2, 3, 4, 5];

/// The placement-score table a filled pattern line of a given capacity is
/// worth under nominal (no-neighbour) assumptions: `{1,3,6,10,15}`.
pub const NOMINAL_COMPLETION_BONUS: [i32; WALL_SIZE] = [1, 3, 6, 10, 15];

/// Total tiles in the game (20 per color).
pub const TOTAL_TILES: usize = NUM_COLORS * TILES_PER_COLOR;

/// Copies of each color present in the bag at game start.
pub const TILES_PER_COLOR: usize = 20;

/// Minimum supported player count.
pub const MIN_PLAYERS: u8 = 2;

/// Maximum supported player count.
pub const MAX_PLAYERS: u8 = 4;

/// A tile color, drawn from the fixed set `{C0, .., C4}`.
///
/// The engine is color-agnostic: scoring only depends on the wall's cyclic
/// color pattern, never on a color's identity, so the five variants carry no
/// further semantics than their ordinal.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    C0 = 0,
    C1 = 1,
    C2 = 2,
    C3 = 3,
    C4 = 4,
}

impl Color {
    /// All five colors in a fixed, canonical order.
    pub const ALL: [Color; NUM_COLORS] = [Color::C0, Color::C1, Color::C2, Color::C3, Color::C4];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn notate(&self) -> char {
        (b'0' + *self as u8) as char
    }
}

impl From<u8> for Color {
    fn from(value: u8) -> Self {
        match value {
            0 => Color::C0,
            1 => Color::C1,
            2 => Color::C2,
            3 => Color::C3,
            4 => Color::C4,
            _ => panic!("expected a color index 0..{NUM_COLORS}, received {value}"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", *self as u8)
    }
}

/// A seat at the table, 0-indexed. Up to [`MAX_PLAYERS`] players are
/// supported; the search/eval/MCTS components are only latency-budgeted
/// for the 2-player case but function correctly for 3/4 as well.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// The next seat to move, wrapping modulo `players`.
    pub fn next(&self, players: u8) -> PlayerId {
        PlayerId((self.0 + 1) % players)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Phase of play a [`crate::azul::position::Position`] is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Drafting,
    WallTiling,
    GameOver,
}

/// Where a drafted color comes from: one of the numbered factories, or the
/// shared center pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Factory(u8),
    Center,
}

/// Where drafted tiles are sent: a pattern line (0..WALL_SIZE), or straight
/// to the floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dest {
    Line(u8),
    Floor,
}

/// The wall's cyclic color pattern: color `k` sits in column `(row + k) %
/// NUM_COLORS` of wall row `row`.
pub fn wall_column_for(row: usize, color: Color) -> usize {
    (row + color.index()) % NUM_COLORS
}

/// Inverse of [`wall_column_for`]: which color occupies wall cell (row, col).
pub fn wall_color_at(row: usize, col: usize) -> Color {
    Color::from(((col + NUM_COLORS - (row % NUM_COLORS)) % NUM_COLORS) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_pattern_is_a_bijection_per_row() {
        for row in 0..WALL_SIZE {
            let mut seen = [false; NUM_COLORS];
            for &color in Color::ALL.iter() {
                let col = wall_column_for(row, color);
                assert!(!seen[col], "row {row} color {color:?} collided at col {col}");
                seen[col] = true;
                assert_eq!(wall_color_at(row, col), color);
            }
        }
    }
}

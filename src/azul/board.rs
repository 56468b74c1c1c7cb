//! A single player's board: pattern lines, wall, floor line, score.
//!
//! Small bit-packable cells with a dedicated mask type per concern, sized
//! for Azul's 5x5 wall.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::azul::consts::*;

/// One of a board's five pattern lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLine {
    pub color: Option<Color>,
    pub fill: u8,
}

impl PatternLine {
    pub fn capacity(line: usize) -> u8 {
        PATTERN_LINE_CAPACITY[line]
    }

    pub fn is_full(&self, line: usize) -> bool {
        self.fill == Self::capacity(line)
    }
}

/// An entry on the floor line: either a drafted tile or the first-player
/// marker. Order matters (penalties are positional).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorEntry {
    Tile(Color),
    Marker,
}

/// A single seat's board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBoard {
    pub lines: [PatternLine; WALL_SIZE],
    /// Row-major bitmask of filled wall cells; bit `col` of `wall[row]`.
    pub wall: [u8; WALL_SIZE],
    #[serde(with = "floor_serde")]
    pub floor: ArrayVec<FloorEntry, FLOOR_CAPACITY>,
    pub score: i32,
}

/// `ArrayVec` doesn't implement `serde::Serialize` for arbitrary element
/// types without its own `serde` feature; round-trip through a plain `Vec`
/// instead since the floor is always within capacity.
mod floor_serde {
    use super::*;

    pub fn serialize<S: serde::Serializer>(
        floor: &ArrayVec<FloorEntry, FLOOR_CAPACITY>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        floor.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ArrayVec<FloorEntry, FLOOR_CAPACITY>, D::Error> {
        let items: Vec<FloorEntry> = Vec::deserialize(deserializer)?;
        let mut out = ArrayVec::new();
        for item in items {
            out.try_push(item).map_err(|_| serde::de::Error::custom("floor line exceeds capacity"))?;
        }
        Ok(out)
    }
}

impl Default for PlayerBoard {
    fn default() -> Self {
        PlayerBoard {
            lines: [PatternLine::default(); WALL_SIZE],
            wall: [0u8; WALL_SIZE],
            floor: ArrayVec::new(),
            score: 0,
        }
    }
}

/// Outcome of [`PlayerBoard::apply_draft`]: how many tiles of the drafted
/// color overflowed into the floor (and thence possibly discard), used by
/// the caller to route the overflow into the shared discard pile.
pub struct DraftOutcome {
    pub tiles_to_discard: u8,
}

/// Outcome of one pattern line's wall-tiling step.
pub struct TilingOutcome {
    pub placed_color: Color,
    pub placed_row: usize,
    pub placement_score: i32,
    pub tiles_to_discard: u8,
}

impl PlayerBoard {
    pub fn wall_has(&self, row: usize, color: Color) -> bool {
        let col = wall_column_for(row, color);
        (self.wall[row] >> col) & 1 == 1
    }

    fn set_wall(&mut self, row: usize, color: Color) {
        let col = wall_column_for(row, color);
        self.wall[row] |= 1 << col;
    }

    /// Whether pattern line `line` can currently accept `color`: the line
    /// must be empty or already tagged with `color`, have room, and the
    /// wall cell it would feed must still be empty.
    pub fn line_accepts(&self, line: usize, color: Color) -> bool {
        let pl = &self.lines[line];
        let tag_ok = pl.color.is_none() || pl.color == Some(color);
        let room_ok = pl.fill < PatternLine::capacity(line);
        let wall_ok = !self.wall_has(line, color);
        tag_ok && room_ok && wall_ok
    }

    /// Places up to `count` tiles of `color` into pattern line `line`,
    /// spilling any that don't fit onto the floor (further spilling to
    /// discard if the floor is also full). Returns the number of tiles that
    /// ended up discarded outright.
    pub fn place_in_line(&mut self, line: usize, color: Color, count: u8) -> DraftOutcome {
        debug_assert!(self.line_accepts(line, color) || self.lines[line].fill == PatternLine::capacity(line));
        let pl = &mut self.lines[line];
        pl.color = Some(color);
        let room = PatternLine::capacity(line) - pl.fill;
        let placed = room.min(count);
        pl.fill += placed;
        let overflow = count - placed;
        let discarded = self.push_floor_tiles(color, overflow);
        DraftOutcome { tiles_to_discard: discarded }
    }

    /// Places all `count` tiles directly onto the floor.
    pub fn place_on_floor(&mut self, color: Color, count: u8) -> DraftOutcome {
        let discarded = self.push_floor_tiles(color, count);
        DraftOutcome { tiles_to_discard: discarded }
    }

    /// Places the first-player marker on this board's floor, if there's
    /// room; otherwise it is lost, which a legal position never actually
    /// triggers since the marker's draft is always the very first action
    /// a floor sees after a round's refill.
    pub fn place_marker(&mut self) {
        if self.floor.len() < FLOOR_CAPACITY {
            let _ = self.floor.try_push(FloorEntry::Marker);
        }
    }

    fn push_floor_tiles(&mut self, color: Color, count: u8) -> u8 {
        let mut discarded = 0;
        for _ in 0..count {
            if self.floor.len() < FLOOR_CAPACITY {
                let _ = self.floor.try_push(FloorEntry::Tile(color));
            } else {
                discarded += 1;
            }
        }
        discarded
    }

    /// Wall-tiling step for one full pattern line, run at round end: moves
    /// one tile to the wall, discards the remaining `i` tiles, and
    /// returns the placement score. Returns `None` if the line isn't full.
    pub fn tile_pattern_line(&mut self, line: usize) -> Option<TilingOutcome> {
        let pl = self.lines[line];
        if pl.fill != PatternLine::capacity(line) {
            return None;
        }
        let color = pl.color.expect("full line always has a color tag");
        self.set_wall(line, color);
        let placement_score = self.placement_score(line, color);
        self.score += placement_score;
        let discarded = pl.fill - 1;
        self.lines[line] = PatternLine::default();
        Some(TilingOutcome { placed_color: color, placed_row: line, placement_score, tiles_to_discard: discarded })
    }

    /// Placement score for a tile just placed at (row, color)'s wall cell: a
    /// direction with no neighbours contributes 0; a direction with
    /// neighbours contributes the full length of its contiguous run
    /// (including the placed tile); if the tile is isolated in both
    /// directions it scores 1 for itself.
    fn placement_score(&self, row: usize, color: Color) -> i32 {
        let col = wall_column_for(row, color);
        let row_run = self.run_length_row(row, col);
        let col_run = self.run_length_col(row, col);
        let contrib = |run: usize| -> i32 {
            if run > 1 { run as i32 } else { 0 }
        };
        let score = contrib(row_run) + contrib(col_run);
        if score == 0 { 1 } else { score }
    }

    fn run_length_row(&self, row: usize, col: usize) -> usize {
        let mask = self.wall[row] | (1 << col); // the tile is already placed by the time we call this, but keep it robust
        let mut len = 1;
        let mut c = col;
        while c > 0 && (mask >> (c - 1)) & 1 == 1 {
            c -= 1;
            len += 1;
        }
        let mut c = col;
        while c + 1 < WALL_SIZE && (mask >> (c + 1)) & 1 == 1 {
            c += 1;
            len += 1;
        }
        len
    }

    fn run_length_col(&self, row: usize, col: usize) -> usize {
        let mut len = 1;
        let mut r = row;
        while r > 0 && (self.wall[r - 1] >> col) & 1 == 1 {
            r -= 1;
            len += 1;
        }
        let mut r = row;
        while r + 1 < WALL_SIZE && (self.wall[r + 1] >> col) & 1 == 1 {
            r += 1;
            len += 1;
        }
        len
    }

    /// Floor-line penalty for the tiles currently on the floor: positional
    /// penalties `[-1,-1,-2,-2,-2,-3,-3]`, score clamped to ≥ 0.
    pub fn apply_floor_penalty(&mut self) {
        let penalty: i32 = FLOOR_PENALTIES.iter().take(self.floor.len()).sum();
        self.score = (self.score + penalty).max(0);
    }

    /// Clears the floor, returning the tiles (for the caller to route to
    /// discard) and whether the marker was present (for the caller to
    /// return it to the center).
    pub fn clear_floor(&mut self) -> (ArrayVec<Color, FLOOR_CAPACITY>, bool) {
        let mut tiles = ArrayVec::new();
        let mut had_marker = false;
        for entry in self.floor.drain(..) {
            match entry {
                FloorEntry::Tile(c) => {
                    let _ = tiles.try_push(c);
                }
                FloorEntry::Marker => had_marker = true,
            }
        }
        (tiles, had_marker)
    }

    pub fn rows_filled(&self) -> u32 {
        self.wall.iter().filter(|&&row| row == 0b11111).count() as u32
    }

    pub fn cols_filled(&self) -> u32 {
        (0..WALL_SIZE)
            .filter(|&col| (0..WALL_SIZE).all(|row| (self.wall[row] >> col) & 1 == 1))
            .count() as u32
    }

    pub fn colors_complete(&self) -> u32 {
        Color::ALL
            .iter()
            .filter(|&&color| (0..WALL_SIZE).all(|row| self.wall_has(row, color)))
            .count() as u32
    }

    pub fn rows_near_complete(&self) -> u32 {
        self.wall.iter().filter(|row| row.count_ones() == WALL_SIZE as u32 - 1).count() as u32
    }

    pub fn cols_near_complete(&self) -> u32 {
        (0..WALL_SIZE)
            .filter(|&col| (0..WALL_SIZE).filter(|&row| (self.wall[row] >> col) & 1 == 1).count() == WALL_SIZE - 1)
            .count() as u32
    }

    pub fn colors_near_complete(&self) -> u32 {
        Color::ALL
            .iter()
            .filter(|&&color| (0..WALL_SIZE).filter(|&row| self.wall_has(row, color)).count() == WALL_SIZE - 1)
            .count() as u32
    }

    /// Applies the end-of-game bonuses: +2/row, +7/col, +10/color.
    pub fn apply_endgame_bonuses(&mut self) {
        self.score += 2 * self.rows_filled() as i32;
        self.score += 7 * self.cols_filled() as i32;
        self.score += 10 * self.colors_complete() as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_placement_scores_one() {
        let mut board = PlayerBoard::default();
        board.lines[0] = PatternLine { color: Some(Color::C0), fill: 1 };
        let outcome = board.tile_pattern_line(0).unwrap();
        assert_eq!(outcome.placement_score, 1);
        assert_eq!(board.score, 1);
    }

    #[test]
    fn contiguous_run_scores_full_length_once() {
        let mut board = PlayerBoard::default();
        // Fill wall row 0 at columns for C0 (col 0) and C1 (col 1) first,
        // then place C2 (col 2) to form a horizontal run of 3.
        board.set_wall(0, Color::C0);
        board.set_wall(0, Color::C1);
        board.lines[0] = PatternLine { color: Some(Color::C2), fill: 1 };
        let outcome = board.tile_pattern_line(0).unwrap();
        assert_eq!(outcome.placement_score, 3);
    }

    #[test]
    fn floor_overflow_discards_excess() {
        let mut board = PlayerBoard::default();
        let outcome = board.place_on_floor(Color::C0, 9);
        assert_eq!(board.floor.len(), FLOOR_CAPACITY);
        assert_eq!(outcome.tiles_to_discard, 2);
    }

    #[test]
    fn floor_penalty_clamps_at_zero() {
        let mut board = PlayerBoard::default();
        board.score = 1;
        board.place_on_floor(Color::C0, 7);
        board.apply_floor_penalty();
        assert_eq!(board.score, 0);
    }
}

//! Zobrist hashing.
//!
//! Each location/shape gets a fixed table of 64-bit keys, built once from a
//! deterministic hasher seeded by the key's coordinates (lazily filling a
//! fixed-size array from a `DefaultHasher`, the same trick classic Zobrist
//! implementations use to avoid shipping a literal key table). Unlike a
//! classic "XOR one key per tile" Zobrist scheme (which only works for
//! *binary* presence), Azul's locations are small multisets, so each table
//! is keyed by `(location, count)` and a transition XORs out the key for
//! the old count and XORs in the key for the new one — "remove old, add
//! new" rather than "toggle a bit".
//!
//! [`Position::apply`](crate::azul::position::Position::apply) calls the
//! `*_hash` functions below immediately before and after each sub-state
//! mutation and XORs the delta into the running hash, so the hash is
//! maintained incrementally rather than recomputed from scratch. [`full_hash`]
//! recomputes it from nothing and is used only to verify the two agree.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::OnceLock;

use crate::azul::board::{FloorEntry, PlayerBoard};
use crate::azul::consts::*;
use crate::azul::position::Position;

const MAX_FACTORIES: usize = (2 * MAX_PLAYERS as usize) + 1;
const MAX_FACTORY_COUNT: usize = FACTORY_CAPACITY + 1;
const MAX_SUPPLY_COUNT: usize = TILES_PER_COLOR + 1;
const MAX_SCORE: usize = 256;

fn keyed_u64(seed: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    hasher.finish()
}

fn table<const N: usize>(cell: &OnceLock<[u64; N]>, make: impl Fn(usize) -> u64) -> &[u64; N] {
    cell.get_or_init(|| std::array::from_fn(make))
}

fn bag_key(color: Color, count: u8) -> u64 {
    static TABLE: OnceLock<[u64; NUM_COLORS * MAX_SUPPLY_COUNT]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("bag", i)))[color.index() * MAX_SUPPLY_COUNT + count as usize]
}

fn discard_key(color: Color, count: u8) -> u64 {
    static TABLE: OnceLock<[u64; NUM_COLORS * MAX_SUPPLY_COUNT]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("discard", i)))[color.index() * MAX_SUPPLY_COUNT + count as usize]
}

fn factory_key(idx: usize, color: Color, count: u8) -> u64 {
    static TABLE: OnceLock<[u64; MAX_FACTORIES * NUM_COLORS * MAX_FACTORY_COUNT]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("factory", i)))
        [(idx * NUM_COLORS + color.index()) * MAX_FACTORY_COUNT + count as usize]
}

fn center_tile_key(color: Color, count: u8) -> u64 {
    static TABLE: OnceLock<[u64; NUM_COLORS * MAX_SUPPLY_COUNT]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("center", i)))[color.index() * MAX_SUPPLY_COUNT + count as usize]
}

fn center_marker_key() -> u64 {
    static KEY: OnceLock<u64> = OnceLock::new();
    *KEY.get_or_init(|| keyed_u64("center-marker"))
}

fn line_key(player: usize, line: usize, color: Option<Color>, fill: u8) -> u64 {
    static TABLE: OnceLock<[u64; MAX_PLAYERS as usize * WALL_SIZE * (NUM_COLORS + 1) * (WALL_SIZE + 1)]> =
        OnceLock::new();
    let color_idx = color.map_or(NUM_COLORS, |c| c.index());
    let idx = ((player * WALL_SIZE + line) * (NUM_COLORS + 1) + color_idx) * (WALL_SIZE + 1) + fill as usize;
    table(&TABLE, |i| keyed_u64(("line", i)))[idx]
}

fn wall_key(player: usize, row: usize, col: usize) -> u64 {
    static TABLE: OnceLock<[u64; MAX_PLAYERS as usize * WALL_SIZE * WALL_SIZE]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("wall", i)))[(player * WALL_SIZE + row) * WALL_SIZE + col]
}

fn floor_tile_key(player: usize, color: Color, count: u8) -> u64 {
    static TABLE: OnceLock<[u64; MAX_PLAYERS as usize * NUM_COLORS * (FLOOR_CAPACITY + 1)]> = OnceLock::new();
    let idx = (player * NUM_COLORS + color.index()) * (FLOOR_CAPACITY + 1) + count as usize;
    table(&TABLE, |i| keyed_u64(("floor", i)))[idx]
}

fn floor_marker_key(player: usize) -> u64 {
    static TABLE: OnceLock<[u64; MAX_PLAYERS as usize]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("floor-marker", i)))[player]
}

fn score_key(player: usize, score: i32) -> u64 {
    static TABLE: OnceLock<[u64; MAX_PLAYERS as usize * MAX_SCORE]> = OnceLock::new();
    let clamped = score.clamp(0, MAX_SCORE as i32 - 1) as usize;
    table(&TABLE, |i| keyed_u64(("score", i)))[player * MAX_SCORE + clamped]
}

fn to_move_key(player: usize) -> u64 {
    static TABLE: OnceLock<[u64; MAX_PLAYERS as usize]> = OnceLock::new();
    table(&TABLE, |i| keyed_u64(("to-move", i)))[player]
}

fn phase_key(phase: Phase) -> u64 {
    static TABLE: OnceLock<[u64; 3]> = OnceLock::new();
    let idx = match phase {
        Phase::Drafting => 0,
        Phase::WallTiling => 1,
        Phase::GameOver => 2,
    };
    table(&TABLE, |i| keyed_u64(("phase", i)))[idx]
}

/// Combined key for one player's entire board. Board mutations are
/// comparatively rare events inside `apply` (one per move for lines/floor,
/// one per full line at round end), so diffing the whole board before and
/// after is both simpler and still well within a small, constant clone
/// budget.
pub fn board_hash(player: usize, board: &PlayerBoard) -> u64 {
    let mut h = 0u64;
    for (line_idx, line) in board.lines.iter().enumerate() {
        h ^= line_key(player, line_idx, line.color, line.fill);
    }
    for row in 0..WALL_SIZE {
        for col in 0..WALL_SIZE {
            if (board.wall[row] >> col) & 1 == 1 {
                h ^= wall_key(player, row, col);
            }
        }
    }
    let mut floor_counts = [0u8; NUM_COLORS];
    let mut has_marker = false;
    for entry in &board.floor {
        match entry {
            FloorEntry::Tile(c) => floor_counts[c.index()] += 1,
            FloorEntry::Marker => has_marker = true,
        }
    }
    for (i, &count) in floor_counts.iter().enumerate() {
        h ^= floor_tile_key(player, Color::from(i as u8), count);
    }
    if has_marker {
        h ^= floor_marker_key(player);
    }
    h ^= score_key(player, board.score);
    h
}

pub fn factories_hash(factories: &[[u8; NUM_COLORS]]) -> u64 {
    let mut h = 0u64;
    for (idx, counts) in factories.iter().enumerate() {
        for (color_idx, &count) in counts.iter().enumerate() {
            h ^= factory_key(idx, Color::from(color_idx as u8), count);
        }
    }
    h
}

pub fn center_hash(tiles: &[u8; NUM_COLORS], marker_present: bool) -> u64 {
    let mut h = 0u64;
    for (color_idx, &count) in tiles.iter().enumerate() {
        h ^= center_tile_key(Color::from(color_idx as u8), count);
    }
    if marker_present {
        h ^= center_marker_key();
    }
    h
}

pub fn bag_hash(counts: &[u8; NUM_COLORS]) -> u64 {
    let mut h = 0u64;
    for (color_idx, &count) in counts.iter().enumerate() {
        h ^= bag_key(Color::from(color_idx as u8), count);
    }
    h
}

pub fn discard_hash(counts: &[u8; NUM_COLORS]) -> u64 {
    let mut h = 0u64;
    for (color_idx, &count) in counts.iter().enumerate() {
        h ^= discard_key(Color::from(color_idx as u8), count);
    }
    h
}

pub fn to_move_hash(player: PlayerId) -> u64 {
    to_move_key(player.index())
}

pub fn phase_hash(phase: Phase) -> u64 {
    phase_key(phase)
}

/// Recomputes the Zobrist hash of `pos` entirely from scratch. Used only to
/// cross-check the incrementally maintained hash in tests — never on the
/// hot path.
pub fn full_hash(pos: &Position) -> u64 {
    let mut h = 0u64;
    h ^= bag_hash(&pos.bag);
    h ^= discard_hash(&pos.discard);
    h ^= factories_hash(&pos.factories);
    h ^= center_hash(&pos.center.tiles, pos.center.marker_present);
    for (i, board) in pos.boards.iter().enumerate() {
        h ^= board_hash(i, board);
    }
    h ^= to_move_hash(pos.to_move);
    h ^= phase_hash(pos.phase);
    h
}

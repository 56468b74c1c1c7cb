//! Retrograde endgame solver: exact minimax over positions with few enough
//! remaining draftable tiles, memoized by a symmetry-canonical key.
//!
//! The canonical key is the *actual* minimum-lexicographic encoding rather
//! than a hash of it — a hash risks exactly the silent-collision failure
//! mode a canonicalization scheme is supposed to rule out, so the cache is
//! keyed on the encoding itself (see `DESIGN.md` for the tradeoff).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::azul::consts::*;
use crate::azul::error::EndgameNotApplicable;
use crate::azul::movegen::Move;
use crate::azul::position::Position;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EndgameEntry {
    pub best_move: Option<Move>,
    pub score: f32,
    pub depth: u8,
    pub exact: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EndgameStats {
    pub entries: usize,
    pub hits: u64,
    pub analyzed_positions: u64,
}

pub fn remaining_draftable_tiles(pos: &Position) -> u32 {
    pos.factories.iter().flatten().map(|&c| c as u32).sum::<u32>()
        + pos.center.tiles.iter().map(|&c| c as u32).sum::<u32>()
}

/// Builds the compact encoding used for canonicalization, viewing the game
/// through seat order `seats` (a permutation of board indices). Factories
/// are sorted among themselves first since any two factories holding the
/// same multiset are interchangeable.
fn encode(pos: &Position, seats: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&pos.bag);
    out.extend_from_slice(&pos.discard);
    let mut factories = pos.factories.clone();
    factories.sort();
    for f in &factories {
        out.extend_from_slice(f);
    }
    out.extend_from_slice(&pos.center.tiles);
    out.push(pos.center.marker_present as u8);
    for &seat in seats {
        let board = &pos.boards[seat];
        for line in &board.lines {
            out.push(line.color.map_or(NUM_COLORS as u8, |c| c.index() as u8));
            out.push(line.fill);
        }
        out.extend_from_slice(&board.wall);
        out.push(board.floor.len() as u8);
        out.push(board.floor.iter().any(|e| *e == crate::azul::board::FloorEntry::Marker) as u8);
        out.extend_from_slice(&board.score.to_be_bytes());
    }
    out.push(seats.iter().position(|&s| s == pos.to_move.index()).unwrap() as u8);
    out.push(match pos.phase {
        Phase::Drafting => 0,
        Phase::WallTiling => 1,
        Phase::GameOver => 2,
    });
    out
}

/// The lexicographically smallest encoding across the (conservative)
/// symmetry group: identity seating, plus the two-seat swap when there are
/// exactly two players. Color-relabeling symmetry is not applied (the wall
/// pattern is not invariant under it).
fn canonical_key(pos: &Position) -> Vec<u8> {
    let identity: Vec<usize> = (0..pos.boards.len()).collect();
    let mut best = encode(pos, &identity);
    if pos.boards.len() == 2 {
        let swapped = encode(pos, &[1, 0]);
        if swapped < best {
            best = swapped;
        }
    }
    best
}

fn terminal_differential(pos: &Position, player: PlayerId) -> f32 {
    let own = pos.boards[player.index()].score as f32;
    let others: Vec<f32> =
        (0..pos.players).filter(|&i| i != player.0).map(|i| pos.boards[i as usize].score as f32).collect();
    let avg_other = if others.is_empty() { 0.0 } else { others.iter().sum::<f32>() / others.len() as f32 };
    own - avg_other
}

/// A process-lifetime cache of exact minimax values for low-tile-count
/// positions, keyed by [`canonical_key`].
pub struct EndgameDatabase {
    cache: HashMap<Vec<u8>, EndgameEntry>,
    threshold_k: u32,
    stats: EndgameStats,
}

impl EndgameDatabase {
    pub fn new(threshold_k: u32) -> Self {
        EndgameDatabase { cache: HashMap::new(), threshold_k, stats: EndgameStats::default() }
    }

    pub fn stats(&self) -> EndgameStats {
        EndgameStats { entries: self.cache.len(), ..self.stats }
    }

    pub fn lookup(&mut self, pos: &Position) -> Option<EndgameEntry> {
        let entry = self.cache.get(&canonical_key(pos)).copied();
        if entry.is_some() {
            self.stats.hits += 1;
        }
        entry
    }

    /// Score returned is a differential — the side-to-move's own eventual
    /// score minus the average of the other seats' — consistent with the
    /// negamax convention [`crate::azul::eval::evaluate`] and the α–β
    /// searcher use. For a terminal position this reduces to its final,
    /// bonus-inclusive score minus the opponents'.
    pub fn solve(&mut self, pos: &Position, max_depth: u32) -> Result<EndgameEntry, EndgameNotApplicable> {
        if remaining_draftable_tiles(pos) > self.threshold_k {
            return Err(EndgameNotApplicable);
        }
        Ok(self.solve_inner(pos, max_depth))
    }

    /// Recurses to a terminal position or `depth_budget == 0`, whichever
    /// comes first. `exact` is true only along a path that actually bottomed
    /// out at a terminal position everywhere below it — the conjunction of
    /// every child's `exact`, not just "this node recursed at all" — since a
    /// single depth-truncated grandchild makes every ancestor's value a
    /// non-minimax estimate too. Only exact entries are memoized: a
    /// truncated entry is specific to the `depth_budget` it was computed
    /// under, and the cache has no room to record that budget, so caching it
    /// would silently hand a later, deeper solve a stale shallow estimate.
    fn solve_inner(&mut self, pos: &Position, depth_budget: u32) -> EndgameEntry {
        let key = canonical_key(pos);
        if let Some(cached) = self.cache.get(&key) {
            self.stats.hits += 1;
            return *cached;
        }
        self.stats.analyzed_positions += 1;

        let entry = if pos.is_terminal() {
            EndgameEntry { best_move: None, score: terminal_differential(pos, pos.to_move), depth: 0, exact: true }
        } else if depth_budget == 0 {
            EndgameEntry { best_move: None, score: terminal_differential(pos, pos.to_move), depth: 0, exact: false }
        } else {
            let moves = pos.legal_actions();
            let mut best_score = f32::NEG_INFINITY;
            let mut best_move = None;
            let mut all_exact = true;
            for mv in moves.iter() {
                let child = pos.apply(*mv).expect("a legal move always applies");
                let child_entry = self.solve_inner(&child, depth_budget - 1);
                all_exact &= child_entry.exact;
                let score_for_us = -child_entry.score;
                if best_move.is_none() || score_for_us > best_score {
                    best_score = score_for_us;
                    best_move = Some(*mv);
                }
            }
            EndgameEntry { best_move, score: best_score, depth: depth_budget as u8, exact: all_exact }
        };

        if entry.exact {
            self.cache.insert(key, entry);
        }
        entry
    }

    /// Serializes every cached `{key, entry}` pair as a flat bincode record
    /// stream.
    pub fn save(&self) -> Result<Vec<u8>, bincode::Error> {
        let records: Vec<(Vec<u8>, EndgameEntry)> = self.cache.iter().map(|(k, v)| (k.clone(), *v)).collect();
        bincode::serialize(&records)
    }

    /// Reloads a record stream written by [`EndgameDatabase::save`],
    /// replacing any existing entries.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), bincode::Error> {
        let records: Vec<(Vec<u8>, EndgameEntry)> = bincode::deserialize(bytes)?;
        self.cache = records.into_iter().collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azul::board::PatternLine;

    /// A 2-player position one drafting move from forcibly ending the game:
    /// the only remaining draftable tile is a single `C0` in factory 0, and
    /// player 0's wall rows 1..4 are each missing only the column their
    /// already-full pattern line would feed. Whichever destination the lone
    /// tile takes, this round's wall-tiling completes rows 1..4 regardless
    /// (row 0 only completes if the tile lands in its pattern line), so
    /// every branch of a solve from this position reaches a terminal
    /// position within one ply — letting a test assert `exact` without
    /// needing to reason about how many further rounds an arbitrary
    /// position would take to finish.
    fn one_ply_from_forced_game_over(seed: u64) -> Position {
        let mut pos = Position::new_initial(seed, 2);
        for f in pos.factories.iter_mut() {
            *f = [0; NUM_COLORS];
        }
        pos.center.tiles = [0; NUM_COLORS];
        pos.factories[0][Color::C0.index()] = 1;

        let board = &mut pos.boards[0];
        board.wall[0] = 0b1_1110; // missing only C0's column
        for row in 1..WALL_SIZE {
            let col = wall_column_for(row, Color::C1);
            board.wall[row] = 0b1_1111 & !(1 << col);
            board.lines[row] = PatternLine { color: Some(Color::C1), fill: PatternLine::capacity(row) };
        }
        pos
    }

    #[test]
    fn a_terminal_position_solves_to_its_own_score_differential() {
        let mut pos = Position::new_initial(1, 2);
        pos.phase = Phase::GameOver;
        pos.boards[0].score = 40;
        pos.boards[1].score = 30;
        let mut db = EndgameDatabase::new(20);
        let entry = db.solve(&pos, 5).unwrap();
        assert!(entry.best_move.is_none());
        assert_eq!(entry.score, 10.0);
    }

    #[test]
    fn a_low_tile_count_position_solves_exactly_and_then_hits_the_cache() {
        let pos = one_ply_from_forced_game_over(50);
        assert!(remaining_draftable_tiles(&pos) < 20);

        let mut db = EndgameDatabase::new(19);
        assert!(db.lookup(&pos).is_none());

        let entry = db.solve(&pos, 2).unwrap();
        assert!(entry.exact, "every branch one ply deep reaches a terminal position");

        assert!(db.lookup(&pos).is_some());
    }

    #[test]
    fn lookup_finds_what_solve_cached() {
        let pos = one_ply_from_forced_game_over(2);
        let mut db = EndgameDatabase::new(1000);
        assert!(db.lookup(&pos).is_none());
        let entry = db.solve(&pos, 1).unwrap();
        assert!(entry.exact);
        assert!(db.lookup(&pos).is_some());
    }

    #[test]
    fn truncated_depth_entries_are_not_cached_as_exact() {
        // A fresh game is many rounds from terminal, so a one-ply solve
        // bottoms out at `depth_budget == 0` on a non-terminal position:
        // the result is a heuristic estimate, not a minimax value, and must
        // neither report `exact` nor be memoized under this position's
        // canonical key (a later, deeper solve of the same position must
        // not be handed this shallow estimate back).
        let pos = Position::new_initial(6, 2);
        let mut db = EndgameDatabase::new(1000);
        let entry = db.solve(&pos, 1).unwrap();
        assert!(!entry.exact);
        assert!(db.lookup(&pos).is_none(), "a truncated, inexact entry must not be cached");
    }

    #[test]
    fn above_threshold_positions_are_rejected() {
        let pos = Position::new_initial(3, 2);
        let mut db = EndgameDatabase::new(0);
        assert!(matches!(db.solve(&pos, 1), Err(EndgameNotApplicable)));
    }

    #[test]
    fn player_swap_symmetry_shares_a_cache_entry() {
        let mut a = Position::new_initial(4, 2);
        a.phase = Phase::GameOver;
        a.boards[0].score = 5;
        a.boards[1].score = 9;
        let mut b = a.clone();
        b.boards.swap(0, 1);
        b.to_move = PlayerId(1 - a.to_move.0);
        let mut db = EndgameDatabase::new(1000);
        db.solve(&a, 2).unwrap();
        assert!(db.lookup(&b).is_some(), "swapped position should hit the same canonical entry");
    }

    #[test]
    fn marker_on_a_different_seats_floor_is_not_canonically_collapsed() {
        let mut a = one_ply_from_forced_game_over(7);
        a.boards[1].place_marker();
        let mut b = one_ply_from_forced_game_over(7);
        b.boards[0].place_marker();
        assert_ne!(canonical_key(&a), canonical_key(&b), "marker-holding seat is part of the canonical key");
    }

    #[test]
    fn save_and_load_round_trips() {
        let pos = one_ply_from_forced_game_over(5);
        let mut db = EndgameDatabase::new(1000);
        db.solve(&pos, 2).unwrap();
        let bytes = db.save().unwrap();
        let mut reloaded = EndgameDatabase::new(1000);
        reloaded.load(&bytes).unwrap();
        assert_eq!(reloaded.stats().entries, db.stats().entries);
        assert!(reloaded.lookup(&pos).is_some());
    }
}

//! The game state: bag, discard, factories, center pool, boards, whose turn
//! it is, and what phase play is in.
//!
//! A [`Position`] is an immutable value: [`Position::apply`] takes `&self`
//! and a [`Move`], and returns a *new* `Position` rather than mutating in
//! place (a cheap clone-then-mutate) so search can hold many positions live
//! at once without aliasing concerns.
//!
//! There is no separate "wall-tiling" move: once the factories and center
//! are fully drafted, `apply` performs wall-tiling, scoring, and the next
//! round's refill synchronously before returning, so every `Position` a
//! caller observes is either mid-draft or, at the very end, game over.

use serde::{Deserialize, Serialize};

use crate::azul::board::{PatternLine, PlayerBoard};
use crate::azul::consts::*;
use crate::azul::error::{IllegalMove, IllegalMoveReason, InvariantId, MalformedPosition};
use crate::azul::movegen::{self, Move, MoveBuffer};
use crate::azul::rng::{ChaChaRng, Rng};
use crate::azul::zobrist;

/// The shared pool of tiles passed over by earlier drafts this round, plus
/// the first-player marker until someone drafts from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterPool {
    pub tiles: [u8; NUM_COLORS],
    pub marker_present: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub players: u8,
    pub bag: [u8; NUM_COLORS],
    pub discard: [u8; NUM_COLORS],
    pub factories: Vec<[u8; NUM_COLORS]>,
    pub center: CenterPool,
    pub boards: Vec<PlayerBoard>,
    pub to_move: PlayerId,
    pub phase: Phase,
    pub round_number: u32,
    rng_seed: u64,
    rng_draws: u64,
    zobrist_hash: u64,
}

impl Position {
    /// A fresh game for `players` seats (2..=4), seeded deterministically:
    /// same `seed` and `players` always produce the same initial deal.
    pub fn new_initial(seed: u64, players: u8) -> Position {
        assert!((MIN_PLAYERS..=MAX_PLAYERS).contains(&players), "players out of range");
        let num_factories = 2 * players as usize + 1;
        let mut pos = Position {
            players,
            bag: [TILES_PER_COLOR as u8; NUM_COLORS],
            discard: [0; NUM_COLORS],
            factories: vec![[0; NUM_COLORS]; num_factories],
            center: CenterPool { tiles: [0; NUM_COLORS], marker_present: true },
            boards: vec![PlayerBoard::default(); players as usize],
            to_move: PlayerId(0),
            phase: Phase::Drafting,
            round_number: 1,
            rng_seed: seed,
            rng_draws: 0,
            zobrist_hash: 0,
        };
        pos.refill_factories();
        pos.zobrist_hash = zobrist::full_hash(&pos);
        pos
    }

    pub fn zobrist(&self) -> u64 {
        self.zobrist_hash
    }

    pub(crate) fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    pub(crate) fn rng_draws(&self) -> u64 {
        self.rng_draws
    }

    /// Assembles a `Position` from its raw fields (used by the textual wire
    /// format decoder) and recomputes the Zobrist hash from scratch rather
    /// than trusting a value carried in the wire format itself.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        players: u8,
        bag: [u8; NUM_COLORS],
        discard: [u8; NUM_COLORS],
        factories: Vec<[u8; NUM_COLORS]>,
        center: CenterPool,
        boards: Vec<PlayerBoard>,
        to_move: PlayerId,
        phase: Phase,
        round_number: u32,
        rng_seed: u64,
        rng_draws: u64,
    ) -> Position {
        let mut pos = Position {
            players,
            bag,
            discard,
            factories,
            center,
            boards,
            to_move,
            phase,
            round_number,
            rng_seed,
            rng_draws,
            zobrist_hash: 0,
        };
        pos.zobrist_hash = zobrist::full_hash(&pos);
        pos
    }

    /// Checks invariants 1-7 of §3: tile conservation, pattern-line color
    /// uniqueness/capacity, wall-pattern agreement, floor capacity, a
    /// non-negative score, and a uniquely located first-player marker.
    /// Called by the wire-format decoders so malformed input is rejected
    /// rather than silently accepted; never called on the search hot path,
    /// since every `Position` the engine itself produces already satisfies
    /// these by construction.
    pub fn validate(&self) -> Result<(), MalformedPosition> {
        let mut per_color = [0u32; NUM_COLORS];
        for i in 0..NUM_COLORS {
            per_color[i] += self.bag[i] as u32 + self.discard[i] as u32;
        }
        for factory in &self.factories {
            for i in 0..NUM_COLORS {
                per_color[i] += factory[i] as u32;
            }
        }
        for i in 0..NUM_COLORS {
            per_color[i] += self.center.tiles[i] as u32;
        }

        let mut marker_locations = if self.center.marker_present { 1 } else { 0 };

        for board in &self.boards {
            for (line_idx, line) in board.lines.iter().enumerate() {
                if let Some(color) = line.color {
                    if line.fill == 0 {
                        return Err(MalformedPosition::new(InvariantId::PatternLineColorUniqueness));
                    }
                    if line.fill > PatternLine::capacity(line_idx) {
                        return Err(MalformedPosition::new(InvariantId::PatternLineCapacity));
                    }
                    if board.wall_has(line_idx, color) {
                        return Err(MalformedPosition::new(InvariantId::PatternLineColorUniqueness));
                    }
                    per_color[color.index()] += line.fill as u32;
                } else if line.fill != 0 {
                    return Err(MalformedPosition::new(InvariantId::PatternLineColorUniqueness));
                }
            }
            // A set wall bit at (row, col) within 0..WALL_SIZE always denotes
            // the color the fixed cyclic pattern assigns to that cell (the
            // bitmask representation has no room for a color/cell
            // mismatch); a bit set outside that range has no corresponding
            // cell at all, which only a hand-crafted or corrupted wire
            // payload could produce.
            for row in 0..WALL_SIZE {
                if board.wall[row] >> WALL_SIZE != 0 {
                    return Err(MalformedPosition::new(InvariantId::WallPatternMismatch));
                }
                for col in 0..WALL_SIZE {
                    if (board.wall[row] >> col) & 1 == 1 {
                        per_color[wall_color_at(row, col).index()] += 1;
                    }
                }
            }
            if board.floor.len() > FLOOR_CAPACITY {
                return Err(MalformedPosition::new(InvariantId::FloorCapacity));
            }
            for entry in &board.floor {
                match entry {
                    crate::azul::board::FloorEntry::Tile(c) => per_color[c.index()] += 1,
                    crate::azul::board::FloorEntry::Marker => marker_locations += 1,
                }
            }
            if board.score < 0 {
                return Err(MalformedPosition::new(InvariantId::NonNegativeScore));
            }
        }

        for (i, &count) in per_color.iter().enumerate() {
            if count != TILES_PER_COLOR as u32 {
                return Err(MalformedPosition::new(InvariantId::TileConservation(Color::from(i as u8))));
            }
        }

        if marker_locations != 1 {
            return Err(MalformedPosition::new(InvariantId::MarkerUniqueness));
        }

        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Final per-player scores. Meaningful once [`Position::is_terminal`]
    /// returns `true`; before that it's simply the running score.
    pub fn final_scores(&self) -> Vec<i32> {
        self.boards.iter().map(|b| b.score).collect()
    }

    pub fn legal_actions(&self) -> MoveBuffer {
        movegen::generate_legal_moves(self)
    }

    /// Applies `mv` for [`Position::to_move`], returning the resulting
    /// position, or an error if `mv` is not currently legal. Always a pure
    /// function of `(self, mv)` — the bag's internal draw order advances a
    /// seeded counter carried on `self`, never the system clock or a shared
    /// RNG, so replaying the same move sequence from the same root always
    /// reaches the same position (and the same Zobrist hash).
    pub fn apply(&self, mv: Move) -> Result<Position, IllegalMove> {
        let mut pos = self.clone();
        if pos.phase != Phase::Drafting {
            return Err(IllegalMove::new(IllegalMoveReason::NoSuchSource(mv.source())));
        }

        let color = mv.color();
        let source = mv.source();
        let dest = mv.dest();
        let player_idx = pos.to_move.index();

        let old_factories_hash = zobrist::factories_hash(&pos.factories);
        let old_center_hash = zobrist::center_hash(&pos.center.tiles, pos.center.marker_present);
        let old_discard_hash = zobrist::discard_hash(&pos.discard);
        let old_board_hash = zobrist::board_hash(player_idx, &pos.boards[player_idx]);
        let old_to_move_hash = zobrist::to_move_hash(pos.to_move);
        let old_phase_hash = zobrist::phase_hash(pos.phase);

        let count = match source {
            Source::Factory(idx) => {
                let counts = *pos
                    .factories
                    .get(idx as usize)
                    .ok_or(IllegalMove::new(IllegalMoveReason::NoSuchSource(source)))?;
                let count = counts[color.index()];
                if count == 0 {
                    return Err(IllegalMove::new(IllegalMoveReason::NoSuchColorInSource(source)));
                }
                for c in 0..NUM_COLORS {
                    if c != color.index() {
                        pos.center.tiles[c] += counts[c];
                    }
                }
                pos.factories[idx as usize] = [0; NUM_COLORS];
                count
            }
            Source::Center => {
                let count = pos.center.tiles[color.index()];
                if count == 0 {
                    return Err(IllegalMove::new(IllegalMoveReason::NoSuchColorInSource(source)));
                }
                pos.center.tiles[color.index()] = 0;
                count
            }
        };

        let took_marker = matches!(source, Source::Center) && pos.center.marker_present;
        if took_marker {
            pos.center.marker_present = false;
        }

        let discarded = {
            let board = &mut pos.boards[player_idx];
            match dest {
                Dest::Line(line) => {
                    let line = line as usize;
                    if board.wall_has(line, color) {
                        return Err(IllegalMove::new(IllegalMoveReason::WallAlreadyHasColor));
                    }
                    if !board.line_accepts(line, color) {
                        return Err(IllegalMove::new(IllegalMoveReason::LineColorMismatch));
                    }
                    board.place_in_line(line, color, count).tiles_to_discard
                }
                Dest::Floor => board.place_on_floor(color, count).tiles_to_discard,
            }
        };
        pos.discard[color.index()] += discarded;
        if took_marker {
            pos.boards[player_idx].place_marker();
        }

        pos.zobrist_hash ^= old_factories_hash ^ zobrist::factories_hash(&pos.factories);
        pos.zobrist_hash ^= old_center_hash ^ zobrist::center_hash(&pos.center.tiles, pos.center.marker_present);
        pos.zobrist_hash ^= old_discard_hash ^ zobrist::discard_hash(&pos.discard);
        pos.zobrist_hash ^= old_board_hash ^ zobrist::board_hash(player_idx, &pos.boards[player_idx]);

        let round_over = pos.factories.iter().all(|f| f.iter().all(|&c| c == 0))
            && pos.center.tiles.iter().all(|&c| c == 0);
        if round_over {
            pos.end_round();
        } else {
            pos.to_move = pos.to_move.next(pos.players);
        }

        pos.zobrist_hash ^= old_to_move_hash ^ zobrist::to_move_hash(pos.to_move);
        pos.zobrist_hash ^= old_phase_hash ^ zobrist::phase_hash(pos.phase);

        Ok(pos)
    }

    /// Wall-tiling, scoring, discard routing, and either the next round's
    /// refill or the end-of-game bonuses. Called once per round, from
    /// inside [`Position::apply`] for whichever move empties the last
    /// factory and the center together.
    fn end_round(&mut self) {
        let old_bag_hash = zobrist::bag_hash(&self.bag);
        let old_discard_hash = zobrist::discard_hash(&self.discard);
        let old_factories_hash = zobrist::factories_hash(&self.factories);
        let old_center_hash = zobrist::center_hash(&self.center.tiles, self.center.marker_present);
        let old_board_hashes: Vec<u64> =
            (0..self.boards.len()).map(|i| zobrist::board_hash(i, &self.boards[i])).collect();

        let mut marker_holder = None;
        for i in 0..self.boards.len() {
            for line in 0..WALL_SIZE {
                if let Some(outcome) = self.boards[i].tile_pattern_line(line) {
                    self.discard[outcome.placed_color.index()] += outcome.tiles_to_discard;
                }
            }
            self.boards[i].apply_floor_penalty();
            let (tiles, had_marker) = self.boards[i].clear_floor();
            for tile in tiles {
                self.discard[tile.index()] += 1;
            }
            if had_marker {
                marker_holder = Some(PlayerId(i as u8));
            }
        }

        let game_over = self.boards.iter().any(|b| b.rows_filled() > 0);
        if game_over {
            for board in self.boards.iter_mut() {
                board.apply_endgame_bonuses();
            }
            self.phase = Phase::GameOver;
        } else {
            self.phase = Phase::Drafting;
            self.round_number += 1;
            if let Some(holder) = marker_holder {
                self.to_move = holder;
            }
            self.center.marker_present = true;
            self.refill_factories();
        }

        self.zobrist_hash ^= old_bag_hash ^ zobrist::bag_hash(&self.bag);
        self.zobrist_hash ^= old_discard_hash ^ zobrist::discard_hash(&self.discard);
        self.zobrist_hash ^= old_factories_hash ^ zobrist::factories_hash(&self.factories);
        self.zobrist_hash ^= old_center_hash ^ zobrist::center_hash(&self.center.tiles, self.center.marker_present);
        for (i, board) in self.boards.iter().enumerate() {
            self.zobrist_hash ^= old_board_hashes[i] ^ zobrist::board_hash(i, board);
        }
    }

    fn next_draw_rng(&mut self) -> ChaChaRng {
        let rng = ChaChaRng::from_seed(self.rng_seed ^ self.rng_draws.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.rng_draws += 1;
        rng
    }

    /// Draws one tile uniformly from the bag, weighted by remaining color
    /// counts, refilling the bag from discard first if it's empty. Returns
    /// `None` only if both are exhausted (never happens with a legal game:
    /// 100 tiles is always enough to fill every round's factories).
    fn draw_one_tile(&mut self) -> Option<Color> {
        if self.bag.iter().all(|&c| c == 0) {
            for c in 0..NUM_COLORS {
                self.bag[c] += self.discard[c];
                self.discard[c] = 0;
            }
        }
        let total: u32 = self.bag.iter().map(|&c| c as u32).sum();
        if total == 0 {
            return None;
        }
        let mut rng = self.next_draw_rng();
        let mut pick = rng.gen_below(total as usize) as u32;
        for (i, &count) in self.bag.iter().enumerate() {
            if pick < count as u32 {
                self.bag[i] -= 1;
                return Some(Color::from(i as u8));
            }
            pick -= count as u32;
        }
        unreachable!("pick stayed within total tile count")
    }

    fn refill_factories(&mut self) {
        for counts in self.factories.iter_mut() {
            *counts = [0; NUM_COLORS];
            for _ in 0..FACTORY_CAPACITY {
                match self.draw_one_tile() {
                    Some(color) => counts[color.index()] += 1,
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_to_completion(mut pos: Position) -> Position {
        let mut guard = 0;
        while !pos.is_terminal() {
            let moves = pos.legal_actions();
            assert!(!moves.is_empty(), "non-terminal position with no legal moves");
            pos = pos.apply(moves[0]).unwrap();
            guard += 1;
            assert!(guard < 10_000, "game did not terminate");
        }
        pos
    }

    #[test]
    fn tile_conservation_holds_after_a_full_game() {
        let pos = Position::new_initial(11, 2);
        let end = play_to_completion(pos);
        let mut total_per_color = [0u32; NUM_COLORS];
        for i in 0..NUM_COLORS {
            total_per_color[i] += end.bag[i] as u32;
            total_per_color[i] += end.discard[i] as u32;
            for factory in &end.factories {
                total_per_color[i] += factory[i] as u32;
            }
            total_per_color[i] += end.center.tiles[i] as u32;
            for board in &end.boards {
                for line in &board.lines {
                    if line.color == Some(Color::from(i as u8)) {
                        total_per_color[i] += line.fill as u32;
                    }
                }
                for row in 0..WALL_SIZE {
                    if board.wall_has(row, Color::from(i as u8)) {
                        total_per_color[i] += 1;
                    }
                }
                for entry in &board.floor {
                    if *entry == crate::azul::board::FloorEntry::Tile(Color::from(i as u8)) {
                        total_per_color[i] += 1;
                    }
                }
            }
        }
        for i in 0..NUM_COLORS {
            assert_eq!(total_per_color[i], TILES_PER_COLOR as u32, "color {i} not conserved");
        }
    }

    #[test]
    fn zobrist_hash_matches_fresh_recomputation_through_a_game() {
        let mut pos = Position::new_initial(3, 3);
        for _ in 0..40 {
            if pos.is_terminal() {
                break;
            }
            let moves = pos.legal_actions();
            pos = pos.apply(moves[moves.len() / 2]).unwrap();
            assert_eq!(pos.zobrist(), zobrist::full_hash(&pos));
        }
    }

    #[test]
    fn every_generated_move_is_actually_legal() {
        let mut pos = Position::new_initial(5, 4);
        for _ in 0..30 {
            if pos.is_terminal() {
                break;
            }
            for mv in pos.legal_actions().iter() {
                pos.apply(*mv).expect("movegen produced an illegal move");
            }
            let moves = pos.legal_actions();
            pos = pos.apply(moves[0]).unwrap();
        }
    }

    #[test]
    fn game_is_not_terminal_at_the_start() {
        let pos = Position::new_initial(1, 2);
        assert!(!pos.is_terminal());
        assert_eq!(pos.final_scores(), vec![0, 0]);
    }

    #[test]
    fn drafting_from_a_factory_fills_the_target_line_and_dumps_the_rest_to_center() {
        let pos = Position::new_initial(42, 2);
        let old_factory = pos.factories[0];
        let color = Color::ALL.iter().copied().find(|&c| old_factory[c.index()] > 0).expect("a non-empty factory");
        let old_center = pos.center.tiles;

        let mv = Move::new(Source::Factory(0), color, Dest::Line(0));
        let next = pos.apply(mv).unwrap();

        assert_eq!(next.factories[0], [0; NUM_COLORS]);
        assert_eq!(next.boards[0].lines[0], PatternLine { color: Some(color), fill: 1 });
        for c in Color::ALL.iter() {
            let expected = if *c == color { old_center[c.index()] } else { old_center[c.index()] + old_factory[c.index()] };
            assert_eq!(next.center.tiles[c.index()], expected, "center count for {c:?} did not match");
        }
        assert_ne!(next.zobrist(), pos.zobrist());
        assert_eq!(next.zobrist(), zobrist::full_hash(&next));
    }

    #[test]
    fn wall_tiling_scores_a_completed_pattern_line_and_discards_the_rest() {
        let mut pos = Position::new_initial(20, 2);
        let color = Color::C0;
        pos.boards[0].lines[2] = PatternLine { color: Some(color), fill: PatternLine::capacity(2) };
        let discard_before = pos.discard[color.index()];
        let score_before = pos.boards[0].score;

        pos.end_round();

        assert!(pos.boards[0].wall_has(2, color));
        assert_eq!(pos.boards[0].lines[2], PatternLine::default());
        assert_eq!(pos.discard[color.index()], discard_before + 2);
        assert!(pos.boards[0].score > score_before);
    }

    #[test]
    fn a_freshly_constructed_position_always_validates() {
        let pos = Position::new_initial(77, 3);
        assert!(pos.validate().is_ok());
    }

    #[test]
    fn validate_rejects_a_broken_tile_count() {
        let mut pos = Position::new_initial(6, 2);
        pos.bag[0] += 1;
        assert!(matches!(
            pos.validate(),
            Err(MalformedPosition { which_invariant: InvariantId::TileConservation(Color::C0) })
        ));
    }

    #[test]
    fn validate_rejects_a_pattern_line_over_capacity() {
        let mut pos = Position::new_initial(6, 2);
        pos.boards[0].lines[0] = PatternLine { color: Some(Color::C0), fill: 2 };
        assert!(matches!(
            pos.validate(),
            Err(MalformedPosition { which_invariant: InvariantId::PatternLineCapacity })
        ));
    }

    #[test]
    fn validate_rejects_a_missing_marker() {
        let mut pos = Position::new_initial(6, 2);
        pos.center.marker_present = false;
        assert!(matches!(
            pos.validate(),
            Err(MalformedPosition { which_invariant: InvariantId::MarkerUniqueness })
        ));
    }

    #[test]
    fn validate_rejects_a_wall_bit_outside_the_grid() {
        let mut pos = Position::new_initial(6, 2);
        pos.boards[0].wall[0] = 0b1000_0000;
        assert!(matches!(
            pos.validate(),
            Err(MalformedPosition { which_invariant: InvariantId::WallPatternMismatch })
        ));
    }

    #[test]
    fn validate_rejects_two_markers() {
        let mut pos = Position::new_initial(6, 2);
        pos.boards[0].place_marker();
        assert!(matches!(
            pos.validate(),
            Err(MalformedPosition { which_invariant: InvariantId::MarkerUniqueness })
        ));
    }
}

//! Static heuristic evaluator: a scalar score for one player's position,
//! in roughly constant time relative to board size.
//!
//! Weights live as named constants next to the function that uses them
//! rather than in a config file, so a reader sees the whole formula in one
//! place.

use crate::azul::board::PlayerBoard;
use crate::azul::consts::*;
use crate::azul::position::Position;

/// Weight on the "expected additional floor tiles" term of floor exposure.
const FLOOR_RISK_WEIGHT: f32 = 1.5;

/// Discount applied to endgame-potential terms, since they are not yet
/// banked points.
const ENDGAME_POTENTIAL_DISCOUNT: f32 = 0.5;

const ENDGAME_ROW_BONUS: f32 = 2.0;
const ENDGAME_COL_BONUS: f32 = 7.0;
const ENDGAME_COLOR_BONUS: f32 = 10.0;

fn pattern_potential(board: &PlayerBoard) -> f32 {
    board
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let capacity = PATTERN_LINE_CAPACITY[i] as f32;
            (line.fill as f32 / capacity) * NOMINAL_COMPLETION_BONUS[i] as f32
        })
        .sum()
}

/// Floor-line penalty already incurred, plus an estimate of further floor
/// exposure weighted by how much of the round is left to play (more
/// remaining draftable tiles means more chances to be forced onto the
/// floor).
fn floor_exposure(pos: &Position, board: &PlayerBoard) -> f32 {
    let incurred: i32 = FLOOR_PENALTIES.iter().take(board.floor.len()).sum();
    let remaining_tiles: u32 = pos.factories.iter().flatten().map(|&c| c as u32).sum::<u32>()
        + pos.center.tiles.iter().map(|&c| c as u32).sum::<u32>();
    let round_capacity = (pos.factories.len() * FACTORY_CAPACITY).max(1) as f32;
    let fraction_remaining = (remaining_tiles as f32 / round_capacity).min(1.0);
    incurred as f32 - FLOOR_RISK_WEIGHT * fraction_remaining
}

fn endgame_potential(board: &PlayerBoard) -> f32 {
    let rows = board.rows_near_complete() as f32 * ENDGAME_ROW_BONUS;
    let cols = board.cols_near_complete() as f32 * ENDGAME_COL_BONUS;
    let colors = board.colors_near_complete() as f32 * ENDGAME_COLOR_BONUS;
    (rows + cols + colors) * ENDGAME_POTENTIAL_DISCOUNT
}

fn per_player_score(pos: &Position, player: PlayerId) -> f32 {
    let board = &pos.boards[player.index()];
    board.score as f32 + pattern_potential(board) + floor_exposure(pos, board) + endgame_potential(board)
}

/// Scores `pos` from `perspective`'s point of view: that player's own
/// components minus the average of every opponent's (the "opponent
/// symmetric term" — in the 2-player case this is just the single
/// opponent's score).
pub fn evaluate(pos: &Position, perspective: PlayerId) -> f32 {
    let own = per_player_score(pos, perspective);
    let opponents: Vec<f32> = (0..pos.players)
        .filter(|&i| i != perspective.0)
        .map(|i| per_player_score(pos, PlayerId(i)))
        .collect();
    if opponents.is_empty() {
        return own;
    }
    let opponent_term = opponents.iter().sum::<f32>() / opponents.len() as f32;
    own - opponent_term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_position_is_perfectly_symmetric() {
        let pos = Position::new_initial(9, 2);
        assert_eq!(evaluate(&pos, PlayerId(0)), evaluate(&pos, PlayerId(1)));
    }

    #[test]
    fn a_full_pattern_line_scores_higher_than_an_empty_one() {
        let mut pos = Position::new_initial(9, 2);
        pos.boards[0].lines[2].color = Some(Color::C0);
        pos.boards[0].lines[2].fill = 3;
        let with_progress = evaluate(&pos, PlayerId(0));
        let baseline = evaluate(&Position::new_initial(9, 2), PlayerId(0));
        assert!(with_progress > baseline);
    }

    #[test]
    fn floor_tiles_reduce_the_score() {
        let mut pos = Position::new_initial(9, 2);
        let outcome = pos.boards[0].place_on_floor(Color::C0, 3);
        assert_eq!(outcome.tiles_to_discard, 0);
        let with_floor = evaluate(&pos, PlayerId(0));
        let baseline = evaluate(&Position::new_initial(9, 2), PlayerId(0));
        assert!(with_floor < baseline);
    }
}

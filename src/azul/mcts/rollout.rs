//! Rollout policies pluggable into MCTS: uniform-random, heuristic-greedy
//! with epsilon exploration, and an optional neural value head with a
//! logged fallback.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::azul::consts::PlayerId;
use crate::azul::eval::evaluate;
use crate::azul::position::Position;
use crate::azul::rng::Rng;

/// A cap on rollout length so a pathological position can't run away;
/// practically every Azul game ends well before this many plies.
const MAX_ROLLOUT_PLIES: u32 = 400;

pub trait RolloutPolicy {
    /// Plays `pos` out (by whatever means the policy implements) and
    /// returns a value from `player`'s perspective.
    fn rollout(&mut self, pos: &Position, player: PlayerId, rng: &mut dyn Rng) -> f32;

    /// An optional prior over moves at `pos`, used to bias expansion order.
    fn prior(&mut self, _pos: &Position) -> Option<Vec<(crate::azul::movegen::Move, f32)>> {
        None
    }
}

fn terminal_value(pos: &Position, player: PlayerId) -> f32 {
    evaluate(pos, player)
}

pub struct UniformRandomPolicy;

impl RolloutPolicy for UniformRandomPolicy {
    fn rollout(&mut self, pos: &Position, player: PlayerId, rng: &mut dyn Rng) -> f32 {
        let mut cur = pos.clone();
        for _ in 0..MAX_ROLLOUT_PLIES {
            if cur.is_terminal() {
                break;
            }
            let moves = cur.legal_actions();
            if moves.is_empty() {
                break;
            }
            let idx = rng.gen_below(moves.len());
            cur = cur.apply(moves[idx]).expect("movegen only produces legal moves");
        }
        terminal_value(&cur, player)
    }
}

/// At each step, picks the move with the best one-ply evaluator delta for
/// the side to move, with probability `epsilon` of a uniform-random move
/// instead (to keep rollouts from collapsing onto a single line).
pub struct HeuristicGreedyPolicy {
    pub epsilon: f32,
}

impl Default for HeuristicGreedyPolicy {
    fn default() -> Self {
        HeuristicGreedyPolicy { epsilon: 0.1 }
    }
}

impl RolloutPolicy for HeuristicGreedyPolicy {
    fn rollout(&mut self, pos: &Position, player: PlayerId, rng: &mut dyn Rng) -> f32 {
        let mut cur = pos.clone();
        for _ in 0..MAX_ROLLOUT_PLIES {
            if cur.is_terminal() {
                break;
            }
            let moves = cur.legal_actions();
            if moves.is_empty() {
                break;
            }
            let chosen = if rng.gen_unit() < self.epsilon {
                moves[rng.gen_below(moves.len())]
            } else {
                let mover = cur.to_move;
                *moves
                    .iter()
                    .max_by(|&&a, &&b| {
                        let score_a = evaluate(&cur.apply(a).unwrap(), mover);
                        let score_b = evaluate(&cur.apply(b).unwrap(), mover);
                        score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap()
            };
            cur = cur.apply(chosen).expect("movegen only produces legal moves");
        }
        terminal_value(&cur, player)
    }
}

/// An external policy/value head, e.g. a neural network. Optional: MCTS
/// falls back to uniform rollouts if it's absent or errors.
pub trait ValueHead {
    fn value(&mut self, pos: &Position, player: PlayerId) -> Option<f32>;
}

/// Wraps an optional [`ValueHead`]: when present and it returns a value,
/// that value is used directly as a truncated rollout; otherwise falls
/// back to uniform-random play, logging the fallback exactly once per
/// process so a misconfigured neural head doesn't spam logs across
/// thousands of rollouts.
pub struct NeuralRolloutPolicy<V: ValueHead> {
    value_head: V,
    fallback: UniformRandomPolicy,
    logged_fallback: AtomicBool,
}

impl<V: ValueHead> NeuralRolloutPolicy<V> {
    pub fn new(value_head: V) -> Self {
        NeuralRolloutPolicy { value_head, fallback: UniformRandomPolicy, logged_fallback: AtomicBool::new(false) }
    }

    fn log_fallback_once(&self) {
        if !self.logged_fallback.swap(true, Ordering::Relaxed) {
            log::warn!("neural value head unavailable; MCTS rollouts falling back to uniform random play");
        }
    }
}

impl<V: ValueHead> RolloutPolicy for NeuralRolloutPolicy<V> {
    fn rollout(&mut self, pos: &Position, player: PlayerId, rng: &mut dyn Rng) -> f32 {
        match self.value_head.value(pos, player) {
            Some(v) => v,
            None => {
                self.log_fallback_once();
                self.fallback.rollout(pos, player, rng)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azul::rng::ChaChaRng;

    #[test]
    fn uniform_rollout_terminates_and_returns_a_finite_value() {
        let pos = Position::new_initial(1, 2);
        let mut rng = ChaChaRng::from_seed(1);
        let mut policy = UniformRandomPolicy;
        let value = policy.rollout(&pos, PlayerId(0), &mut rng);
        assert!(value.is_finite());
    }

    struct AlwaysAbstainsValueHead;
    impl ValueHead for AlwaysAbstainsValueHead {
        fn value(&mut self, _pos: &Position, _player: PlayerId) -> Option<f32> {
            None
        }
    }

    #[test]
    fn neural_policy_falls_back_when_the_value_head_abstains() {
        let pos = Position::new_initial(2, 2);
        let mut rng = ChaChaRng::from_seed(2);
        let mut policy = NeuralRolloutPolicy::new(AlwaysAbstainsValueHead);
        let value = policy.rollout(&pos, PlayerId(0), &mut rng);
        assert!(value.is_finite());
    }
}

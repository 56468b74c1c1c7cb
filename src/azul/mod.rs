//! The Azul rules engine: state, move generation, evaluation, search, and
//! the endgame and profiling tooling built on top of them.

pub mod board;
pub mod clock;
pub mod consts;
pub mod endgame;
pub mod error;
pub mod eval;
pub mod mcts;
pub mod movegen;
pub mod notation;
pub mod position;
pub mod profiler;
pub mod rng;
pub mod search;
pub mod tt;
pub mod zobrist;

pub mod prelude {
    pub use super::board::{FloorEntry, PatternLine, PlayerBoard};
    pub use super::clock::{Clock, Deadline, FakeClock, SystemClock};
    pub use super::consts::*;
    pub use super::endgame::{EndgameDatabase, EndgameEntry, EndgameStats};
    pub use super::error::*;
    pub use super::eval::evaluate;
    pub use super::mcts::rollout::{HeuristicGreedyPolicy, RolloutPolicy, UniformRandomPolicy, ValueHead};
    pub use super::mcts::{search_mcts, MctsResult};
    pub use super::movegen::{generate_legal_moves, Move, MoveBuffer};
    pub use super::notation::{decode_position, decode_position_text, encode_position, encode_position_text};
    pub use super::position::{CenterPool, Position};
    pub use super::profiler::{PerformanceBudget, Profiler, ProfileResult};
    pub use super::rng::{ChaChaRng, Rng};
    pub use super::search::{search_alpha_beta, SearchResult};
    pub use super::tt::{Bound, Entry as TtEntry, TranspositionTable};
}

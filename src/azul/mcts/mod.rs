//! Monte Carlo tree search: UCT selection over an arena of nodes, with a
//! pluggable rollout policy and visit-count best-move selection.

pub mod rollout;

use std::time::Duration;

use crate::azul::clock::{Clock, Deadline};
use crate::azul::consts::PlayerId;
use crate::azul::movegen::Move;
use crate::azul::position::Position;
use crate::azul::rng::Rng;
use rollout::RolloutPolicy;

/// UCT exploration constant, `sqrt(2)`: the textbook value balancing
/// exploitation of the current best child against exploring untried ones.
const EXPLORATION_CONSTANT: f32 = std::f32::consts::SQRT_2;

const ROLLOUT_POLL_INTERVAL: u32 = 64;

struct Node {
    pos: Position,
    parent: Option<usize>,
    incoming_move: Option<Move>,
    children: Vec<usize>,
    untried: Vec<Move>,
    visits: u64,
    total_value: f32,
}

impl Node {
    fn new(pos: Position, parent: Option<usize>, incoming_move: Option<Move>) -> Self {
        let untried: Vec<Move> = pos.legal_actions().iter().copied().collect();
        Node { pos, parent, incoming_move, children: Vec::new(), untried, visits: 0, total_value: 0.0 }
    }

    fn mean_value(&self) -> f32 {
        if self.visits == 0 { 0.0 } else { self.total_value / self.visits as f32 }
    }

    fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }
}

pub struct MctsResult {
    pub best_move: Option<Move>,
    pub value: f32,
    pub visits: u64,
    pub principal_variation: Vec<Move>,
    pub root_children: Vec<(Move, u64, f32)>,
}

struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new(root_pos: Position) -> Self {
        Tree { nodes: vec![Node::new(root_pos, None, None)] }
    }

    fn uct_score(&self, parent_visits: u64, child: &Node) -> f32 {
        if child.visits == 0 {
            return f32::INFINITY;
        }
        let exploitation = child.mean_value();
        let exploration = EXPLORATION_CONSTANT * ((parent_visits as f32).ln() / child.visits as f32).sqrt();
        exploitation + exploration
    }

    /// Walks from the root, selecting the best UCT child at each fully
    /// expanded node, until it reaches a node with an untried move or a
    /// terminal position. Returns that node's index.
    fn select(&self, root: usize) -> usize {
        let mut cur = root;
        loop {
            let node = &self.nodes[cur];
            if node.pos.is_terminal() || !node.is_fully_expanded() || node.children.is_empty() {
                return cur;
            }
            let parent_visits = node.visits;
            cur = *node
                .children
                .iter()
                .max_by(|&&a, &&b| {
                    let sa = self.uct_score(parent_visits, &self.nodes[a]);
                    let sb = self.uct_score(parent_visits, &self.nodes[b]);
                    sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("fully expanded node has at least one child");
        }
    }

    /// Expands one untried move at `idx` into a new child node, returning
    /// the child's index. Returns `idx` unchanged if the position is
    /// terminal or has no untried moves left.
    fn expand(&mut self, idx: usize, rng: &mut dyn Rng) -> usize {
        if self.nodes[idx].pos.is_terminal() || self.nodes[idx].untried.is_empty() {
            return idx;
        }
        let pick = rng.gen_below(self.nodes[idx].untried.len());
        let mv = self.nodes[idx].untried.swap_remove(pick);
        let child_pos = self.nodes[idx].pos.apply(mv).expect("movegen only produces legal moves");
        let child_idx = self.nodes.len();
        self.nodes.push(Node::new(child_pos, Some(idx), Some(mv)));
        self.nodes[idx].children.push(child_idx);
        child_idx
    }

    /// Propagates `value` (from the perspective of the player to move at
    /// `leaf`) up to the root, flipping sign at each ply in the standard
    /// two-player way.
    fn backpropagate(&mut self, leaf: usize, mut value: f32) {
        let mut cur = Some(leaf);
        while let Some(idx) = cur {
            let node = &mut self.nodes[idx];
            node.visits += 1;
            node.total_value += value;
            value = -value;
            cur = node.parent;
        }
    }

    /// Walks from the root following the most-visited child at each step,
    /// the same robustness criterion as the root's own best-move choice.
    fn principal_variation(&self) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut cur = 0;
        loop {
            let best = self.nodes[cur].children.iter().max_by_key(|&&c| self.nodes[c].visits).copied();
            match best {
                Some(child) => {
                    pv.push(self.nodes[child].incoming_move.expect("non-root node always has an incoming move"));
                    cur = child;
                }
                None => break,
            }
        }
        pv
    }
}

/// Runs MCTS from `pos` for up to `max_rollouts` simulations or until
/// `max_time` elapses, whichever comes first, and returns the move with the
/// most root visits (not the highest mean value — visit count is the
/// standard, lower-variance choice once search has converged even slightly).
pub fn search_mcts(
    pos: &Position,
    player: PlayerId,
    max_time: Duration,
    max_rollouts: u32,
    policy: &mut dyn RolloutPolicy,
    rng: &mut dyn Rng,
    clock: &dyn Clock,
) -> MctsResult {
    let mut tree = Tree::new(pos.clone());
    let deadline = Deadline::after(clock, max_time);

    if pos.is_terminal() || pos.legal_actions().is_empty() {
        return MctsResult {
            best_move: None,
            value: 0.0,
            visits: 0,
            principal_variation: Vec::new(),
            root_children: Vec::new(),
        };
    }

    for i in 0..max_rollouts {
        if i % ROLLOUT_POLL_INTERVAL == 0 && deadline.expired(clock) {
            break;
        }
        let selected = tree.select(0);
        let expanded = tree.expand(selected, rng);
        let leaf_mover = tree.nodes[expanded].pos.to_move;
        let value_for_mover = if tree.nodes[expanded].pos.is_terminal() {
            crate::azul::eval::evaluate(&tree.nodes[expanded].pos, leaf_mover)
        } else {
            policy.rollout(&tree.nodes[expanded].pos, leaf_mover, rng)
        };
        // `value_for_mover` is from the perspective of the player to move at
        // the leaf; flip once more if that differs from `player` so the
        // very first backpropagation step (which un-flips at the leaf
        // itself) lands on a consistent sign convention.
        let value_at_leaf = if leaf_mover == player { value_for_mover } else { -value_for_mover };
        tree.backpropagate(expanded, value_at_leaf);
    }

    let root = &tree.nodes[0];
    let root_children: Vec<(Move, u64, f32)> = root
        .children
        .iter()
        .map(|&c| {
            let child = &tree.nodes[c];
            (child.incoming_move.expect("non-root node always has an incoming move"), child.visits, child.mean_value())
        })
        .collect();

    let principal_variation = tree.principal_variation();
    let best = root_children.iter().max_by_key(|(_, visits, _)| *visits);
    match best {
        Some(&(mv, visits, value)) => {
            MctsResult { best_move: Some(mv), value, visits, principal_variation, root_children }
        }
        None => MctsResult { best_move: None, value: 0.0, visits: 0, principal_variation, root_children },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azul::clock::SystemClock;
    use crate::azul::rng::ChaChaRng;
    use rollout::UniformRandomPolicy;

    #[test]
    fn mcts_picks_some_legal_move_within_its_rollout_budget() {
        let pos = Position::new_initial(9, 2);
        let mut policy = UniformRandomPolicy;
        let mut rng = ChaChaRng::from_seed(9);
        let clock = SystemClock;
        let result = search_mcts(&pos, pos.to_move, Duration::from_secs(5), 64, &mut policy, &mut rng, &clock);
        let legal = pos.legal_actions();
        assert!(result.best_move.is_some());
        assert!(legal.iter().any(|&m| Some(m) == result.best_move));
    }

    #[test]
    fn more_rollouts_visit_the_root_at_least_as_much() {
        let pos = Position::new_initial(10, 2);
        let mut policy = UniformRandomPolicy;
        let mut rng = ChaChaRng::from_seed(10);
        let clock = SystemClock;
        let few = search_mcts(&pos, pos.to_move, Duration::from_secs(5), 8, &mut policy, &mut rng, &clock);
        let mut rng2 = ChaChaRng::from_seed(11);
        let many = search_mcts(&pos, pos.to_move, Duration::from_secs(5), 64, &mut policy, &mut rng2, &clock);
        assert!(many.visits >= few.visits);
    }

    #[test]
    fn ten_budgeted_runs_each_return_a_legal_move_within_their_rollout_and_time_budget() {
        let pos = Position::new_initial(1, 2);
        let clock = SystemClock;
        let legal = pos.legal_actions();
        for seed in 0..10 {
            let mut policy = UniformRandomPolicy;
            let mut rng = ChaChaRng::from_seed(seed);
            let start = std::time::Instant::now();
            let result = search_mcts(&pos, pos.to_move, Duration::from_millis(200), 300, &mut policy, &mut rng, &clock);
            let elapsed_ms = start.elapsed().as_millis();
            assert!(result.best_move.is_some());
            assert!(legal.iter().any(|&m| Some(m) == result.best_move));
            assert!(result.visits <= 300, "run {seed} visited {} > 300", result.visits);
            assert!(elapsed_ms <= 220, "run {seed} took {elapsed_ms}ms > 220ms budget");
        }
    }

    #[test]
    fn mcts_converges_on_a_single_dominating_move_at_a_thousand_rollouts() {
        use crate::azul::consts::{Color, Dest, Source, NUM_COLORS};

        let mut pos = Position::new_initial(5, 2);
        for f in pos.factories.iter_mut() {
            *f = [0; NUM_COLORS];
        }
        pos.center.tiles = [0; NUM_COLORS];
        pos.center.tiles[Color::C0.index()] = 1;
        // Row 0 already has every column but the one C0 feeds, so drafting it
        // to line 0 completes the row and ends the game on the spot; dropping
        // it to the floor instead merely costs a point and drags the game on.
        pos.boards[0].wall[0] = 0b1_1110;

        let dominating = crate::azul::movegen::Move::new(Source::Center, Color::C0, Dest::Line(0));
        assert!(pos.legal_actions().iter().any(|&m| m == dominating));

        let clock = SystemClock;
        let trials = 20;
        let mut hits = 0;
        for seed in 0..trials {
            let mut policy = UniformRandomPolicy;
            let mut rng = ChaChaRng::from_seed(1000 + seed);
            let result = search_mcts(&pos, pos.to_move, Duration::from_secs(5), 1000, &mut policy, &mut rng, &clock);
            if result.best_move == Some(dominating) {
                hits += 1;
            }
        }
        assert!(hits as f32 / trials as f32 >= 0.95, "dominating move only chosen {hits}/{trials} times");
    }

    #[test]
    fn mcts_on_a_terminal_position_returns_no_move() {
        let mut pos = Position::new_initial(11, 2);
        pos.phase = crate::azul::consts::Phase::GameOver;
        let mut policy = UniformRandomPolicy;
        let mut rng = ChaChaRng::from_seed(12);
        let clock = SystemClock;
        let result = search_mcts(&pos, pos.to_move, Duration::from_secs(1), 32, &mut policy, &mut rng, &clock);
        assert!(result.best_move.is_none());
    }
}

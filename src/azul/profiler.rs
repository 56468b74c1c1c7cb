//! Instrumentation harness: times individual engine operations against a
//! fixed performance budget table and renders a pass/fail report.

use std::time::{Duration, Instant};

use crate::azul::clock::SystemClock;
use crate::azul::consts::PlayerId;
use crate::azul::endgame::EndgameDatabase;
use crate::azul::eval::evaluate;
use crate::azul::mcts::rollout::UniformRandomPolicy;
use crate::azul::mcts::search_mcts;
use crate::azul::movegen::generate_legal_moves;
use crate::azul::position::Position;
use crate::azul::rng::ChaChaRng;
use crate::azul::search::search_alpha_beta;
use crate::azul::tt::TranspositionTable;

/// Latency/memory ceilings each component is expected to stay under.
#[derive(Clone, Debug)]
pub struct PerformanceBudget {
    pub move_generation_max: Duration,
    pub evaluation_max: Duration,
    pub search_depth_3_max: Duration,
    pub mcts_hint_max: Duration,
    pub endgame_position_max: Duration,
    pub resident_memory_max_mb: u64,
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        PerformanceBudget {
            move_generation_max: Duration::from_micros(50),
            evaluation_max: Duration::from_micros(100),
            search_depth_3_max: Duration::from_secs(4),
            mcts_hint_max: Duration::from_millis(200),
            endgame_position_max: Duration::from_millis(100),
            resident_memory_max_mb: 2048,
        }
    }
}

/// Timing result for one profiled operation.
#[derive(Clone, Debug)]
pub struct ProfileResult {
    pub component: String,
    pub operation: String,
    pub iterations: u32,
    pub total: Duration,
    pub per_iteration: Duration,
    pub budget: Option<Duration>,
}

impl ProfileResult {
    pub fn within_budget(&self) -> bool {
        self.budget.map_or(true, |b| self.per_iteration <= b)
    }
}

/// Resident set size of the current process in MB, read from `/proc/self/status`
/// on Linux; returns `None` on platforms where that file doesn't exist.
fn resident_memory_mb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb / 1024);
        }
    }
    None
}

fn time_it<F: FnMut()>(iterations: u32, mut f: F) -> Duration {
    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    start.elapsed()
}

pub struct Profiler {
    budget: PerformanceBudget,
    results: Vec<ProfileResult>,
}

impl Default for Profiler {
    fn default() -> Self {
        Profiler::new(PerformanceBudget::default())
    }
}

impl Profiler {
    pub fn new(budget: PerformanceBudget) -> Self {
        Profiler { budget, results: Vec::new() }
    }

    pub fn results(&self) -> &[ProfileResult] {
        &self.results
    }

    pub fn profile_move_generation(&mut self, pos: &Position) {
        let iterations = 1000;
        let total = time_it(iterations, || {
            let _ = generate_legal_moves(pos);
        });
        self.record("move_generator", "generate_legal_moves", iterations, total, Some(self.budget.move_generation_max));
    }

    pub fn profile_evaluation(&mut self, pos: &Position) {
        let iterations = 1000;
        let total = time_it(iterations, || {
            let _ = evaluate(pos, pos.to_move);
        });
        self.record("evaluator", "evaluate", iterations, total, Some(self.budget.evaluation_max));
    }

    pub fn profile_search_depth_3(&mut self, pos: &Position) {
        let iterations = 5;
        let clock = SystemClock;
        let mut tt = TranspositionTable::new(1 << 16);
        let total = time_it(iterations, || {
            let _ = search_alpha_beta(pos, 3, self.budget.search_depth_3_max, &clock, &mut tt, None);
        });
        self.record("search", "alpha_beta_depth_3", iterations, total, Some(self.budget.search_depth_3_max));
    }

    pub fn profile_mcts_hint(&mut self, pos: &Position) {
        let iterations = 5;
        let clock = SystemClock;
        let total = time_it(iterations, || {
            let mut policy = UniformRandomPolicy;
            let mut rng = ChaChaRng::from_seed(0);
            let _ = search_mcts(pos, pos.to_move, self.budget.mcts_hint_max, u32::MAX, &mut policy, &mut rng, &clock);
        });
        self.record("mcts", "hint_generation", iterations, total, Some(self.budget.mcts_hint_max));
    }

    pub fn profile_endgame(&mut self, pos: &Position) {
        let iterations = 10;
        let mut db = EndgameDatabase::new(20);
        let total = time_it(iterations, || {
            let _ = db.solve(pos, 10);
        });
        self.record("endgame", "solve_single_position", iterations, total, Some(self.budget.endgame_position_max));
    }

    fn record(&mut self, component: &str, operation: &str, iterations: u32, total: Duration, budget: Option<Duration>) {
        let per_iteration = total / iterations.max(1);
        self.results.push(ProfileResult {
            component: component.to_string(),
            operation: operation.to_string(),
            iterations,
            total,
            per_iteration,
            budget,
        });
    }

    /// Runs every component's profile against `pos` and `player` in turn.
    pub fn run_comprehensive(&mut self, pos: &Position, _player: PlayerId) {
        self.profile_move_generation(pos);
        self.profile_evaluation(pos);
        self.profile_search_depth_3(pos);
        self.profile_mcts_hint(pos);
        self.profile_endgame(pos);
    }

    /// Renders a human-readable pass/fail report, plus a memory budget line
    /// if `/proc/self/status` is readable.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("Azul engine profiling report\n");
        out.push_str("=============================\n");
        for r in &self.results {
            let status = if r.within_budget() { "ok" } else { "OVER BUDGET" };
            out.push_str(&format!(
                "{:<14} {:<24} {:>10.3?}/iter ({} iterations) [{status}]\n",
                r.component, r.operation, r.per_iteration, r.iterations
            ));
        }
        if let Some(mb) = resident_memory_mb() {
            let status = if mb <= self.budget.resident_memory_max_mb { "ok" } else { "OVER BUDGET" };
            out.push_str(&format!("resident memory: {mb} MB [{status}]\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_generation_profile_records_a_result_within_its_loose_test_budget() {
        let pos = Position::new_initial(1, 2);
        let mut profiler = Profiler::default();
        profiler.profile_move_generation(&pos);
        assert_eq!(profiler.results().len(), 1);
        assert_eq!(profiler.results()[0].component, "move_generator");
    }

    #[test]
    fn report_renders_one_line_per_profiled_operation() {
        let pos = Position::new_initial(2, 2);
        let mut profiler = Profiler::default();
        profiler.profile_move_generation(&pos);
        profiler.profile_evaluation(&pos);
        let report = profiler.render_report();
        assert_eq!(report.lines().filter(|l| l.contains("iterations")).count(), 2);
    }
}

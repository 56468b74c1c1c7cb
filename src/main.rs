use clap::{Parser, Subcommand};
use flexi_logger::{AdaptiveFormat, Logger, WriteMode};
use lib_azul::prelude::*;

#[derive(Clone, Debug, Parser)]
#[command(name = "azul-engine", about = "Azul rules engine: profiling and move-generation benchmarks")]
struct Cli {
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Run the comprehensive profiling harness against a fresh position.
    Profile {
        #[arg(long, default_value_t = 2)]
        players: u8,

        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Benchmark move generation in isolation over many positions.
    BenchMovegen {
        #[arg(long, default_value_t = 2)]
        players: u8,

        #[arg(long, default_value_t = 1)]
        seed: u64,

        #[arg(long, default_value_t = 10_000)]
        iterations: u32,
    },
}

fn run_profile(players: u8, seed: u64) -> anyhow::Result<()> {
    let pos = Position::new_initial(seed, players);
    let mut profiler = Profiler::default();
    profiler.run_comprehensive(&pos, pos.to_move);
    println!("{}", profiler.render_report());
    Ok(())
}

fn run_bench_movegen(players: u8, seed: u64, iterations: u32) -> anyhow::Result<()> {
    let mut pos = Position::new_initial(seed, players);
    let start = std::time::Instant::now();
    let mut total_moves: u64 = 0;
    for _ in 0..iterations {
        let moves = generate_legal_moves(&pos);
        total_moves += moves.len() as u64;
        if pos.is_terminal() || moves.is_empty() {
            pos = Position::new_initial(seed ^ total_moves, players);
            continue;
        }
        pos = pos.apply(moves[0])?;
    }
    let elapsed = start.elapsed();
    println!(
        "generated {total_moves} moves across {iterations} calls in {elapsed:?} ({:?}/call)",
        elapsed / iterations.max(1)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _logger = Logger::try_with_env_or_str(cli.log_level.clone().unwrap_or_else(|| "info".into()).as_str())?
        .write_mode(WriteMode::BufferAndFlush)
        .log_to_stderr()
        .adaptive_format_for_stderr(match cfg!(debug_assertions) {
            true => AdaptiveFormat::WithThread,
            _ => AdaptiveFormat::Default,
        })
        .start()?;

    let result = match cli.command {
        Command::Profile { players, seed } => run_profile(players, seed),
        Command::BenchMovegen { players, seed, iterations } => run_bench_movegen(players, seed, iterations),
    };

    if let Err(e) = &result {
        log::error!("fatal error: {e}");
    }
    result
}

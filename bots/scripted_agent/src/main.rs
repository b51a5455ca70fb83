use std::io::Write;

use clap::Parser;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde_json::Map;
use tictactoe::{to_params, MakeMoveParams, Method, Position, RequestEnvelope, TauntParams};
use tictactoe_agent_utils::DEFAULT_TAUNTS;
use tracing::debug;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Prints a fixed-shape sequence of agent requests to stdout, one per line,
/// for piping into a game server by hand.
#[derive(Parser)]
struct Args {
    /// Log each request to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.verbose {
        initialize_logging(LevelFilter::DEBUG);
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    debug!(seed);

    let mut stdout = std::io::stdout().lock();
    for request in script(&mut rng) {
        let line = request.to_line()?;
        debug!(method = %request.method, "{}", line);
        writeln!(stdout, "{}", line)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Looks at the game, then plays every cell in random order. Counting moves
/// from 1, odd moves are followed by another look at the game and even moves
/// by a taunt.
fn script(rng: &mut StdRng) -> Vec<RequestEnvelope> {
    let mut methods = vec![
        (Method::ViewGameState, Map::new()),
        (Method::GetTurn, Map::new()),
    ];

    let mut positions: Vec<Position> = Position::all().collect();
    positions.shuffle(rng);
    for (move_idx, pos) in positions.into_iter().enumerate() {
        methods.push((Method::MakeMove, to_params(&MakeMoveParams::from(pos))));
        if move_idx % 2 == 1 {
            let message = DEFAULT_TAUNTS[(move_idx / 2) % DEFAULT_TAUNTS.len()];
            let params = to_params(&TauntParams {
                message: String::from(message),
            });
            methods.push((Method::TauntPlayer, params));
        } else {
            methods.push((Method::ViewGameState, Map::new()));
        }
    }

    methods.push((Method::ViewGameState, Map::new()));
    methods.push((Method::GetGameHistory, Map::new()));

    methods
        .into_iter()
        .zip(1..)
        .map(|((method, params), id)| RequestEnvelope::new(id, method, params))
        .collect()
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

use std::path::PathBuf;
use std::process::ExitCode;

use agent::{
    error_chain, stdio_transport, Agent, AgentConfig, ChildProcessTransport, FinishReason,
    HttpTransport, Outcome, Recorder, RpcClient, Shutdown, StrategyKind, Transport,
    TransportConfig,
};
use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Plays tic-tac-toe against a JSON-RPC game server.
///
/// Without --url or --server, requests are written to stdout and responses
/// are read from stdin.
#[derive(Parser)]
struct Args {
    /// Log at least at debug level
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Seconds between polls [default: 1.0]
    #[arg(short, long)]
    poll_interval: Option<f64>,

    /// Maximum number of loop iterations [default: 100]
    #[arg(short, long)]
    max_turns: Option<usize>,

    /// How to pick moves [default: random]
    #[arg(long, value_enum)]
    strategy: Option<StrategyKind>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Chance of taunting after each move [default: 0.3]
    #[arg(long)]
    taunt_probability: Option<f64>,

    /// JSON config file; command-line flags take precedence over it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Talk to the server over HTTP at this URL
    #[arg(long, conflicts_with = "server")]
    url: Option<String>,

    /// Spawn the server with this command and talk to it over its stdin/stdout
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    server: Vec<String>,

    /// Seconds to wait for each response (no limit by default)
    #[arg(long)]
    rpc_timeout: Option<f64>,

    /// Ask the server for a new game before playing
    #[arg(long, default_value_t = false)]
    restart: bool,

    /// Fetch and log the game history after playing
    #[arg(long, default_value_t = false)]
    history: bool,

    /// Record the session's requests and responses as a JSON file into this directory
    #[arg(short, long)]
    record_to_directory: Option<PathBuf>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        args.log_level.max(LevelFilter::DEBUG)
    } else {
        args.log_level
    };
    initialize_logging(level);

    match run(args) {
        Ok(outcome) if outcome.reason.is_failure() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<Outcome> {
    let file_config = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };
    let overrides = AgentConfig {
        poll_interval: args.poll_interval,
        max_turns: args.max_turns,
        taunt_probability: args.taunt_probability,
        taunts: None,
        strategy: args.strategy,
        seed: args.seed,
        server_command: (!args.server.is_empty()).then_some(args.server),
        url: args.url,
        rpc_timeout: args.rpc_timeout,
    };
    let config = file_config.merge(overrides).resolve()?;

    // Get a random seed
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let strategy = config.strategy.build(StdRng::seed_from_u64(rng.gen()));

    let recorder = match args.record_to_directory {
        Some(dir_path) => Some(Recorder::new(dir_path)?),
        None => None,
    };

    let shutdown = Shutdown::new();
    shutdown
        .install_ctrl_c_handler()
        .context("Could not install the Ctrl-C handler")?;

    let transport: Box<dyn Transport> = match config.transport {
        TransportConfig::Stdio => Box::new(
            stdio_transport(shutdown.clone())?.with_timeout(config.rpc_timeout),
        ),
        TransportConfig::Child(command) => Box::new(
            ChildProcessTransport::spawn(&command, shutdown.clone())
                .with_context(|| format!("Could not start the server {:?}", command))?
                .with_timeout(config.rpc_timeout),
        ),
        TransportConfig::Http(url) => Box::new(HttpTransport::new(&url, config.rpc_timeout)?),
    };

    let client = RpcClient::new(transport).with_recorder(recorder);
    let mut agent = Agent::new(client, strategy, config.taunts, rng, config.settings)
        .with_shutdown(shutdown);

    if args.restart {
        agent.restart_game().context("Could not restart the game")?;
    }

    let outcome = agent.run();
    eprintln!(
        "{} after {} turns ({} moves made)",
        outcome.reason, outcome.turns, outcome.moves_made
    );

    if args.history && !matches!(outcome.reason, FinishReason::Interrupted) {
        match agent.fetch_history() {
            Ok(history) => info!("Game history: {}", history),
            Err(err) => warn!("Could not fetch the game history: {}", error_chain(&err)),
        }
    }

    if let Some(recorder) = agent.client_mut().recorder_mut() {
        let path = recorder.write_session_recording()?;
        info!(path = %path.display(), "Wrote session recording");
    }

    Ok(outcome)
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    // stdout may carry the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tictactoe_agent_utils::{
    FirstEmptyStrategy, HeuristicStrategy, RandomStrategy, Strategy, Taunts,
    DEFAULT_TAUNTS, DEFAULT_TAUNT_PROBABILITY,
};

use crate::agent::AgentSettings;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Any empty cell, uniformly at random
    #[default]
    Random,
    /// The first empty cell in row-major order
    FirstEmpty,
    /// Win, block, center, corner, anything
    Heuristic,
}

impl StrategyKind {
    pub fn build(self, rng: StdRng) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Random => Box::new(RandomStrategy::new(rng)),
            StrategyKind::FirstEmpty => Box::new(FirstEmptyStrategy),
            StrategyKind::Heuristic => Box::new(HeuristicStrategy),
        }
    }
}

/// Everything that can be set in a config file. Unset fields fall back to
/// command-line flags and then to built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Seconds between polls
    pub poll_interval: Option<f64>,
    pub max_turns: Option<usize>,
    pub taunt_probability: Option<f64>,
    pub taunts: Option<Vec<String>>,
    pub strategy: Option<StrategyKind>,
    pub seed: Option<u64>,
    /// Program and arguments of a game server to spawn
    pub server_command: Option<Vec<String>>,
    pub url: Option<String>,
    /// Seconds to wait for each response
    pub rpc_timeout: Option<f64>,
}

/// How to reach the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportConfig {
    /// Requests on our stdout, responses on our stdin
    Stdio,
    Child(Vec<String>),
    Http(String),
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub settings: AgentSettings,
    pub taunts: Taunts,
    pub strategy: StrategyKind,
    pub seed: Option<u64>,
    pub transport: TransportConfig,
    pub rpc_timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    /// Fields set in `overrides` win.
    pub fn merge(self, overrides: AgentConfig) -> AgentConfig {
        AgentConfig {
            poll_interval: overrides.poll_interval.or(self.poll_interval),
            max_turns: overrides.max_turns.or(self.max_turns),
            taunt_probability: overrides.taunt_probability.or(self.taunt_probability),
            taunts: overrides.taunts.or(self.taunts),
            strategy: overrides.strategy.or(self.strategy),
            seed: overrides.seed.or(self.seed),
            server_command: overrides.server_command.or(self.server_command),
            url: overrides.url.or(self.url),
            rpc_timeout: overrides.rpc_timeout.or(self.rpc_timeout),
        }
    }

    /// Validates the settings and fills in defaults.
    pub fn resolve(self) -> anyhow::Result<ResolvedConfig> {
        let defaults = AgentSettings::default();
        let poll_interval = match self.poll_interval {
            Some(secs) => seconds("poll_interval", secs)?,
            None => defaults.poll_interval,
        };
        let max_turns = self.max_turns.unwrap_or(defaults.max_turns);
        let rpc_timeout = self
            .rpc_timeout
            .map(|secs| seconds("rpc_timeout", secs))
            .transpose()?;
        if rpc_timeout == Some(Duration::ZERO) {
            anyhow::bail!("rpc_timeout must be positive");
        }

        let taunt_probability = self.taunt_probability.unwrap_or(DEFAULT_TAUNT_PROBABILITY);
        if !(0.0..=1.0).contains(&taunt_probability) {
            anyhow::bail!(
                "taunt_probability must be between 0 and 1, got {}",
                taunt_probability
            );
        }
        let messages = self
            .taunts
            .unwrap_or_else(|| DEFAULT_TAUNTS.iter().map(|&msg| String::from(msg)).collect());

        let transport = match (self.url, self.server_command) {
            (Some(_), Some(_)) => {
                anyhow::bail!("Use either a server URL or a server command, not both")
            }
            (Some(url), None) => TransportConfig::Http(url),
            (None, Some(command)) if command.is_empty() => {
                anyhow::bail!("The server command is empty")
            }
            (None, Some(command)) => TransportConfig::Child(command),
            (None, None) => TransportConfig::Stdio,
        };

        Ok(ResolvedConfig {
            settings: AgentSettings {
                poll_interval,
                max_turns,
            },
            taunts: Taunts::new(messages, taunt_probability),
            strategy: self.strategy.unwrap_or_default(),
            seed: self.seed,
            transport,
            rpc_timeout,
        })
    }
}

fn seconds(field: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        anyhow::anyhow!(
            "{} must be a non-negative number of seconds, got {}",
            field,
            secs
        )
    })
}

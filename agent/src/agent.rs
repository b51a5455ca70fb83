use std::time::Duration;

use rand::rngs::StdRng;
use serde_json::Value;
use tictactoe::{GameState, GameStatus, Method, Position};
use tictactoe_agent_utils::{Strategy, Taunts};
use tracing::{debug, error, info, warn};

use crate::client::RpcClient;
use crate::error::{error_chain, CallError};
use crate::shutdown::Shutdown;
use crate::transport::Transport;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    /// Pause after every iteration of the loop.
    pub poll_interval: Duration,
    /// Upper bound on loop iterations, and thereby on `get_turn` calls.
    pub max_turns: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_turns: 100,
        }
    }
}

/// Why the agent stopped.
#[derive(Debug)]
pub enum FinishReason {
    GameOver(GameStatus),
    /// A read-only call (`get_turn` or `view_game_state`) failed.
    QueryFailed { method: Method, err: CallError },
    MoveFailed { position: Position, err: CallError },
    /// The game was still running but there was no empty cell.
    StrategyExhausted,
    MaxTurnsReached,
    Interrupted,
}

impl FinishReason {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FinishReason::QueryFailed { .. }
                | FinishReason::MoveFailed { .. }
                | FinishReason::StrategyExhausted
        )
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::GameOver(status) => write!(f, "Game over: {}", status),
            FinishReason::QueryFailed { method, err } => {
                write!(f, "Call to {} failed: {}", method, error_chain(err))
            }
            FinishReason::MoveFailed { position, err } => {
                write!(f, "Move at {} failed: {}", position, error_chain(err))
            }
            FinishReason::StrategyExhausted => {
                write!(f, "No move available although the game is still running")
            }
            FinishReason::MaxTurnsReached => write!(f, "Maximum number of turns reached"),
            FinishReason::Interrupted => write!(f, "Interrupted"),
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub reason: FinishReason,
    /// Loop iterations that ran, including polls where it was not our turn.
    pub turns: usize,
    pub moves_made: usize,
}

enum Transition {
    Continue,
    Finish(FinishReason),
}

/// Polls the server and plays whenever it is the agent's turn.
pub struct Agent<T, S> {
    client: RpcClient<T>,
    strategy: S,
    taunts: Taunts,
    rng: StdRng,
    settings: AgentSettings,
    state: GameState,
    shutdown: Shutdown,
    moves_made: usize,
}

impl<T: Transport, S: Strategy> Agent<T, S> {
    pub fn new(
        client: RpcClient<T>,
        strategy: S,
        taunts: Taunts,
        rng: StdRng,
        settings: AgentSettings,
    ) -> Self {
        Self {
            client,
            strategy,
            taunts,
            rng,
            settings,
            state: GameState::new(),
            shutdown: Shutdown::new(),
            moves_made: 0,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn client(&self) -> &RpcClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut RpcClient<T> {
        &mut self.client
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Asks the server for a new game and forgets everything about the old one.
    pub fn restart_game(&mut self) -> Result<(), CallError> {
        self.client.restart_game()?;
        self.state.restart();
        info!("Started a new game");
        Ok(())
    }

    pub fn fetch_history(&mut self) -> Result<Value, CallError> {
        self.client.get_game_history()
    }

    /// Runs until the game ends, something fails, the turn budget is used up,
    /// or shutdown is requested.
    pub fn run(&mut self) -> Outcome {
        info!(
            strategy = self.strategy.name(),
            max_turns = self.settings.max_turns,
            poll_interval = ?self.settings.poll_interval,
            "Agent started"
        );
        let mut turns = 0;
        let reason = loop {
            if self.shutdown.is_requested() {
                break FinishReason::Interrupted;
            }
            if turns >= self.settings.max_turns {
                break FinishReason::MaxTurnsReached;
            }
            turns += 1;
            if let Transition::Finish(reason) = self.play_turn() {
                break reason;
            }
            if self.shutdown.sleep(self.settings.poll_interval) {
                break FinishReason::Interrupted;
            }
        };

        match &reason {
            reason if reason.is_failure() => error!(turns, "{}", reason),
            reason => info!(turns, moves_made = self.moves_made, "{}", reason),
        }
        Outcome {
            reason,
            turns,
            moves_made: self.moves_made,
        }
    }

    fn play_turn(&mut self) -> Transition {
        let turn = match self.client.get_turn() {
            Ok(turn) => turn,
            Err(err) => return query_failed(Method::GetTurn, err),
        };
        if !turn.is_agent_turn {
            debug!("Waiting for the opponent");
            return Transition::Continue;
        }

        let snapshot = match self.client.view_game_state() {
            Ok(snapshot) => snapshot,
            Err(err) => return query_failed(Method::ViewGameState, err),
        };
        self.state.apply(snapshot);
        debug!("Current board:\n{}", self.state.board);
        if self.state.status.is_over() {
            return Transition::Finish(FinishReason::GameOver(self.state.status));
        }

        let marker = match self.state.agent_marker() {
            Some(marker) => marker,
            None => {
                let inferred = self.state.board.next_marker();
                let marker = self.state.assign_marker(inferred);
                debug!(
                    %marker,
                    "Server did not say which marker is ours, inferred it from the board"
                );
                marker
            }
        };

        let Some(position) = self.strategy.select_move(&self.state.board, marker) else {
            return Transition::Finish(FinishReason::StrategyExhausted);
        };
        info!(%marker, %position, "Making move");
        let result = match self.client.make_move(position) {
            Ok(result) => result,
            Err(err) if err.is_interrupted() => {
                return Transition::Finish(FinishReason::Interrupted)
            }
            Err(err) => return Transition::Finish(FinishReason::MoveFailed { position, err }),
        };
        self.moves_made += 1;
        if let Some(message) = &result.message {
            debug!(reply = %message, "Move accepted");
        }

        self.taunt();

        match (result.snapshot, result.status) {
            (Some(snapshot), _) => {
                self.state.apply(snapshot);
            }
            (None, Some(status)) => self.state.status = status,
            (None, None) => {}
        }
        if self.state.status.is_over() {
            return Transition::Finish(FinishReason::GameOver(self.state.status));
        }
        Transition::Continue
    }

    /// Sends a taunt with the configured probability. Failures are only logged.
    fn taunt(&mut self) {
        let Some(message) = self.taunts.pick(&mut self.rng) else {
            return;
        };
        let message = String::from(message);
        match self.client.taunt_player(&message) {
            Ok(()) => info!(taunt = %message, "Taunted the opponent"),
            Err(err) => warn!(taunt = %message, "Taunt failed: {}", error_chain(&err)),
        }
    }
}

fn query_failed(method: Method, err: CallError) -> Transition {
    if err.is_interrupted() {
        return Transition::Finish(FinishReason::Interrupted);
    }
    Transition::Finish(FinishReason::QueryFailed { method, err })
}

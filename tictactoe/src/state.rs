use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::board::unit_variant_name;
use crate::errors::{describe, ParseError};
use crate::{parse_board, parse_marker, Board, Marker};

/// Whether the game is still running, and how it ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GameStatus {
    InProgress,
    Won(Marker),
    Draw,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        self != GameStatus::InProgress
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::InProgress => write!(f, "in progress"),
            GameStatus::Won(marker) => write!(f, "won by {}", marker),
            GameStatus::Draw => write!(f, "draw"),
        }
    }
}

/// Accepts `"InProgress"`, `"Draw"`, `{"Won": <marker>}`, and the
/// single-key object forms `{"InProgress": null}` and `{"Draw": null}`.
pub fn parse_status(raw: &Value) -> Result<GameStatus, ParseError> {
    if let Some(won) = raw.as_object().and_then(|map| map.get("Won")) {
        if raw.as_object().map(|map| map.len()) == Some(1) {
            return parse_marker(won).map(GameStatus::Won);
        }
    }
    match unit_variant_name(raw) {
        Some("InProgress") => Ok(GameStatus::InProgress),
        Some("Draw") => Ok(GameStatus::Draw),
        _ => Err(ParseError::UnknownStatus {
            value: describe(raw),
        }),
    }
}

impl<'de> Deserialize<'de> for GameStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        parse_status(&raw).map_err(serde::de::Error::custom)
    }
}

fn field<'a>(raw: &'a Value, names: &[&'static str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| raw.get(*name))
        .filter(|value| !value.is_null())
}

fn require<'a>(raw: &'a Value, name: &'static str) -> Result<&'a Value, ParseError> {
    field(raw, &[name]).ok_or(ParseError::MissingField { field: name })
}

/// Result of `get_turn`.
///
/// This is only a momentary snapshot: the opponent may move right after it was taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TurnInfo {
    pub is_agent_turn: bool,
}

impl TurnInfo {
    /// A missing flag counts as "not the agent's turn".
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let is_agent_turn = match field(raw, &["isAgentTurn", "isAiTurn"]) {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(ParseError::InvalidField {
                    field: "isAgentTurn",
                    value: describe(other),
                })
            }
        };
        Ok(Self { is_agent_turn })
    }
}

/// One full state report from `view_game_state`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GameSnapshot {
    pub board: Board,
    pub status: GameStatus,
    /// The marker the server says the agent plays, if it says so.
    pub agent_marker: Option<Marker>,
}

impl GameSnapshot {
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let board = parse_board(require(raw, "board")?)?;
        // A missing status means the game is still running.
        let status = match field(raw, &["status"]) {
            Some(status) => parse_status(status)?,
            None => GameStatus::InProgress,
        };
        let agent_marker = field(raw, &["agentPlayer", "aiPlayer"])
            .map(parse_marker)
            .transpose()?;
        Ok(Self {
            board,
            status,
            agent_marker,
        })
    }
}

/// Result of `make_move`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResult {
    pub message: Option<String>,
    /// Status of the state embedded in the result, if there is one.
    pub status: Option<GameStatus>,
    /// Present if the embedded state is a full snapshot.
    pub snapshot: Option<GameSnapshot>,
}

impl MoveResult {
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let message = match field(raw, &["message"]) {
            None => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
        };
        let embedded = field(raw, &["gameState"]);
        let status = embedded
            .and_then(|state| field(state, &["status"]))
            .map(parse_status)
            .transpose()?;
        let snapshot = match embedded {
            Some(state) if field(state, &["board"]).is_some() => Some(GameSnapshot::parse(state)?),
            _ => None,
        };
        Ok(Self {
            message,
            status,
            snapshot,
        })
    }
}

/// The client-side picture of the current game.
///
/// Board and status are replaced wholesale by every snapshot. The agent's
/// marker is assigned once and survives later snapshots until [`GameState::restart()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub status: GameStatus,
    agent_marker: Option<Marker>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::empty(),
            status: GameStatus::InProgress,
            agent_marker: None,
        }
    }

    pub fn agent_marker(&self) -> Option<Marker> {
        self.agent_marker
    }

    /// Sets the agent's marker unless it is already known.
    ///
    /// Returns the marker in effect afterwards.
    pub fn assign_marker(&mut self, marker: Marker) -> Marker {
        *self.agent_marker.get_or_insert(marker)
    }

    pub fn apply(&mut self, snapshot: GameSnapshot) -> &GameState {
        self.board = snapshot.board;
        self.status = snapshot.status;
        if let Some(marker) = snapshot.agent_marker {
            self.assign_marker(marker);
        }
        self
    }

    /// Parses a state-shaped RPC result and applies it.
    pub fn update(&mut self, rpc_result: &Value) -> Result<&GameState, ParseError> {
        let snapshot = GameSnapshot::parse(rpc_result)?;
        Ok(self.apply(snapshot))
    }

    pub fn restart(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;
    use serde_json::json;

    use super::*;
    use crate::{Cell, Position};

    quickcheck! {
        fn status_serialization_parses_back(status: GameStatus) -> bool {
            parse_status(&serde_json::to_value(status).unwrap()) == Ok(status)
        }
    }

    #[test]
    fn status_encodings() {
        assert_eq!(parse_status(&json!("InProgress")), Ok(GameStatus::InProgress));
        assert_eq!(parse_status(&json!({"Draw": null})), Ok(GameStatus::Draw));
        assert_eq!(
            parse_status(&json!({"Won": "O"})),
            Ok(GameStatus::Won(Marker::O))
        );
        assert_eq!(
            parse_status(&json!({"Won": {"X": null}})),
            Ok(GameStatus::Won(Marker::X))
        );
        assert!(parse_status(&json!("Won")).is_err());
        assert!(parse_status(&json!({"Won": "Z"})).is_err());
    }

    #[test]
    fn turn_info_aliases() {
        assert!(TurnInfo::parse(&json!({"isAgentTurn": true})).unwrap().is_agent_turn);
        assert!(TurnInfo::parse(&json!({"isAiTurn": true})).unwrap().is_agent_turn);
        assert!(!TurnInfo::parse(&json!({})).unwrap().is_agent_turn);
        assert!(TurnInfo::parse(&json!({"isAgentTurn": "yes"})).is_err());
    }

    fn state_json(marker: &str, status: Value) -> Value {
        json!({
            "board": [
                ["X", "Empty", "Empty"],
                ["Empty", "Empty", "Empty"],
                ["Empty", "Empty", "Empty"],
            ],
            "status": status,
            "agentPlayer": marker,
        })
    }

    #[test]
    fn marker_is_assigned_once() {
        let mut state = GameState::new();
        state.update(&state_json("O", json!("InProgress"))).unwrap();
        assert_eq!(state.agent_marker(), Some(Marker::O));
        assert_eq!(state.board.get(Position { row: 0, col: 0 }), Cell::Marker(Marker::X));

        state.update(&state_json("X", json!("Draw"))).unwrap();
        assert_eq!(state.agent_marker(), Some(Marker::O));
        assert_eq!(state.status, GameStatus::Draw);

        state.restart();
        assert_eq!(state.agent_marker(), None);
        assert_eq!(state.status, GameStatus::InProgress);
        assert_eq!(state.assign_marker(Marker::X), Marker::X);
        assert_eq!(state.assign_marker(Marker::O), Marker::X);
    }

    #[test]
    fn snapshot_requires_board() {
        assert_eq!(
            GameSnapshot::parse(&json!({"status": "Draw"})),
            Err(ParseError::MissingField { field: "board" })
        );
        let snapshot = GameSnapshot::parse(&json!({
            "board": [
                ["Empty", "Empty", "Empty"],
                ["Empty", "Empty", "Empty"],
                ["Empty", "Empty", "Empty"],
            ],
            "aiPlayer": {"X": null},
        }))
        .unwrap();
        assert_eq!(snapshot.status, GameStatus::InProgress);
        assert_eq!(snapshot.agent_marker, Some(Marker::X));
    }

    #[test]
    fn move_result_with_and_without_state() {
        let result = MoveResult::parse(&json!({"message": "Move made"})).unwrap();
        assert_eq!(result.message.as_deref(), Some("Move made"));
        assert_eq!(result.status, None);

        let result = MoveResult::parse(&json!({
            "message": "Move made",
            "gameState": {"status": {"Won": "X"}},
        }))
        .unwrap();
        assert_eq!(result.status, Some(GameStatus::Won(Marker::X)));
        assert!(result.snapshot.is_none());

        let draw = json!({"gameState": state_json("X", json!("Draw"))});
        let result = MoveResult::parse(&draw).unwrap();
        assert_eq!(result.status, Some(GameStatus::Draw));
        assert_eq!(result.snapshot.map(|s| s.status), Some(GameStatus::Draw));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{describe, MalformedResponse};
use crate::Position;

pub const JSONRPC_VERSION: &str = "2.0";

/// The methods the game server offers to the agent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Whose turn is it?
    ///
    /// The result is a [`TurnInfo`](crate::TurnInfo).
    GetTurn,
    /// The result is a [`GameSnapshot`](crate::GameSnapshot).
    ViewGameState,
    /// Params are [`MakeMoveParams`], the result is a [`MoveResult`](crate::MoveResult).
    MakeMove,
    /// Params are [`TauntParams`]. The result carries no information.
    TauntPlayer,
    /// Resets the server's game.
    RestartGame,
    /// The result is implementation-defined.
    GetGameHistory,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::GetTurn => "get_turn",
            Method::ViewGameState => "view_game_state",
            Method::MakeMove => "make_move",
            Method::TauntPlayer => "taunt_player",
            Method::RestartGame => "restart_game",
            Method::GetGameHistory => "get_game_history",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeMoveParams {
    pub row: u8,
    pub col: u8,
}

impl From<Position> for MakeMoveParams {
    fn from(pos: Position) -> Self {
        Self {
            row: pos.row,
            col: pos.col,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TauntParams {
    pub message: String,
}

/// Converts a params struct into the JSON object sent as `params`.
pub fn to_params<T: Serialize>(params: &T) -> Map<String, Value> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// One JSON-RPC request, serialized as a single line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    /// Always present, possibly empty.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RequestEnvelope {
    pub fn new(id: u64, method: Method, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: String::from(JSONRPC_VERSION),
            id,
            method: String::from(method.as_str()),
            params,
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// The `error` member of a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Exactly one of these is present in a well-formed response.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponsePayload {
    Result(Value),
    Error(RpcErrorObject),
}

/// One JSON-RPC response.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
    /// `Value::Null` if the server did not send one.
    pub id: Value,
    pub payload: ResponsePayload,
}

impl ResponseEnvelope {
    /// Parses a single response line.
    ///
    /// An explicit `"result": null` is read as an empty object.
    pub fn parse(line: &str) -> Result<Self, MalformedResponse> {
        let value: Value = serde_json::from_str(line).map_err(MalformedResponse::NotJson)?;
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(MalformedResponse::NotAnObject {
                    value: describe(&other),
                })
            }
        };
        let id = map.remove("id").unwrap_or(Value::Null);
        let payload = match (map.remove("result"), map.remove("error")) {
            (Some(_), Some(_)) => return Err(MalformedResponse::BothResultAndError),
            (None, None) => return Err(MalformedResponse::NeitherResultNorError),
            (Some(Value::Null), None) => ResponsePayload::Result(Value::Object(Map::new())),
            (Some(result), None) => ResponsePayload::Result(result),
            (None, Some(error)) => ResponsePayload::Error(
                serde_json::from_value(error).map_err(MalformedResponse::InvalidErrorObject)?,
            ),
        };
        Ok(Self { id, payload })
    }

    /// Whether this response answers the request with the given id.
    ///
    /// Servers that could not read the request answer errors with a null id;
    /// those are accepted for any request.
    pub fn answers(&self, request_id: u64) -> bool {
        match (&self.id, &self.payload) {
            (Value::Null, ResponsePayload::Error(_)) => true,
            (id, _) => id.as_u64() == Some(request_id),
        }
    }
}

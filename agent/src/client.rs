use serde_json::{Map, Value};
use tictactoe::{
    to_params, GameSnapshot, MakeMoveParams, Method, MoveResult, Position, RequestEnvelope,
    ResponseEnvelope, ResponsePayload, TauntParams, TurnInfo,
};
use tracing::{debug, trace};

use crate::error::CallError;
use crate::recording::Recorder;
use crate::transport::Transport;

/// A JSON-RPC 2.0 client for the game server.
///
/// Calls are strictly sequential: each one waits for its response before the
/// next request is written. Request ids start at 1 and are never reused.
pub struct RpcClient<T> {
    transport: T,
    next_id: u64,
    recorder: Option<Recorder>,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Option<Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn recorder_mut(&mut self) -> Option<&mut Recorder> {
        self.recorder.as_mut()
    }

    /// Performs one call and returns its `result`.
    pub fn call(&mut self, method: Method, params: Map<String, Value>) -> Result<Value, CallError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RequestEnvelope::new(id, method, params)
            .to_line()
            .map_err(CallError::Serialize)?;
        trace!(name: "Sending request", %method, request = %request);
        let mut line = self.transport.send_and_receive(&request)?;
        let response = loop {
            trace!(name: "Received response", %method, response = %line);
            let response = ResponseEnvelope::parse(&line);
            // Answers to earlier calls that timed out may still be queued up
            let stale = match &response {
                Ok(response) if !response.answers(id) => {
                    response.id.as_u64().filter(|&found| found < id)
                }
                _ => None,
            };
            let next = stale.and_then(|found| Some((found, self.transport.receive_next()?)));
            match next {
                Some((found, next)) => {
                    debug!(%method, found, expected = id, "Discarding a late response");
                    line = next?;
                }
                None => break response,
            }
        };

        if let Some(recorder) = &mut self.recorder {
            recorder.store_exchange(method.as_str(), &request, &line);
        }

        let response = response?;
        if !response.answers(id) {
            return Err(CallError::IdMismatch {
                expected: id,
                found: response.id,
            });
        }
        match response.payload {
            ResponsePayload::Result(result) => Ok(result),
            ResponsePayload::Error(err) => Err(CallError::Rpc(err)),
        }
    }

    pub fn get_turn(&mut self) -> Result<TurnInfo, CallError> {
        let result = self.call(Method::GetTurn, Map::new())?;
        Ok(TurnInfo::parse(&result)?)
    }

    pub fn view_game_state(&mut self) -> Result<GameSnapshot, CallError> {
        let result = self.call(Method::ViewGameState, Map::new())?;
        Ok(GameSnapshot::parse(&result)?)
    }

    pub fn make_move(&mut self, pos: Position) -> Result<MoveResult, CallError> {
        let params = to_params(&MakeMoveParams::from(pos));
        let result = self.call(Method::MakeMove, params)?;
        Ok(MoveResult::parse(&result)?)
    }

    pub fn taunt_player(&mut self, message: &str) -> Result<(), CallError> {
        let params = to_params(&TauntParams {
            message: String::from(message),
        });
        self.call(Method::TauntPlayer, params)?;
        Ok(())
    }

    pub fn restart_game(&mut self) -> Result<(), CallError> {
        self.call(Method::RestartGame, Map::new())?;
        Ok(())
    }

    /// The history format is up to the server.
    pub fn get_game_history(&mut self) -> Result<Value, CallError> {
        self.call(Method::GetGameHistory, Map::new())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quickcheck::quickcheck;
    use serde_json::json;
    use tictactoe::{GameStatus, Marker, MalformedResponse};

    use super::*;
    use crate::error::TransportError;
    use crate::test_support::{FakeServer, RawServer};

    fn sent_ids(sent: &[String]) -> Vec<u64> {
        sent.iter()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].as_u64().unwrap())
            .collect()
    }

    quickcheck! {
        fn ids_strictly_increase(num_calls: u8) -> bool {
            let mut client = RpcClient::new(FakeServer::new(|_, _| Ok(json!({}))));
            for _ in 0..num_calls {
                client.call(Method::GetTurn, Map::new()).unwrap();
            }
            let ids = &client.transport().ids;
            ids.len() == usize::from(num_calls)
                && ids.first().map_or(true, |&id| id == 1)
                && ids.windows(2).all(|pair| pair[1] == pair[0] + 1)
        }
    }

    #[test]
    fn ids_survive_failed_calls() {
        let mut client = RpcClient::new(RawServer::new([
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nope"}}"#,
            "not json",
            r#"{"jsonrpc":"2.0","id":3,"result":{}}"#,
        ]));
        assert!(client.call(Method::GetTurn, Map::new()).is_err());
        assert!(client.call(Method::GetTurn, Map::new()).is_err());
        assert!(client.call(Method::GetTurn, Map::new()).is_ok());
        assert_eq!(sent_ids(&client.transport().sent), vec![1, 2, 3]);
    }

    #[test]
    fn request_shape() {
        let mut client =
            RpcClient::new(RawServer::new([r#"{"jsonrpc":"2.0","id":1,"result":{}}"#]));
        client.make_move(Position::new(1, 2).unwrap()).unwrap();
        let request: Value = serde_json::from_str(&client.transport().sent[0]).unwrap();
        assert_eq!(
            request,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "make_move",
                "params": {"row": 1, "col": 2},
            })
        );
    }

    #[test]
    fn rpc_error_is_reported() {
        let mut client = RpcClient::new(FakeServer::new(|_, _| {
            Err((-32000, String::from("cell occupied")))
        }));
        let err = client.make_move(Position::CENTER).unwrap_err();
        let err = match err {
            CallError::Rpc(err) => err,
            other => panic!("expected an RPC error, got {:?}", other),
        };
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "cell occupied");
    }

    #[test]
    fn mismatched_id_is_rejected() {
        let mut client =
            RpcClient::new(RawServer::new([r#"{"jsonrpc":"2.0","id":5,"result":{}}"#]));
        assert!(matches!(
            client.call(Method::GetTurn, Map::new()),
            Err(CallError::IdMismatch { expected: 1, .. })
        ));
    }

    #[test]
    fn late_answers_to_earlier_calls_are_skipped() {
        let mut client = RpcClient::new(
            RawServer::default()
                .then_fail(TransportError::Timeout(Duration::from_millis(100)))
                .then_respond(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
                .then_respond(r#"{"jsonrpc":"2.0","id":2,"result":{"isAgentTurn":true}}"#),
        );
        assert!(matches!(
            client.taunt_player("hi"),
            Err(CallError::Transport(TransportError::Timeout(_)))
        ));
        assert!(client.get_turn().unwrap().is_agent_turn);
        assert_eq!(client.transport().sent.len(), 2);
    }

    #[test]
    fn stale_answer_without_a_follow_up_is_a_mismatch() {
        let mut client = RpcClient::new(
            RawServer::default()
                .then_respond(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
                .then_respond(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#),
        );
        client.call(Method::GetTurn, Map::new()).unwrap();
        assert!(matches!(
            client.call(Method::GetTurn, Map::new()),
            Err(CallError::IdMismatch { expected: 2, .. })
        ));
    }

    #[test]
    fn malformed_responses() {
        let mut client = RpcClient::new(RawServer::new([
            "{",
            r#"{"jsonrpc":"2.0","id":2}"#,
            r#"{"jsonrpc":"2.0","id":3,"result":{},"error":{"code":1,"message":"x"}}"#,
        ]));
        for _ in 0..3 {
            assert!(matches!(
                client.call(Method::GetTurn, Map::new()),
                Err(CallError::MalformedResponse(_))
            ));
        }
        let mut client = RpcClient::new(RawServer::new(["42"]));
        assert!(matches!(
            client.call(Method::GetTurn, Map::new()),
            Err(CallError::MalformedResponse(MalformedResponse::NotAnObject { .. }))
        ));
    }

    #[test]
    fn transport_errors_propagate() {
        let mut client =
            RpcClient::new(RawServer::default().then_fail(TransportError::Interrupted));
        let err = client.get_turn().unwrap_err();
        assert!(err.is_interrupted());
        assert!(matches!(
            client.get_turn(),
            Err(CallError::Transport(TransportError::Closed))
        ));
    }

    #[test]
    fn typed_wrappers() {
        let mut client = RpcClient::new(FakeServer::new(|method, _| match method {
            "get_turn" => Ok(json!({"isAgentTurn": true})),
            "view_game_state" => Ok(json!({
                "board": [
                    ["X", "Empty", "Empty"],
                    ["Empty", "O", "Empty"],
                    ["Empty", "Empty", "Empty"],
                ],
                "status": "InProgress",
                "agentPlayer": "X",
            })),
            "make_move" => Ok(json!({"message": "ok", "gameState": {"status": {"Won": "X"}}})),
            "get_game_history" => Ok(json!([{"move": 1}])),
            _ => Ok(Value::Null),
        }));
        assert!(client.get_turn().unwrap().is_agent_turn);
        let snapshot = client.view_game_state().unwrap();
        assert_eq!(snapshot.agent_marker, Some(Marker::X));
        assert_eq!(snapshot.board.count(Marker::O), 1);
        let result = client.make_move(Position::CENTER).unwrap();
        assert_eq!(result.status, Some(GameStatus::Won(Marker::X)));
        client.taunt_player("hello").unwrap();
        client.restart_game().unwrap();
        assert_eq!(client.get_game_history().unwrap(), json!([{"move": 1}]));
        assert_eq!(
            client.transport().methods(),
            vec![
                "get_turn",
                "view_game_state",
                "make_move",
                "taunt_player",
                "restart_game",
                "get_game_history",
            ]
        );
        assert_eq!(client.transport().calls[3].1, json!({"message": "hello"}));
    }

    #[test]
    fn unexpected_result_shape() {
        let mut client = RpcClient::new(FakeServer::new(|_, _| Ok(json!({"isAgentTurn": "yes"}))));
        assert!(matches!(client.get_turn(), Err(CallError::UnexpectedResult(_))));
    }

    #[test]
    fn exchanges_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().to_path_buf()).unwrap();
        let mut client =
            RpcClient::new(FakeServer::new(|_, _| Ok(json!({})))).with_recorder(Some(recorder));
        client.call(Method::GetTurn, Map::new()).unwrap();
        client.view_game_state().unwrap_err();
        let exchanges = client.recorder_mut().unwrap().exchanges();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[1].method, "view_game_state");
    }
}

//! In-memory servers for exercising the client and the control loop.

use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::TransportError;
use crate::transport::Transport;

type Handler = Box<dyn FnMut(&str, &Value) -> Result<Value, (i64, String)>>;

/// Answers each request by passing its method and params to a handler.
///
/// Responses echo the request id. Every request is logged.
pub struct FakeServer {
    handler: Handler,
    pub calls: Vec<(String, Value)>,
    pub ids: Vec<u64>,
}

impl FakeServer {
    pub fn new(
        handler: impl FnMut(&str, &Value) -> Result<Value, (i64, String)> + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Vec::new(),
            ids: Vec::new(),
        }
    }

    pub fn methods(&self) -> Vec<&str> {
        self.calls.iter().map(|(method, _)| method.as_str()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.iter().filter(|(m, _)| m == method).count()
    }
}

impl Transport for FakeServer {
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError> {
        let request: Value = serde_json::from_str(payload).map_err(|err| {
            TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
        let method = request["method"].as_str().unwrap_or_default().to_owned();
        let params = request["params"].clone();
        self.ids.extend(request["id"].as_u64());
        self.calls.push((method.clone(), params.clone()));
        let response = match (self.handler)(&method, &params) {
            Ok(result) => json!({"jsonrpc": "2.0", "id": request["id"], "result": result}),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": code, "message": message},
            }),
        };
        Ok(response.to_string())
    }
}

/// Replies with canned responses in order, regardless of the request.
#[derive(Default)]
pub struct RawServer {
    responses: VecDeque<Result<String, TransportError>>,
    pub sent: Vec<String>,
}

impl RawServer {
    pub fn new<I: IntoIterator<Item = &'static str>>(responses: I) -> Self {
        Self {
            responses: responses.into_iter().map(|r| Ok(String::from(r))).collect(),
            sent: Vec::new(),
        }
    }

    pub fn then_fail(mut self, err: TransportError) -> Self {
        self.responses.push_back(Err(err));
        self
    }

    pub fn then_respond(mut self, line: &str) -> Self {
        self.responses.push_back(Ok(String::from(line)));
        self
    }
}

impl Transport for RawServer {
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError> {
        self.sent.push(String::from(payload));
        self.responses
            .pop_front()
            .unwrap_or(Err(TransportError::Closed))
    }

    fn receive_next(&mut self) -> Option<Result<String, TransportError>> {
        self.responses.pop_front()
    }
}

/// A `view_game_state` result.
pub fn state(rows: [[&str; 3]; 3], status: Value) -> Value {
    json!({"board": rows, "status": status})
}

/// A byte stream that produces each line only after its delay has passed.
pub struct DelayedLines {
    lines: VecDeque<(Duration, Value)>,
    current: Vec<u8>,
    pos: usize,
}

impl DelayedLines {
    pub fn new<I: IntoIterator<Item = (Duration, Value)>>(lines: I) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            current: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for DelayedLines {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos == self.current.len() {
            let Some((delay, line)) = self.lines.pop_front() else {
                return Ok(0);
            };
            std::thread::sleep(delay);
            self.current = format!("{}\n", line).into_bytes();
            self.pos = 0;
        }
        let len = buf.len().min(self.current.len() - self.pos);
        buf[..len].copy_from_slice(&self.current[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }
}

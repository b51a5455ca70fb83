use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::shutdown::Shutdown;

/// How often a waiting transport checks for a shutdown request.
const POLL_TICK: Duration = Duration::from_millis(50);

/// Carries one request to the server and brings back one response.
///
/// The channel is released when the transport is dropped.
pub trait Transport {
    /// Writes exactly one message and blocks until exactly one message comes back.
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError>;

    /// Waits for one more message without sending anything.
    ///
    /// Only streaming transports can have a message queued up after a response
    /// that arrived too late; the others return `None`.
    fn receive_next(&mut self) -> Option<Result<String, TransportError>> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError> {
        (**self).send_and_receive(payload)
    }

    fn receive_next(&mut self) -> Option<Result<String, TransportError>> {
        (**self).receive_next()
    }
}

/// Newline-delimited messages over a pair of byte streams.
///
/// Lines are read on a background thread and handed over through a channel,
/// so waiting for a response can be cut short by a deadline or a shutdown request.
pub struct LineTransport<W: Write> {
    writer: W,
    lines: Receiver<std::io::Result<String>>,
    timeout: Option<Duration>,
    shutdown: Shutdown,
}

impl<W: Write> LineTransport<W> {
    pub fn new<R: BufRead + Send + 'static>(
        reader: R,
        writer: W,
        shutdown: Shutdown,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name(String::from("rpc-reader"))
            .spawn(move || read_lines(reader, tx))?;
        Ok(Self {
            writer,
            lines: rx,
            timeout: None,
            shutdown,
        })
    }

    /// Gives up waiting for a response after `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn receive(&mut self) -> Result<String, TransportError> {
        let deadline = self.timeout.map(|timeout| (Instant::now() + timeout, timeout));
        loop {
            if self.shutdown.is_requested() {
                return Err(TransportError::Interrupted);
            }
            let mut wait = POLL_TICK;
            if let Some((deadline, timeout)) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(TransportError::Timeout(timeout));
                }
                wait = wait.min(deadline - now);
            }
            match self.lines.recv_timeout(wait) {
                Ok(Ok(line)) => return Ok(line),
                Ok(Err(err)) => return Err(TransportError::from(err)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }
}

fn read_lines<R: BufRead>(mut reader: R, tx: Sender<std::io::Result<String>>) {
    let mut buf = String::new();
    loop {
        buf.clear(); // because read_line() appends to the buffer
        match reader.read_line(&mut buf) {
            // 0 bytes read means EOF. Dropping the sender tells the other side.
            Ok(0) => break,
            Ok(_) => {
                let line = buf.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(Ok(String::from(line))).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
                break;
            }
        }
    }
}

impl<W: Write> Transport for LineTransport<W> {
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError> {
        if self.shutdown.is_requested() {
            return Err(TransportError::Interrupted);
        }
        self.writer.write_all(payload.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.receive()
    }

    fn receive_next(&mut self) -> Option<Result<String, TransportError>> {
        Some(self.receive())
    }
}

/// Talks JSON-RPC over this process's own stdout (requests) and stdin (responses).
pub fn stdio_transport(
    shutdown: Shutdown,
) -> std::io::Result<LineTransport<std::io::Stdout>> {
    LineTransport::new(BufReader::new(std::io::stdin()), std::io::stdout(), shutdown)
}

/// Spawns the game server and talks to it over its stdin/stdout.
///
/// The server is killed when the transport is dropped.
pub struct ChildProcessTransport {
    lines: LineTransport<ChildStdin>,
    child: Child,
}

impl ChildProcessTransport {
    pub fn spawn(command: &[String], shutdown: Shutdown) -> std::io::Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Empty server command")
        })?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        debug!(pid = child.id(), %program, "Spawned game server");

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "Could not access the server's stdin/stdout",
                ));
            }
        };
        let lines = LineTransport::new(BufReader::new(stdout), stdin, shutdown)?;
        Ok(Self { lines, child })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lines.set_timeout(timeout);
        self
    }
}

impl Transport for ChildProcessTransport {
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError> {
        self.lines.send_and_receive(payload)
    }

    fn receive_next(&mut self) -> Option<Result<String, TransportError>> {
        self.lines.receive_next()
    }
}

impl Drop for ChildProcessTransport {
    fn drop(&mut self) {
        if let Err(err) = self.child.kill() {
            // Already exited, most likely
            debug!(%err, "Could not kill the game server");
        }
        match self.child.wait() {
            Ok(status) => debug!(%status, "Game server exited"),
            Err(err) => warn!(%err, "Could not reap the game server"),
        }
    }
}

/// POSTs each request to an HTTP endpoint; the response body is the response.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self {
            client,
            url: String::from(url),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Http(err),
        }
    }
}

impl Transport for HttpTransport {
    fn send_and_receive(&mut self, payload: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(String::from(payload))
            .send()
            .map_err(|err| self.classify(err))?;
        let status = response.status();
        let body = response.text().map_err(|err| self.classify(err))?;
        let body = body.trim();
        // JSON-RPC servers may send error envelopes with a failure status.
        if !status.is_success() && !body.starts_with('{') {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body: String::from(body),
            });
        }
        if body.is_empty() {
            return Err(TransportError::Closed);
        }
        Ok(String::from(body))
    }
}

//! Loopback HTTP endpoint for reading and changing the minimum level
//!
//! Protocol:
//! - `GET` answers `200 {"level":"info"}`
//! - `PUT` with `{"level":"debug"}`, `level=debug` or a bare `debug` body sets
//!   the gate and answers with the new level
//! - an unknown level answers `400 {"error":"..."}`, other methods `405`
//!
//! The endpoint starts at most once per [`LevelServer`]. A failed bind is
//! logged through the pipeline and leaves the process without runtime level
//! control; it is never returned to the caller.

use crate::core::{AtomicLevel, Field, LogLevel, Logger, LoggerError, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

const MAX_BODY_BYTES: usize = 4 * 1024;
const MAX_HEADER_LINES: usize = 64;
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Lifecycle of a [`LevelServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    Starting,
    Running(SocketAddr),
    /// Bind failed; the endpoint stays absent
    Failed,
}

/// One-shot latch owning the level endpoint
#[derive(Debug)]
pub struct LevelServer {
    state: Mutex<ServerState>,
}

static GLOBAL: Lazy<LevelServer> = Lazy::new(LevelServer::new);

impl LevelServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState::NotStarted),
        }
    }

    /// Process-wide latch used by [`LoggerConfig::build`](crate::config::LoggerConfig::build)
    pub fn global() -> &'static LevelServer {
        &GLOBAL
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    /// Address the endpoint listens on, once running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.state() {
            ServerState::Running(addr) => Some(addr),
            _ => None,
        }
    }

    /// Bind `127.0.0.1:port` and serve `gate` from a background thread
    ///
    /// Only the first call does anything; later calls return the current
    /// state untouched, whatever port they ask for.
    pub fn start(&self, port: u16, gate: AtomicLevel, logger: &Logger) -> ServerState {
        {
            let mut state = self.state.lock();
            if *state != ServerState::NotStarted {
                return *state;
            }
            *state = ServerState::Starting;
        }

        let outcome = bind(port).and_then(|listener| {
            let addr = listener
                .local_addr()
                .unwrap_or_else(|_| SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
            let server_logger = logger.clone();
            thread::Builder::new()
                .name("log-level-server".to_string())
                .spawn(move || serve(listener, gate, server_logger))
                .map_err(|e| {
                    LoggerError::control_server(addr.to_string(), format!("cannot spawn thread: {}", e))
                })?;
            Ok(addr)
        });

        let next = match outcome {
            Ok(addr) => {
                logger.info(format!("log server init success, port:{}", port));
                ServerState::Running(addr)
            }
            Err(e) => {
                logger.error_with(
                    "init log server start failed",
                    [Field::new("error", e.to_string())],
                );
                ServerState::Failed
            }
        };

        *self.state.lock() = next;
        next
    }
}

impl Default for LevelServer {
    fn default() -> Self {
        Self::new()
    }
}

fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpListener::bind(addr).map_err(|e| LoggerError::control_server(addr.to_string(), e.to_string()))
}

fn serve(listener: TcpListener, gate: AtomicLevel, logger: Logger) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(e) = handle_connection(stream, &gate, &logger) {
                    eprintln!("[LOGGER WARNING] Level server request failed: {}", e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("[LOGGER WARNING] Level server accept failed: {}", e);
            }
        }
    }
}

/// Status and JSON body returned by the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelResponse {
    pub status: u16,
    pub body: String,
}

impl LevelResponse {
    fn level(level: LogLevel) -> Self {
        Self {
            status: 200,
            body: json!({ "level": level.as_str() }).to_string(),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }).to_string(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            _ => "Internal Server Error",
        }
    }
}

#[derive(Deserialize)]
struct LevelPayload {
    level: String,
}

/// Level named by a `PUT` body, in JSON, form or plain-text encoding
fn requested_level(content_type: Option<&str>, body: &str) -> Result<LogLevel> {
    let body = body.trim();
    let is_form = content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false);

    if is_form || body.starts_with("level=") {
        let value = body
            .split('&')
            .find_map(|pair| pair.strip_prefix("level="))
            .ok_or_else(|| LoggerError::invalid_level(body))?;
        return value.parse();
    }
    if body.starts_with('{') {
        let payload: LevelPayload = serde_json::from_str(body)?;
        return payload.level.parse();
    }
    body.parse()
}

/// Answer one request against `gate`
pub fn respond(method: &str, content_type: Option<&str>, body: &str, gate: &AtomicLevel) -> LevelResponse {
    match method {
        "GET" => LevelResponse::level(gate.level()),
        "PUT" => match requested_level(content_type, body) {
            Ok(level) => {
                gate.set_level(level);
                LevelResponse::level(level)
            }
            Err(e) => LevelResponse::error(400, e.to_string()),
        },
        _ => LevelResponse::error(405, "Only GET and PUT are supported."),
    }
}

fn handle_connection(stream: TcpStream, gate: &AtomicLevel, logger: &Logger) -> io::Result<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let method = request_line.split_whitespace().next().unwrap_or("").to_string();

    let mut content_length = Ok(0usize);
    let mut content_type = None;
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse::<usize>();
            } else if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_string());
            }
        }
    }

    let response = match content_length {
        Err(_) => LevelResponse::error(400, "invalid content-length"),
        Ok(length) if length > MAX_BODY_BYTES => {
            LevelResponse::error(413, "request body too large")
        }
        Ok(length) => {
            let mut body = vec![0u8; length];
            reader.read_exact(&mut body)?;
            let body = String::from_utf8_lossy(&body);

            let before = gate.level();
            let response = respond(&method, content_type.as_deref(), &body, gate);
            let after = gate.level();
            if method == "PUT" && response.status == 200 {
                logger.info_with(
                    "log level changed",
                    [
                        Field::new("from", before.as_str()),
                        Field::new("to", after.as_str()),
                    ],
                );
            }
            response
        }
    };

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.reason(),
        response.body.len(),
        response.body
    )?;
    stream.flush()
}

//! Command client
//!
//! Blocking request/response client for the command channel. `send` never
//! returns `Err` for protocol-level outcomes: whatever happens on the wire
//! is reported as a [`Response`], so callers handle exactly one shape.
//!
//! Failure handling distinguishes two cases:
//!
//! - **Timeout**: the server may still answer; the response is an error
//!   (`"Command timed out"`) but the connection is kept.
//! - **Any other socket error**: the connection is marked
//!   [`ConnectionState::Disconnected`] and must be re-established before
//!   further sends succeed (a later `send` reconnects inline).

use crate::command::codec::{Response, decode_response, encode_request};
use crate::command::protocol::Command;
use crate::config::CommandConfig;
use crate::error::{Error, Result};
use crate::net::{self, ConnectionState};
use crate::robot::ArmJoint;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// First delay of the transient-send retry schedule; doubles per retry
const SEND_RETRY_BASE: Duration = Duration::from_millis(100);

/// Client for the newline-delimited command protocol
pub struct CommandClient {
    addr: String,
    config: CommandConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
    /// Bytes received past the last consumed response line
    recv_buffer: Vec<u8>,
}

impl CommandClient {
    /// Create a client for `addr` (`host:port`); no I/O happens here
    pub fn new(addr: impl Into<String>, config: CommandConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            stream: None,
            state: ConnectionState::Disconnected,
            recv_buffer: Vec::new(),
        }
    }

    /// Open the command connection
    ///
    /// The response timeout also bounds the connect attempt.
    pub fn connect(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;
        match net::connect(&self.addr, self.config.response_timeout()) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.recv_buffer.clear();
                self.state = ConnectionState::Connected;
                log::info!("✓ Command channel connected to {}", self.addr);
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection; safe to call repeatedly
    pub fn close(&mut self) {
        net::close_stream(&mut self.stream);
        self.recv_buffer.clear();
        self.state = ConnectionState::Disconnected;
    }

    /// Send one command line and wait for its response
    pub fn send(&mut self, name: &str, args: &[String]) -> Response {
        let line = match encode_request(name, args) {
            Ok(line) => line,
            Err(e) => return Response::error(e.to_string()),
        };

        if self.stream.is_none()
            && let Err(e) = self.connect()
        {
            log::warn!("Command connect to {} failed: {}", self.addr, e);
            return Response::error(format!("Connection failed: {}", e));
        }

        if let Err(e) = self.write_line(&line) {
            log::warn!("Command send failed: {}", e);
            self.close();
            return Response::error(format!("Send failed: {}", e));
        }

        match self.read_response_line() {
            Ok(response_line) => decode_response(&response_line),
            Err(Error::Timeout) => Response::error("Command timed out"),
            Err(e) => {
                log::warn!("Command receive failed: {}", e);
                self.close();
                Response::error(format!("Receive failed: {}", e))
            }
        }
    }

    /// Send a typed command
    pub fn send_command(&mut self, command: &Command) -> Response {
        self.send(command.name(), &command.wire_args())
    }

    /// Write the whole line, retrying transient errors with doubling delays
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut delay = SEND_RETRY_BASE;
        let mut attempt = 0u32;
        loop {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            match stream.write_all(line.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(e) if is_transient(&e) && attempt < self.config.send_retries => {
                    attempt += 1;
                    log::debug!(
                        "Transient send error: {} (retry {}/{} in {:?})",
                        e,
                        attempt,
                        self.config.send_retries,
                        delay
                    );
                    std::thread::sleep(delay);
                    delay *= 2;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Collect one newline-terminated response line
    fn read_response_line(&mut self) -> Result<String> {
        let mut chunk = [0u8; 1024];
        loop {
            if let Some(pos) = self.recv_buffer.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = self.recv_buffer.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line_bytes).into_owned());
            }

            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            match stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed",
                    )));
                }
                Ok(n) => self.recv_buffer.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(Error::Timeout);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // Typed command surface

    pub fn move_forward(&mut self, speed: u8) -> Response {
        self.send_command(&Command::MoveForward { speed })
    }

    pub fn move_backward(&mut self, speed: u8) -> Response {
        self.send_command(&Command::MoveBackward { speed })
    }

    pub fn turn_left(&mut self, speed: u8) -> Response {
        self.send_command(&Command::TurnLeft { speed })
    }

    pub fn turn_right(&mut self, speed: u8) -> Response {
        self.send_command(&Command::TurnRight { speed })
    }

    pub fn stop(&mut self) -> Response {
        self.send_command(&Command::Stop)
    }

    pub fn set_servo(&mut self, channel: u8, angle: u8) -> Response {
        self.send_command(&Command::SetServo { channel, angle })
    }

    pub fn set_led(&mut self, led: u8, on: bool) -> Response {
        self.send_command(&Command::SetLed { led, on })
    }

    pub fn set_led_color(&mut self, led: u8, r: u8, g: u8, b: u8) -> Response {
        self.send_command(&Command::SetLedColor { led, r, g, b })
    }

    pub fn set_arm_position(&mut self, joint: ArmJoint, angle: u8) -> Response {
        self.send_command(&Command::SetArmPosition { joint, angle })
    }

    pub fn set_camera_tilt(&mut self, angle: u8) -> Response {
        self.send_command(&Command::SetCameraTilt { angle })
    }

    /// Request a range reading, parsed out of the response `data`
    pub fn get_distance(&mut self) -> Result<f64> {
        let response = self.send_command(&Command::GetDistance);
        if !response.is_success() {
            let reason = response
                .message
                .unwrap_or_else(|| "Distance request failed".to_string());
            return Err(Error::Protocol(reason));
        }
        match response.data {
            Some(serde_json::Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| Error::Protocol("Non-numeric distance".to_string())),
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| Error::Protocol(format!("Non-numeric distance: {}", s))),
            _ => Err(Error::Protocol("Distance response carried no data".to_string())),
        }
    }
}

impl Drop for CommandClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

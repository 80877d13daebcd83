//! Connection lifecycle shared by the video and command channels
//!
//! Both channels follow the same pattern: dial with a bounded connect
//! timeout, keep-alive probing on the established socket, bounded linear
//! backoff between reconnect attempts, and an idempotent close that never
//! fails loudly.
//!
//! Keep-alive matters here because the peer is a battery-powered robot: a
//! power loss produces no FIN, and without probing a blocked read would hang
//! until the kernel gives up on its own schedule. With idle 30s / interval
//! 10s / 3 probes a dead peer is detected within about a minute.

use crate::error::{Error, Result};
use socket2::{Domain, Socket, TcpKeepalive, Type};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Keep-alive idle time before the first probe
const KEEPALIVE_IDLE: Duration = Duration::from_secs(30);

/// Interval between keep-alive probes
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Unanswered probes before the connection is declared dead
const KEEPALIVE_RETRIES: u32 = 3;

/// Lifecycle of one TCP link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket held
    #[default]
    Disconnected,
    /// Dial in progress
    Connecting,
    /// Socket established and usable
    Connected,
    /// Lost the socket, retrying
    Reconnecting,
    /// Retries exhausted; terminal until an explicit reconnect request
    Failed,
}

impl ConnectionState {
    /// True while the link holds a usable socket
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Resolve a `host:port` string to one socket address
fn resolve_addr(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::Other(format!("Address resolved to nothing: {}", addr)))
}

/// Open a TCP connection with a bounded connect timeout and keep-alive probing
///
/// `std::net` cannot express keep-alive idle/interval/count, so the socket is
/// built through `socket2` and converted once configured. No retry happens
/// here; callers wrap this in [`retry_with_backoff`] when they want one.
pub fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let address = resolve_addr(addr)?;

    let socket = Socket::new(Domain::for_address(address), Type::STREAM, None)?;
    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_IDLE)
        .with_interval(KEEPALIVE_INTERVAL)
        .with_retries(KEEPALIVE_RETRIES);
    socket.set_tcp_keepalive(&keepalive)?;

    socket.connect_timeout(&address.into(), timeout)?;

    let stream: TcpStream = socket.into();
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    Ok(stream)
}

/// Linear backoff schedule: `base * attempt_number`, capped at `max_attempts`
///
/// Attempt numbers are 1-based, so consecutive delays are monotonically
/// non-decreasing. `next_delay` returns `None` once `max_attempts` is reached.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    /// Create a schedule with the given base delay and attempt cap
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` when attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.base * self.attempt)
    }

    /// Attempts consumed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start the schedule over (after a successful connect)
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Call `op` until it succeeds, sleeping the backoff delay between failures
///
/// Returns the last error once `max_attempts` attempts have all failed.
pub fn retry_with_backoff<T, F>(
    label: &str,
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut backoff = Backoff::new(base_delay, max_attempts);
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => match backoff.next_delay() {
                Some(delay) => {
                    log::warn!(
                        "{}: attempt {}/{} failed: {} (retrying in {:?})",
                        label,
                        backoff.attempt(),
                        max_attempts,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                }
                None => {
                    log::error!("{}: giving up after {} attempts: {}", label, max_attempts, e);
                    return Err(e);
                }
            },
        }
    }
}

/// Close a held stream, swallowing errors
///
/// Safe on an already-closed or never-opened slot. Shutdown must be total
/// even when the kernel reports the socket already gone.
pub fn close_stream(stream: &mut Option<TcpStream>) {
    if let Some(s) = stream.take()
        && let Err(e) = s.shutdown(std::net::Shutdown::Both)
    {
        log::debug!("Socket close reported: {}", e);
    }
}

//! Command server: accept loop and per-connection sessions
//!
//! One listener thread accepts connections; every accepted connection gets
//! its own session thread. Sessions are independent: each reads lines off
//! its socket, runs them through the dispatcher, and writes exactly one
//! response line per request line, in request order. A failed or closed
//! session never affects the others.
//!
//! All sessions share one robot behind a mutex, so concurrent clients are
//! serialized at the handler boundary and the hardware only ever sees one
//! mutation at a time.

use crate::command::codec::encode_response;
use crate::command::dispatch;
use crate::config::CommandConfig;
use crate::error::{Error, Result};
use crate::robot::Robot;
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Longest request line a session will buffer before giving up on the peer
const MAX_LINE_LEN: usize = 64 * 1024;

/// Listening command server
pub struct CommandServer {
    running: Arc<AtomicBool>,
    local_addr: SocketAddr,
    listener_thread: Option<JoinHandle<()>>,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl CommandServer {
    /// Bind and start serving
    pub fn start(
        bind_addr: &str,
        config: &CommandConfig,
        robot: Arc<Mutex<Robot>>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)?;
        let local_addr = listener.local_addr()?;
        // Non-blocking accept so the loop can observe the running flag
        listener.set_nonblocking(true)?;

        let running = Arc::new(AtomicBool::new(true));
        let sessions: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));

        let thread = {
            let running = Arc::clone(&running);
            let sessions = Arc::clone(&sessions);
            let config = config.clone();
            std::thread::Builder::new()
                .name("cmd-listener".to_string())
                .spawn(move || accept_loop(listener, robot, config, running, sessions))
                .map_err(|e| Error::Other(format!("Failed to spawn command listener: {}", e)))?
        };

        log::info!("✓ Command server listening on {}", local_addr);
        Ok(CommandServer {
            running,
            local_addr,
            listener_thread: Some(thread),
            sessions,
        })
    }

    /// Address the server is bound to
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, then wait for every session to wind down
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }
        log::info!("Stopping command server");

        if let Some(handle) = self.listener_thread.take()
            && handle.join().is_err()
        {
            log::error!("Command listener thread panicked");
        }

        let handles: Vec<JoinHandle<()>> = self.sessions.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Command session thread panicked");
            }
        }
        log::info!("✓ Command server stopped");
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    robot: Arc<Mutex<Robot>>,
    config: CommandConfig,
    running: Arc<AtomicBool>,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    let mut session_id = 0usize;

    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                session_id += 1;
                log::info!("Command connection {} from {}", session_id, peer);

                let robot = Arc::clone(&robot);
                let running = Arc::clone(&running);
                let config = config.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("cmd-session-{}", session_id))
                    .spawn(move || {
                        if let Err(e) = serve_session(stream, &robot, &config, &running) {
                            log::warn!("Command session {} ended: {}", peer, e);
                        }
                    });
                match spawned {
                    Ok(handle) => sessions.lock().push(handle),
                    Err(e) => log::error!("Failed to spawn command session: {}", e),
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                log::error!("Accept failed: {}", e);
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }
    log::info!("Command listener stopped");
}

/// Serve one connection until the peer closes, an error occurs, or the
/// server shuts down
fn serve_session(
    mut stream: TcpStream,
    robot: &Arc<Mutex<Robot>>,
    config: &CommandConfig,
    running: &AtomicBool,
) -> Result<()> {
    let peer = stream.peer_addr()?;
    // Bounded reads so shutdown is observed even on an idle connection
    stream.set_read_timeout(Some(config.session_read_timeout()))?;

    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];

    while running.load(Ordering::Relaxed) {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                log::info!("Command connection {} closed by peer", peer);
                return Ok(());
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => return Err(e.into()),
        };
        buffer.extend_from_slice(&chunk[..n]);

        // Extract every complete line; a trailing partial line stays
        // buffered for the next read
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let response = dispatch::handle_line(robot, &line);
            stream.write_all(encode_response(&response)?.as_bytes())?;
        }

        if buffer.len() > MAX_LINE_LEN {
            return Err(Error::Framing(format!(
                "Command line from {} exceeds {} bytes",
                peer, MAX_LINE_LEN
            )));
        }
    }
    Ok(())
}

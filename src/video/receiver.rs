//! Video frame transport
//!
//! Receives the camera stream from the robot and publishes the most recent
//! decoded frame for consumers.
//!
//! # Wire Format
//!
//! Frames are length-prefixed JPEG payloads:
//!
//! ```text
//! ┌──────────────────┬─────────────────────┐
//! │ Length (4 bytes) │ JPEG payload        │
//! │ Little-endian u32│ (variable size)     │
//! └──────────────────┴─────────────────────┘
//! ```
//!
//! # Receive Loop
//!
//! ```text
//! 1. Read the 4-byte length prefix
//! 2. Read exactly that many payload bytes in ≤ chunk-size reads
//! 3. Validate the payload (JPEG markers, padding tolerated)
//! 4. Decode and publish as the latest frame (latest-wins, no queue)
//! ```
//!
//! # Failure Policy
//!
//! - **Malformed payload**: dropped silently, streaming continues. Corrupt
//!   frames are expected on a lossy camera pipeline and are never fatal.
//! - **I/O or framing error**: the socket is closed and the connection is
//!   re-established with linear backoff. After the configured number of
//!   consecutive failed attempts the receiver stops for good.
//! - **Oversized declared length**: treated as a desynchronized stream and
//!   handled like any other framing error.

use crate::config::VideoConfig;
use crate::error::{Error, Result};
use crate::net::{self, Backoff, ConnectionState};
use crate::video::frame::is_valid_frame;
use image::RgbImage;
use parking_lot::Mutex;
use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

/// One decoded video frame
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Decoded pixels
    pub image: RgbImage,
    /// Monotonic frame counter, starting at 1 for the first published frame
    pub seq: u64,
    /// When the payload finished arriving
    pub received_at: Instant,
}

#[derive(Default)]
struct FrameShared {
    latest: Mutex<Option<DecodedFrame>>,
    state: Mutex<ConnectionState>,
    frames: AtomicU64,
    dropped: AtomicU64,
    bytes: AtomicU64,
}

/// Consumer-side view of the video channel
///
/// Cloneable; all clones observe the same latest-frame slot and counters.
#[derive(Clone, Default)]
pub struct FrameHandle {
    shared: Arc<FrameShared>,
}

impl FrameHandle {
    /// Take the latest frame, leaving the slot empty
    ///
    /// Returns `None` when no frame arrived since the last take.
    pub fn take(&self) -> Option<DecodedFrame> {
        self.shared.latest.lock().take()
    }

    /// Clone the latest frame without consuming it
    pub fn peek(&self) -> Option<DecodedFrame> {
        self.shared.latest.lock().clone()
    }

    /// Current lifecycle state of the video connection
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Frames decoded and published so far
    pub fn frames_received(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    /// Payloads discarded (failed validation or decode)
    pub fn frames_dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Payload bytes consumed off the wire
    pub fn bytes_received(&self) -> u64 {
        self.shared.bytes.load(Ordering::Relaxed)
    }

    fn publish(&self, frame: DecodedFrame) {
        // Latest-wins: replace whatever the consumer has not collected yet.
        // The lock covers only the assignment, never any I/O.
        *self.shared.latest.lock() = Some(frame);
        self.shared.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn set_state(&self, state: ConnectionState) {
        *self.shared.state.lock() = state;
    }
}

/// Blocking receiver for the video channel
pub struct VideoReceiver {
    addr: String,
    config: VideoConfig,
    handle: FrameHandle,
    running: Arc<AtomicBool>,
    /// Clone of the live socket so `stop()` can unblock a pending read
    shutdown_slot: Arc<Mutex<Option<TcpStream>>>,
    stream: Option<TcpStream>,
    /// Reusable payload buffer (avoids one allocation per frame)
    read_buffer: Vec<u8>,
    seq: u64,
}

/// Running video receiver thread
pub struct VideoThread {
    handle: FrameHandle,
    running: Arc<AtomicBool>,
    shutdown_slot: Arc<Mutex<Option<TcpStream>>>,
    thread: JoinHandle<()>,
}

impl VideoThread {
    /// Consumer view of the stream
    pub fn frames(&self) -> FrameHandle {
        self.handle.clone()
    }

    /// Stop the receiver and wait for the thread to exit
    ///
    /// Closes the live socket out-of-band so a blocking read returns
    /// immediately instead of waiting out its timeout.
    pub fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(stream) = self.shutdown_slot.lock().as_ref() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        if self.thread.join().is_err() {
            log::error!("Video receiver thread panicked");
        }
    }
}

impl VideoReceiver {
    /// Create a receiver for `addr` (`host:port`)
    pub fn new(addr: impl Into<String>, config: VideoConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            handle: FrameHandle::default(),
            running: Arc::new(AtomicBool::new(true)),
            shutdown_slot: Arc::new(Mutex::new(None)),
            stream: None,
            read_buffer: Vec::new(),
            seq: 0,
        }
    }

    /// Spawn the receive loop on a dedicated thread
    pub fn spawn(addr: impl Into<String>, config: VideoConfig) -> Result<VideoThread> {
        let mut receiver = Self::new(addr, config);
        let handle = receiver.handle();
        let running = Arc::clone(&receiver.running);
        let shutdown_slot = Arc::clone(&receiver.shutdown_slot);

        let thread = std::thread::Builder::new()
            .name("video-receiver".to_string())
            .spawn(move || receiver.run())
            .map_err(|e| Error::Other(format!("Failed to spawn video receiver: {}", e)))?;

        Ok(VideoThread {
            handle,
            running,
            shutdown_slot,
            thread,
        })
    }

    /// Consumer view of the stream
    pub fn handle(&self) -> FrameHandle {
        self.handle.clone()
    }

    /// Open the video connection (single attempt, no retry)
    fn connect(&mut self) -> Result<()> {
        let stream = net::connect(&self.addr, self.config.connect_timeout())?;
        *self.shutdown_slot.lock() = Some(stream.try_clone()?);
        self.stream = Some(stream);
        self.handle.set_state(ConnectionState::Connected);
        log::info!("✓ Video stream connected to {}", self.addr);
        Ok(())
    }

    fn disconnect(&mut self) {
        net::close_stream(&mut self.stream);
        self.shutdown_slot.lock().take();
    }

    /// Run the receive loop until stopped or retries are exhausted
    ///
    /// Never panics and never propagates an error; terminal outcomes are
    /// visible through [`FrameHandle::state`].
    pub fn run(&mut self) {
        log::info!("Video receiver started for {}", self.addr);
        let mut backoff = Backoff::new(
            self.config.reconnect_base_delay(),
            self.config.max_reconnect_attempts,
        );
        let mut first_connect = true;

        while self.running.load(Ordering::Relaxed) {
            if self.stream.is_none() {
                self.handle.set_state(if first_connect {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Reconnecting
                });

                match self.connect() {
                    Ok(()) => {
                        first_connect = false;
                        backoff.reset();
                    }
                    Err(e) => match backoff.next_delay() {
                        Some(delay) => {
                            log::warn!(
                                "Video connect to {} failed: {} (attempt {}/{}, retrying in {:?})",
                                self.addr,
                                e,
                                backoff.attempt(),
                                self.config.max_reconnect_attempts,
                                delay
                            );
                            std::thread::sleep(delay);
                            continue;
                        }
                        None => {
                            log::error!(
                                "Video connect to {} failed: {} (max reconnection attempts reached)",
                                self.addr,
                                e
                            );
                            self.handle.set_state(ConnectionState::Failed);
                            return;
                        }
                    },
                }
            }

            match self.read_frame() {
                Ok(len) => self.process_payload(len),
                Err(e) => {
                    // Stop-initiated socket shutdown surfaces as a read
                    // error; do not log it as a stream fault.
                    if !self.running.load(Ordering::Relaxed) {
                        break;
                    }
                    log::warn!("Video stream error: {} (reconnecting)", e);
                    self.disconnect();
                    self.handle.set_state(ConnectionState::Reconnecting);
                }
            }
        }

        self.disconnect();
        if self.handle.state() != ConnectionState::Failed {
            self.handle.set_state(ConnectionState::Disconnected);
        }
        log::info!("Video receiver stopped");
    }

    /// Read one length-prefixed payload into the internal buffer
    ///
    /// Returns the payload length. Every failure here (timeout, EOF, short
    /// read, oversized length) is fatal to the current connection.
    fn read_frame(&mut self) -> Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(Error::NotConnected)?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > self.config.max_frame_bytes {
            return Err(Error::Framing(format!("Frame too large: {} bytes", len)));
        }

        self.read_buffer.clear();
        self.read_buffer.resize(len, 0);

        // Accumulate across partial reads, each bounded to the chunk size
        let mut filled = 0;
        while filled < len {
            let want = (len - filled).min(self.config.read_chunk_size);
            match stream.read(&mut self.read_buffer[filled..filled + want]) {
                Ok(0) => {
                    return Err(Error::Framing(format!(
                        "Connection closed mid-frame ({}/{} bytes)",
                        filled, len
                    )));
                }
                Ok(n) => filled += n,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Ok(len)
    }

    /// Validate, decode, and publish one assembled payload
    fn process_payload(&mut self, len: usize) {
        self.handle
            .shared
            .bytes
            .fetch_add(len as u64, Ordering::Relaxed);

        if !is_valid_frame(&self.read_buffer) {
            self.handle.shared.dropped.fetch_add(1, Ordering::Relaxed);
            log::debug!("Dropped invalid frame ({} bytes)", len);
            return;
        }

        match image::load_from_memory(&self.read_buffer) {
            Ok(image) => {
                self.seq += 1;
                self.handle.publish(DecodedFrame {
                    image: image.into_rgb8(),
                    seq: self.seq,
                    received_at: Instant::now(),
                });
                log::trace!("Published frame {} ({} bytes)", self.seq, len);
            }
            Err(e) => {
                self.handle.shared.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Frame decode failed: {}", e);
            }
        }
    }
}

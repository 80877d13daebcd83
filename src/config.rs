//! Configuration for the Sarathi daemon and teleop client
//!
//! Loads configuration from a TOML file. Every field carries a default so a
//! partial file (or no file at all) produces a working configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub video: VideoConfig,
    pub command: CommandConfig,
    pub robot: RobotConfig,
    pub logging: LoggingConfig,
}

/// Network addresses and ports
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the daemon binds to (the teleop client uses it as the host to dial)
    pub bind_address: String,
    /// Command channel port
    pub command_port: u16,
    /// Video channel port
    pub video_port: u16,
}

/// Video frame transport tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoConfig {
    /// TCP connect and per-read timeout in seconds
    pub connect_timeout_secs: u64,
    /// Upper bound on a single payload read
    pub read_chunk_size: usize,
    /// Declared frame lengths above this are treated as a desynchronized stream
    pub max_frame_bytes: usize,
    /// Consecutive failed reconnects before the receiver gives up
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in seconds, scaled linearly by attempt number
    pub reconnect_base_delay_secs: u64,
}

/// Command channel tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// How long the client waits for a response line, in milliseconds
    pub response_timeout_ms: u64,
    /// Transient send errors are retried this many times
    pub send_retries: u32,
    /// Server-side session read timeout in milliseconds (bounds shutdown latency)
    pub session_read_timeout_ms: u64,
}

/// Robot collaborator selection and backend parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Backend name: "sim" or "uart"
    pub backend: String,
    /// Serial port for the uart backend
    pub uart_port: String,
    /// Baud rate for the uart backend
    pub uart_baud: u32,
    /// Base distance reported by the sim range sensor, in centimetres
    pub sim_distance_cm: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use sarathi::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("sarathi.toml")?;
    /// # Ok::<(), sarathi::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration with the simulated robot backend
    ///
    /// Suitable for development and tests. Deployments on the robot should
    /// provide a TOML file selecting the uart backend.
    pub fn sim_defaults() -> Self {
        Self {
            network: NetworkConfig::default(),
            video: VideoConfig::default(),
            command: CommandConfig::default(),
            robot: RobotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Address the command dispatcher binds to
    pub fn command_bind_addr(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.command_port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::sim_defaults()
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            command_port: 5003,
            video_port: 8003,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            read_chunk_size: 4096,
            max_frame_bytes: 8 * 1024 * 1024,
            max_reconnect_attempts: 3,
            reconnect_base_delay_secs: 2,
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 1000,
            send_retries: 2,
            session_read_timeout_ms: 500,
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            backend: "sim".to_string(),
            uart_port: "/dev/ttyS1".to_string(),
            uart_baud: 115_200,
            sim_distance_cm: 100.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl VideoConfig {
    /// Connect/read timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Base reconnect delay as a `Duration`
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_base_delay_secs)
    }
}

impl CommandConfig {
    /// Client response timeout as a `Duration`
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Session read timeout as a `Duration`
    pub fn session_read_timeout(&self) -> Duration {
        Duration::from_millis(self.session_read_timeout_ms)
    }
}

//! Sarathi - Teleoperation transport for a small tracked robot
//!
//! Two independent TCP channels connect an operator station to the robot:
//!
//! - **Video**: the robot streams length-prefixed JPEG frames; the
//!   [`video::VideoReceiver`] decodes them and keeps only the latest.
//! - **Command**: clients send `NAME#arg#arg` lines; the
//!   [`command::CommandServer`] executes them against one shared
//!   [`robot::Robot`] and answers each line with a JSON response.
//!
//! Both channels reconnect with bounded backoff and shut down cleanly on
//! request. The robot side runs hardware through interchangeable backends
//! (simulated or UART), so the whole stack is testable on a desk.

pub mod command;
pub mod config;
pub mod error;
pub mod net;
pub mod robot;
pub mod video;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};

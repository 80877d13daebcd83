//! Command channel: `#`-delimited request lines, JSON response lines

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod protocol;
pub mod server;

pub use client::CommandClient;
pub use codec::{Response, Status, decode_response, encode_request, encode_response, split_request};
pub use protocol::{COMMANDS, Command, CommandSpec, lookup};
pub use server::CommandServer;

//! Video channel: length-prefixed JPEG frames over TCP

pub mod frame;
pub mod receiver;

pub use frame::{is_valid_frame, strip_padding};
pub use receiver::{DecodedFrame, FrameHandle, VideoReceiver, VideoThread};

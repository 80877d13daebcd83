//! End-to-end tests for the video channel.
//!
//! A scripted loopback server plays the robot side of the stream; the
//! real receiver runs on its own thread exactly as it does in production.

use image::{DynamicImage, ImageFormat, RgbImage};
use sarathi::config::VideoConfig;
use sarathi::net::ConnectionState;
use sarathi::video::VideoReceiver;
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::time::{Duration, Instant};

fn test_config() -> VideoConfig {
    VideoConfig {
        connect_timeout_secs: 1,
        read_chunk_size: 4096,
        max_frame_bytes: 1024 * 1024,
        max_reconnect_attempts: 3,
        reconnect_base_delay_secs: 0,
    }
}

fn tiny_jpeg() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, image::Rgb([30, 90, 200])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

fn frame_bytes(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_streaming_session_accounts_every_byte() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let jpeg = tiny_jpeg();
    let payload_len = jpeg.len() as u64;
    let wire = frame_bytes(&jpeg);

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        for _ in 0..5 {
            stream.write_all(&wire).unwrap();
        }
        // Hold the connection until the receiver closes its end
        let mut buf = [0u8; 1];
        let _ = stream.read(&mut buf);
    });

    let video = VideoReceiver::spawn(addr, test_config()).unwrap();
    let frames = video.frames();

    assert!(wait_until(Duration::from_secs(5), || {
        frames.frames_received() >= 5
    }));
    assert_eq!(frames.frames_received(), 5);
    assert_eq!(frames.frames_dropped(), 0);
    assert_eq!(frames.bytes_received(), 5 * payload_len);
    assert_eq!(frames.state(), ConnectionState::Connected);

    let frame = frames.peek().expect("frame available");
    assert_eq!(frame.image.dimensions(), (16, 16));
    // peek leaves the frame in place, take consumes it
    assert!(frames.take().is_some());
    assert!(frames.take().is_none());

    video.stop();
    server.join().unwrap();
    assert_eq!(frames.state(), ConnectionState::Disconnected);
}

#[test]
fn test_frame_counter_survives_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let jpeg = tiny_jpeg();

    let server = std::thread::spawn(move || {
        // First connection: two whole frames, then die mid-payload
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&frame_bytes(&jpeg)).unwrap();
        stream.write_all(&frame_bytes(&jpeg)).unwrap();
        stream
            .write_all(&((jpeg.len() as u32).to_le_bytes()))
            .unwrap();
        stream.write_all(&jpeg[..jpeg.len() / 2]).unwrap();
        drop(stream);

        // Second connection: one more frame, held open until the
        // receiver closes its end
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&frame_bytes(&jpeg)).unwrap();
        let mut buf = [0u8; 1];
        let _ = stream.read(&mut buf);
    });

    let video = VideoReceiver::spawn(addr, test_config()).unwrap();
    let frames = video.frames();

    assert!(wait_until(Duration::from_secs(5), || {
        frames.frames_received() >= 3
    }));

    // The counter is per-receiver, not per-connection
    let frame = frames.take().expect("latest frame present");
    assert_eq!(frame.seq, 3);

    video.stop();
    server.join().unwrap();
}

#[test]
fn test_stop_interrupts_idle_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let jpeg = tiny_jpeg();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&frame_bytes(&jpeg)).unwrap();
        // Idle until the receiver closes its end
        let mut buf = [0u8; 1];
        let _ = stream.read(&mut buf);
    });

    let video = VideoReceiver::spawn(addr, test_config()).unwrap();
    let frames = video.frames();
    assert!(wait_until(Duration::from_secs(5), || {
        frames.frames_received() >= 1
    }));

    // No frame is in flight, so the receiver is parked in a blocking read.
    // stop() must shut the socket down out-of-band rather than wait it out.
    let started = Instant::now();
    video.stop();
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "stop took {:?}",
        started.elapsed()
    );
    assert_eq!(frames.state(), ConnectionState::Disconnected);

    server.join().unwrap();
}

#[test]
fn test_unreachable_stream_ends_in_failed_state() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let video = VideoReceiver::spawn(addr, test_config()).unwrap();
    let frames = video.frames();

    assert!(wait_until(Duration::from_secs(5), || {
        frames.state() == ConnectionState::Failed
    }));
    assert_eq!(frames.frames_received(), 0);

    video.stop();
}

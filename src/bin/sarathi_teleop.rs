//! Sarathi teleop CLI
//!
//! Sends commands to a running `sarathi-server` and prints the response,
//! or watches the video channel and reports stream statistics.
//!
//! # Usage
//!
//! ```bash
//! sarathi-teleop --host 192.168.4.1 drive forward 60
//! sarathi-teleop --host 192.168.4.1 distance
//! sarathi-teleop --host 192.168.4.1 raw SET_SERVO 3 90
//! sarathi-teleop --host 192.168.4.1 watch-video
//! ```

use clap::{Parser, Subcommand};
use sarathi::command::{CommandClient, Response, Status};
use sarathi::config::AppConfig;
use sarathi::error::{Error, Result};
use sarathi::net::ConnectionState;
use sarathi::robot::ArmJoint;
use sarathi::video::VideoReceiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sarathi-teleop")]
#[command(about = "Drive the robot and watch its camera from the command line")]
struct Args {
    /// Robot hostname or IP
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Command channel port (overrides config)
    #[arg(long)]
    command_port: Option<u16>,

    /// Video channel port (overrides config)
    #[arg(long)]
    video_port: Option<u16>,

    /// Config file supplying ports and timeouts
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Drive in a direction (forward, backward, left, right)
    Drive {
        direction: String,
        /// Speed percentage (0-100)
        #[arg(default_value = "50")]
        speed: u8,
    },
    /// Stop both tracks
    Stop,
    /// Set a servo channel to an angle in degrees
    Servo { channel: u8, angle: u8 },
    /// Switch a discrete LED on or off
    Led { id: u8, state: String },
    /// Set an RGB LED color
    LedColor { id: u8, r: u8, g: u8, b: u8 },
    /// Read the ultrasonic range sensor
    Distance,
    /// Position a named arm joint (base, shoulder, elbow)
    Arm { joint: String, angle: u8 },
    /// Tilt the camera mount
    Tilt { angle: u8 },
    /// Send a raw command line: NAME [ARGS...]
    Raw { name: String, args: Vec<String> },
    /// Watch the video stream and print per-second statistics
    WatchVideo,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let command_port = args.command_port.unwrap_or(config.network.command_port);
    let video_port = args.video_port.unwrap_or(config.network.video_port);

    let mut client = CommandClient::new(
        format!("{}:{}", args.host, command_port),
        config.command.clone(),
    );

    let response = match args.command {
        Cmd::WatchVideo => {
            return watch_video(&args.host, video_port, config.video);
        }
        Cmd::Distance => {
            let cm = client.get_distance()?;
            println!("{:.1} cm", cm);
            return Ok(());
        }
        Cmd::Drive { direction, speed } => match direction.as_str() {
            "forward" => client.move_forward(speed),
            "backward" => client.move_backward(speed),
            "left" => client.turn_left(speed),
            "right" => client.turn_right(speed),
            other => {
                return Err(Error::InvalidParameter(format!(
                    "Unknown direction: {} (expected forward, backward, left or right)",
                    other
                )));
            }
        },
        Cmd::Stop => client.stop(),
        Cmd::Servo { channel, angle } => client.set_servo(channel, angle),
        Cmd::Led { id, state } => client.set_led(id, parse_led_state(&state)?),
        Cmd::LedColor { id, r, g, b } => client.set_led_color(id, r, g, b),
        Cmd::Arm { joint, angle } => {
            let joint =
                ArmJoint::from_name(&joint).ok_or_else(|| Error::UnknownJoint(joint.clone()))?;
            client.set_arm_position(joint, angle)
        }
        Cmd::Tilt { angle } => client.set_camera_tilt(angle),
        Cmd::Raw { name, args } => client.send(&name, &args),
    };

    print_response(&response);
    if response.status == Status::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_led_state(state: &str) -> Result<bool> {
    match state {
        "on" | "1" => Ok(true),
        "off" | "0" => Ok(false),
        other => Err(Error::InvalidParameter(format!(
            "LED state must be on or off, got {}",
            other
        ))),
    }
}

fn print_response(response: &Response) {
    match response.status {
        Status::Success => {
            if let Some(message) = &response.message {
                println!("{}", message);
            }
            if let Some(data) = &response.data {
                println!("{}", data);
            }
            if response.message.is_none() && response.data.is_none() {
                println!("ok");
            }
        }
        Status::Error => {
            eprintln!("error: {}", response.message.as_deref().unwrap_or("unknown"));
        }
    }
}

/// Stream frames and print one statistics line per second until Ctrl-C
fn watch_video(host: &str, port: u16, config: sarathi::config::VideoConfig) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    println!("Watching video from {} (Ctrl-C to stop)", addr);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed))
        .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let video = VideoReceiver::spawn(addr, config)?;
    let frames = video.frames();

    let mut last_frames = 0u64;
    let mut last_bytes = 0u64;
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_secs(1));

        let total_frames = frames.frames_received();
        let total_bytes = frames.bytes_received();
        println!(
            "{} | {} fps | {} KiB/s | {} frames total | {} dropped",
            frames.state(),
            total_frames - last_frames,
            (total_bytes - last_bytes) / 1024,
            total_frames,
            frames.frames_dropped()
        );
        last_frames = total_frames;
        last_bytes = total_bytes;

        if frames.state() == ConnectionState::Failed {
            eprintln!("Video stream gave up after repeated reconnect failures");
            break;
        }
    }

    video.stop();
    Ok(())
}

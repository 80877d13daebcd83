//! UART robot backend
//!
//! Talks to the motor controller board over a serial line using short
//! ASCII frames, one per line:
//!
//! | Frame                 | Direction | Meaning                         |
//! |-----------------------|-----------|---------------------------------|
//! | `M <left> <right>\n`  | → board   | track speeds in raw units       |
//! | `S <ch> <deg>\n`      | → board   | servo channel to angle          |
//! | `E <id> <0\|1>\n`     | → board   | LED on/off                      |
//! | `L <id> <r> <g> <b>\n`| → board   | RGB LED color                   |
//! | `D\n`                 | → board   | request a distance reading      |
//! | `D <cm>\n`            | ← board   | distance reply in centimeters   |
//!
//! All set-frames are fire-and-forget. Only the distance query waits for
//! a reply, bounded by the port read timeout.

use crate::config::RobotConfig;
use crate::error::{Error, Result};
use crate::robot::{DRIVE_UNITS_MAX, DriveMotors, LedBank, RangeSensor, Robot, ServoBank};
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

const PORT_TIMEOUT: Duration = Duration::from_millis(500);
const MAX_REPLY_LEN: usize = 64;

fn drive_frame(left: i32, right: i32) -> String {
    format!("M {} {}\n", left, right)
}

fn servo_frame(channel: u8, degrees: u8) -> String {
    format!("S {} {}\n", channel, degrees)
}

fn led_state_frame(id: u8, on: bool) -> String {
    format!("E {} {}\n", id, if on { 1 } else { 0 })
}

fn led_color_frame(id: u8, r: u8, g: u8, b: u8) -> String {
    format!("L {} {} {} {}\n", id, r, g, b)
}

fn parse_distance_reply(reply: &str) -> Result<f32> {
    reply
        .strip_prefix('D')
        .map(str::trim)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("Bad distance reply: {:?}", reply)))
}

/// One open serial connection, shared by all capability impls
struct UartLink {
    port: Box<dyn SerialPort>,
}

impl UartLink {
    fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PORT_TIMEOUT)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud);
        Ok(UartLink { port })
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    /// Send a query and collect one newline-terminated reply
    fn query_line(&mut self, line: &str) -> Result<String> {
        self.send_line(line)?;

        let mut reply = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(Error::Protocol("Serial reply truncated".to_string())),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    reply.push(byte[0]);
                    if reply.len() > MAX_REPLY_LEN {
                        return Err(Error::Protocol("Serial reply too long".to_string()));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Err(Error::Timeout),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(String::from_utf8_lossy(&reply).trim().to_string())
    }
}

struct UartDrive(Arc<Mutex<UartLink>>);

impl DriveMotors for UartDrive {
    fn set_speeds(&mut self, left: i32, right: i32) -> Result<()> {
        let left = left.clamp(-DRIVE_UNITS_MAX, DRIVE_UNITS_MAX);
        let right = right.clamp(-DRIVE_UNITS_MAX, DRIVE_UNITS_MAX);
        self.0.lock().send_line(&drive_frame(left, right))
    }
}

struct UartServos(Arc<Mutex<UartLink>>);

impl ServoBank for UartServos {
    fn set_angle(&mut self, channel: u8, degrees: u8) -> Result<()> {
        self.0.lock().send_line(&servo_frame(channel, degrees))
    }
}

struct UartLeds(Arc<Mutex<UartLink>>);

impl LedBank for UartLeds {
    fn set_state(&mut self, id: u8, on: bool) -> Result<()> {
        self.0.lock().send_line(&led_state_frame(id, on))
    }

    fn set_color(&mut self, id: u8, r: u8, g: u8, b: u8) -> Result<()> {
        self.0.lock().send_line(&led_color_frame(id, r, g, b))
    }
}

struct UartRange(Arc<Mutex<UartLink>>);

impl RangeSensor for UartRange {
    fn distance_cm(&mut self) -> Result<f32> {
        let reply = self.0.lock().query_line("D\n")?;
        parse_distance_reply(&reply)
    }
}

/// Build a UART-backed robot
pub fn build(config: &RobotConfig) -> Result<Robot> {
    let link = Arc::new(Mutex::new(UartLink::open(
        &config.uart_port,
        config.uart_baud,
    )?));

    Ok(Robot::new(
        Box::new(UartDrive(Arc::clone(&link))),
        Box::new(UartServos(Arc::clone(&link))),
        Box::new(UartLeds(Arc::clone(&link))),
        Box::new(UartRange(link)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_formats() {
        assert_eq!(drive_frame(-300, 300), "M -300 300\n");
        assert_eq!(servo_frame(3, 90), "S 3 90\n");
        assert_eq!(led_state_frame(1, true), "E 1 1\n");
        assert_eq!(led_state_frame(1, false), "E 1 0\n");
        assert_eq!(led_color_frame(0, 255, 0, 128), "L 0 255 0 128\n");
    }

    #[test]
    fn test_parse_distance_reply() {
        assert_eq!(parse_distance_reply("D 42.7").unwrap(), 42.7);
        assert_eq!(parse_distance_reply("D 100").unwrap(), 100.0);
    }

    #[test]
    fn test_parse_distance_reply_rejects_malformed() {
        assert!(parse_distance_reply("").is_err());
        assert!(parse_distance_reply("42.7").is_err());
        assert!(parse_distance_reply("D abc").is_err());
        assert!(parse_distance_reply("X 42.7").is_err());
    }
}

//! Command set and parse-time validation
//!
//! Every request line maps to one [`Command`] variant. Parsing is strict:
//! the name must be known, the argument count must match the table below,
//! and each argument must validate. Anything else is rejected with an
//! error response before any hardware is touched.
//!
//! | Command            | Args                     | Validation                  |
//! |--------------------|--------------------------|-----------------------------|
//! | `MOVE_FORWARD`     | speed                    | clamped to 0-100            |
//! | `MOVE_BACKWARD`    | speed                    | clamped to 0-100            |
//! | `TURN_LEFT`        | speed                    | clamped to 0-100            |
//! | `TURN_RIGHT`       | speed                    | clamped to 0-100            |
//! | `STOP`             | (none)                   |                             |
//! | `SET_SERVO`        | channel, angle           | angle rejected outside 0-180|
//! | `SET_LED`          | led, state               | state must be 0 or 1        |
//! | `SET_LED_COLOR`    | led, r, g, b             | components clamped to 0-255 |
//! | `GET_DISTANCE`     | (none)                   |                             |
//! | `SET_ARM_POSITION` | joint, angle             | joint name; angle 0-180     |
//! | `SET_CAMERA_TILT`  | angle                    | angle rejected outside 0-180|
//!
//! Speeds and color components are clamped rather than rejected because a
//! slightly out-of-range value from a joystick mapping is still a usable
//! intent. Angles are rejected because an out-of-range angle can drive a
//! servo against its mechanical stop.

use crate::command::codec::Response;
use crate::robot::ArmJoint;
use std::fmt;

/// Inclusive servo angle range in degrees
pub const ANGLE_RANGE: std::ops::RangeInclusive<i64> = 0..=180;

/// One entry in the command table
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub arity: usize,
}

/// Every command the server understands, with its argument count
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "MOVE_FORWARD", arity: 1 },
    CommandSpec { name: "MOVE_BACKWARD", arity: 1 },
    CommandSpec { name: "TURN_LEFT", arity: 1 },
    CommandSpec { name: "TURN_RIGHT", arity: 1 },
    CommandSpec { name: "STOP", arity: 0 },
    CommandSpec { name: "SET_SERVO", arity: 2 },
    CommandSpec { name: "SET_LED", arity: 2 },
    CommandSpec { name: "SET_LED_COLOR", arity: 4 },
    CommandSpec { name: "GET_DISTANCE", arity: 0 },
    CommandSpec { name: "SET_ARM_POSITION", arity: 2 },
    CommandSpec { name: "SET_CAMERA_TILT", arity: 1 },
];

/// Look up a command by wire name
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// A parsed, validated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveForward { speed: u8 },
    MoveBackward { speed: u8 },
    TurnLeft { speed: u8 },
    TurnRight { speed: u8 },
    Stop,
    SetServo { channel: u8, angle: u8 },
    SetLed { led: u8, on: bool },
    SetLedColor { led: u8, r: u8, g: u8, b: u8 },
    GetDistance,
    SetArmPosition { joint: ArmJoint, angle: u8 },
    SetCameraTilt { angle: u8 },
}

impl Command {
    /// Parse a split request into a command
    ///
    /// On rejection the returned [`Response`] carries the exact error
    /// message sent back over the wire.
    pub fn parse(name: &str, args: &[&str]) -> Result<Command, Response> {
        if name.is_empty() {
            return Err(Response::error("Empty command"));
        }

        let spec = lookup(name)
            .ok_or_else(|| Response::error(format!("Unknown command: {}", name)))?;
        if args.len() != spec.arity {
            return Err(Response::error(format!(
                "{} expects {} arguments",
                spec.name, spec.arity
            )));
        }

        match name {
            "MOVE_FORWARD" => Ok(Command::MoveForward { speed: parse_speed(args[0])? }),
            "MOVE_BACKWARD" => Ok(Command::MoveBackward { speed: parse_speed(args[0])? }),
            "TURN_LEFT" => Ok(Command::TurnLeft { speed: parse_speed(args[0])? }),
            "TURN_RIGHT" => Ok(Command::TurnRight { speed: parse_speed(args[0])? }),
            "STOP" => Ok(Command::Stop),
            "SET_SERVO" => Ok(Command::SetServo {
                channel: parse_index(args[0], "channel")?,
                angle: parse_angle(args[1])?,
            }),
            "SET_LED" => Ok(Command::SetLed {
                led: parse_index(args[0], "LED id")?,
                on: parse_led_state(args[1])?,
            }),
            "SET_LED_COLOR" => Ok(Command::SetLedColor {
                led: parse_index(args[0], "LED id")?,
                r: parse_rgb(args[1])?,
                g: parse_rgb(args[2])?,
                b: parse_rgb(args[3])?,
            }),
            "GET_DISTANCE" => Ok(Command::GetDistance),
            "SET_ARM_POSITION" => Ok(Command::SetArmPosition {
                joint: parse_joint(args[0])?,
                angle: parse_angle(args[1])?,
            }),
            "SET_CAMERA_TILT" => Ok(Command::SetCameraTilt { angle: parse_angle(args[0])? }),
            _ => Err(Response::error(format!("Unknown command: {}", name))),
        }
    }

    /// Wire name of this command
    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveForward { .. } => "MOVE_FORWARD",
            Command::MoveBackward { .. } => "MOVE_BACKWARD",
            Command::TurnLeft { .. } => "TURN_LEFT",
            Command::TurnRight { .. } => "TURN_RIGHT",
            Command::Stop => "STOP",
            Command::SetServo { .. } => "SET_SERVO",
            Command::SetLed { .. } => "SET_LED",
            Command::SetLedColor { .. } => "SET_LED_COLOR",
            Command::GetDistance => "GET_DISTANCE",
            Command::SetArmPosition { .. } => "SET_ARM_POSITION",
            Command::SetCameraTilt { .. } => "SET_CAMERA_TILT",
        }
    }

    /// Arguments in wire order
    pub fn wire_args(&self) -> Vec<String> {
        match self {
            Command::MoveForward { speed }
            | Command::MoveBackward { speed }
            | Command::TurnLeft { speed }
            | Command::TurnRight { speed } => vec![speed.to_string()],
            Command::Stop | Command::GetDistance => Vec::new(),
            Command::SetServo { channel, angle } => {
                vec![channel.to_string(), angle.to_string()]
            }
            Command::SetLed { led, on } => {
                vec![led.to_string(), if *on { "1" } else { "0" }.to_string()]
            }
            Command::SetLedColor { led, r, g, b } => {
                vec![led.to_string(), r.to_string(), g.to_string(), b.to_string()]
            }
            Command::SetArmPosition { joint, angle } => {
                vec![joint.name().to_string(), angle.to_string()]
            }
            Command::SetCameraTilt { angle } => vec![angle.to_string()],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for arg in self.wire_args() {
            write!(f, "#{}", arg)?;
        }
        Ok(())
    }
}

fn parse_speed(arg: &str) -> Result<u8, Response> {
    let value: i64 = arg
        .parse()
        .map_err(|_| Response::error(format!("Invalid speed: {}", arg)))?;
    Ok(value.clamp(0, 100) as u8)
}

fn parse_angle(arg: &str) -> Result<u8, Response> {
    let value: i64 = arg
        .parse()
        .map_err(|_| Response::error(format!("Invalid angle: {}", arg)))?;
    if !ANGLE_RANGE.contains(&value) {
        return Err(Response::error(format!(
            "Invalid angle: {} (must be 0-180)",
            value
        )));
    }
    Ok(value as u8)
}

fn parse_index(arg: &str, what: &str) -> Result<u8, Response> {
    arg.parse()
        .map_err(|_| Response::error(format!("Invalid {}: {}", what, arg)))
}

fn parse_led_state(arg: &str) -> Result<bool, Response> {
    match arg {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(Response::error(format!("Invalid LED state: {}", arg))),
    }
}

fn parse_rgb(arg: &str) -> Result<u8, Response> {
    let value: i64 = arg
        .parse()
        .map_err(|_| Response::error(format!("Invalid RGB value: {}", arg)))?;
    Ok(value.clamp(0, 255) as u8)
}

fn parse_joint(arg: &str) -> Result<ArmJoint, Response> {
    ArmJoint::from_name(arg).ok_or_else(|| Response::error(format!("Unknown joint: {}", arg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::codec::{Status, split_request};

    #[test]
    fn test_parse_stop() {
        assert_eq!(Command::parse("STOP", &[]).unwrap(), Command::Stop);
    }

    #[test]
    fn test_parse_move_forward() {
        let cmd = Command::parse("MOVE_FORWARD", &["50"]).unwrap();
        assert_eq!(cmd, Command::MoveForward { speed: 50 });
    }

    #[test]
    fn test_speed_clamped_high() {
        let cmd = Command::parse("MOVE_FORWARD", &["150"]).unwrap();
        assert_eq!(cmd, Command::MoveForward { speed: 100 });
    }

    #[test]
    fn test_speed_clamped_negative() {
        let cmd = Command::parse("TURN_LEFT", &["-20"]).unwrap();
        assert_eq!(cmd, Command::TurnLeft { speed: 0 });
    }

    #[test]
    fn test_invalid_speed_text() {
        let err = Command::parse("MOVE_FORWARD", &["fast"]).unwrap_err();
        assert_eq!(err.status, Status::Error);
        assert_eq!(err.message.as_deref(), Some("Invalid speed: fast"));
    }

    #[test]
    fn test_unknown_command_message() {
        let err = Command::parse("UNKNOWNCMD", &[]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Unknown command: UNKNOWNCMD"));
    }

    #[test]
    fn test_empty_command() {
        let err = Command::parse("", &[]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Empty command"));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Command::parse("SET_SERVO", &["3"]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("SET_SERVO expects 2 arguments"));

        let err = Command::parse("STOP", &["5"]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("STOP expects 0 arguments"));
    }

    #[test]
    fn test_servo_angle_rejected_out_of_range() {
        let err = Command::parse("SET_SERVO", &["0", "200"]).unwrap_err();
        assert_eq!(
            err.message.as_deref(),
            Some("Invalid angle: 200 (must be 0-180)")
        );
        assert!(Command::parse("SET_CAMERA_TILT", &["-5"]).is_err());
        assert!(Command::parse("SET_ARM_POSITION", &["base", "181"]).is_err());
    }

    #[test]
    fn test_servo_angle_boundaries_accepted() {
        assert_eq!(
            Command::parse("SET_SERVO", &["3", "0"]).unwrap(),
            Command::SetServo { channel: 3, angle: 0 }
        );
        assert_eq!(
            Command::parse("SET_SERVO", &["3", "180"]).unwrap(),
            Command::SetServo { channel: 3, angle: 180 }
        );
    }

    #[test]
    fn test_led_state_strict() {
        assert_eq!(
            Command::parse("SET_LED", &["1", "1"]).unwrap(),
            Command::SetLed { led: 1, on: true }
        );
        let err = Command::parse("SET_LED", &["1", "2"]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Invalid LED state: 2"));
    }

    #[test]
    fn test_rgb_components_clamped() {
        let cmd = Command::parse("SET_LED_COLOR", &["0", "300", "-5", "128"]).unwrap();
        assert_eq!(cmd, Command::SetLedColor { led: 0, r: 255, g: 0, b: 128 });
    }

    #[test]
    fn test_arm_joint_names() {
        let cmd = Command::parse("SET_ARM_POSITION", &["Shoulder", "45"]).unwrap();
        assert_eq!(
            cmd,
            Command::SetArmPosition { joint: ArmJoint::Shoulder, angle: 45 }
        );
        let err = Command::parse("SET_ARM_POSITION", &["wrist", "45"]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Unknown joint: wrist"));
    }

    #[test]
    fn test_wire_round_trip() {
        let original = Command::SetLedColor { led: 2, r: 255, g: 0, b: 128 };
        let line = crate::command::codec::encode_request(original.name(), &original.wire_args())
            .unwrap();
        let (name, args) = split_request(&line);
        assert_eq!(Command::parse(name, &args).unwrap(), original);
    }

    #[test]
    fn test_display_matches_wire_form() {
        let cmd = Command::SetServo { channel: 3, angle: 90 };
        assert_eq!(cmd.to_string(), "SET_SERVO#3#90");
        assert_eq!(Command::Stop.to_string(), "STOP");
    }

    #[test]
    fn test_table_covers_every_variant() {
        for spec in COMMANDS {
            assert!(lookup(spec.name).is_some());
        }
        assert!(lookup("MOVE_FORWARD").is_some());
        assert!(lookup("move_forward").is_none());
    }
}

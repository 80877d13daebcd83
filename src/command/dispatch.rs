//! Command execution against the shared robot
//!
//! One request line in, one [`Response`] out, unconditionally. Parse
//! rejections never reach the robot; handler failures are caught here and
//! converted into error responses so a bad command cannot end a session.
//! The robot mutex is held only while a handler runs, never during socket
//! I/O.

use crate::command::codec::{Response, split_request};
use crate::command::protocol::Command;
use crate::error::Result;
use crate::robot::Robot;
use parking_lot::Mutex;
use std::sync::Arc;

/// Parse and execute one raw request line
pub fn handle_line(robot: &Arc<Mutex<Robot>>, line: &str) -> Response {
    let (name, args) = split_request(line);
    match Command::parse(name, &args) {
        Ok(command) => {
            log::debug!("Executing {}", command);
            let mut robot = robot.lock();
            execute(&mut robot, &command)
        }
        Err(response) => {
            log::debug!("Rejected {:?}: {:?}", line.trim(), response.message);
            response
        }
    }
}

/// Execute one parsed command, always yielding a response
pub fn execute(robot: &mut Robot, command: &Command) -> Response {
    match try_execute(robot, command) {
        Ok(response) => response,
        Err(e) => Response::error(format!("Error executing {}: {}", command.name(), e)),
    }
}

fn try_execute(robot: &mut Robot, command: &Command) -> Result<Response> {
    let response = match command {
        Command::MoveForward { speed } => {
            robot.move_forward(*speed)?;
            Response::success(format!("Moving forward at {}%", speed))
        }
        Command::MoveBackward { speed } => {
            robot.move_backward(*speed)?;
            Response::success(format!("Moving backward at {}%", speed))
        }
        Command::TurnLeft { speed } => {
            robot.turn_left(*speed)?;
            Response::success(format!("Turning left at {}%", speed))
        }
        Command::TurnRight { speed } => {
            robot.turn_right(*speed)?;
            Response::success(format!("Turning right at {}%", speed))
        }
        Command::Stop => {
            robot.stop()?;
            Response::success("Stopped")
        }
        Command::SetServo { channel, angle } => {
            robot.set_servo(*channel, *angle)?;
            Response::success(format!("Set servo {} to {}°", channel, angle))
        }
        Command::SetLed { led, on } => {
            robot.set_led(*led, *on)?;
            let state = if *on { "on" } else { "off" };
            Response::success(format!("Set LED {} to {}", led, state))
        }
        Command::SetLedColor { led, r, g, b } => {
            robot.set_led_color(*led, *r, *g, *b)?;
            Response::success(format!("Set LED {} to RGB({}, {}, {})", led, r, g, b))
        }
        Command::GetDistance => {
            let cm = robot.distance_cm()?;
            // One decimal on the wire, like the sensor itself reports
            let rounded = (f64::from(cm) * 10.0).round() / 10.0;
            Response::success_data(serde_json::json!(rounded))
        }
        Command::SetArmPosition { joint, angle } => {
            robot.set_arm_joint(*joint, *angle)?;
            Response::success(format!("Set {} to {}°", joint.name(), angle))
        }
        Command::SetCameraTilt { angle } => {
            robot.set_camera_tilt(*angle)?;
            Response::success(format!("Set camera tilt to {}°", angle))
        }
    };
    Ok(response)
}

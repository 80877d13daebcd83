//! Robot hardware abstraction
//!
//! Command handlers never talk to hardware directly. They go through the
//! [`Robot`] composite, which owns one implementation of each capability
//! trait and records the last commanded value for every actuator. Backends
//! are selected at startup by [`create_robot`]:
//!
//! - `"sim"`: in-memory state, for development and tests
//! - `"uart"`: line-oriented frames over a serial port to the motor board

pub mod sim;
pub mod uart;

use crate::config::RobotConfig;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Maximum drive speed in raw backend units
pub const DRIVE_UNITS_MAX: i32 = 1000;

/// Servo channel the camera tilt mount is wired to
pub const CAMERA_TILT_CHANNEL: u8 = 3;

/// Neutral angle the arm returns to on startup and shutdown
pub const ARM_DEFAULT_ANGLE: u8 = 90;

/// Track drive, differential steering
pub trait DriveMotors: Send {
    /// Set both track speeds in raw units (-1000..1000)
    ///
    /// Out-of-range values are clamped by the backend.
    fn set_speeds(&mut self, left: i32, right: i32) -> Result<()>;
}

/// Bank of positional servos addressed by channel
pub trait ServoBank: Send {
    fn set_angle(&mut self, channel: u8, degrees: u8) -> Result<()>;
}

/// Bank of discrete and RGB LEDs addressed by id
pub trait LedBank: Send {
    fn set_state(&mut self, id: u8, on: bool) -> Result<()>;
    fn set_color(&mut self, id: u8, r: u8, g: u8, b: u8) -> Result<()>;
}

/// Forward-facing ultrasonic range sensor
pub trait RangeSensor: Send {
    /// Measure distance to the nearest obstacle in centimeters
    fn distance_cm(&mut self) -> Result<f32>;
}

/// Named joints of the camera arm and their servo channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmJoint {
    Base,
    Shoulder,
    Elbow,
}

impl ArmJoint {
    pub const ALL: [ArmJoint; 3] = [ArmJoint::Base, ArmJoint::Shoulder, ArmJoint::Elbow];

    /// Parse a joint name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "base" => Some(ArmJoint::Base),
            "shoulder" => Some(ArmJoint::Shoulder),
            "elbow" => Some(ArmJoint::Elbow),
            _ => None,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            ArmJoint::Base => "base",
            ArmJoint::Shoulder => "shoulder",
            ArmJoint::Elbow => "elbow",
        }
    }

    /// Servo channel this joint is wired to
    #[inline]
    pub fn channel(&self) -> u8 {
        match self {
            ArmJoint::Base => 0,
            ArmJoint::Shoulder => 1,
            ArmJoint::Elbow => 2,
        }
    }
}

/// Last commanded state of one LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    Off,
    On,
    Color(u8, u8, u8),
}

/// The actuation target shared by all command sessions
///
/// Owns one backend implementation per capability and mirrors the last
/// commanded value for each actuator so callers can inspect what the
/// hardware was told without a round-trip.
pub struct Robot {
    drive: Box<dyn DriveMotors>,
    servos: Box<dyn ServoBank>,
    leds: Box<dyn LedBank>,
    range: Box<dyn RangeSensor>,
    last_speeds: (i32, i32),
    servo_angles: HashMap<u8, u8>,
    led_states: HashMap<u8, LedState>,
}

impl Robot {
    pub fn new(
        drive: Box<dyn DriveMotors>,
        servos: Box<dyn ServoBank>,
        leds: Box<dyn LedBank>,
        range: Box<dyn RangeSensor>,
    ) -> Self {
        Self {
            drive,
            servos,
            leds,
            range,
            last_speeds: (0, 0),
            servo_angles: HashMap::new(),
            led_states: HashMap::new(),
        }
    }

    /// Map a 0-100 speed percentage onto raw drive units
    #[inline]
    fn speed_units(speed: u8) -> i32 {
        i32::from(speed) * DRIVE_UNITS_MAX / 100
    }

    fn apply_speeds(&mut self, left: i32, right: i32) -> Result<()> {
        self.drive.set_speeds(left, right)?;
        self.last_speeds = (left, right);
        Ok(())
    }

    pub fn move_forward(&mut self, speed: u8) -> Result<()> {
        let units = Self::speed_units(speed);
        self.apply_speeds(units, units)
    }

    pub fn move_backward(&mut self, speed: u8) -> Result<()> {
        let units = Self::speed_units(speed);
        self.apply_speeds(-units, -units)
    }

    /// Spin left in place (tracks counter-rotate)
    pub fn turn_left(&mut self, speed: u8) -> Result<()> {
        let units = Self::speed_units(speed);
        self.apply_speeds(-units, units)
    }

    /// Spin right in place
    pub fn turn_right(&mut self, speed: u8) -> Result<()> {
        let units = Self::speed_units(speed);
        self.apply_speeds(units, -units)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.apply_speeds(0, 0)
    }

    pub fn set_servo(&mut self, channel: u8, degrees: u8) -> Result<()> {
        self.servos.set_angle(channel, degrees)?;
        self.servo_angles.insert(channel, degrees);
        Ok(())
    }

    pub fn set_led(&mut self, id: u8, on: bool) -> Result<()> {
        self.leds.set_state(id, on)?;
        self.led_states
            .insert(id, if on { LedState::On } else { LedState::Off });
        Ok(())
    }

    pub fn set_led_color(&mut self, id: u8, r: u8, g: u8, b: u8) -> Result<()> {
        self.leds.set_color(id, r, g, b)?;
        self.led_states.insert(id, LedState::Color(r, g, b));
        Ok(())
    }

    pub fn distance_cm(&mut self) -> Result<f32> {
        self.range.distance_cm()
    }

    pub fn set_arm_joint(&mut self, joint: ArmJoint, degrees: u8) -> Result<()> {
        self.set_servo(joint.channel(), degrees)
    }

    pub fn set_camera_tilt(&mut self, degrees: u8) -> Result<()> {
        self.set_servo(CAMERA_TILT_CHANNEL, degrees)
    }

    /// Move every arm joint to its neutral angle
    pub fn center_arm(&mut self) -> Result<()> {
        for joint in ArmJoint::ALL {
            self.set_arm_joint(joint, ARM_DEFAULT_ANGLE)?;
        }
        Ok(())
    }

    /// Last commanded track speeds in raw units
    #[inline]
    pub fn last_speeds(&self) -> (i32, i32) {
        self.last_speeds
    }

    /// Last commanded angle for a servo channel, if any
    #[inline]
    pub fn servo_angle(&self, channel: u8) -> Option<u8> {
        self.servo_angles.get(&channel).copied()
    }

    /// Last commanded state for an LED, if any
    #[inline]
    pub fn led_state(&self, id: u8) -> Option<LedState> {
        self.led_states.get(&id).copied()
    }

    /// Park the hardware in a safe state
    ///
    /// Motors are stopped before anything else; the arm then returns to
    /// neutral and any LED we turned on is turned off.
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop()?;
        self.center_arm()?;
        let lit: Vec<u8> = self
            .led_states
            .iter()
            .filter(|(_, state)| **state != LedState::Off)
            .map(|(id, _)| *id)
            .collect();
        for id in lit {
            self.set_led(id, false)?;
        }
        log::info!("Robot parked: motors stopped, arm centered");
        Ok(())
    }
}

/// Create a robot from configuration
pub fn create_robot(config: &RobotConfig) -> Result<Robot> {
    match config.backend.as_str() {
        "sim" => Ok(sim::build(config)),
        "uart" => uart::build(config),
        other => Err(Error::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RobotConfig;

    fn sim_robot() -> Robot {
        sim::build(&RobotConfig::default())
    }

    #[test]
    fn test_speed_percentage_maps_to_units() {
        let mut robot = sim_robot();
        robot.move_forward(50).unwrap();
        assert_eq!(robot.last_speeds(), (500, 500));
        robot.move_forward(100).unwrap();
        assert_eq!(robot.last_speeds(), (1000, 1000));
    }

    #[test]
    fn test_turn_counter_rotates_tracks() {
        let mut robot = sim_robot();
        robot.turn_left(30).unwrap();
        assert_eq!(robot.last_speeds(), (-300, 300));
        robot.turn_right(30).unwrap();
        assert_eq!(robot.last_speeds(), (300, -300));
    }

    #[test]
    fn test_stop_zeroes_both_tracks() {
        let mut robot = sim_robot();
        robot.move_backward(80).unwrap();
        assert_eq!(robot.last_speeds(), (-800, -800));
        robot.stop().unwrap();
        assert_eq!(robot.last_speeds(), (0, 0));
    }

    #[test]
    fn test_arm_joints_map_to_channels() {
        assert_eq!(ArmJoint::Base.channel(), 0);
        assert_eq!(ArmJoint::Shoulder.channel(), 1);
        assert_eq!(ArmJoint::Elbow.channel(), 2);

        let mut robot = sim_robot();
        robot.set_arm_joint(ArmJoint::Elbow, 45).unwrap();
        assert_eq!(robot.servo_angle(2), Some(45));
    }

    #[test]
    fn test_camera_tilt_uses_reserved_channel() {
        let mut robot = sim_robot();
        robot.set_camera_tilt(120).unwrap();
        assert_eq!(robot.servo_angle(CAMERA_TILT_CHANNEL), Some(120));
    }

    #[test]
    fn test_joint_names_case_insensitive() {
        assert_eq!(ArmJoint::from_name("base"), Some(ArmJoint::Base));
        assert_eq!(ArmJoint::from_name("SHOULDER"), Some(ArmJoint::Shoulder));
        assert_eq!(ArmJoint::from_name("wrist"), None);
    }

    #[test]
    fn test_led_state_tracked() {
        let mut robot = sim_robot();
        robot.set_led(1, true).unwrap();
        assert_eq!(robot.led_state(1), Some(LedState::On));
        robot.set_led_color(2, 255, 0, 128).unwrap();
        assert_eq!(robot.led_state(2), Some(LedState::Color(255, 0, 128)));
        assert_eq!(robot.led_state(7), None);
    }

    #[test]
    fn test_shutdown_parks_hardware() {
        let mut robot = sim_robot();
        robot.move_forward(60).unwrap();
        robot.set_led(0, true).unwrap();
        robot.set_arm_joint(ArmJoint::Base, 10).unwrap();

        robot.shutdown().unwrap();

        assert_eq!(robot.last_speeds(), (0, 0));
        assert_eq!(robot.servo_angle(0), Some(ARM_DEFAULT_ANGLE));
        assert_eq!(robot.led_state(0), Some(LedState::Off));
    }

    #[test]
    fn test_factory_rejects_unknown_backend() {
        let config = RobotConfig {
            backend: "quantum".to_string(),
            ..RobotConfig::default()
        };
        assert!(matches!(
            create_robot(&config),
            Err(Error::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_factory_builds_sim() {
        let robot = create_robot(&RobotConfig::default());
        assert!(robot.is_ok());
    }
}

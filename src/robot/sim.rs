//! Simulated robot backend
//!
//! Keeps all actuator state in memory so the full command path can run on
//! a development machine. A [`SimHandle`] clone observes every mutation,
//! which is how the integration tests assert what the "hardware" was told.

use crate::config::RobotConfig;
use crate::error::Result;
use crate::robot::{DRIVE_UNITS_MAX, DriveMotors, LedBank, LedState, RangeSensor, Robot, ServoBank};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct SimState {
    speeds: (i32, i32),
    servo_angles: HashMap<u8, u8>,
    led_states: HashMap<u8, LedState>,
    distance_cm: f32,
}

/// Shared view of the simulated hardware
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    pub fn motor_speeds(&self) -> (i32, i32) {
        self.state.lock().speeds
    }

    pub fn servo_angle(&self, channel: u8) -> Option<u8> {
        self.state.lock().servo_angles.get(&channel).copied()
    }

    pub fn led_state(&self, id: u8) -> Option<LedState> {
        self.state.lock().led_states.get(&id).copied()
    }

    /// Script the distance the range sensor will report
    pub fn set_distance_cm(&self, cm: f32) {
        self.state.lock().distance_cm = cm;
    }
}

struct SimDrive(Arc<Mutex<SimState>>);

impl DriveMotors for SimDrive {
    fn set_speeds(&mut self, left: i32, right: i32) -> Result<()> {
        let left = left.clamp(-DRIVE_UNITS_MAX, DRIVE_UNITS_MAX);
        let right = right.clamp(-DRIVE_UNITS_MAX, DRIVE_UNITS_MAX);
        self.0.lock().speeds = (left, right);
        Ok(())
    }
}

struct SimServos(Arc<Mutex<SimState>>);

impl ServoBank for SimServos {
    fn set_angle(&mut self, channel: u8, degrees: u8) -> Result<()> {
        self.0.lock().servo_angles.insert(channel, degrees);
        Ok(())
    }
}

struct SimLeds(Arc<Mutex<SimState>>);

impl LedBank for SimLeds {
    fn set_state(&mut self, id: u8, on: bool) -> Result<()> {
        let state = if on { LedState::On } else { LedState::Off };
        self.0.lock().led_states.insert(id, state);
        Ok(())
    }

    fn set_color(&mut self, id: u8, r: u8, g: u8, b: u8) -> Result<()> {
        self.0.lock().led_states.insert(id, LedState::Color(r, g, b));
        Ok(())
    }
}

struct SimRange(Arc<Mutex<SimState>>);

impl RangeSensor for SimRange {
    fn distance_cm(&mut self) -> Result<f32> {
        let base = self.0.lock().distance_cm;
        // Small jitter so repeated readings look like a real sensor
        let noise: f32 = rand::thread_rng().gen_range(-2.0..2.0);
        Ok((base + noise).max(0.0))
    }
}

/// Build a simulated robot
pub fn build(config: &RobotConfig) -> Robot {
    let (robot, _) = build_with_handle(config);
    robot
}

/// Build a simulated robot plus an inspection handle
pub fn build_with_handle(config: &RobotConfig) -> (Robot, SimHandle) {
    let state = Arc::new(Mutex::new(SimState {
        speeds: (0, 0),
        servo_angles: HashMap::new(),
        led_states: HashMap::new(),
        distance_cm: config.sim_distance_cm,
    }));

    let robot = Robot::new(
        Box::new(SimDrive(Arc::clone(&state))),
        Box::new(SimServos(Arc::clone(&state))),
        Box::new(SimLeds(Arc::clone(&state))),
        Box::new(SimRange(Arc::clone(&state))),
    );
    (robot, SimHandle { state })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::ArmJoint;

    #[test]
    fn test_drive_units_clamped() {
        let state = Arc::new(Mutex::new(SimState {
            speeds: (0, 0),
            servo_angles: HashMap::new(),
            led_states: HashMap::new(),
            distance_cm: 100.0,
        }));
        let mut drive = SimDrive(Arc::clone(&state));
        drive.set_speeds(5000, -9999).unwrap();
        assert_eq!(state.lock().speeds, (1000, -1000));
    }

    #[test]
    fn test_handle_observes_mutations() {
        let (mut robot, handle) = build_with_handle(&RobotConfig::default());

        robot.turn_left(40).unwrap();
        assert_eq!(handle.motor_speeds(), (-400, 400));

        robot.set_arm_joint(ArmJoint::Shoulder, 135).unwrap();
        assert_eq!(handle.servo_angle(1), Some(135));

        robot.set_led_color(3, 0, 255, 0).unwrap();
        assert_eq!(handle.led_state(3), Some(LedState::Color(0, 255, 0)));
    }

    #[test]
    fn test_distance_jitters_around_base() {
        let (mut robot, handle) = build_with_handle(&RobotConfig::default());
        handle.set_distance_cm(50.0);
        for _ in 0..20 {
            let cm = robot.distance_cm().unwrap();
            assert!((48.0..52.0).contains(&cm), "reading out of band: {}", cm);
        }
    }

    #[test]
    fn test_distance_never_negative() {
        let (mut robot, handle) = build_with_handle(&RobotConfig::default());
        handle.set_distance_cm(0.5);
        for _ in 0..20 {
            assert!(robot.distance_cm().unwrap() >= 0.0);
        }
    }
}

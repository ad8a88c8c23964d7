//! Recording doubles for the hardware traits.

use std::{collections::VecDeque, string::String, time::Duration, vec::Vec};

use crate::{
    actuator::{AngleMotor, Drivebase, Scheduler, Side, Stop},
    config::DriveSettings,
    error::DeviceError,
    operator::{Buttons, OperatorPanel},
    reflectance::{ColorSensor, Rgb},
};

#[derive(Clone, Debug, PartialEq)]
pub enum MotorCall {
    RunTarget {
        speed: f64,
        target: f64,
        then: Stop,
        wait: bool,
    },
    RunUntilStalled {
        speed: f64,
        then: Stop,
        duty_limit: f64,
    },
    Stop,
}

#[derive(Default, Debug)]
pub struct MockMotor {
    pub angle: f64,
    pub resets: usize,
    pub calls: Vec<MotorCall>,
    /// Angle reported after `run_until_stalled`.
    pub stall_angle: f64,
}

impl AngleMotor for MockMotor {
    fn reset_angle(&mut self) -> Result<(), DeviceError> {
        self.angle = 0.0;
        self.resets += 1;
        Ok(())
    }

    fn angle(&self) -> Result<f64, DeviceError> {
        Ok(self.angle)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.calls.push(MotorCall::Stop);
        Ok(())
    }

    async fn run_target(
        &mut self,
        speed: f64,
        target: f64,
        then: Stop,
        wait: bool,
    ) -> Result<(), DeviceError> {
        self.calls.push(MotorCall::RunTarget {
            speed,
            target,
            then,
            wait,
        });
        self.angle = target;
        Ok(())
    }

    async fn run_until_stalled(
        &mut self,
        speed: f64,
        then: Stop,
        duty_limit: f64,
    ) -> Result<f64, DeviceError> {
        self.calls.push(MotorCall::RunUntilStalled {
            speed,
            then,
            duty_limit,
        });
        self.angle = self.stall_angle;
        Ok(self.angle)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DriveCall {
    Drive { speed: f64, turn_rate: f64 },
    Stop,
    Straight(f64),
    Turn(f64),
    Settings(DriveSettings),
}

/// Drivebase whose wheels advance a fixed angle on every `drive`.
#[derive(Default, Debug)]
pub struct MockDrivebase {
    pub left: MockMotor,
    pub right: MockMotor,
    pub calls: Vec<DriveCall>,
    pub degrees_per_drive: f64,
}

impl MockDrivebase {
    pub fn new(degrees_per_drive: f64) -> Self {
        Self {
            degrees_per_drive,
            ..Default::default()
        }
    }
}

impl Drivebase for MockDrivebase {
    type Motor = MockMotor;

    fn drive(&mut self, speed: f64, turn_rate: f64) -> Result<(), DeviceError> {
        self.calls.push(DriveCall::Drive { speed, turn_rate });
        self.left.angle += self.degrees_per_drive;
        self.right.angle += self.degrees_per_drive;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.calls.push(DriveCall::Stop);
        Ok(())
    }

    async fn straight(&mut self, distance: f64) -> Result<(), DeviceError> {
        self.calls.push(DriveCall::Straight(distance));
        Ok(())
    }

    async fn turn(&mut self, angle: f64) -> Result<(), DeviceError> {
        self.calls.push(DriveCall::Turn(angle));
        Ok(())
    }

    fn settings(&mut self, settings: DriveSettings) -> Result<(), DeviceError> {
        self.calls.push(DriveCall::Settings(settings));
        Ok(())
    }

    fn wheel(&mut self, side: Side) -> &mut MockMotor {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Plays back readings in order, then repeats the last one.
#[derive(Debug, Default)]
pub struct MockSensor {
    readings: VecDeque<Rgb>,
    last: Rgb,
    fail: bool,
    pub reads: usize,
}

impl MockSensor {
    pub fn from_rgb(readings: &[Rgb]) -> Self {
        Self {
            readings: readings.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn sequence(reflectance: &[f64]) -> Self {
        let readings: Vec<Rgb> = reflectance
            .iter()
            .map(|&v| Rgb::new(v, v, v))
            .collect();
        Self::from_rgb(&readings)
    }

    pub fn constant(reflectance: f64) -> Self {
        Self::sequence(&[reflectance])
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl ColorSensor for MockSensor {
    fn rgb(&mut self) -> Result<Rgb, DeviceError> {
        if self.fail {
            return Err(DeviceError::new("mock sensor", "disconnected"));
        }
        self.reads += 1;
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }
}

#[derive(Default, Debug)]
pub struct MockScheduler {
    pub ticks: usize,
    pub slept: Vec<Duration>,
}

impl Scheduler for MockScheduler {
    async fn tick(&mut self) {
        self.ticks += 1;
    }

    async fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

/// Panel that reports one scripted button state per poll, then nothing.
#[derive(Default, Debug)]
pub struct MockPanel {
    presses: VecDeque<Buttons>,
    pub polls: usize,
    pub clears: usize,
    /// What is on screen now.
    pub text: Vec<(i16, i16, String)>,
    /// Everything ever drawn.
    pub history: Vec<String>,
}

impl MockPanel {
    pub fn new(presses: &[Buttons]) -> Self {
        Self {
            presses: presses.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn shows(&self, needle: &str) -> bool {
        self.history.iter().any(|t| t.contains(needle))
    }
}

impl OperatorPanel for MockPanel {
    fn pressed(&mut self) -> Buttons {
        self.polls += 1;
        self.presses.pop_front().unwrap_or_default()
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.text.clear();
    }

    fn draw_text(&mut self, x: i16, y: i16, text: &str) {
        self.text.push((x, y, String::from(text)));
        self.history.push(String::from(text));
    }
}

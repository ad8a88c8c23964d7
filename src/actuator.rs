//! Seams between the mission logic and the motors.
//!
//! Speeds are in mm/s for the drivebase and deg/s for single motors; angles
//! are motor shaft degrees. Positive `turn_rate`/`turn` is clockwise seen
//! from above.
#![allow(async_fn_in_trait)]

use core::{f64::consts::PI, time::Duration};

#[allow(unused_imports)]
use num_traits::Float;

use serde::{Deserialize, Serialize};

use crate::{config::DriveSettings, error::DeviceError};

/// What a motor does once it has reached its target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stop {
    Coast,
    #[default]
    Brake,
    Hold,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

pub trait AngleMotor {
    /// Makes the current shaft position read as zero.
    fn reset_angle(&mut self) -> Result<(), DeviceError>;

    /// Degrees turned since the last reset.
    fn angle(&self) -> Result<f64, DeviceError>;

    /// Stops driving the motor and lets it coast.
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Turns to `target` degrees at `speed` deg/s. When `wait` is false the
    /// motor is left running toward the target.
    async fn run_target(
        &mut self,
        speed: f64,
        target: f64,
        then: Stop,
        wait: bool,
    ) -> Result<(), DeviceError>;

    /// Runs at `speed` deg/s until the shaft stops moving, with output
    /// limited to `duty_limit` percent. Returns the angle it stalled at.
    async fn run_until_stalled(
        &mut self,
        speed: f64,
        then: Stop,
        duty_limit: f64,
    ) -> Result<f64, DeviceError>;
}

pub trait Drivebase {
    type Motor: AngleMotor;

    /// Starts driving at `speed` mm/s while turning at `turn_rate` deg/s.
    /// Returns immediately.
    fn drive(&mut self, speed: f64, turn_rate: f64) -> Result<(), DeviceError>;

    /// Commands zero velocity on both wheels.
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Drives `distance` mm and waits until it gets there.
    async fn straight(&mut self, distance: f64) -> Result<(), DeviceError>;

    /// Turns in place by `angle` degrees and waits until it gets there.
    async fn turn(&mut self, angle: f64) -> Result<(), DeviceError>;

    fn settings(&mut self, settings: DriveSettings) -> Result<(), DeviceError>;

    fn wheel(&mut self, side: Side) -> &mut Self::Motor;
}

/// Cooperative timing. There is one thread of control; loops yield here.
pub trait Scheduler {
    /// Yields for one scheduler tick.
    async fn tick(&mut self);

    async fn sleep(&mut self, duration: Duration);
}

/// Converts between chassis motion and wheel shaft angles.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DriveGeometry {
    /// mm
    pub wheel_diameter: f64,
    /// mm
    pub axle_track: f64,
}

impl DriveGeometry {
    pub fn new(wheel_diameter: f64, axle_track: f64) -> Self {
        Self {
            wheel_diameter,
            axle_track,
        }
    }

    /// Wheel degrees that roll the robot `mm` along the floor.
    pub fn wheel_degrees(&self, mm: f64) -> f64 {
        mm / (PI * self.wheel_diameter) * 360.0
    }

    /// Floor distance rolled by `degrees` of wheel rotation.
    pub fn wheel_mm(&self, degrees: f64) -> f64 {
        degrees / 360.0 * PI * self.wheel_diameter
    }

    /// Left and right wheel speeds in deg/s for a chassis speed in mm/s and
    /// a clockwise turn rate in deg/s.
    pub fn wheel_speeds(&self, speed: f64, turn_rate: f64) -> (f64, f64) {
        let arc = turn_rate.to_radians() * self.axle_track / 2.0;
        (
            self.wheel_degrees(speed + arc),
            self.wheel_degrees(speed - arc),
        )
    }

    /// Wheel degrees each side turns (left forward, right back) to spin the
    /// chassis `angle` degrees clockwise in place.
    pub fn spin_degrees(&self, angle: f64) -> f64 {
        angle * self.axle_track / self.wheel_diameter
    }
}

/// Trapezoidal speed limit for a move of known length, applied one tick at a
/// time: speed climbs by `acceleration` from rest, holds at `cruise`, and
/// falls so that it can still brake to zero by the end (`v² = 2·a·d`).
#[derive(Copy, Clone, Debug)]
pub struct SpeedRamp {
    pub cruise: f64,
    pub acceleration: f64,
    speed: f64,
}

impl SpeedRamp {
    /// `cruise` and `acceleration` in the same units as the distances later
    /// passed to [`SpeedRamp::next`] (e.g. wheel deg/s and deg/s²).
    pub fn new(cruise: f64, acceleration: f64) -> Self {
        Self {
            cruise: cruise.abs(),
            acceleration: acceleration.abs(),
            speed: 0.0,
        }
    }

    /// Speed to command for the next `dt`, given the distance still to go.
    pub fn next(&mut self, remaining: f64, dt: Duration) -> f64 {
        let accelerating = self.speed + self.acceleration * dt.as_secs_f64();
        let braking = (2.0 * self.acceleration * remaining.abs()).sqrt();
        self.speed = self.cruise.min(accelerating).min(braking);
        self.speed
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

/// Flags a motor that is commanded to move but has stopped turning for
/// `ticks_required` consecutive samples.
#[derive(Copy, Clone, Debug)]
pub struct StallDetector {
    /// deg/s
    pub velocity_threshold: f64,
    pub ticks_required: u32,
    grace_ticks: u32,
    slow_ticks: u32,
}

impl StallDetector {
    pub fn new(velocity_threshold: f64, ticks_required: u32, grace_ticks: u32) -> Self {
        Self {
            velocity_threshold,
            ticks_required,
            grace_ticks,
            slow_ticks: 0,
        }
    }

    /// Feeds one velocity sample; true once the motor counts as stalled.
    pub fn update(&mut self, velocity: f64) -> bool {
        if self.grace_ticks > 0 {
            self.grace_ticks -= 1;
            return false;
        }
        if velocity.abs() <= self.velocity_threshold {
            self.slow_ticks += 1;
        } else {
            self.slow_ticks = 0;
        }
        self.slow_ticks >= self.ticks_required
    }
}

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Speed and acceleration limits used by `straight` and `turn`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriveSettings {
    /// mm/s
    pub straight_speed: f64,
    /// mm/s^2
    pub straight_acceleration: f64,
    /// deg/s
    pub turn_rate: f64,
    /// deg/s^2
    pub turn_acceleration: f64,
}

impl DriveSettings {
    pub const DEFAULT: Self = Self::new(700.0, 300.0, 250.0, 250.0);

    pub const fn new(
        straight_speed: f64,
        straight_acceleration: f64,
        turn_rate: f64,
        turn_acceleration: f64,
    ) -> Self {
        Self {
            straight_speed,
            straight_acceleration,
            turn_rate,
            turn_acceleration,
        }
    }
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub struct RobotConfig {
    /// mm
    pub wheel_diameter: f64,
    /// Distance between the two drive wheel contact patches, mm.
    pub axle_track: f64,
    /// Minimum period between two control loop iterations.
    pub tick: Duration,
    pub primary_calibration_path: &'static str,
    pub secondary_calibration_path: &'static str,
    /// Pause after declining calibration so the same press does not select a mission.
    pub decline_debounce: Duration,
    /// Pause after each calibration confirm.
    pub confirm_debounce: Duration,
    pub drive_settings: DriveSettings,
}

pub const ROBOT: RobotConfig = RobotConfig {
    wheel_diameter: 56.0,
    axle_track: 117.0,
    tick: Duration::from_millis(5),
    primary_calibration_path: "light.json",
    secondary_calibration_path: "secondary_light.json",
    decline_debounce: Duration::from_millis(225),
    confirm_debounce: Duration::from_millis(275),
    drive_settings: DriveSettings::DEFAULT,
};

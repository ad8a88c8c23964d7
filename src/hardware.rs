//! V5 implementations of the hardware traits.

extern crate alloc;
use alloc::{format, string::String};
use core::time::Duration;

use log::warn;

use vexide::{
    devices::{
        controller::Controller,
        display::{Display, Font, FontFamily, FontSize, Text},
        rgb::Rgb as DisplayRgb,
        smart::{
            motor::{BrakeMode, Motor},
            optical::OpticalSensor,
        },
    },
    fs,
    prelude::*,
};

use crate::{
    actuator::{AngleMotor, DriveGeometry, Drivebase, Scheduler, Side, SpeedRamp, StallDetector, Stop},
    calibration::Storage,
    config::{DriveSettings, ROBOT},
    error::{DeviceError, StorageError},
    operator::{Button, Buttons, OperatorPanel},
    reflectance::{ColorSensor, Rgb},
};

/// Degrees of error at which a position move counts as arrived.
const TARGET_TOLERANCE: f64 = 2.0;
const STALL_VELOCITY: f64 = 6.0;
const STALL_TICKS: u32 = 40;
const SPIN_UP_TICKS: u32 = 20;

fn motor_err(e: impl core::fmt::Debug) -> DeviceError {
    DeviceError::new("motor", format!("{e:?}"))
}

fn brake_mode(then: Stop) -> BrakeMode {
    match then {
        Stop::Coast => BrakeMode::Coast,
        Stop::Brake => BrakeMode::Brake,
        Stop::Hold => BrakeMode::Hold,
    }
}

/// deg/s to the rpm the motor firmware takes.
fn rpm(deg_per_sec: f64) -> i32 {
    (deg_per_sec / 6.0).round() as i32
}

pub struct V5Motor {
    motor: Motor,
}

impl V5Motor {
    pub fn new(motor: Motor) -> Self {
        Self { motor }
    }

    /// deg/s
    fn velocity(&self) -> Result<f64, DeviceError> {
        Ok(self.motor.velocity().map_err(motor_err)? * 6.0)
    }

    fn set_velocity(&mut self, deg_per_sec: f64) -> Result<(), DeviceError> {
        self.motor.set_velocity(rpm(deg_per_sec)).map_err(motor_err)
    }

    fn hold_position(&mut self, then: Stop) -> Result<(), DeviceError> {
        self.motor.brake(brake_mode(then)).map_err(motor_err)
    }

    fn set_target(&mut self, degrees: f64, deg_per_sec: f64) -> Result<(), DeviceError> {
        self.motor
            .set_position_target(Position::from_degrees(degrees), rpm(deg_per_sec.abs()))
            .map_err(motor_err)
    }
}

impl AngleMotor for V5Motor {
    fn reset_angle(&mut self) -> Result<(), DeviceError> {
        self.motor.reset_position().map_err(motor_err)
    }

    fn angle(&self) -> Result<f64, DeviceError> {
        Ok(self.motor.position().map_err(motor_err)?.as_degrees())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.motor.brake(BrakeMode::Coast).map_err(motor_err)
    }

    async fn run_target(
        &mut self,
        speed: f64,
        target: f64,
        then: Stop,
        wait: bool,
    ) -> Result<(), DeviceError> {
        self.set_target(target, speed)?;
        if !wait {
            return Ok(());
        }

        let mut stall = StallDetector::new(STALL_VELOCITY, STALL_TICKS, SPIN_UP_TICKS);
        loop {
            sleep(Motor::WRITE_INTERVAL).await;
            if (self.angle()? - target).abs() <= TARGET_TOLERANCE {
                break;
            }
            if stall.update(self.velocity()?) {
                warn!("run_target: stall detected at {:.1} deg", self.angle()?);
                break;
            }
        }
        self.hold_position(then)
    }

    async fn run_until_stalled(
        &mut self,
        speed: f64,
        then: Stop,
        duty_limit: f64,
    ) -> Result<f64, DeviceError> {
        let limit = Motor::V5_MAX_VOLTAGE * (duty_limit / 100.0).clamp(0.0, 1.0);
        self.motor.set_voltage_limit(limit).map_err(motor_err)?;
        self.set_velocity(speed)?;

        let mut stall = StallDetector::new(STALL_VELOCITY, STALL_TICKS, SPIN_UP_TICKS);
        while !stall.update(self.velocity()?) {
            sleep(Motor::WRITE_INTERVAL).await;
        }

        self.hold_position(then)?;
        self.motor
            .set_voltage_limit(Motor::V5_MAX_VOLTAGE)
            .map_err(motor_err)?;
        self.angle()
    }
}

/// Two-motor differential drive.
pub struct V5Drivebase {
    left: V5Motor,
    right: V5Motor,
    geometry: DriveGeometry,
    settings: DriveSettings,
}

impl V5Drivebase {
    pub fn new(left: Motor, right: Motor) -> Self {
        Self {
            left: V5Motor::new(left),
            right: V5Motor::new(right),
            geometry: DriveGeometry::new(ROBOT.wheel_diameter, ROBOT.axle_track),
            settings: ROBOT.drive_settings,
        }
    }

    /// Moves both wheels by the given angles and waits for them to arrive.
    /// The position targets are re-sent every tick with the ramped speed.
    async fn move_wheels(
        &mut self,
        left_degrees: f64,
        right_degrees: f64,
        mut ramp: SpeedRamp,
    ) -> Result<(), DeviceError> {
        let left_target = self.left.angle()? + left_degrees;
        let right_target = self.right.angle()? + right_degrees;

        let mut stall = StallDetector::new(STALL_VELOCITY, STALL_TICKS, SPIN_UP_TICKS);
        loop {
            let left_error = (self.left.angle()? - left_target).abs();
            let right_error = (self.right.angle()? - right_target).abs();
            if left_error <= TARGET_TOLERANCE && right_error <= TARGET_TOLERANCE {
                break;
            }

            let speed = ramp.next(left_error.max(right_error), Motor::WRITE_INTERVAL);
            self.left.set_target(left_target, speed)?;
            self.right.set_target(right_target, speed)?;
            sleep(Motor::WRITE_INTERVAL).await;

            let velocity = (self.left.velocity()?.abs() + self.right.velocity()?.abs()) / 2.0;
            if stall.update(velocity) {
                warn!("drivebase: stall detected");
                break;
            }
        }
        self.left.hold_position(Stop::Hold)?;
        self.right.hold_position(Stop::Hold)
    }
}

impl Drivebase for V5Drivebase {
    type Motor = V5Motor;

    fn drive(&mut self, speed: f64, turn_rate: f64) -> Result<(), DeviceError> {
        let (left, right) = self.geometry.wheel_speeds(speed, turn_rate);
        self.left.set_velocity(left)?;
        self.right.set_velocity(right)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.left.set_velocity(0.0)?;
        self.right.set_velocity(0.0)
    }

    async fn straight(&mut self, distance: f64) -> Result<(), DeviceError> {
        let degrees = self.geometry.wheel_degrees(distance);
        let ramp = SpeedRamp::new(
            self.geometry.wheel_degrees(self.settings.straight_speed),
            self.geometry.wheel_degrees(self.settings.straight_acceleration),
        );
        self.move_wheels(degrees, degrees, ramp).await
    }

    async fn turn(&mut self, angle: f64) -> Result<(), DeviceError> {
        let degrees = self.geometry.spin_degrees(angle);
        let ramp = SpeedRamp::new(
            self.geometry.spin_degrees(self.settings.turn_rate),
            self.geometry.spin_degrees(self.settings.turn_acceleration),
        );
        self.move_wheels(degrees, -degrees, ramp).await
    }

    fn settings(&mut self, settings: DriveSettings) -> Result<(), DeviceError> {
        self.settings = settings;
        Ok(())
    }

    fn wheel(&mut self, side: Side) -> &mut V5Motor {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

pub struct V5ColorSensor {
    sensor: OpticalSensor,
}

impl V5ColorSensor {
    pub fn new(mut sensor: OpticalSensor) -> Self {
        if let Err(e) = sensor.set_led_brightness(1.0) {
            warn!("optical sensor: LED setup failed: {e:?}");
        }
        if let Err(e) = sensor.set_integration_time(Duration::from_millis(20)) {
            warn!("optical sensor: integration time setup failed: {e:?}");
        }
        Self { sensor }
    }
}

impl ColorSensor for V5ColorSensor {
    fn rgb(&mut self) -> Result<Rgb, DeviceError> {
        let color = self
            .sensor
            .color()
            .map_err(|e| DeviceError::new("optical sensor", format!("{e:?}")))?;
        Ok(Rgb::new(color.red, color.green, color.blue))
    }
}

pub struct V5Scheduler;

impl Scheduler for V5Scheduler {
    async fn tick(&mut self) {
        sleep(ROBOT.tick).await;
    }

    async fn sleep(&mut self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Calibration files on the SD card.
pub struct V5Storage;

impl Storage for V5Storage {
    fn read_to_string(&self, path: &str) -> Result<String, StorageError> {
        fs::read_to_string(path).map_err(|e| StorageError::Io {
            path: String::from(path),
            message: format!("{e:?}"),
        })
    }

    fn write(&mut self, path: &str, contents: &str) -> Result<(), StorageError> {
        fs::write(path, contents.as_bytes()).map_err(|e| StorageError::Io {
            path: String::from(path),
            message: format!("{e:?}"),
        })
    }
}

/// Brain screen for prompts, controller buttons for input. The face buttons
/// are laid out like the brick's: the D-pad plus A as center.
pub struct V5Panel {
    display: Display,
    controller: Controller,
}

impl V5Panel {
    pub fn new(display: Display, controller: Controller) -> Self {
        Self {
            display,
            controller,
        }
    }
}

impl OperatorPanel for V5Panel {
    fn pressed(&mut self) -> Buttons {
        let state = self.controller.state().unwrap_or_default();
        let mut held = Buttons::NONE;
        if state.button_left.is_pressed() {
            held = held.with(Button::Left);
        }
        if state.button_right.is_pressed() {
            held = held.with(Button::Right);
        }
        if state.button_up.is_pressed() {
            held = held.with(Button::Up);
        }
        if state.button_down.is_pressed() {
            held = held.with(Button::Down);
        }
        if state.button_a.is_pressed() {
            held = held.with(Button::Center);
        }
        held
    }

    fn clear(&mut self) {
        self.display.erase(DisplayRgb::new(255, 255, 255));
    }

    fn draw_text(&mut self, x: i16, y: i16, text: &str) {
        let text = Text::new(
            text,
            Font::new(FontSize::MEDIUM, FontFamily::Monospace),
            [x, y],
        );
        self.display
            .draw_text(&text, DisplayRgb::new(0, 0, 0), None);
    }
}

extern crate alloc;
use alloc::vec::Vec;
use core::time::Duration;

use crate::{
    actuator::{AngleMotor, Drivebase, Scheduler, Side, Stop},
    calibration::{CalibrationStore, SensorId},
    config::DriveSettings,
    error::Error,
    line_follow::{FollowSummary, LineFollowParams, LineFollower},
    reflectance::ColorSensor,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MotorSlot {
    Left,
    Right,
    Arm,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// mm, negative drives backwards.
    Straight(f64),
    /// Degrees, positive is clockwise.
    Turn(f64),
    Stop,
    Settings(DriveSettings),
    LineFollow(SensorId, LineFollowParams),
    /// Zeroes the motor's angle, then turns it to `target`.
    RunTarget {
        motor: MotorSlot,
        speed: f64,
        target: f64,
        then: Stop,
        wait: bool,
    },
    /// Zeroes the motor's angle, then runs it into a hard stop.
    RunUntilStalled {
        motor: MotorSlot,
        speed: f64,
        then: Stop,
        duty_limit: f64,
    },
    StopMotor(MotorSlot),
    Wait(u64),
}

/// Everything a mission touches.
pub struct Robot<D: Drivebase, S, C, T> {
    pub drivebase: D,
    pub arm: D::Motor,
    pub primary: S,
    pub secondary: S,
    pub store: C,
    pub scheduler: T,
}

impl<D, S, C, T> Robot<D, S, C, T>
where
    D: Drivebase,
    S: ColorSensor,
    C: CalibrationStore,
    T: Scheduler,
{
    pub fn motor(&mut self, slot: MotorSlot) -> &mut D::Motor {
        match slot {
            MotorSlot::Left => self.drivebase.wheel(Side::Left),
            MotorSlot::Right => self.drivebase.wheel(Side::Right),
            MotorSlot::Arm => &mut self.arm,
        }
    }

    pub async fn follow_line(
        &mut self,
        sensor: SensorId,
        params: LineFollowParams,
    ) -> Result<FollowSummary, Error> {
        let reader = match sensor {
            SensorId::Primary => &mut self.primary,
            SensorId::Secondary => &mut self.secondary,
        };
        LineFollower::for_sensor(sensor)
            .follow(
                params,
                &mut self.drivebase,
                reader,
                &self.store,
                &mut self.scheduler,
            )
            .await
    }

    /// Runs every action in order. The first failure ends the plan where it
    /// stands; motors are not stopped on the way out.
    pub async fn run_plan(&mut self, plan: Vec<Action>) -> Result<(), Error> {
        for action in plan {
            match action {
                Action::Straight(distance) => {
                    self.drivebase.straight(distance).await?;
                }
                Action::Turn(angle) => {
                    self.drivebase.turn(angle).await?;
                }
                Action::Stop => {
                    self.drivebase.stop()?;
                }
                Action::Settings(settings) => {
                    self.drivebase.settings(settings)?;
                }
                Action::LineFollow(sensor, params) => {
                    self.follow_line(sensor, params).await?;
                }
                Action::RunTarget {
                    motor,
                    speed,
                    target,
                    then,
                    wait,
                } => {
                    let motor = self.motor(motor);
                    motor.reset_angle()?;
                    motor.run_target(speed, target, then, wait).await?;
                }
                Action::RunUntilStalled {
                    motor,
                    speed,
                    then,
                    duty_limit,
                } => {
                    let motor = self.motor(motor);
                    motor.reset_angle()?;
                    motor.run_until_stalled(speed, then, duty_limit).await?;
                }
                Action::StopMotor(motor) => {
                    self.motor(motor).stop()?;
                }
                Action::Wait(ms) => {
                    self.scheduler.sleep(Duration::from_millis(ms)).await;
                }
            }
        }
        Ok(())
    }
}

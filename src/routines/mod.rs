//! Mission choreography compiled from `src/routines/*.routine` by the build
//! script. The IR types below must stay identical to the ones in `build.rs`;
//! postcard encodes enum variants by position.

extern crate alloc;
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use serde::{Deserialize, Serialize};

use crate::{
    actuator::Stop,
    calibration::SensorId,
    config::DriveSettings,
    error::Error,
    line_follow::LineFollowParams,
    plan::{Action, MotorSlot},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
enum IRSensor {
    Primary,
    Secondary,
}
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
enum IRMotor {
    Left,
    Right,
    Arm,
}
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
enum IRStop {
    Coast,
    Brake,
    Hold,
}
#[derive(Serialize, Deserialize, Debug, Clone)]
enum IRAction {
    Straight(f64),
    Turn(f64),
    Stop,
    Settings(f64, f64, f64, f64),
    LineFollow {
        sensor: IRSensor,
        rotations: f64,
        speed: f64,
        kp: f64,
        kd: f64,
    },
    RunTarget {
        motor: IRMotor,
        speed: f64,
        target: f64,
        then: IRStop,
        wait: bool,
    },
    RunUntilStalled {
        motor: IRMotor,
        speed: f64,
        then: IRStop,
        duty_limit: f64,
    },
    StopMotor(IRMotor),
    Wait(u64),
}
#[derive(Serialize, Deserialize, Debug, Clone)]
struct IRRoutine {
    name: String,
    actions: Vec<IRAction>,
}

include!(concat!(env!("OUT_DIR"), "/routines_index.rs"));

fn map_sensor(s: IRSensor) -> SensorId {
    match s {
        IRSensor::Primary => SensorId::Primary,
        IRSensor::Secondary => SensorId::Secondary,
    }
}

fn map_motor(m: IRMotor) -> MotorSlot {
    match m {
        IRMotor::Left => MotorSlot::Left,
        IRMotor::Right => MotorSlot::Right,
        IRMotor::Arm => MotorSlot::Arm,
    }
}

fn map_stop(s: IRStop) -> Stop {
    match s {
        IRStop::Coast => Stop::Coast,
        IRStop::Brake => Stop::Brake,
        IRStop::Hold => Stop::Hold,
    }
}

fn map_action(a: IRAction) -> Action {
    match a {
        IRAction::Straight(d) => Action::Straight(d),
        IRAction::Turn(a) => Action::Turn(a),
        IRAction::Stop => Action::Stop,
        IRAction::Settings(s, sa, t, ta) => Action::Settings(DriveSettings::new(s, sa, t, ta)),
        IRAction::LineFollow {
            sensor,
            rotations,
            speed,
            kp,
            kd,
        } => Action::LineFollow(
            map_sensor(sensor),
            LineFollowParams::new(rotations, speed, kp, kd),
        ),
        IRAction::RunTarget {
            motor,
            speed,
            target,
            then,
            wait,
        } => Action::RunTarget {
            motor: map_motor(motor),
            speed,
            target,
            then: map_stop(then),
            wait,
        },
        IRAction::RunUntilStalled {
            motor,
            speed,
            then,
            duty_limit,
        } => Action::RunUntilStalled {
            motor: map_motor(motor),
            speed,
            then: map_stop(then),
            duty_limit,
        },
        IRAction::StopMotor(m) => Action::StopMotor(map_motor(m)),
        IRAction::Wait(ms) => Action::Wait(ms),
    }
}

/// Decodes the routine compiled from `<name>.routine`.
pub fn load(name: &str) -> Result<Vec<Action>, Error> {
    let (_, bytes) = ROUTINE_BLOBS
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| Error::UnknownRoutine(name.to_string()))?;
    let ir = postcard::from_bytes::<IRRoutine>(bytes)
        .map_err(|_| Error::BadRoutine(name.to_string()))?;
    Ok(ir.actions.into_iter().map(map_action).collect())
}

pub fn list_names() -> Vec<String> {
    let mut out = Vec::new();
    for (name, _) in ROUTINE_BLOBS {
        out.push(String::from(*name));
    }
    out
}

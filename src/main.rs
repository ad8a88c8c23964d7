#![no_main]
#![no_std]
extern crate alloc;

use log::{LevelFilter, error, info, warn};
use vexide::prelude::*;

use linebreakers::{
    calibration::JsonCalibrationStore,
    hardware::{V5ColorSensor, V5Drivebase, V5Motor, V5Panel, V5Scheduler, V5Storage},
    logger,
    operator::{prompt_calibration, run_calibration},
    plan::Robot,
    reflectance::warm_up,
};

#[vexide::main]
async fn main(peripherals: Peripherals) {
    let _ = logger::init(LevelFilter::Info);

    let mut panel = V5Panel::new(peripherals.display, peripherals.primary_controller);
    let mut robot = Robot {
        drivebase: V5Drivebase::new(
            Motor::new(peripherals.port_2, Gearset::Green, Direction::Forward),
            Motor::new(peripherals.port_3, Gearset::Green, Direction::Reverse),
        ),
        arm: V5Motor::new(Motor::new(peripherals.port_1, Gearset::Green, Direction::Forward)),
        primary: V5ColorSensor::new(OpticalSensor::new(peripherals.port_4)),
        secondary: V5ColorSensor::new(OpticalSensor::new(peripherals.port_5)),
        store: JsonCalibrationStore::new(V5Storage),
        scheduler: V5Scheduler,
    };

    // light both sensors before anyone calibrates against them
    if let Err(e) = warm_up(&mut robot.primary).and(warm_up(&mut robot.secondary)) {
        warn!("startup: sensor warm-up failed: {}", e);
    }

    if prompt_calibration(&mut panel, &mut robot.scheduler).await {
        if let Err(e) = run_calibration(
            &mut panel,
            &mut robot.scheduler,
            &mut robot.store,
            &mut robot.primary,
            &mut robot.secondary,
        )
        .await
        {
            error!("calibration: {}", e);
            return;
        }
    }

    match robot.run_missions(&mut panel).await {
        Ok(_) => info!("all missions run"),
        Err(e) => error!("missions: {}", e),
    }
}

//! Calibrated PD line following on one light sensor.
//!
//! The robot rides the edge of a line: the midpoint between the calibrated
//! black and white readings is the setpoint, and the signed distance of each
//! live reading from it steers the drivebase. The loop runs until the two
//! drive wheels have turned, on average, the requested number of rotations.

use core::num::NonZeroU32;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    actuator::{AngleMotor, Drivebase, Scheduler, Side},
    calibration::{CalibrationStore, SensorId},
    error::{DeviceError, Error},
    reflectance::ColorSensor,
};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineFollowParams {
    /// Average drive wheel rotations to cover before stopping.
    pub target_rotations: f64,
    /// mm/s
    pub base_speed: f64,
    pub kp: f64,
    pub kd: f64,
}

impl LineFollowParams {
    pub fn new(target_rotations: f64, base_speed: f64, kp: f64, kd: f64) -> Self {
        Self {
            target_rotations,
            base_speed,
            kp,
            kd,
        }
    }

    pub fn target_degrees(&self) -> f64 {
        360.0 * self.target_rotations
    }
}

/// Proportional-derivative term on the deviation from the midpoint.
///
/// With `stale_every = Some(n)` the remembered deviation is only refreshed
/// on every n-th step (when a wrapping step counter reaches `n - 1`), so the
/// derivative is taken against an older reading most of the time. `n = 1`
/// behaves exactly like `None`.
#[derive(Copy, Clone, Debug)]
pub struct Pd {
    pub kp: f64,
    pub kd: f64,
    stale_every: Option<NonZeroU32>,
    last_deviation: f64,
    counter: u32,
}

impl Pd {
    pub fn new(kp: f64, kd: f64, stale_every: Option<NonZeroU32>) -> Self {
        Self {
            kp,
            kd,
            stale_every,
            last_deviation: 0.0,
            counter: 0,
        }
    }

    /// Turn rate for this step's deviation.
    pub fn next(&mut self, deviation: f64) -> f64 {
        let proportional = self.kp * deviation;
        let derivative = (deviation - self.last_deviation) * self.kd;

        match self.stale_every {
            None => self.last_deviation = deviation,
            Some(n) => {
                let n = n.get();
                self.counter += 1;
                if self.counter == n {
                    self.counter = 0;
                }
                if self.counter == n - 1 {
                    self.last_deviation = deviation;
                }
            }
        }

        proportional + derivative
    }

    pub fn last_deviation(&self) -> f64 {
        self.last_deviation
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FollowSummary {
    /// Drive commands issued.
    pub ticks: u32,
    /// Average wheel angle when the loop exited.
    pub distance_degrees: f64,
}

/// One line-following behavior bound to a sensor and its calibration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineFollower {
    pub sensor: SensorId,
    pub stale_every: Option<NonZeroU32>,
}

impl LineFollower {
    pub const fn primary() -> Self {
        Self {
            sensor: SensorId::Primary,
            stale_every: None,
        }
    }

    /// The secondary sensor's follower only refreshes its derivative
    /// reference every fifth step.
    // TODO: confirm with the drive team whether the five-step refresh was intended
    pub const fn secondary() -> Self {
        Self {
            sensor: SensorId::Secondary,
            stale_every: NonZeroU32::new(5),
        }
    }

    pub const fn for_sensor(sensor: SensorId) -> Self {
        match sensor {
            SensorId::Primary => Self::primary(),
            SensorId::Secondary => Self::secondary(),
        }
    }

    /// Follows the line until the target distance is covered, then stops.
    ///
    /// Calibration is loaded before anything touches the motors, so a
    /// missing record fails with [`Error::NotCalibrated`] and the robot
    /// never moves. There is no timeout: a wheel that never turns keeps
    /// this loop running.
    pub async fn follow<D, S, C, T>(
        &self,
        params: LineFollowParams,
        drivebase: &mut D,
        sensor: &mut S,
        store: &C,
        scheduler: &mut T,
    ) -> Result<FollowSummary, Error>
    where
        D: Drivebase,
        S: ColorSensor,
        C: CalibrationStore,
        T: Scheduler,
    {
        let calibration = store.load(self.sensor)?;
        let midpoint = calibration.midpoint();
        let target = params.target_degrees();

        drivebase.wheel(Side::Left).reset_angle()?;
        drivebase.wheel(Side::Right).reset_angle()?;

        info!(
            "line_follow: {:?} sensor, midpoint {:.2}, target {:.0} deg",
            self.sensor, midpoint, target
        );

        let mut pd = Pd::new(params.kp, params.kd, self.stale_every);
        let mut ticks = 0u32;
        let distance_degrees = loop {
            let distance = wheel_distance(drivebase)?;
            if distance >= target {
                break distance;
            }

            let deviation = sensor.reflectance()? - midpoint;
            let turn_rate = pd.next(deviation);
            drivebase.drive(params.base_speed, turn_rate)?;
            ticks += 1;

            scheduler.tick().await;
        };

        drivebase.stop()?;
        debug!(
            "line_follow: done after {} ticks at {:.1} deg",
            ticks, distance_degrees
        );

        Ok(FollowSummary {
            ticks,
            distance_degrees,
        })
    }
}

fn wheel_distance<D: Drivebase>(drivebase: &mut D) -> Result<f64, DeviceError> {
    let left = drivebase.wheel(Side::Left).angle()?;
    let right = drivebase.wheel(Side::Right).angle()?;
    Ok((left + right) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calibration::{CalibrationRecord, JsonCalibrationStore, MemoryStorage},
        mock::{DriveCall, MockDrivebase, MockScheduler, MockSensor},
    };
    use approx::assert_relative_eq;
    use pollster::block_on;

    fn calibrated(black: f64, white: f64) -> JsonCalibrationStore<MemoryStorage> {
        let mut store = JsonCalibrationStore::new(MemoryStorage::new());
        let record = CalibrationRecord::new(black, white);
        store.save(SensorId::Primary, &record).unwrap();
        store.save(SensorId::Secondary, &record).unwrap();
        store
    }

    fn drive_commands(drivebase: &MockDrivebase) -> Vec<(f64, f64)> {
        drivebase
            .calls
            .iter()
            .filter_map(|call| match *call {
                DriveCall::Drive { speed, turn_rate } => Some((speed, turn_rate)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn standard_pd_uses_previous_step() {
        let (kp, kd) = (-0.4, 1.0);
        let deviations = [10.0, -5.0, 2.0, 7.5];
        let mut pd = Pd::new(kp, kd, None);
        let mut previous = 0.0;
        for d in deviations {
            assert_relative_eq!(pd.next(d), kp * d + kd * (d - previous));
            previous = d;
        }
    }

    #[test]
    fn stale_pd_refreshes_every_fifth_step() {
        let (kp, kd) = (0.5, 2.0);
        let mut pd = Pd::new(kp, kd, NonZeroU32::new(5));
        let deviations: Vec<f64> = (0..14).map(|i| (i * i) as f64 - 20.0).collect();

        // reference = deviation of the most recent refresh (steps 3, 8, 13)
        for (i, &d) in deviations.iter().enumerate() {
            let reference = match i {
                0..=3 => 0.0,
                4..=8 => deviations[3],
                _ => deviations[8],
            };
            assert_relative_eq!(pd.next(d), kp * d + kd * (d - reference));
        }
        assert_relative_eq!(pd.last_deviation(), deviations[13]);
    }

    #[test]
    fn stale_every_one_is_standard() {
        let mut stale = Pd::new(1.5, 0.3, NonZeroU32::new(1));
        let mut standard = Pd::new(1.5, 0.3, None);
        for d in [4.0, -2.0, 9.0, 0.5] {
            assert_relative_eq!(stale.next(d), standard.next(d));
        }
    }

    #[test]
    fn midpoint_sample_gives_zero_turn() {
        let store = calibrated(20.0, 80.0);
        let mut drivebase = MockDrivebase::new(30.0);
        let mut sensor = MockSensor::constant(50.0);
        let mut scheduler = MockScheduler::default();

        let params = LineFollowParams::new(1.0, 175.0, -0.4, 1.0);
        block_on(LineFollower::primary().follow(
            params,
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();

        let commands = drive_commands(&drivebase);
        assert_eq!(commands.len(), 12);
        assert!(commands.iter().all(|&c| c == (175.0, 0.0)));
        assert_eq!(drivebase.calls.last(), Some(&DriveCall::Stop));
        assert_eq!(scheduler.ticks, 12);
    }

    #[test]
    fn turn_rates_follow_samples() {
        let store = calibrated(20.0, 80.0);
        let mut drivebase = MockDrivebase::new(120.0);
        let mut sensor = MockSensor::sequence(&[60.0, 45.0, 52.0]);
        let mut scheduler = MockScheduler::default();

        let params = LineFollowParams::new(1.0, 150.0, -0.4, 1.0);
        block_on(LineFollower::primary().follow(
            params,
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();

        let commands = drive_commands(&drivebase);
        assert_eq!(commands.len(), 3);
        assert_relative_eq!(commands[0].1, 6.0);
        assert_relative_eq!(commands[1].1, -13.0);
        assert_relative_eq!(commands[2].1, 6.2, epsilon = 1e-9);
    }

    #[test]
    fn stops_once_at_first_tick_past_target() {
        let store = calibrated(20.0, 80.0);
        let mut drivebase = MockDrivebase::new(25.0);
        let mut sensor = MockSensor::constant(65.0);
        let mut scheduler = MockScheduler::default();

        let params = LineFollowParams::new(1.5, 100.0, 0.4, 1.0);
        let summary = block_on(LineFollower::primary().follow(
            params,
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();

        // 540 deg at 25 deg per command: 22 commands reach 550
        assert_eq!(summary.ticks, 22);
        assert_relative_eq!(summary.distance_degrees, 550.0);
        let stops = drivebase
            .calls
            .iter()
            .filter(|c| **c == DriveCall::Stop)
            .count();
        assert_eq!(stops, 1);
        assert_eq!(drivebase.calls.last(), Some(&DriveCall::Stop));
    }

    #[test]
    fn wheel_angles_are_reset_on_entry() {
        let store = calibrated(20.0, 80.0);
        let mut drivebase = MockDrivebase::new(90.0);
        drivebase.left.angle = 5000.0;
        drivebase.right.angle = 5000.0;
        let mut sensor = MockSensor::constant(50.0);
        let mut scheduler = MockScheduler::default();

        let summary = block_on(LineFollower::primary().follow(
            LineFollowParams::new(1.0, 175.0, -0.4, 1.0),
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();

        assert_eq!(summary.ticks, 4);
        assert_eq!(drivebase.left.resets, 1);
        assert_eq!(drivebase.right.resets, 1);
    }

    #[test]
    fn missing_calibration_never_moves() {
        let store = JsonCalibrationStore::new(MemoryStorage::new());
        let mut drivebase = MockDrivebase::new(30.0);
        let mut sensor = MockSensor::constant(50.0);
        let mut scheduler = MockScheduler::default();

        let result = block_on(LineFollower::secondary().follow(
            LineFollowParams::new(1.0, 175.0, -0.4, 1.0),
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ));

        assert!(matches!(
            result,
            Err(Error::NotCalibrated(SensorId::Secondary))
        ));
        assert!(drivebase.calls.is_empty());
        assert_eq!(drivebase.left.resets + drivebase.right.resets, 0);
        assert_eq!(sensor.reads, 0);
    }

    #[test]
    fn calibration_is_reloaded_every_call() {
        let mut store = calibrated(20.0, 80.0);
        let mut drivebase = MockDrivebase::new(360.0);
        let mut sensor = MockSensor::constant(50.0);
        let mut scheduler = MockScheduler::default();
        let params = LineFollowParams::new(1.0, 100.0, 1.0, 0.0);

        block_on(LineFollower::primary().follow(
            params,
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();
        store
            .save(SensorId::Primary, &CalibrationRecord::new(0.0, 40.0))
            .unwrap();
        block_on(LineFollower::primary().follow(
            params,
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();

        let commands = drive_commands(&drivebase);
        assert_relative_eq!(commands[0].1, 0.0);
        assert_relative_eq!(commands[1].1, 30.0);
    }

    #[test]
    fn secondary_follower_uses_stale_derivative() {
        let samples: Vec<f64> = (50..58).map(f64::from).collect();
        let params = LineFollowParams::new(1.0, 100.0, 0.0, 1.0);

        let turn_rates = |follower: LineFollower| {
            let store = calibrated(20.0, 80.0);
            let mut drivebase = MockDrivebase::new(45.0);
            let mut sensor = MockSensor::sequence(&samples);
            let mut scheduler = MockScheduler::default();
            block_on(follower.follow(
                params,
                &mut drivebase,
                &mut sensor,
                &store,
                &mut scheduler,
            ))
            .unwrap();
            let stops = drivebase
                .calls
                .iter()
                .filter(|c| **c == DriveCall::Stop)
                .count();
            assert_eq!(stops, 1);
            drive_commands(&drivebase)
                .into_iter()
                .map(|(_, turn_rate)| turn_rate)
                .collect::<Vec<_>>()
        };

        // reference deviation refreshes after the fourth sample
        assert_eq!(
            turn_rates(LineFollower::secondary()),
            vec![0.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            turn_rates(LineFollower::primary()),
            vec![0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn secondary_follower_reads_its_own_calibration() {
        let mut store = JsonCalibrationStore::new(MemoryStorage::new());
        store
            .save(SensorId::Secondary, &CalibrationRecord::new(10.0, 30.0))
            .unwrap();
        let mut drivebase = MockDrivebase::new(360.0);
        let mut sensor = MockSensor::constant(25.0);
        let mut scheduler = MockScheduler::default();

        block_on(LineFollower::secondary().follow(
            LineFollowParams::new(1.0, 100.0, 2.0, 0.0),
            &mut drivebase,
            &mut sensor,
            &store,
            &mut scheduler,
        ))
        .unwrap();

        assert_eq!(drive_commands(&drivebase), vec![(100.0, 10.0)]);
    }
}

//! Button-to-mission dispatch.

extern crate alloc;
use alloc::collections::BTreeSet;

use log::info;

use crate::{
    actuator::{Drivebase, Scheduler},
    calibration::CalibrationStore,
    error::Error,
    operator::{Button, OperatorPanel, draw_mission_map},
    plan::Robot,
    reflectance::ColorSensor,
    routines,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mission {
    CargoPlane,
    TruckBridge,
    TruckToTruck,
    /// Lifts the arm into its hard stop. A pit utility, not a scored run.
    ArmRaise,
    HomeDelivery,
}

impl Mission {
    pub const ALL: [Mission; 5] = [
        Mission::CargoPlane,
        Mission::TruckBridge,
        Mission::TruckToTruck,
        Mission::ArmRaise,
        Mission::HomeDelivery,
    ];

    pub fn for_button(button: Button) -> Self {
        match button {
            Button::Left => Mission::CargoPlane,
            Button::Up => Mission::TruckBridge,
            Button::Right => Mission::TruckToTruck,
            Button::Down => Mission::ArmRaise,
            Button::Center => Mission::HomeDelivery,
        }
    }

    pub fn button(self) -> Button {
        match self {
            Mission::CargoPlane => Button::Left,
            Mission::TruckBridge => Button::Up,
            Mission::TruckToTruck => Button::Right,
            Mission::ArmRaise => Button::Down,
            Mission::HomeDelivery => Button::Center,
        }
    }

    /// Name of the compiled routine holding this mission's moves.
    pub fn routine(self) -> &'static str {
        match self {
            Mission::CargoPlane => "cargo_plane",
            Mission::TruckBridge => "truck_bridge",
            Mission::TruckToTruck => "truck_to_truck",
            Mission::ArmRaise => "arm_raise",
            Mission::HomeDelivery => "home_delivery",
        }
    }

    /// Whether finishing this mission counts toward ending the menu.
    pub fn is_tracked(self) -> bool {
        !matches!(self, Mission::ArmRaise)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MissionTracker {
    completed: BTreeSet<Mission>,
}

impl MissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&mut self, mission: Mission) {
        if mission.is_tracked() {
            self.completed.insert(mission);
        }
    }

    pub fn is_complete(&self, mission: Mission) -> bool {
        self.completed.contains(&mission)
    }

    pub fn remaining(&self) -> impl Iterator<Item = Mission> + '_ {
        Mission::ALL
            .into_iter()
            .filter(|m| m.is_tracked() && !self.completed.contains(m))
    }

    pub fn all_done(&self) -> bool {
        self.remaining().next().is_none()
    }
}

impl<D, S, C, T> Robot<D, S, C, T>
where
    D: Drivebase,
    S: ColorSensor,
    C: CalibrationStore,
    T: Scheduler,
{
    /// Shows the mission map and runs whatever the operator picks until every
    /// tracked mission has run once. Missions can be re-run; a failing
    /// mission ends the menu.
    pub async fn run_missions<P: OperatorPanel>(
        &mut self,
        panel: &mut P,
    ) -> Result<MissionTracker, Error> {
        let mut tracker = MissionTracker::new();
        panel.clear();

        while !tracker.all_done() {
            draw_mission_map(panel);

            // One snapshot per pass. A button first pressed while a mission
            // runs is picked up on the next pass.
            for button in panel.pressed().iter() {
                let mission = Mission::for_button(button);
                info!("missions: starting {:?}", mission);
                let plan = routines::load(mission.routine())?;
                self.run_plan(plan).await?;
                tracker.complete(mission);
                info!("missions: {:?} finished", mission);
            }

            self.scheduler.tick().await;
        }

        info!("missions: all missions complete");
        Ok(tracker)
    }
}

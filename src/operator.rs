//! Brain screen prompts and the button-driven calibration flow.

use log::info;

use crate::{
    actuator::Scheduler,
    calibration::{CalibrationStore, SensorId, record_black, record_white},
    config::ROBOT,
    error::Error,
    reflectance::ColorSensor,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    Up,
    Down,
    Center,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::Left,
        Button::Up,
        Button::Right,
        Button::Down,
        Button::Center,
    ];

    const fn bit(self) -> u8 {
        match self {
            Button::Left => 1 << 0,
            Button::Right => 1 << 1,
            Button::Up => 1 << 2,
            Button::Down => 1 << 3,
            Button::Center => 1 << 4,
        }
    }
}

/// Buttons held down during one poll.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Buttons(u8);

impl Buttons {
    pub const NONE: Self = Self(0);

    pub const fn with(self, button: Button) -> Self {
        Self(self.0 | button.bit())
    }

    pub const fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl From<Button> for Buttons {
    fn from(button: Button) -> Self {
        Buttons::NONE.with(button)
    }
}

/// Screen and buttons the operator interacts with.
pub trait OperatorPanel {
    fn pressed(&mut self) -> Buttons;
    fn clear(&mut self);
    fn draw_text(&mut self, x: i16, y: i16, text: &str);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Surface {
    Black,
    White,
}

struct CalibrationStep {
    sensor: SensorId,
    surface: Surface,
    prompt: [&'static str; 2],
}

const CALIBRATION_STEPS: [CalibrationStep; 4] = [
    CalibrationStep {
        sensor: SensorId::Primary,
        surface: Surface::Black,
        prompt: ["Place right light", "sensor on black!"],
    },
    CalibrationStep {
        sensor: SensorId::Primary,
        surface: Surface::White,
        prompt: ["Place right light", "sensor on white!"],
    },
    CalibrationStep {
        sensor: SensorId::Secondary,
        surface: Surface::Black,
        prompt: ["Place left light", "sensor on black!"],
    },
    CalibrationStep {
        sensor: SensorId::Secondary,
        surface: Surface::White,
        prompt: ["Place left light", "sensor on white!"],
    },
];

pub async fn wait_for_press<P, T>(panel: &mut P, scheduler: &mut T, button: Button)
where
    P: OperatorPanel,
    T: Scheduler,
{
    while !panel.pressed().contains(button) {
        scheduler.tick().await;
    }
}

/// Asks whether to calibrate. Up answers yes, Down answers no; Down wins if
/// both are held.
pub async fn prompt_calibration<P, T>(panel: &mut P, scheduler: &mut T) -> bool
where
    P: OperatorPanel,
    T: Scheduler,
{
    panel.clear();
    panel.draw_text(3, 20, "   Do you want to");
    panel.draw_text(5, 40, "       calibrate?");
    panel.draw_text(6, 60, "(Press Up for Yes");
    panel.draw_text(8, 80, "and Down for No)");

    loop {
        let pressed = panel.pressed();
        if pressed.contains(Button::Down) {
            // the release would otherwise land in the mission menu
            scheduler.sleep(ROBOT.decline_debounce).await;
            return false;
        }
        if pressed.contains(Button::Up) {
            return true;
        }
        scheduler.tick().await;
    }
}

/// Walks the operator through black then white for the right (primary)
/// sensor, then the left (secondary) one, saving after every confirm.
pub async fn run_calibration<P, T, C, S>(
    panel: &mut P,
    scheduler: &mut T,
    store: &mut C,
    primary: &mut S,
    secondary: &mut S,
) -> Result<(), Error>
where
    P: OperatorPanel,
    T: Scheduler,
    C: CalibrationStore,
    S: ColorSensor,
{
    for step in &CALIBRATION_STEPS {
        panel.clear();
        panel.draw_text(15, 45, step.prompt[0]);
        panel.draw_text(15, 65, step.prompt[1]);

        wait_for_press(panel, scheduler, Button::Center).await;

        let sensor = match step.sensor {
            SensorId::Primary => &mut *primary,
            SensorId::Secondary => &mut *secondary,
        };
        let sample = sensor.reflectance()?;
        match step.surface {
            Surface::Black => record_black(store, step.sensor, sample)?,
            Surface::White => record_white(store, step.sensor, sample)?,
        };

        scheduler.sleep(ROBOT.confirm_debounce).await;
    }
    panel.clear();
    info!("calibration: complete");
    Ok(())
}

/// Which button starts which program, laid out like the brick's buttons.
pub fn draw_mission_map<P: OperatorPanel>(panel: &mut P) {
    panel.draw_text(0, 0, "Pick Program");
    panel.draw_text(85, 28, "1");
    panel.draw_text(41, 60, "2");
    panel.draw_text(85, 60, "3");
    panel.draw_text(130, 60, "4");
    panel.draw_text(85, 92, "5");
}

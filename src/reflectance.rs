use crate::error::DeviceError;

/// Raw channel intensities from a color sensor.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    pub fn mean(&self) -> f64 {
        (self.red + self.green + self.blue) / 3.0
    }
}

pub trait ColorSensor {
    fn rgb(&mut self) -> Result<Rgb, DeviceError>;

    /// Single scalar reflectance: the mean of the three channels. Reading
    /// all three keeps every emitter lit.
    fn reflectance(&mut self) -> Result<f64, DeviceError> {
        Ok(self.rgb()?.mean())
    }
}

/// Takes one reading and throws it away so the sensor's emitters are on
/// before anyone calibrates against it.
pub fn warm_up<S: ColorSensor>(sensor: &mut S) -> Result<(), DeviceError> {
    sensor.reflectance().map(|_| ())
}

//! Persisted black/white reference readings for the two light sensors.
//!
//! Each sensor owns one small JSON file on the SD card, e.g.
//! `{"black":21.3,"white":84.0}`. Files are rewritten whole on every
//! calibration step, so whatever was written last is what the line follower
//! sees on its next run, including after a power cycle.

extern crate alloc;
use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::ROBOT,
    error::{Error, StorageError},
};

/// White value written alongside a fresh black reading, until the white
/// step replaces it.
pub const PLACEHOLDER_WHITE: f64 = 100.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorId {
    /// Right-hand sensor, used by the standard line follower.
    Primary,
    /// Left-hand sensor.
    Secondary,
}

impl SensorId {
    pub fn path(self) -> &'static str {
        match self {
            SensorId::Primary => ROBOT.primary_calibration_path,
            SensorId::Secondary => ROBOT.secondary_calibration_path,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub black: f64,
    pub white: f64,
}

impl CalibrationRecord {
    pub fn new(black: f64, white: f64) -> Self {
        Self { black, white }
    }

    /// Reflectance halfway between the two references; the edge of the line.
    pub fn midpoint(&self) -> f64 {
        (self.black + self.white) / 2.0
    }

    /// A lighter surface should reflect more. When this is false the
    /// follower steers away from the line instead of along it.
    pub fn is_ordered(&self) -> bool {
        self.white > self.black
    }
}

/// Byte-level persistence used by [`JsonCalibrationStore`].
pub trait Storage {
    fn read_to_string(&self, path: &str) -> Result<String, StorageError>;
    fn write(&mut self, path: &str, contents: &str) -> Result<(), StorageError>;
}

/// Volatile storage, for running the core off the robot.
#[derive(Default, Debug, Clone)]
pub struct MemoryStorage {
    files: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn read_to_string(&self, path: &str) -> Result<String, StorageError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }

    fn write(&mut self, path: &str, contents: &str) -> Result<(), StorageError> {
        self.files.insert(path.to_string(), contents.to_string());
        Ok(())
    }
}

pub trait CalibrationStore {
    /// Most recently saved record for `sensor`.
    ///
    /// A missing or undecodable file is [`Error::NotCalibrated`].
    fn load(&self, sensor: SensorId) -> Result<CalibrationRecord, Error>;

    /// Replaces any record previously saved for `sensor`.
    fn save(&mut self, sensor: SensorId, record: &CalibrationRecord) -> Result<(), Error>;
}

pub struct JsonCalibrationStore<S> {
    storage: S,
}

impl<S: Storage> JsonCalibrationStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> CalibrationStore for JsonCalibrationStore<S> {
    fn load(&self, sensor: SensorId) -> Result<CalibrationRecord, Error> {
        let text = match self.storage.read_to_string(sensor.path()) {
            Ok(text) => text,
            Err(e) => {
                debug!("calibration: load {:?} failed: {}", sensor, e);
                return Err(Error::NotCalibrated(sensor));
            }
        };
        serde_json::from_str(&text).map_err(|e| {
            debug!("calibration: {} is unreadable: {}", sensor.path(), e);
            Error::NotCalibrated(sensor)
        })
    }

    fn save(&mut self, sensor: SensorId, record: &CalibrationRecord) -> Result<(), Error> {
        let text = serde_json::to_string(record).map_err(|e| Error::Encode(e.to_string()))?;
        self.storage.write(sensor.path(), &text)?;
        Ok(())
    }
}

/// First calibration step: the sensor is over black.
pub fn record_black<C: CalibrationStore>(
    store: &mut C,
    sensor: SensorId,
    sample: f64,
) -> Result<CalibrationRecord, Error> {
    let record = CalibrationRecord::new(sample, PLACEHOLDER_WHITE);
    store.save(sensor, &record)?;
    debug!("calibration: {:?} black = {:.2}", sensor, sample);
    Ok(record)
}

/// Second calibration step: the sensor is over white. Keeps the stored black.
pub fn record_white<C: CalibrationStore>(
    store: &mut C,
    sensor: SensorId,
    sample: f64,
) -> Result<CalibrationRecord, Error> {
    let black = store.load(sensor)?.black;
    let record = CalibrationRecord::new(black, sample);
    store.save(sensor, &record)?;
    debug!("calibration: {:?} white = {:.2}", sensor, sample);
    if !record.is_ordered() {
        warn!(
            "calibration: {:?} white ({:.2}) is not above black ({:.2}), line following will invert",
            sensor, record.white, record.black
        );
    }
    Ok(record)
}

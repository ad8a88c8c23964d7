extern crate alloc;
use alloc::string::String;

use thiserror::Error;

use crate::calibration::SensorId;

/// A hardware read or write that the device refused.
///
/// Nothing in the crate retries these; they halt whatever mission is running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{device}: {message}")]
pub struct DeviceError {
    pub device: &'static str,
    pub message: String,
}

impl DeviceError {
    pub fn new(device: &'static str, message: impl Into<String>) -> Self {
        Self {
            device,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("no file at {0}")]
    Missing(String),
    #[error("could not access {path}: {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0:?} light sensor has not been calibrated")]
    NotCalibrated(SensorId),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("could not encode calibration record: {0}")]
    Encode(String),
    #[error("no routine named {0:?}")]
    UnknownRoutine(String),
    #[error("routine {0:?} could not be decoded")]
    BadRoutine(String),
}

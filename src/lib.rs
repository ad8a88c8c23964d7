#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod actuator;
pub mod calibration;
pub mod config;
pub mod error;
pub mod line_follow;
pub mod mission;
pub mod operator;
pub mod plan;
pub mod reflectance;
pub mod routines;

#[cfg(feature = "robot")]
pub mod hardware;
#[cfg(feature = "robot")]
pub mod logger;

#[cfg(test)]
pub(crate) mod mock;

pub use error::{DeviceError, Error, StorageError};

//! Sun-tracking shading engine: computes where a window covering has to be
//! to keep direct sunlight out, and drives that position into the device
//! while respecting manual overrides, hysteresis and climate policy.

pub mod calculation;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod models;
pub mod ports;
pub mod registry;
pub mod sun;

pub use error::{Error, Result};

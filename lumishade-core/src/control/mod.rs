//! Which target a cover should aim for under its current mode.

pub mod mapping;
pub mod strategy;

pub use mapping::{Interpolation, PositionMapping};
pub use strategy::{ControlStrategy, PolicyInputs, Selection};

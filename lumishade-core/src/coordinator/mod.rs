pub mod control_loop;
pub mod cover;
pub mod room;

use std::sync::Arc;

use crate::calculation::{FlatWindowCalculator, ShadeCalculator};
use crate::ports::{ActuationSink, Clock, Ephemeris, SensorSource, SystemClock};

pub use control_loop::{ControlLoop, Decision, HoldReason, ObservationOutcome};
pub use cover::{CoverConfig, CoverCoordinator};
pub use room::{RoomConfig, RoomCoordinator, SharedInputs};

/// External services a cover coordinator talks to.
#[derive(Clone)]
pub struct CoverPorts {
    pub ephemeris: Arc<dyn Ephemeris>,
    pub sensors: Arc<dyn SensorSource>,
    pub sink: Arc<dyn ActuationSink>,
    pub clock: Arc<dyn Clock>,
    pub calculator: Arc<dyn ShadeCalculator>,
}

impl CoverPorts {
    pub fn new(
        ephemeris: Arc<dyn Ephemeris>,
        sensors: Arc<dyn SensorSource>,
        sink: Arc<dyn ActuationSink>,
    ) -> Self {
        Self {
            ephemeris,
            sensors,
            sink,
            clock: Arc::new(SystemClock),
            calculator: Arc::new(FlatWindowCalculator),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn ShadeCalculator>) -> Self {
        self.calculator = calculator;
        self
    }
}

/// External services a room coordinator talks to.
#[derive(Clone)]
pub struct RoomPorts {
    pub sensors: Arc<dyn SensorSource>,
    pub clock: Arc<dyn Clock>,
}

impl RoomPorts {
    pub fn new(sensors: Arc<dyn SensorSource>) -> Self {
        Self {
            sensors,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

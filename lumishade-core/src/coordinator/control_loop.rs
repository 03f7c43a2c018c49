use time::OffsetDateTime;
use tracing::debug;

use crate::models::{AutomationPolicy, ControlState, CoverState, PositionObservation, ResetTrigger};

/// What an observed position turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationOutcome {
    /// Intermediate position skipped by policy
    Ignored,
    /// The device moving towards, or arriving at, our own command
    Echo,
    /// Consistent with the last command, nothing changes
    Tracked,
    OverrideDetected,
    OverrideReset(ResetTrigger),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    Disabled,
    NoTarget,
    ManualOverride,
    OutsideActiveWindow,
    AtTarget,
    BelowMinDelta,
    TooSoon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Actuate(u8),
    Hold(HoldReason),
}

/// Override detection and hysteresis for one cover. Holds no I/O; the
/// coordinator feeds observations and targets in and carries decisions out.
#[derive(Debug, Clone, Default)]
pub struct ControlLoop {
    current_position: Option<u8>,
    commanded_position: Option<u8>,
    last_actuation_time: Option<OffsetDateTime>,
    state: ControlState,
    in_transit: bool,
}

impl ControlLoop {
    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn current_position(&self) -> Option<u8> {
        self.current_position
    }

    pub fn commanded_position(&self) -> Option<u8> {
        self.commanded_position
    }

    pub fn last_actuation_time(&self) -> Option<OffsetDateTime> {
        self.last_actuation_time
    }

    pub fn is_overridden(&self) -> bool {
        self.state == ControlState::ManualOverride
    }

    /// Copies the loop's view into a published cover state.
    pub fn fill(&self, state: &mut CoverState) {
        state.current_position = self.current_position;
        state.commanded_position = self.commanded_position;
        state.last_actuation_time = self.last_actuation_time;
        state.control_state = self.state;
        state.manual_override = self.is_overridden();
    }

    pub fn observe(
        &mut self,
        observation: PositionObservation,
        policy: &AutomationPolicy,
        now: OffsetDateTime,
    ) -> ObservationOutcome {
        if observation.moving && policy.ignore_intermediate {
            return ObservationOutcome::Ignored;
        }

        let position = observation.position;
        self.current_position = Some(position);

        if self.is_overridden() {
            let trigger = match position {
                100 => Some(ResetTrigger::FullyOpen),
                0 => Some(ResetTrigger::FullyClosed),
                _ => None,
            };

            return match trigger.filter(|trigger| policy.resets_on(*trigger)) {
                Some(trigger) => {
                    self.begin_reset();
                    ObservationOutcome::OverrideReset(trigger)
                }
                None => ObservationOutcome::Tracked,
            };
        }

        let Some(commanded) = self.commanded_position else {
            return ObservationOutcome::Tracked;
        };
        let deviation = position.abs_diff(commanded);

        if self.in_transit {
            if deviation <= policy.override_tolerance {
                self.in_transit = false;
                return ObservationOutcome::Echo;
            }

            let settling = self
                .last_actuation_time
                .is_some_and(|at| now - at < policy.settle_time);
            if settling {
                return ObservationOutcome::Echo;
            }

            self.in_transit = false;
        }

        if deviation > policy.override_tolerance {
            debug!("Observed {} while {} was commanded", position, commanded);
            self.state = ControlState::ManualOverride;
            return ObservationOutcome::OverrideDetected;
        }

        ObservationOutcome::Tracked
    }

    /// Leaves manual override when `trigger` is allowed to. An explicit reset is always allowed.
    pub fn reset_override(&mut self, trigger: ResetTrigger, policy: &AutomationPolicy) -> bool {
        if !self.is_overridden() {
            return false;
        }
        if trigger != ResetTrigger::Explicit && !policy.resets_on(trigger) {
            return false;
        }

        self.begin_reset();
        true
    }

    /// The hand-set position becomes the new baseline, so a reset that ends
    /// without a move does not read the same position as another override.
    fn begin_reset(&mut self) {
        self.state = ControlState::Resetting;
        self.in_transit = false;
        if self.current_position.is_some() {
            self.commanded_position = self.current_position;
        }
    }

    /// `now` must carry the local offset; its time of day is checked against the active window.
    pub fn decide(
        &mut self,
        target: Option<u8>,
        now: OffsetDateTime,
        policy: &AutomationPolicy,
        enabled: bool,
        force: bool,
    ) -> Decision {
        if !enabled {
            if !self.is_overridden() {
                self.state = ControlState::Idle;
            }
            return Decision::Hold(HoldReason::Disabled);
        }

        if self.is_overridden() {
            return Decision::Hold(HoldReason::ManualOverride);
        }

        let force = force || self.state == ControlState::Resetting;

        let Some(target) = target else {
            self.state = ControlState::Idle;
            return Decision::Hold(HoldReason::NoTarget);
        };
        self.state = ControlState::Controlling;

        if policy.active_window.is_some_and(|window| !window.contains(now.time())) {
            return Decision::Hold(HoldReason::OutsideActiveWindow);
        }

        if self.current_position == Some(target) {
            return Decision::Hold(HoldReason::AtTarget);
        }

        if !force {
            if let Some(reference) = self.commanded_position.or(self.current_position) {
                if target.abs_diff(reference) < policy.min_delta_position {
                    return Decision::Hold(HoldReason::BelowMinDelta);
                }
            }
            if let Some(last) = self.last_actuation_time {
                if now - last < policy.min_delta_time {
                    return Decision::Hold(HoldReason::TooSoon);
                }
            }
        }

        Decision::Actuate(target)
    }

    pub fn record_actuation(&mut self, position: u8, now: OffsetDateTime) {
        self.commanded_position = Some(position);
        self.last_actuation_time = Some(now);
        self.state = ControlState::Controlling;
        self.in_transit = true;
    }
}

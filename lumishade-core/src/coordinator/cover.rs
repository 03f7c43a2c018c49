use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::CoverPorts;
use super::control_loop::{ControlLoop, Decision, ObservationOutcome};
use super::room::{RoomCoordinator, SharedInputs};
use crate::calculation;
use crate::control::{ControlStrategy, PolicyInputs, PositionMapping};
use crate::error::{Error, Result};
use crate::models::{
    AutomationPolicy, ClimateThresholds, ClimateTracker, ControlMode, CoverId, CoverSnapshot, CoverState,
    ExposureWindow, GeoLocation, PositionObservation, ResetTrigger, RoomId, SensorToggles, SunSample,
    WindowGeometry,
};
use crate::sun::{DEFAULT_STEP, SunSeries};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverConfig {
    pub id: CoverId,
    pub name: String,
    /// Identifier handed to the actuation sink, defaults to `name`
    #[serde(default)]
    pub device: Option<String>,
    /// Room to join once it is registered
    #[serde(default)]
    pub room: Option<RoomId>,
    pub geometry: WindowGeometry,
    #[serde(default)]
    pub policy: AutomationPolicy,
    #[serde(default)]
    pub thresholds: ClimateThresholds,
    #[serde(default)]
    pub toggles: SensorToggles,
    #[serde(default)]
    pub mapping: PositionMapping,
    #[serde(default)]
    pub mode: ControlMode,
    #[serde(default = "enabled")]
    pub control_enabled: bool,
}

fn enabled() -> bool {
    true
}

/// Settings that can change at runtime. Mode, enablement, thresholds and
/// toggles are ignored while the cover belongs to a room.
#[derive(Debug, Clone)]
struct CoverSettings {
    geometry: WindowGeometry,
    policy: AutomationPolicy,
    thresholds: ClimateThresholds,
    toggles: SensorToggles,
    mapping: PositionMapping,
    mode: ControlMode,
    control_enabled: bool,
}

struct DayCache {
    series: SunSeries,
    exposure: Option<ExposureWindow>,
}

#[derive(Default)]
struct CoverInner {
    control: ControlLoop,
    tracker: ClimateTracker,
    day: Option<DayCache>,
    force_next: bool,
    degraded: bool,
}

/// Newest request served by a finished recomputation, and its failure.
#[derive(Default)]
struct Completed {
    ticket: u64,
    error: Option<Error>,
}

/// Drives one cover: computes its target, runs the control loop and talks
/// to the device. Recomputations never overlap; requests arriving while one
/// runs are served together by the next one.
pub struct CoverCoordinator {
    id: CoverId,
    name: String,
    device: String,
    location: GeoLocation,
    ports: CoverPorts,
    settings: RwLock<CoverSettings>,
    room: RwLock<Option<(RoomId, Weak<RoomCoordinator>)>>,
    inner: Mutex<CoverInner>,
    snapshot: RwLock<CoverSnapshot>,
    requested: AtomicU64,
    completed: Mutex<Completed>,
    shut_down: AtomicBool,
}

impl CoverCoordinator {
    pub fn new(config: CoverConfig, location: GeoLocation, ports: CoverPorts) -> Arc<Self> {
        if let Err(err) = config.geometry.validate() {
            warn!("Cover {} starts with invalid geometry: {}", config.name, err);
        }

        let device = config.device.unwrap_or_else(|| config.name.clone());
        let snapshot = CoverSnapshot::empty(config.id, config.name.clone());

        Arc::new(Self {
            id: config.id,
            name: config.name,
            device,
            location,
            ports,
            settings: RwLock::new(CoverSettings {
                geometry: config.geometry,
                policy: config.policy,
                thresholds: config.thresholds,
                toggles: config.toggles,
                mapping: config.mapping,
                mode: config.mode,
                control_enabled: config.control_enabled,
            }),
            room: RwLock::new(None),
            inner: Mutex::new(CoverInner::default()),
            snapshot: RwLock::new(snapshot),
            requested: AtomicU64::new(0),
            completed: Mutex::new(Completed::default()),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> CoverId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recomputes and actuates if needed. Resolves once a recomputation
    /// started after this call has finished, with that recomputation's error.
    pub async fn refresh(&self) -> Result<CoverSnapshot> {
        if self.is_shut_down() {
            return Err(Error::ShutDown);
        }

        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let mut completed = self.completed.lock().await;
        if completed.ticket >= ticket {
            debug!("Update of {} coalesced", self.name);
            return match &completed.error {
                Some(err) => Err(err.clone()),
                None => Ok(self.snapshot().await),
            };
        }

        let covering = self.requested.load(Ordering::SeqCst);
        let result = self.recompute().await;
        *completed = Completed {
            ticket: covering,
            error: result.as_ref().err().cloned(),
        };

        result
    }

    async fn recompute(&self) -> Result<CoverSnapshot> {
        let now = self.ports.clock.now();
        let settings = self.settings.read().await.clone();
        let room = self.room().await;
        let mut inner = self.inner.lock().await;

        let inputs = match &room {
            Some(room) => {
                let inputs = room.shared_inputs().await;
                if inputs.sensors_failed {
                    let err = Error::SensorUnavailable(format!("room {} sensors", room.name()));
                    return self.skip_tick(&mut inner, err).await;
                }
                inputs
            }
            None => match self.ports.sensors.read_climate().await {
                Ok(readings) => SharedInputs {
                    mode: settings.mode,
                    control_enabled: settings.control_enabled,
                    thresholds: settings.thresholds.clone(),
                    toggles: settings.toggles,
                    climate: inner.tracker.update(readings),
                    degraded: false,
                    sensors_failed: false,
                },
                Err(err) => return self.skip_tick(&mut inner, err).await,
            },
        };

        let sun = match self.ports.ephemeris.solar_position(&self.location, now) {
            Ok((azimuth, elevation)) => SunSample::new(now, azimuth, elevation),
            Err(err) => return self.skip_tick(&mut inner, err).await,
        };

        let (night, exposure) = self.day_info(&mut inner, &settings.geometry, now, &sun);
        let geometry = match (night, settings.geometry.sunset_position) {
            (true, Some(position)) => settings.geometry.with_default_position(position),
            _ => settings.geometry.clone(),
        };

        let selection = ControlStrategy::from(inputs.mode).select_target(&PolicyInputs {
            climate: &inputs.climate,
            thresholds: &inputs.thresholds,
            toggles: &inputs.toggles,
            geometry: &geometry,
            sun: &sun,
            calculator: self.ports.calculator.as_ref(),
            night,
        });

        let max_tilt = geometry.max_tilt();
        let target = selection.map(|selection| {
            let percent = selection.target.as_percent(max_tilt.unwrap_or(100.0));
            settings.mapping.apply(percent).round() as u8
        });

        let force = std::mem::take(&mut inner.force_next);
        let local_now = now.to_offset(self.location.utc_offset());
        let decision = inner.control.decide(
            target,
            local_now,
            &settings.policy,
            inputs.control_enabled,
            force,
        );

        let mut failure = None;
        match decision {
            Decision::Actuate(position) => {
                if self.is_shut_down() {
                    debug!("Dropping actuation of {} after shutdown", self.name);
                    return Err(Error::ShutDown);
                }

                match self.actuate(position, max_tilt).await {
                    Ok(()) => {
                        info!("Moved {} to {}%", self.name, position);
                        inner.control.record_actuation(position, now);
                    }
                    Err(err) => {
                        warn!("Failed to move {} to {}%: {}", self.name, position, err);
                        failure = Some(err);
                    }
                }
            }
            Decision::Hold(reason) => {
                debug!("Holding {} ({:?}), target {:?}", self.name, reason, target);
            }
        }

        inner.degraded = inputs.degraded || inputs.climate.is_degraded();
        if inner.degraded {
            info!("{} runs on last known sensor values", self.name);
        }

        let snapshot = CoverSnapshot {
            cover: self.id,
            name: self.name.clone(),
            room: room.as_ref().map(|room| room.id()),
            state: cover_state(&inner, inputs.mode, inputs.control_enabled),
            target_position: target,
            direct_sun: !night && calculation::is_direct_sun(&geometry, &sun),
            blocking: selection.is_some_and(|selection| selection.blocking),
            sun: Some(sun),
            climate: inputs.climate,
            exposure,
            updated_at: Some(now),
        };
        *self.snapshot.write().await = snapshot.clone();

        match failure {
            Some(err) => Err(err),
            None => Ok(snapshot),
        }
    }

    /// Keeps the last snapshot, flags it degraded and leaves the control loop untouched.
    async fn skip_tick(&self, inner: &mut CoverInner, err: Error) -> Result<CoverSnapshot> {
        warn!("Skipping update of {}: {}", self.name, err);

        inner.degraded = true;
        self.snapshot.write().await.state.degraded = true;

        Err(err)
    }

    /// Whether it is night for this cover and today's exposure window.
    fn day_info(
        &self,
        inner: &mut CoverInner,
        geometry: &WindowGeometry,
        now: OffsetDateTime,
        sun: &SunSample,
    ) -> (bool, Option<ExposureWindow>) {
        let today = now.to_offset(self.location.utc_offset()).date();

        if inner.day.as_ref().is_none_or(|day| day.series.date() != today) {
            inner.day = match SunSeries::for_day(self.ports.ephemeris.as_ref(), &self.location, today, DEFAULT_STEP) {
                Ok(series) => {
                    let exposure = series.exposure_window(|sample| calculation::is_direct_sun(geometry, sample));
                    debug!("Exposure window of {} for {}: {:?}", self.name, today, exposure);
                    Some(DayCache { series, exposure })
                }
                Err(err) => {
                    warn!("No sun series for {} on {}: {}", self.name, today, err);
                    None
                }
            };
        }

        match &inner.day {
            Some(day) => (is_night(&day.series, geometry, now), day.exposure),
            None => (!sun.is_above_horizon(), None),
        }
    }

    async fn actuate(&self, position: u8, max_tilt: Option<f64>) -> Result<()> {
        match max_tilt {
            Some(max_tilt) => {
                let degrees = f64::from(position) / 100.0 * max_tilt;
                self.ports.sink.set_cover_tilt(&self.device, degrees).await
            }
            None => self.ports.sink.set_cover_position(&self.device, position).await,
        }
    }

    /// Feeds a position reported by the device into override detection.
    pub async fn observe_position(&self, observation: PositionObservation) -> Result<ObservationOutcome> {
        let now = self.ports.clock.now();
        let policy = self.settings.read().await.policy.clone();

        let outcome = {
            let mut inner = self.inner.lock().await;
            let outcome = inner.control.observe(observation, &policy, now);

            match outcome {
                ObservationOutcome::OverrideDetected => {
                    warn!("Manual change of {} to {}% detected", self.name, observation.position);
                }
                ObservationOutcome::OverrideReset(trigger) => {
                    info!("Manual override of {} reset by {:?}", self.name, trigger);
                    inner.force_next = true;
                }
                _ => debug!("{} reported {}%: {:?}", self.name, observation.position, outcome),
            }

            self.publish_state(&inner).await;
            outcome
        };

        if let ObservationOutcome::OverrideReset(_) = outcome {
            self.refresh().await?;
        }

        Ok(outcome)
    }

    /// Explicit reset action. Returns whether an override was lifted.
    pub async fn reset_override(&self) -> Result<bool> {
        let policy = self.settings.read().await.policy.clone();

        let accepted = {
            let mut inner = self.inner.lock().await;
            let accepted = inner.control.reset_override(ResetTrigger::Explicit, &policy);
            if accepted {
                info!("Manual override of {} reset", self.name);
                inner.force_next = true;
                self.publish_state(&inner).await;
            }
            accepted
        };

        if accepted {
            self.refresh().await?;
        }

        Ok(accepted)
    }

    /// Recomputes bypassing the hysteresis gates.
    pub async fn force_update(&self) -> Result<CoverSnapshot> {
        self.inner.lock().await.force_next = true;
        self.refresh().await
    }

    pub async fn set_mode(&self, mode: ControlMode) -> Result<CoverSnapshot> {
        self.settings.write().await.mode = mode;
        self.refresh().await
    }

    pub async fn set_control_enabled(&self, enabled: bool) -> Result<CoverSnapshot> {
        self.settings.write().await.control_enabled = enabled;
        self.refresh().await
    }

    pub async fn set_toggles(&self, toggles: SensorToggles) -> Result<CoverSnapshot> {
        self.settings.write().await.toggles = toggles;
        self.refresh().await
    }

    pub async fn snapshot(&self) -> CoverSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Today's exposure window as of the last recomputation.
    pub async fn exposure_window(&self) -> Option<ExposureWindow> {
        self.snapshot.read().await.exposure
    }

    /// Stops all further actuation, including from a recomputation already in flight.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            info!("Cover {} shut down", self.name);
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub async fn room_id(&self) -> Option<RoomId> {
        self.room
            .read()
            .await
            .as_ref()
            .filter(|(_, room)| room.strong_count() > 0)
            .map(|(id, _)| *id)
    }

    async fn room(&self) -> Option<Arc<RoomCoordinator>> {
        self.room.read().await.as_ref().and_then(|(_, room)| room.upgrade())
    }

    pub(crate) async fn attach_room(&self, room_id: RoomId, room: Weak<RoomCoordinator>) -> Result<()> {
        let mut slot = self.room.write().await;

        if let Some((current, existing)) = slot.as_ref() {
            if *current != room_id && existing.strong_count() > 0 {
                return Err(Error::AlreadyInRoom {
                    cover: self.id,
                    room: *current,
                });
            }
        }

        *slot = Some((room_id, room));
        Ok(())
    }

    pub(crate) async fn detach_room(&self, room_id: RoomId) {
        let mut slot = self.room.write().await;
        if slot.as_ref().is_some_and(|(current, _)| *current == room_id) {
            *slot = None;
        }
    }

    async fn publish_state(&self, inner: &CoverInner) {
        let mut snapshot = self.snapshot.write().await;
        inner.control.fill(&mut snapshot.state);
        snapshot.state.degraded = inner.degraded;
    }
}

fn cover_state(inner: &CoverInner, mode: ControlMode, control_enabled: bool) -> CoverState {
    let mut state = CoverState {
        mode,
        control_enabled,
        degraded: inner.degraded,
        ..CoverState::default()
    };
    inner.control.fill(&mut state);
    state
}

/// After sunset plus offset, or before sunrise plus offset.
fn is_night(series: &SunSeries, geometry: &WindowGeometry, now: OffsetDateTime) -> bool {
    match (series.sunrise(), series.sunset()) {
        (Some(sunrise), Some(sunset)) => {
            now > sunset + Duration::minutes(geometry.sunset_offset_minutes)
                || now < sunrise + Duration::minutes(geometry.sunrise_offset_minutes)
        }
        // Polar night
        _ => true,
    }
}

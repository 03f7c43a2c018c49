#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::macros::datetime;
use time::{Duration, OffsetDateTime, UtcOffset};

use lumishade_core::coordinator::{CoverConfig, CoverPorts, RoomConfig, RoomPorts};
use lumishade_core::models::{
    AutomationPolicy, ClimateReadings, ClimateThresholds, ControlMode, CoverKind, GeoLocation, PositionLimits,
    Reading, RoomId, SensorToggles, VerticalBlind, WindowGeometry,
};
use lumishade_core::ports::{ActuationSink, Clock, Ephemeris, SensorSource};
use lumishade_core::{Error, Result};

/// Sun walking 15° per hour with a noon peak of 60°, in UTC.
pub struct LinearSun;

impl Ephemeris for LinearSun {
    fn solar_position(&self, _: &GeoLocation, timestamp: OffsetDateTime) -> Result<(f64, f64)> {
        let utc = timestamp.to_offset(UtcOffset::UTC);
        let hours = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;
        Ok((15.0 * hours, 60.0 - 10.0 * (hours - 12.0).abs()))
    }
}

pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

/// Sensor source returning whatever the test put in.
pub struct ScriptedSensors {
    next: Mutex<Result<ClimateReadings>>,
    reads: AtomicUsize,
}

impl ScriptedSensors {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(Ok(ClimateReadings::default())),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn set_temperature(&self, temperature: f64) {
        *self.next.lock().unwrap() = Ok(ClimateReadings {
            temperature: Reading::Value(temperature),
            ..Default::default()
        });
    }

    pub fn set(&self, readings: ClimateReadings) {
        *self.next.lock().unwrap() = Ok(readings);
    }

    pub fn fail(&self) {
        *self.next.lock().unwrap() = Err(Error::SensorUnavailable("bus offline".to_string()));
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for ScriptedSensors {
    async fn read_climate(&self) -> Result<ClimateReadings> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.next.lock().unwrap().clone()
    }
}

/// Sensor source that blocks until the test releases `gate`.
pub struct GatedSensors {
    pub gate: tokio::sync::Mutex<()>,
    reads: AtomicUsize,
}

impl GatedSensors {
    pub fn new() -> Self {
        Self {
            gate: tokio::sync::Mutex::new(()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for GatedSensors {
    async fn read_climate(&self) -> Result<ClimateReadings> {
        let _open = self.gate.lock().await;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(ClimateReadings::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Position(String, u8),
    Tilt(String, f64),
}

#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<Command>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn positions_for(&self, device: &str) -> Vec<u8> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                Command::Position(target, position) if target == device => Some(position),
                _ => None,
            })
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, command: Command) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::ActuationFailure("motor did not respond".to_string()));
        }
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

#[async_trait]
impl ActuationSink for RecordingSink {
    async fn set_cover_position(&self, device: &str, position: u8) -> Result<()> {
        self.record(Command::Position(device.to_string(), position))
    }

    async fn set_cover_tilt(&self, device: &str, degrees: f64) -> Result<()> {
        self.record(Command::Tilt(device.to_string(), degrees))
    }
}

pub struct MockEnv {
    pub clock: Arc<ManualClock>,
    pub sensors: Arc<ScriptedSensors>,
    pub sink: Arc<RecordingSink>,
    pub location: GeoLocation,
}

impl MockEnv {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::new(datetime!(2024-06-21 12:00 UTC))),
            sensors: Arc::new(ScriptedSensors::new()),
            sink: Arc::new(RecordingSink::default()),
            location: GeoLocation {
                latitude: 48.2,
                longitude: 16.4,
                elevation_m: 0.0,
                utc_offset_minutes: 0,
            },
        }
    }

    pub fn cover_ports(&self) -> CoverPorts {
        CoverPorts::new(Arc::new(LinearSun), self.sensors.clone(), self.sink.clone()).with_clock(self.clock.clone())
    }

    pub fn room_ports(&self) -> RoomPorts {
        RoomPorts::new(self.sensors.clone()).with_clock(self.clock.clone())
    }
}

pub fn vertical_geometry(facing_azimuth: f64, fov_left: f64, fov_right: f64) -> WindowGeometry {
    WindowGeometry {
        facing_azimuth,
        fov_left,
        fov_right,
        default_position: 100,
        sunset_position: None,
        sunset_offset_minutes: 0,
        sunrise_offset_minutes: 0,
        min_elevation: None,
        max_elevation: None,
        blind_spot: None,
        limits: PositionLimits::default(),
        cover: CoverKind::Vertical(VerticalBlind {
            window_height: 2.1,
            distance: 0.5,
            cover_bottom: 0.0,
            shaded_area_height: 0.0,
        }),
    }
}

pub fn cover_config(id: i32, name: &str, geometry: WindowGeometry) -> CoverConfig {
    CoverConfig {
        id,
        name: name.to_string(),
        device: None,
        room: None,
        geometry,
        policy: AutomationPolicy {
            min_delta_position: 5,
            min_delta_time: Duration::seconds(300),
            override_tolerance: 3,
            ..Default::default()
        },
        thresholds: ClimateThresholds::default(),
        toggles: SensorToggles::default(),
        mapping: Default::default(),
        mode: ControlMode::Normal,
        control_enabled: true,
    }
}

pub fn room_config(id: RoomId, name: &str, mode: ControlMode) -> RoomConfig {
    RoomConfig {
        id,
        name: name.to_string(),
        mode,
        control_enabled: true,
        thresholds: ClimateThresholds {
            temp_low: Some(20.0),
            temp_high: Some(26.0),
            ..Default::default()
        },
        toggles: SensorToggles::default(),
        reset_mode_at_midnight: true,
    }
}

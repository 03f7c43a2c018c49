use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use lumishade_core::coordinator::{CoverCoordinator, CoverPorts, RoomCoordinator, RoomPorts};
use lumishade_core::event::Event;
use lumishade_core::models::{CoverId, PositionObservation};
use lumishade_core::ports::{Clock, SensorSource};
use lumishade_core::registry::CoordinatorRegistry;
use rand::Rng;
use rand::seq::IndexedRandom;
use time::{Date, OffsetDateTime};
use tokio::sync::mpsc;

use crate::ephemeris::SimpleEphemeris;
use crate::settings::Settings;
use crate::simulate::{SimulatedClock, SimulatedMotor, SimulatedSensors};

pub mod ephemeris;
pub mod settings;
pub mod simulate;

/// Builds every coordinator from the settings and drives them with an
/// accelerated clock until ctrl-c.
pub async fn run(settings: &Arc<Settings>) -> Result<(), Box<dyn Error>> {
    let location = settings.location;
    let offset = location.utc_offset();
    let start = settings.simulation.start.unwrap_or_else(OffsetDateTime::now_utc);
    let clock: Arc<dyn Clock> = Arc::new(SimulatedClock::new(start, settings.simulation.speed));
    let sensors: Arc<dyn SensorSource> = Arc::new(SimulatedSensors::new(clock.clone(), offset));
    let (feedback_tx, mut feedback_rx) = mpsc::unbounded_channel();

    let registry = CoordinatorRegistry::new();
    for config in &settings.rooms {
        let ports = RoomPorts::new(sensors.clone()).with_clock(clock.clone());
        registry.add_room(RoomCoordinator::new(config.clone(), ports)).await?;
    }
    for config in &settings.covers {
        let motor = SimulatedMotor::new(config.id, config.geometry.max_tilt(), feedback_tx.clone());
        let ports = CoverPorts::new(Arc::new(SimpleEphemeris), sensors.clone(), Arc::new(motor))
            .with_clock(clock.clone());
        let cover = CoverCoordinator::new(config.clone(), location, ports);
        registry.add_cover(cover, config.room).await?;
    }
    let cover_ids: Vec<CoverId> = settings.covers.iter().map(|cover| cover.id).collect();

    tracing::info!(
        "Simulating {} rooms and {} covers from {} at {}x",
        settings.rooms.len(),
        cover_ids.len(),
        start,
        settings.simulation.speed
    );

    let mut interval = tokio::time::interval(Duration::from_secs(settings.simulation.tick_seconds.max(1)));
    let mut today: Date = clock.now().to_offset(offset).date();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = feedback_rx.recv() => {
                dispatch(&registry, event).await;
            },
            _ = interval.tick() => {
                let now = clock.now().to_offset(offset);
                if now.date() != today {
                    today = now.date();
                    tracing::info!("New day {}", today);
                    dispatch(&registry, Event::Midnight).await;
                }

                if let Some(event) = manual_change(&cover_ids, settings.simulation.manual_change_chance) {
                    tracing::info!("Simulated hand on {:?}", event);
                    dispatch(&registry, event).await;
                }

                tracing::debug!("Tick at {}", now);
                dispatch(&registry, Event::SunTick).await;
                log_snapshots(&registry).await;
            },
            _ = &mut shutdown => {
                tracing::info!("Stopping simulation");
                registry.shutdown().await;
                return Ok(());
            }
        }
    }
}

async fn dispatch(registry: &CoordinatorRegistry, event: Event) {
    if let Err(err) = registry.dispatch(event).await {
        tracing::warn!("Event failed: {}", err);
    }
}

async fn log_snapshots(registry: &CoordinatorRegistry) {
    for room in registry.rooms().await {
        match serde_json::to_string(&room.snapshot().await) {
            Ok(json) => tracing::debug!("Room {}: {}", room.name(), json),
            Err(err) => tracing::warn!("Room {} snapshot not serializable: {}", room.name(), err),
        }
    }
    for cover in registry.covers().await {
        match serde_json::to_string(&cover.snapshot().await) {
            Ok(json) => tracing::debug!("Cover {}: {}", cover.name(), json),
            Err(err) => tracing::warn!("Cover {} snapshot not serializable: {}", cover.name(), err),
        }
    }
}

/// Sometimes somebody moves a random cover to a random position.
fn manual_change(cover_ids: &[CoverId], chance: f64) -> Option<Event> {
    let mut rng = rand::rng();
    if !rng.random_bool(chance.clamp(0.0, 1.0)) {
        return None;
    }

    let cover = *cover_ids.choose(&mut rng)?;
    Some(Event::PositionObserved {
        cover,
        observation: PositionObservation::settled(rng.random_range(0..=100)),
    })
}

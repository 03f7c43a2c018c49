use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::RoomPorts;
use super::cover::CoverCoordinator;
use crate::error::Result;
use crate::models::{
    ClimateSnapshot, ClimateThresholds, ClimateTracker, ComfortLevel, ControlMode, CoverId, ExposureWindow,
    RoomId, RoomSnapshot, RoomState, SensorToggles,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub id: RoomId,
    pub name: String,
    /// Mode at start-up, restored every midnight
    #[serde(default)]
    pub mode: ControlMode,
    #[serde(default = "enabled")]
    pub control_enabled: bool,
    #[serde(default)]
    pub thresholds: ClimateThresholds,
    #[serde(default)]
    pub toggles: SensorToggles,
    #[serde(default = "enabled")]
    pub reset_mode_at_midnight: bool,
}

fn enabled() -> bool {
    true
}

/// Room-wide inputs every member reads instead of its own.
#[derive(Debug, Clone)]
pub struct SharedInputs {
    pub mode: ControlMode,
    pub control_enabled: bool,
    pub thresholds: ClimateThresholds,
    pub toggles: SensorToggles,
    pub climate: ClimateSnapshot,
    /// Some readings are missing or the last read failed
    pub degraded: bool,
    /// The last sensor read failed and `climate` is from an earlier one
    pub sensors_failed: bool,
}

#[derive(Debug, Clone)]
struct RoomSettings {
    mode: ControlMode,
    control_enabled: bool,
    thresholds: ClimateThresholds,
    toggles: SensorToggles,
}

#[derive(Debug, Default, Clone)]
struct SharedClimate {
    climate: ClimateSnapshot,
    degraded: bool,
    failed: bool,
}

/// Groups covers of one room, shares sensors and settings with them and
/// aggregates their state.
pub struct RoomCoordinator {
    id: RoomId,
    name: String,
    default_mode: ControlMode,
    reset_mode_at_midnight: bool,
    ports: RoomPorts,
    this: Weak<RoomCoordinator>,
    settings: RwLock<RoomSettings>,
    tracker: Mutex<ClimateTracker>,
    shared: RwLock<SharedClimate>,
    members: RwLock<BTreeMap<CoverId, Weak<CoverCoordinator>>>,
    state: RwLock<RoomState>,
    requested: AtomicU64,
    completed: Mutex<u64>,
}

impl RoomCoordinator {
    pub fn new(config: RoomConfig, ports: RoomPorts) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: config.id,
            name: config.name,
            default_mode: config.mode,
            reset_mode_at_midnight: config.reset_mode_at_midnight,
            ports,
            this: this.clone(),
            settings: RwLock::new(RoomSettings {
                mode: config.mode,
                control_enabled: config.control_enabled,
                thresholds: config.thresholds,
                toggles: config.toggles,
            }),
            tracker: Mutex::new(ClimateTracker::default()),
            shared: RwLock::new(SharedClimate::default()),
            members: RwLock::new(BTreeMap::new()),
            state: RwLock::new(RoomState::default()),
            requested: AtomicU64::new(0),
            completed: Mutex::new(0),
        })
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a cover. Registering a member twice is a no-op; a cover owned by
    /// another room is rejected.
    pub async fn register_cover(&self, cover: &Arc<CoverCoordinator>) -> Result<()> {
        cover.attach_room(self.id, self.this.clone()).await?;

        let mut members = self.members.write().await;
        if members.insert(cover.id(), Arc::downgrade(cover)).is_none() {
            info!("Cover {} joined room {}", cover.name(), self.name);
        }

        Ok(())
    }

    /// Returns whether the cover was a member.
    pub async fn unregister_cover(&self, cover_id: CoverId) -> bool {
        let removed = self.members.write().await.remove(&cover_id);

        match removed {
            Some(cover) => {
                if let Some(cover) = cover.upgrade() {
                    cover.detach_room(self.id).await;
                }
                info!("Cover {} left room {}", cover_id, self.name);
                true
            }
            None => false,
        }
    }

    pub async fn members(&self) -> Vec<CoverId> {
        self.members.read().await.keys().copied().collect()
    }

    /// Live members; references to dropped covers are pruned.
    async fn live_members(&self) -> Vec<Arc<CoverCoordinator>> {
        let mut members = self.members.write().await;
        members.retain(|id, cover| {
            let alive = cover.strong_count() > 0;
            if !alive {
                debug!("Pruning dropped cover {} from room {}", id, self.name);
            }
            alive
        });

        members.values().filter_map(Weak::upgrade).collect()
    }

    pub async fn shared_inputs(&self) -> SharedInputs {
        let settings = self.settings.read().await.clone();
        let shared = self.shared.read().await.clone();

        SharedInputs {
            mode: settings.mode,
            control_enabled: settings.control_enabled,
            thresholds: settings.thresholds,
            toggles: settings.toggles,
            climate: shared.climate,
            degraded: shared.degraded,
            sensors_failed: shared.failed,
        }
    }

    /// Reads the room sensors, updates every member and aggregates. Concurrent
    /// calls are coalesced the same way cover updates are.
    pub async fn refresh(&self) -> RoomSnapshot {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let mut completed = self.completed.lock().await;
        if *completed >= ticket {
            return self.snapshot().await;
        }

        let covering = self.requested.load(Ordering::SeqCst);
        self.read_sensors().await;
        self.async_notify_children().await;
        let snapshot = self.aggregate().await;
        *completed = covering;

        snapshot
    }

    async fn read_sensors(&self) {
        match self.ports.sensors.read_climate().await {
            Ok(readings) => {
                let climate = self.tracker.lock().await.update(readings);
                let degraded = climate.is_degraded();
                *self.shared.write().await = SharedClimate {
                    climate,
                    degraded,
                    failed: false,
                };
            }
            Err(err) => {
                warn!("Room {} keeps last known climate: {}", self.name, err);
                let mut shared = self.shared.write().await;
                shared.degraded = true;
                shared.failed = true;
            }
        }
    }

    /// Updates every member and waits for all of them. A failing member is
    /// logged and keeps its last snapshot.
    pub async fn async_notify_children(&self) {
        for cover in self.live_members().await {
            if let Err(err) = cover.refresh().await {
                warn!("Cover {} in room {} failed to update: {}", cover.name(), self.name, err);
            }
        }
    }

    async fn aggregate(&self) -> RoomSnapshot {
        let mut exposure: Option<ExposureWindow> = None;
        let mut comfort_status = false;
        let mut members = Vec::new();

        for cover in self.live_members().await {
            let snapshot = cover.snapshot().await;
            members.push(snapshot.cover);

            if let Some(window) = snapshot.exposure {
                exposure = Some(exposure.map_or(window, |current| current.union(&window)));
            }
            if snapshot.state.mode == ControlMode::Climate && snapshot.blocking {
                comfort_status = true;
            }
        }

        let thresholds = self.settings.read().await.thresholds.clone();
        let shared = self.shared.read().await.clone();

        let state = RoomState {
            start_sun_time: exposure.map(|window| window.start),
            end_sun_time: exposure.map(|window| window.end),
            comfort_status,
            comfort_level: ComfortLevel::assess(&shared.climate, &thresholds),
            shared_climate_snapshot: shared.climate,
            members,
            degraded: shared.degraded,
        };
        debug!("Room {} aggregated: {:?}", self.name, state);
        *self.state.write().await = state;

        self.snapshot().await
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        let settings = self.settings.read().await;

        RoomSnapshot {
            room: self.id,
            name: self.name.clone(),
            mode: settings.mode,
            control_enabled: settings.control_enabled,
            state: self.state.read().await.clone(),
        }
    }

    pub async fn set_mode(&self, mode: ControlMode) -> RoomSnapshot {
        self.settings.write().await.mode = mode;
        info!("Room {} switched to {:?}", self.name, mode);
        self.refresh().await
    }

    pub async fn set_control_enabled(&self, enabled: bool) -> RoomSnapshot {
        self.settings.write().await.control_enabled = enabled;
        info!("Room {} control enabled: {}", self.name, enabled);
        self.refresh().await
    }

    pub async fn set_toggles(&self, toggles: SensorToggles) -> RoomSnapshot {
        self.settings.write().await.toggles = toggles;
        self.refresh().await
    }

    pub async fn set_thresholds(&self, thresholds: ClimateThresholds) -> RoomSnapshot {
        self.settings.write().await.thresholds = thresholds;
        self.refresh().await
    }

    /// Moves every member to its current target, ignoring hysteresis.
    pub async fn force_update_covers(&self) -> RoomSnapshot {
        for cover in self.live_members().await {
            if let Err(err) = cover.force_update().await {
                warn!("Forced update of {} failed: {}", cover.name(), err);
            }
        }

        self.aggregate().await
    }

    /// Restores the configured mode at the start of a new day.
    pub async fn midnight_reset(&self) -> RoomSnapshot {
        let changed = {
            let mut settings = self.settings.write().await;
            let changed = self.reset_mode_at_midnight && settings.mode != self.default_mode;
            if changed {
                settings.mode = self.default_mode;
            }
            changed
        };

        if changed {
            let today = self.ports.clock.now().date();
            info!("Room {} restored mode {:?} for {}", self.name, self.default_mode, today);
        }

        self.refresh().await
    }
}

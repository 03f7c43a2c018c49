use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::coordinator::{CoverCoordinator, RoomCoordinator};
use crate::error::{Error, Result};
use crate::event::{Event, Target};
use crate::models::{ControlMode, CoverId, RoomId};

/// Owns every coordinator and wires covers to their rooms, whichever of the
/// two is registered first.
#[derive(Default)]
pub struct CoordinatorRegistry {
    covers: RwLock<BTreeMap<CoverId, Arc<CoverCoordinator>>>,
    rooms: RwLock<BTreeMap<RoomId, Arc<RoomCoordinator>>>,
    /// Room each cover asked to join
    memberships: RwLock<BTreeMap<CoverId, RoomId>>,
}

impl CoordinatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cover and joins it to `room` now, or as soon as that room is added.
    pub async fn add_cover(&self, cover: Arc<CoverCoordinator>, room: Option<RoomId>) -> Result<()> {
        let id = cover.id();
        self.covers.write().await.insert(id, cover.clone());

        if let Some(room_id) = room {
            self.memberships.write().await.insert(id, room_id);

            let room = self.rooms.read().await.get(&room_id).cloned();
            match room {
                Some(room) => room.register_cover(&cover).await?,
                None => debug!("Cover {} waits for room {}", cover.name(), room_id),
            }
        }

        info!("Registered cover {}", cover.name());
        Ok(())
    }

    /// Registers a room and connects covers that were added before it.
    pub async fn add_room(&self, room: Arc<RoomCoordinator>) -> Result<()> {
        let room_id = room.id();
        self.rooms.write().await.insert(room_id, room.clone());

        let waiting: Vec<CoverId> = self
            .memberships
            .read()
            .await
            .iter()
            .filter(|(_, wanted)| **wanted == room_id)
            .map(|(cover, _)| *cover)
            .collect();

        for cover_id in waiting {
            let cover = self.covers.read().await.get(&cover_id).cloned();
            if let Some(cover) = cover {
                room.register_cover(&cover).await?;
            }
        }

        info!("Registered room {}", room.name());
        Ok(())
    }

    /// Removes a cover from its room and stops it.
    pub async fn remove_cover(&self, cover_id: CoverId) -> Result<Arc<CoverCoordinator>> {
        let cover = self
            .covers
            .write()
            .await
            .remove(&cover_id)
            .ok_or(Error::CoverNotFound(cover_id))?;
        self.memberships.write().await.remove(&cover_id);

        if let Some(room_id) = cover.room_id().await {
            if let Some(room) = self.rooms.read().await.get(&room_id).cloned() {
                room.unregister_cover(cover_id).await;
            }
        }

        cover.shutdown();
        info!("Removed cover {}", cover.name());
        Ok(cover)
    }

    /// Removes a room. Its covers carry on alone and rejoin if the room is added again.
    pub async fn remove_room(&self, room_id: RoomId) -> Result<Arc<RoomCoordinator>> {
        let room = self
            .rooms
            .write()
            .await
            .remove(&room_id)
            .ok_or(Error::RoomNotFound(room_id))?;

        for cover_id in room.members().await {
            room.unregister_cover(cover_id).await;
        }

        info!("Removed room {}", room.name());
        Ok(room)
    }

    pub async fn cover(&self, cover_id: CoverId) -> Result<Arc<CoverCoordinator>> {
        self.covers
            .read()
            .await
            .get(&cover_id)
            .cloned()
            .ok_or(Error::CoverNotFound(cover_id))
    }

    pub async fn room(&self, room_id: RoomId) -> Result<Arc<RoomCoordinator>> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(Error::RoomNotFound(room_id))
    }

    pub async fn covers(&self) -> Vec<Arc<CoverCoordinator>> {
        self.covers.read().await.values().cloned().collect()
    }

    pub async fn rooms(&self) -> Vec<Arc<RoomCoordinator>> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// Covers not attached to any live room.
    async fn standalone_covers(&self) -> Vec<Arc<CoverCoordinator>> {
        let mut standalone = Vec::new();
        for cover in self.covers().await {
            if cover.room_id().await.is_none() {
                standalone.push(cover);
            }
        }
        standalone
    }

    /// Routes an event to the coordinators it concerns. Transient failures
    /// are logged and swallowed; they are retried on the next event.
    pub async fn dispatch(&self, event: Event) -> Result<()> {
        debug!("Dispatching {:?}", event);

        match event {
            Event::SunTick => self.refresh_all().await,
            Event::Midnight => {
                for room in self.rooms().await {
                    room.midnight_reset().await;
                }
                let mut failure = FirstFailure::default();
                for cover in self.standalone_covers().await {
                    failure.record(&cover, cover.refresh().await);
                }
                failure.into_result()
            }
            Event::RoomSensorsChanged { room } => {
                self.room(room).await?.refresh().await;
                Ok(())
            }
            Event::CoverSensorsChanged { cover } => {
                let cover = self.cover(cover).await?;
                match cover.room_id().await {
                    // Members use the room's sensors
                    Some(room) => {
                        self.room(room).await?.refresh().await;
                        Ok(())
                    }
                    None => soft(cover.refresh().await),
                }
            }
            Event::PositionObserved { cover, observation } => {
                soft(self.cover(cover).await?.observe_position(observation).await)
            }
            Event::ResetOverride { cover } => soft(self.cover(cover).await?.reset_override().await),
            Event::ForceUpdate { target } => self.force_update(target).await,
            Event::SetMode { target, mode } => self.set_mode(target, mode).await,
            Event::SetControlEnabled { target, enabled } => self.set_control_enabled(target, enabled).await,
        }
    }

    async fn refresh_all(&self) -> Result<()> {
        for room in self.rooms().await {
            room.refresh().await;
        }
        let mut failure = FirstFailure::default();
        for cover in self.standalone_covers().await {
            failure.record(&cover, cover.refresh().await);
        }
        failure.into_result()
    }

    async fn force_update(&self, target: Target) -> Result<()> {
        match target {
            Target::Cover(cover) => soft(self.cover(cover).await?.force_update().await),
            Target::Room(room) => {
                self.room(room).await?.force_update_covers().await;
                Ok(())
            }
            Target::All => {
                for room in self.rooms().await {
                    room.force_update_covers().await;
                }
                let mut failure = FirstFailure::default();
                for cover in self.standalone_covers().await {
                    failure.record(&cover, cover.force_update().await);
                }
                failure.into_result()
            }
        }
    }

    async fn set_mode(&self, target: Target, mode: ControlMode) -> Result<()> {
        match target {
            Target::Cover(cover) => {
                let cover = self.cover(cover).await?;
                if let Some(room) = cover.room_id().await {
                    warn!("{} follows the mode of room {}", cover.name(), room);
                }
                soft(cover.set_mode(mode).await)
            }
            Target::Room(room) => {
                self.room(room).await?.set_mode(mode).await;
                Ok(())
            }
            Target::All => {
                for room in self.rooms().await {
                    room.set_mode(mode).await;
                }
                let mut failure = FirstFailure::default();
                for cover in self.standalone_covers().await {
                    failure.record(&cover, cover.set_mode(mode).await);
                }
                failure.into_result()
            }
        }
    }

    async fn set_control_enabled(&self, target: Target, enabled: bool) -> Result<()> {
        match target {
            Target::Cover(cover) => {
                let cover = self.cover(cover).await?;
                if let Some(room) = cover.room_id().await {
                    warn!("{} follows the control switch of room {}", cover.name(), room);
                }
                soft(cover.set_control_enabled(enabled).await)
            }
            Target::Room(room) => {
                self.room(room).await?.set_control_enabled(enabled).await;
                Ok(())
            }
            Target::All => {
                for room in self.rooms().await {
                    room.set_control_enabled(enabled).await;
                }
                let mut failure = FirstFailure::default();
                for cover in self.standalone_covers().await {
                    failure.record(&cover, cover.set_control_enabled(enabled).await);
                }
                failure.into_result()
            }
        }
    }

    /// Stops every cover.
    pub async fn shutdown(&self) {
        for cover in self.covers().await {
            cover.shutdown();
        }
    }
}

fn soft<T>(result: Result<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_transient() => {
            warn!("Transient failure: {}", err);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// First hard failure of a loop over covers. Later covers still run.
#[derive(Default)]
struct FirstFailure(Option<Error>);

impl FirstFailure {
    fn record<T>(&mut self, cover: &CoverCoordinator, result: Result<T>) {
        if let Err(err) = soft(result) {
            warn!("{} failed: {}", cover.name(), err);
            self.0.get_or_insert(err);
        }
    }

    fn into_result(self) -> Result<()> {
        self.0.map_or(Ok(()), Err)
    }
}

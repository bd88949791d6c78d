use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::LifecycleState;
use crate::{log_debug, log_info};

use super::{
    clock::Clock,
    controller::WateringController,
    state::{WaterOutcome, WateringSnapshot},
    store::KeyValueStore,
};

const ENABLE_LOGS: bool = true;

/// Everything the rendering layer needs to draw one plant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantSnapshot {
    pub session_id: String,
    pub lifecycle: LifecycleState,
    pub watering: WateringSnapshot,
}

/// One display session of a plant: the user-selected lifecycle state plus
/// its watering cooldown.
pub struct PlantSession {
    id: String,
    lifecycle: RwLock<LifecycleState>,
    watering: WateringController,
}

impl PlantSession {
    pub async fn open(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let id = Uuid::new_v4().to_string();
        let watering = WateringController::load(store, clock).await;
        log_info!("Plant session {id} opened");

        Self {
            id,
            lifecycle: RwLock::new(LifecycleState::default()),
            watering,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.read().await
    }

    /// No transition rules: any state may follow any other.
    pub async fn set_lifecycle(&self, next: LifecycleState) -> LifecycleState {
        let mut guard = self.lifecycle.write().await;
        let previous = *guard;
        *guard = next;
        log_debug!("Plant session {}: lifecycle {previous} -> {next}", self.id);
        previous
    }

    /// String entry point for UI layers; only the four known names parse.
    pub async fn set_lifecycle_str(&self, name: &str) -> Result<LifecycleState> {
        let next: LifecycleState = name.parse()?;
        self.set_lifecycle(next).await;
        Ok(next)
    }

    pub fn watering(&self) -> &WateringController {
        &self.watering
    }

    pub async fn can_water_now(&self) -> bool {
        self.watering.can_water_now().await
    }

    pub async fn water(&self) -> Result<WaterOutcome> {
        self.watering.water().await
    }

    pub async fn snapshot(&self) -> PlantSnapshot {
        PlantSnapshot {
            session_id: self.id.clone(),
            lifecycle: self.lifecycle().await,
            watering: self.watering.snapshot().await,
        }
    }

    /// Ends the session. The pending cooldown expiry check is cancelled and
    /// later waterings are refused; snapshots stay available.
    pub async fn end(&self) {
        self.watering.shutdown().await;
        log_info!("Plant session {} ended", self.id);
    }
}

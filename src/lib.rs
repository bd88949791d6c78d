pub mod db;
pub mod models;
pub mod settings;
pub mod synthesis;
pub mod timer;
pub mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::{info, warn};

use db::Database;
use models::{IdentificationRequest, IdentificationResult};
use settings::{SettingsStore, SETTINGS_FILE};
use synthesis::{GeminiProvider, IdentifyError, Synthesizer};
use timer::{PlantSession, SystemClock};

/// Installs the process-wide logger. `PLANT_GARDEN_DEBUG=1` lowers the
/// default level to debug; `RUST_LOG` still wins when set.
pub fn init_logging() {
    utils::logging::init();
}

/// Host-side wiring of both components over one data directory.
pub struct Garden {
    data_dir: PathBuf,
    db: Database,
    settings: SettingsStore,
    synthesizer: Synthesizer,
    plant: PlantSession,
}

impl Garden {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))
            .context("failed to load settings")?;

        let db_path = data_dir.join(settings.storage().database_file);
        let db = tokio::task::spawn_blocking(move || Database::new(db_path))
            .await
            .context("database initialization task panicked")??;

        let gemini_config = settings.provider().to_gemini_config();
        if gemini_config.api_key.is_none() {
            warn!(
                "No API key found in {}; identification will fail until one is set",
                settings.provider().api_key_env
            );
        }
        let provider = GeminiProvider::new(gemini_config)
            .context("failed to build completion provider")?;
        let synthesizer = Synthesizer::new(Arc::new(provider));

        let plant = PlantSession::open(Arc::new(db.clone()), Arc::new(SystemClock)).await;

        info!("Garden opened at {}", data_dir.display());

        Ok(Self {
            data_dir,
            db,
            settings,
            synthesizer,
            plant,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub fn plant(&self) -> &PlantSession {
        &self.plant
    }

    pub async fn identify(
        &self,
        request: &IdentificationRequest,
    ) -> Result<IdentificationResult, IdentifyError> {
        self.synthesizer.identify(request).await
    }

    pub async fn shutdown(&self) {
        self.plant.end().await;
        info!("Garden at {} shut down", self.data_dir.display());
    }
}

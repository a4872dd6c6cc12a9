pub mod admin;
pub mod api;
pub mod camera;
pub mod cli;
pub mod db;
pub mod directory;
pub mod error;
pub mod lockout;
pub mod navigation;
pub mod recognition;
pub mod session;
pub mod settings;
pub mod storage;
mod utils;

#[cfg(test)]
mod testing;

use std::{fs, sync::Arc};

use anyhow::{Context, Result};

use admin::AdminGate;
use api::ApiClient;
use camera::{CameraController, CaptureBackend};
use db::Database;
use directory::RegisteredUserCache;
use lockout::LockoutCountdown;
use recognition::RecognitionController;
use session::SessionStore;
use settings::Settings;
use storage::KeyValueStore;

/// Installs `env_logger` on first call and sets the level on every call, so
/// a later call can raise verbosity. `RUST_LOG` still wins when set.
pub fn init_logging(debug: bool) {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .try_init();
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    log::set_max_level(if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

/// Long-lived services shared by every view.
pub struct AppState {
    pub settings: Settings,
    pub db: Database,
    pub api: ApiClient,
    pub sessions: SessionStore,
    pub users: RegisteredUserCache,
}

impl AppState {
    pub fn open(settings: Settings) -> Result<Self> {
        fs::create_dir_all(&settings.data_dir).with_context(|| {
            format!(
                "failed to create data directory {}",
                settings.data_dir.display()
            )
        })?;

        let db = Database::open(settings.database_path())?;
        let store: Arc<dyn KeyValueStore> = Arc::new(db.clone());
        let api = ApiClient::from_settings(&settings)?;

        log::info!("facegate using backend {}", api.base_url());

        Ok(Self {
            sessions: SessionStore::new(store.clone()),
            users: RegisteredUserCache::new(store),
            settings,
            db,
            api,
        })
    }

    pub fn camera(&self, backend: Arc<dyn CaptureBackend>) -> CameraController {
        CameraController::new(backend, self.settings.camera_timeout())
    }

    pub fn recognition(&self, camera: CameraController) -> RecognitionController {
        RecognitionController::new(
            camera,
            Arc::new(self.api.clone()),
            self.sessions.clone(),
            self.settings.proceed_delay(),
        )
    }

    pub fn lockout(&self) -> LockoutCountdown {
        LockoutCountdown::new(self.settings.lock_duration_secs)
    }

    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(self.settings.admin.clone(), self.sessions.clone())
    }
}

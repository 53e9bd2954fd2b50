use std::sync::Arc;
use std::time::Duration;

use facegate_vision::FaceEncoder;

use crate::audit::ActivityLog;
use crate::auth::AdminAuth;
use crate::capture::CaptureCache;
use crate::config::Config;
use crate::session::SessionRegistry;
use crate::store::IdentityStore;

/// Everything the HTTP handlers share. One instance per process, behind an
/// `Arc`; each component handles its own interior locking.
pub struct AppState {
    pub config: Config,
    pub encoder: Box<dyn FaceEncoder>,
    pub store: IdentityStore,
    pub sessions: SessionRegistry,
    pub captures: CaptureCache,
    pub admin: AdminAuth,
    pub audit: Arc<ActivityLog>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, encoder: Box<dyn FaceEncoder>) -> anyhow::Result<SharedState> {
        let audit = Arc::new(ActivityLog::new());
        let store = IdentityStore::open(&config.data_dir, audit.clone())?;
        let captures = CaptureCache::new(Duration::from_secs(config.capture_ttl_secs));
        let admin = AdminAuth::new(&config.admin_username, &config.admin_password);
        Ok(Arc::new(Self {
            encoder,
            store,
            sessions: SessionRegistry::new(),
            captures,
            admin,
            audit,
            config,
        }))
    }
}

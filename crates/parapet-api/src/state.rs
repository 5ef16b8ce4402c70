use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use parapet_core::config::Config;
use parapet_core::upload::FileUploadConfig;
use parapet_sessions::provider::AuthProvider;
use parapet_sessions::two_factor::Enrollment;
use parapet_storage::Storage;
use tokio::sync::{Mutex, MutexGuard};

/// Enrollment flows idle past this age are swept on the next map access.
/// The TOTP secret is not persisted server-side until the first code
/// verifies, so sweeping an abandoned flow loses nothing.
pub const ENROLLMENT_TTL: Duration = Duration::from_secs(30 * 60);

/// An in-flight enrollment machine plus its creation time.
///
/// `started_at` is a tokio instant so the sweep honors a paused test clock.
pub struct EnrollmentSlot {
    pub machine: Enrollment<dyn AuthProvider>,
    pub started_at: Instant,
}

impl EnrollmentSlot {
    pub fn new(machine: Enrollment<dyn AuthProvider>) -> Self {
        Self {
            machine,
            started_at: Instant::now(),
        }
    }
}

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub avatar_config: Arc<FileUploadConfig>,
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<dyn AuthProvider>,
    /// In-flight two-factor enrollments, keyed by session token. Entries are
    /// created on the first password submission, removed on dismiss, close,
    /// or two-factor disable, and swept once older than [`ENROLLMENT_TTL`].
    pub enrollments: Arc<Mutex<HashMap<String, EnrollmentSlot>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        auth: Arc<dyn AuthProvider>,
    ) -> anyhow::Result<Self> {
        let avatar_config = config.avatar_upload_config()?;
        Ok(Self {
            config: Arc::new(config),
            avatar_config: Arc::new(avatar_config),
            storage,
            auth,
            enrollments: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Lock the enrollment map, sweeping expired flows first.
    pub async fn lock_enrollments(
        &self,
    ) -> MutexGuard<'_, HashMap<String, EnrollmentSlot>> {
        let mut guard = self.enrollments.lock().await;
        guard.retain(|_, slot| slot.started_at.elapsed() < ENROLLMENT_TTL);
        guard
    }
}

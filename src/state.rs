use crate::config::Settings;
use crate::errors::StoreError;
use crate::resolver::{DailyRecordResolver, GoalsResolver};
use crate::session::{LocalSessionProvider, SessionProvider};
use crate::store::{FileStore, HealthStore};
use crate::theme::Theme;
use std::sync::Arc;

/// Shared collaborators, injected so tests can swap in their own.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HealthStore>,
    pub sessions: Arc<dyn SessionProvider>,
    pub metrics: Arc<DailyRecordResolver>,
    pub goals: Arc<GoalsResolver>,
    pub default_theme: Theme,
}

impl AppState {
    pub fn new(
        store: Arc<dyn HealthStore>,
        sessions: Arc<dyn SessionProvider>,
        default_theme: Theme,
    ) -> Self {
        Self {
            metrics: Arc::new(DailyRecordResolver::new(Arc::clone(&store))),
            goals: Arc::new(GoalsResolver::new(Arc::clone(&store))),
            store,
            sessions,
            default_theme,
        }
    }

    /// Opens the data file named in `settings` and wires the file store in as
    /// both the health store and the session provider's user store.
    pub async fn open(settings: &Settings) -> Result<Self, StoreError> {
        let store = Arc::new(FileStore::open(settings.data_path.clone()).await?);
        let sessions = LocalSessionProvider::new(store.clone(), settings.bcrypt_cost);
        Ok(Self::new(store, Arc::new(sessions), settings.default_theme))
    }
}

use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};
use shared_database::{ClinicStore, InMemoryClinicStore, SupabaseClinicStore};

/// State shared by every cell router: configuration plus the one store
/// instance all services commit through.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ClinicStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Picks the adapter named by `config.store_backend`.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn ClinicStore> = match config.store_backend {
            StoreBackend::Supabase => {
                info!("Using Supabase clinic store at {}", config.supabase_url);
                Arc::new(SupabaseClinicStore::new(&config))
            }
            StoreBackend::Memory => {
                info!("Using in-memory clinic store");
                Arc::new(InMemoryClinicStore::new())
            }
        };
        Self::new(config, store)
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(InMemoryClinicStore::new()))
    }
}

use std::env;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which persistence adapter backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub clinic_name: String,
    pub clinic_address: String,
    pub clinic_phone: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_backend: StoreBackend::Memory,
            clinic_name: env::var("CLINIC_NAME")
                .unwrap_or_else(|_| "Clinic".to_string()),
            clinic_address: env::var("CLINIC_ADDRESS").unwrap_or_default(),
            clinic_phone: env::var("CLINIC_PHONE").unwrap_or_default(),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(3000),
        };

        config.store_backend = match env::var("CLINIC_STORE_BACKEND").as_deref() {
            Ok("supabase") => StoreBackend::Supabase,
            Ok("memory") => StoreBackend::Memory,
            Ok(other) => {
                warn!("Unknown CLINIC_STORE_BACKEND '{}', falling back to default", other);
                config.default_backend()
            }
            Err(_) => config.default_backend(),
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_configured() {
            warn!("Supabase backend selected but not fully configured - using in-memory store");
            config.store_backend = StoreBackend::Memory;
        }

        if config.supabase_jwt_secret.is_empty() {
            warn!("Application not fully configured - all authenticated requests will be rejected");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    fn default_backend(&self) -> StoreBackend {
        if self.is_configured() {
            StoreBackend::Supabase
        } else {
            StoreBackend::Memory
        }
    }
}

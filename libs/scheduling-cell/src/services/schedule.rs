use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::error::ClinicError;
use shared_models::schedule::ScheduleConfig;
use shared_utils::AppState;

use crate::models::UpsertScheduleRequest;

pub struct ScheduleService {
    store: Arc<dyn ClinicStore>,
}

impl ScheduleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn get_config(&self, doctor_id: Uuid) -> Result<ScheduleConfig, ClinicError> {
        debug!("Fetching schedule for doctor {}", doctor_id);
        self.store
            .get_schedule_config(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("No schedule configured for doctor {}", doctor_id)))
    }

    /// Replaces the doctor's working pattern. Existing bookings keep the
    /// times they were made with.
    pub async fn upsert_config(
        &self,
        doctor_id: Uuid,
        request: UpsertScheduleRequest,
    ) -> Result<ScheduleConfig, ClinicError> {
        let config = ScheduleConfig::new(
            doctor_id,
            request.work_start,
            request.work_end,
            request.slot_duration_min,
            request.break_duration_min,
        )?;

        let saved = self.store.upsert_schedule_config(config).await?;
        info!(
            "Schedule for doctor {} set to {}-{} ({} min slots, {} min breaks)",
            doctor_id, saved.work_start, saved.work_end, saved.slot_duration_min, saved.break_duration_min
        );
        Ok(saved)
    }
}

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::error::ClinicError;
use shared_models::schedule::{BlockSpan, BlockedInterval};
use shared_models::time::TimeRange;
use shared_utils::AppState;

use crate::models::BlockRequest;

/// Doctor-declared unavailable intervals.
pub struct BlockRegistry {
    store: Arc<dyn ClinicStore>,
}

impl BlockRegistry {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn block(&self, doctor_id: Uuid, request: BlockRequest) -> Result<BlockedInterval, ClinicError> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(ClinicError::Validation("A reason is required to block time".to_string()));
        }

        let span = self.resolve_span(doctor_id, &request).await?;
        let block = BlockedInterval::new(doctor_id, request.date, span, reason);

        match self.store.insert_block_if_free(block).await {
            Ok(block) => {
                info!("Blocked {:?} for doctor {} on {}: {}", block.span, doctor_id, block.date, block.reason);
                Ok(block)
            }
            Err(e) => {
                warn!("Block for doctor {} on {} rejected: {}", doctor_id, request.date, e);
                Err(e.into())
            }
        }
    }

    async fn resolve_span(&self, doctor_id: Uuid, request: &BlockRequest) -> Result<BlockSpan, ClinicError> {
        if request.whole_day {
            return Ok(BlockSpan::WholeDay);
        }

        let start = request.time.ok_or_else(|| {
            ClinicError::Validation("Either a time or whole_day is required".to_string())
        })?;

        let range = match request.end_time {
            Some(end) => TimeRange::new(start, end)?,
            None => {
                let config = self.store.get_schedule_config(doctor_id).await?.ok_or_else(|| {
                    ClinicError::Validation(format!("Doctor {} is not configured", doctor_id))
                })?;
                TimeRange::starting_at(start, config.slot_duration_min)?
            }
        };

        Ok(BlockSpan::Range {
            start: range.start,
            end: range.end,
        })
    }

    /// Removes a block. A block belonging to another doctor reads as missing.
    pub async fn unblock(&self, doctor_id: Uuid, block_id: Uuid) -> Result<BlockedInterval, ClinicError> {
        match self.store.get_block(block_id).await? {
            Some(block) if block.doctor_id == doctor_id => {}
            _ => return Err(ClinicError::not_found("Block", block_id)),
        }

        let removed = self.store.delete_block(block_id).await?;
        info!("Unblocked {} for doctor {} on {}", block_id, doctor_id, removed.date);
        Ok(removed)
    }

    pub async fn list_blocks(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<BlockedInterval>, ClinicError> {
        debug!("Listing blocks for doctor {} on {}", doctor_id, date);
        Ok(self.store.list_blocks(doctor_id, date).await?)
    }
}

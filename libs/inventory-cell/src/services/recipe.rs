use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::error::ClinicError;
use shared_models::inventory::{Treatment, TreatmentRecipe};
use shared_utils::AppState;

use crate::models::{RecipeLine, UpsertTreatmentRequest};

fn validate_cost(cost: f64) -> Result<(), ClinicError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(ClinicError::Validation(format!("Invalid treatment cost {}", cost)));
    }
    Ok(())
}

/// Treatment catalogue plus the consumables each treatment uses.
pub struct TreatmentRecipeStore {
    store: Arc<dyn ClinicStore>,
}

impl TreatmentRecipeStore {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Creates the treatment, or updates the one with the same name
    /// (case-insensitive) in place.
    pub async fn upsert_treatment(&self, request: UpsertTreatmentRequest) -> Result<Treatment, ClinicError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("Treatment name is required".to_string()));
        }
        validate_cost(request.cost)?;
        if request.duration_minutes == Some(0) {
            return Err(ClinicError::Validation("Treatment duration must be positive".to_string()));
        }

        let treatment = self
            .store
            .upsert_treatment(Treatment::new(name, request.cost, request.duration_minutes))
            .await?;
        info!("Saved treatment {} ({}) at {:.2}", treatment.name, treatment.id, treatment.cost);
        Ok(treatment)
    }

    pub async fn get_treatment(&self, treatment_id: Uuid) -> Result<Treatment, ClinicError> {
        self.store
            .get_treatment(treatment_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Treatment", treatment_id))
    }

    pub async fn find_treatment(&self, name: &str) -> Result<Treatment, ClinicError> {
        self.store
            .find_treatment_by_name(name)
            .await?
            .ok_or_else(|| ClinicError::not_found("Treatment", name.trim()))
    }

    pub async fn list_treatments(&self) -> Result<Vec<Treatment>, ClinicError> {
        Ok(self.store.list_treatments().await?)
    }

    /// Changes the live price. Invoices already issued keep their amount.
    pub async fn update_treatment_cost(&self, treatment_id: Uuid, cost: f64) -> Result<Treatment, ClinicError> {
        validate_cost(cost)?;
        let treatment = self.get_treatment(treatment_id).await?;
        let previous = treatment.cost;

        let updated = self.store.upsert_treatment(Treatment { cost, ..treatment }).await?;
        info!("Treatment {} repriced from {:.2} to {:.2}", updated.name, previous, updated.cost);
        Ok(updated)
    }

    /// Sets how many units of `item_id` one treatment consumes.
    pub async fn link(&self, treatment_id: Uuid, item_id: Uuid, qty_required: i32) -> Result<TreatmentRecipe, ClinicError> {
        if qty_required <= 0 {
            return Err(ClinicError::Validation("qty_required must be positive".to_string()));
        }

        let line = self
            .store
            .upsert_recipe_line(TreatmentRecipe {
                treatment_id,
                item_id,
                qty_required,
            })
            .await?;
        info!("Treatment {} now uses {} of item {}", treatment_id, qty_required, item_id);
        Ok(line)
    }

    pub async fn unlink(&self, treatment_id: Uuid, item_id: Uuid) -> Result<(), ClinicError> {
        self.store.delete_recipe_line(treatment_id, item_id).await?;
        info!("Removed item {} from treatment {}", item_id, treatment_id);
        Ok(())
    }

    /// Recipe of the treatment joined with item names, empty when none is linked.
    pub async fn resolve(&self, treatment_id: Uuid) -> Result<Vec<RecipeLine>, ClinicError> {
        self.get_treatment(treatment_id).await?;
        let recipe = self.store.get_recipe(treatment_id).await?;
        debug!("Treatment {} has {} recipe line(s)", treatment_id, recipe.len());

        let mut lines = Vec::with_capacity(recipe.len());
        for entry in recipe {
            let item = self
                .store
                .get_item(entry.item_id)
                .await?
                .ok_or_else(|| ClinicError::not_found("Inventory item", entry.item_id))?;
            lines.push(RecipeLine {
                item_id: item.id,
                item_name: item.name,
                unit: item.unit,
                qty_required: entry.qty_required,
            });
        }
        lines.sort_by(|a, b| a.item_name.to_lowercase().cmp(&b.item_name.to_lowercase()));
        Ok(lines)
    }
}

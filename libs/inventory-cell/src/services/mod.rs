pub mod import;
pub mod recipe;
pub mod stock;

pub use import::InventoryImporter;
pub use recipe::TreatmentRecipeStore;
pub use stock::InventoryStock;

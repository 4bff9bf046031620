pub mod analysis;
mod dto;
pub mod handlers;
pub mod table;

pub use handlers::router;
pub use table::{reference_table, NutritionFacts, NutritionTable};

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use handlers::router;
pub use repo::{MemoryProfileStore, PgProfileStore, ProfileStore};
pub use repo_types::UserPreferences;

pub mod dto;
pub mod fallback;
pub mod handlers;
pub mod model;
pub mod normalize;
pub mod prompt;
pub mod services;

pub use handlers::router;

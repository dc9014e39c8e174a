pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::CacheError;
pub use models::*;
pub use router::semantic_cache_routes;
pub use services::cache::SemanticCacheService;

pub mod cache;

pub use cache::SemanticCacheService;

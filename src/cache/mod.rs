pub mod error;
pub mod proximity_cache;

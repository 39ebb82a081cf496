pub mod config;
pub mod coordinate_key;
pub mod record;

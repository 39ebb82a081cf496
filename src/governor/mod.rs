pub mod error;
pub mod interval_governor;

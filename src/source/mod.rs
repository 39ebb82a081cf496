pub mod cleaning;
pub mod error;
pub mod observations;

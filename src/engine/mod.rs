pub mod enrichment_engine;
pub mod progress;
pub mod state;

pub mod dataset;
pub mod equipment;
pub mod error;
pub mod stats;

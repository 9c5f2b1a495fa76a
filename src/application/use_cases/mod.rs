pub mod dataset_service;
pub mod retention;
pub mod stats_engine;

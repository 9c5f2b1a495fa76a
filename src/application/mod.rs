pub mod use_cases;

pub use use_cases::dataset_service::{DatasetService, RenderedReport};
pub use use_cases::retention::{EvictionReport, RetentionPolicy, DEFAULT_RETENTION_LIMIT};
pub use use_cases::stats_engine::StatsEngine;

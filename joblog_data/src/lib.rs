pub mod analysis;
pub mod columns;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod misc;
pub mod pending;
pub mod pipeline;
pub mod record;

pub use analysis::Analysis;
pub use columns::ColumnIndex;
pub use config::{PartitionLimits, RunConfig, RunConfigBuilder};
pub use error::{FileError, PipelineError, RecordError};
pub use metrics::{DerivedMetrics, MemoryEfficiency};
pub use pending::PendingTime;
pub use pipeline::{FileReport, Pipeline, RunReport};
pub use record::{EligibleRecord, RawRecord};

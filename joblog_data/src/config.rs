use std::collections::HashMap;

use derive_builder::Builder;
use derive_more::derive::{Deref, From, Into};
use serde::{Deserialize, Serialize};

use crate::columns::DEFAULT_COLUMNS_OF_INTEREST;

/// Max requestable memory per partition, same unit as normalized `ReqMem`.
///
/// Jobs from partitions not listed here are never analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Deref, From, Into, Serialize, Deserialize)]
pub struct PartitionLimits(HashMap<String, u64>);

impl PartitionLimits {
    pub fn max_req_mem(&self, partition: &str) -> Option<u64> {
        self.0.get(partition).copied()
    }
}

impl Default for PartitionLimits {
    fn default() -> Self {
        PartitionLimits(
            [
                ("general", 80_000),        //     80 gb
                ("general_big", 750_000),   //    750 gb
                ("hov", 750_000),           //    750 gb
                ("snp", 750_000),           //    750 gb
                ("spill", 241_000),         //    241 gb
                ("bigmem", 3_041_000),      //  3,041 gb
                ("interact", 128_000),      //    128 gb
            ]
            .into_iter()
            .map(|(name, limit)| (name.to_owned(), limit))
            .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, u64); N]> for PartitionLimits {
    fn from(value: [(&str, u64); N]) -> Self {
        PartitionLimits(value.into_iter().map(|(name, limit)| (name.to_owned(), limit)).collect())
    }
}

/// Everything the pipeline needs for one run. Read-only once built.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RunConfig {
    #[builder(default = "String::from(\"|\")")]
    pub delimiter: String,
    /// Eligible records per parallel batch
    #[builder(default = "1000")]
    pub batch_size: usize,
    /// Copied verbatim into every output row, in this order
    #[builder(default = "DEFAULT_COLUMNS_OF_INTEREST.iter().map(|&c| c.to_owned()).collect()")]
    pub columns_of_interest: Vec<String>,
    #[builder(default)]
    pub partition_limits: PartitionLimits,
    /// `None` means one worker per available core
    #[builder(default)]
    pub worker_threads: Option<usize>,
}

impl RunConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == Some(0) {
            return Err("batch_size must be at least 1".to_owned());
        }
        if self.delimiter.as_ref().is_some_and(|d| d.is_empty()) {
            return Err("delimiter must not be empty".to_owned());
        }
        if self.worker_threads == Some(Some(0)) {
            return Err("worker_threads must be at least 1".to_owned());
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            delimiter: String::from("|"),
            batch_size: 1000,
            columns_of_interest: DEFAULT_COLUMNS_OF_INTEREST.iter().map(|&c| c.to_owned()).collect(),
            partition_limits: PartitionLimits::default(),
            worker_threads: None,
        }
    }
}

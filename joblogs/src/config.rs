use std::path::PathBuf;

use color_eyre::{eyre::Context as _, Result};
use config::{Config, ConfigError, Environment, File};
use joblog_data::{PartitionLimits, RunConfig, RunConfigBuilder};
use serde::Deserialize;

use crate::cli::{Action, Args};

const DEFAULT_INPUT_LOCATION: &str = ".";
const DEFAULT_OUTPUT_LOCATION: &str = ".";
const DEFAULT_FILE_MASK: &str = "2020-*.csv";
const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_DELIMITER: &str = "|";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub input_location: PathBuf,
    pub output_location: PathBuf,
    pub file_mask: String,
    pub batch_size: usize,
    pub delimiter: String,
    pub worker_threads: Option<usize>,
    /// empty means the action's default columns
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub partitions: PartitionLimits,
}

impl Settings {
    /// defaults < config file < `JOBLOGS_*` environment < command line
    pub fn new(args: &Args) -> Result<Self, ConfigError> {
        let path_arg = |path: &Option<PathBuf>| path.as_ref().map(|p| p.to_string_lossy().into_owned());

        let builder = Config::builder()
            .set_default("input_location", DEFAULT_INPUT_LOCATION)?
            .set_default("output_location", DEFAULT_OUTPUT_LOCATION)?
            .set_default("file_mask", DEFAULT_FILE_MASK)?
            .set_default("batch_size", DEFAULT_BATCH_SIZE.to_string())?
            .set_default("delimiter", DEFAULT_DELIMITER)?
            .add_source(File::from(args.config.as_path()).required(false))
            .add_source(Environment::with_prefix("JOBLOGS"))
            .set_override_option("input_location", path_arg(&args.input_location))?
            .set_override_option("output_location", path_arg(&args.output_location))?
            .set_override_option("file_mask", args.file_mask.clone())?
            .set_override_option("batch_size", args.batch_size.map(|n| n.to_string()))?
            .set_override_option("delimiter", args.delimiter.clone())?
            .set_override_option("worker_threads", args.threads.map(|n| n.to_string()))?
            .build()?;

        builder.try_deserialize()
    }

    pub fn run_config(&self, action: Action) -> Result<RunConfig> {
        let columns = if self.columns.is_empty() {
            action.default_columns()
        } else {
            self.columns.clone()
        };

        RunConfigBuilder::default()
            .delimiter(self.delimiter.clone())
            .batch_size(self.batch_size)
            .columns_of_interest(columns)
            .partition_limits(self.partitions.clone())
            .worker_threads(self.worker_threads)
            .build()
            .wrap_err("invalid settings")
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser as _;
    use tempfile::TempDir;

    use super::*;

    fn args(dir: &TempDir, extra: &[&str]) -> Args {
        let config = dir.path().join("joblogs.toml");
        let config = config.to_string_lossy();
        let argv = ["joblogs", "--config", config.as_ref()].into_iter().chain(extra.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn Settings__new__defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::new(&args(&dir, &[])).unwrap();
        assert_eq!(settings.file_mask, DEFAULT_FILE_MASK);
        assert_eq!(settings.delimiter, "|");
        assert_eq!(settings.partitions, PartitionLimits::default());
        assert!(settings.columns.is_empty());
    }

    #[test]
    fn Settings__new__file_then_cli() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("joblogs.toml"),
            "batch_size = 10\nfile_mask = \"*.txt\"\n\n[partitions]\ngeneral = 1000\n",
        )
        .unwrap();

        let settings = Settings::new(&args(&dir, &["--batchsize", "20"])).unwrap();
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.file_mask, "*.txt");
        assert_eq!(settings.partitions, PartitionLimits::from([("general", 1000)]));
    }

    #[test]
    fn Settings__run_config() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::new(&args(&dir, &["--threads", "3"])).unwrap();

        let memeff = settings.run_config(Action::Memeff).unwrap();
        assert_eq!(memeff.columns_of_interest, Action::Memeff.default_columns());
        assert_eq!(memeff.worker_threads, Some(3));

        let pend = settings.run_config(Action::Pend).unwrap();
        assert!(pend.columns_of_interest.contains(&"Submit".to_owned()));
    }

    #[test]
    fn Settings__run_config__rejects_zero_batch() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::new(&args(&dir, &["--batchsize", "0"])).unwrap();
        assert!(settings.run_config(Action::Memeff).is_err());
    }
}

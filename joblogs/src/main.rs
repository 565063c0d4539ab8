use std::{fs::File, io::BufWriter, path::PathBuf};

use clap::Parser;
use color_eyre::{eyre::Context as _, Result};
use joblog_data::{Analysis, MemoryEfficiency, PendingTime, Pipeline, RunConfig, RunReport};
use tracing::{info, warn, Level};

mod cli;
mod config;
mod files;

use cli::{Action, Args};
use config::Settings;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    register_logging(args.log_level)?;

    let settings = Settings::new(&args).wrap_err("loading settings")?;
    let run_config = settings.run_config(args.action)?;

    let inputs = files::enumerate_inputs(&settings.input_location, &settings.file_mask)?;
    if inputs.is_empty() {
        warn!(
            "no files in {:?} match `{}`, the report will only have a header",
            settings.input_location, settings.file_mask
        );
    }

    let output_path = files::output_path(&settings.output_location, args.action.output_prefix())?;
    info!("{:?} report of {} files into {output_path:?}", args.action, inputs.len());
    let output = files::open_output(&output_path)?;

    let report = match args.action {
        Action::Memeff => run(MemoryEfficiency, run_config, &inputs, output),
        Action::Pend => run(PendingTime, run_config, &inputs, output),
    }?;

    info!(
        written = report.written(),
        ineligible = report.ineligible(),
        failed = report.failed(),
        skipped_files = report.skipped.len(),
        "done: {output_path:?}"
    );
    Ok(())
}

fn run<A: Analysis>(analysis: A, config: RunConfig, inputs: &[PathBuf], output: File) -> Result<RunReport> {
    let pipeline = Pipeline::new(analysis, config)?;
    let mut sink = BufWriter::new(output);
    let report = pipeline.run(inputs, &mut sink)?;
    sink.into_inner()
        .map_err(|e| e.into_error())
        .wrap_err("flushing output")?;
    Ok(report)
}

fn register_logging(level: Level) -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDate};
use color_eyre::{
    eyre::{bail, eyre, Context as _},
    Result,
};
use glob::Pattern;
use rand::Rng;
use tracing::debug;

/// There are only 90 two digit suffixes per day.
const MAX_NAME_ATTEMPTS: usize = 200;

/// Regular files in `dir` whose name matches `mask`, in lexicographic order.
pub fn enumerate_inputs(dir: &Path, mask: &str) -> Result<Vec<PathBuf>> {
    let dir_text = dir
        .to_str()
        .ok_or_else(|| eyre!("input location {dir:?} is not valid utf-8"))?;
    let pattern = format!("{}/{mask}", Pattern::escape(dir_text));

    let mut inputs = glob::glob(&pattern)
        .wrap_err_with(|| format!("invalid file mask `{mask}`"))?
        .collect::<Result<Vec<_>, _>>()
        .wrap_err_with(|| format!("listing {dir:?}"))?;
    inputs.retain(|path| path.is_file());
    inputs.sort();

    debug!("{} inputs match {pattern}", inputs.len());
    Ok(inputs)
}

/// `<dir>/<prefix>-<YYYY-MM-DD>-<NN>.txt` for today, with a fresh random `NN`.
pub fn output_path(dir: &Path, prefix: &str) -> Result<PathBuf> {
    output_path_with(dir, prefix, Local::now().date_naive(), &mut rand::thread_rng())
}

pub fn output_path_with(dir: &Path, prefix: &str, date: NaiveDate, rng: &mut impl Rng) -> Result<PathBuf> {
    let date = date.format("%Y-%m-%d");
    for _ in 0..MAX_NAME_ATTEMPTS {
        let suffix: u8 = rng.gen_range(10..100);
        let candidate = dir.join(format!("{prefix}-{date}-{suffix}.txt"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    bail!("no free output name for {prefix}-{date} in {dir:?}")
}

/// Append mode, but never onto a report from an earlier run.
pub fn open_output(path: &Path) -> Result<File> {
    OpenOptions::new()
        .append(true)
        .create_new(true)
        .open(path)
        .wrap_err_with(|| format!("creating output {path:?}"))
}

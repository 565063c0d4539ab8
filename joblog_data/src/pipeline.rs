use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use itertools::Itertools as _;
use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    analysis::Analysis,
    columns::ColumnIndex,
    config::RunConfig,
    error::{FileError, PipelineError, RecordError},
    filter::Rejection,
    record::{EligibleRecord, RawRecord},
};

/// Counters for one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub eligible: usize,
    pub ineligible: usize,
    /// ineligible records per [`Rejection::kind`]
    pub rejections: BTreeMap<&'static str, usize>,
    /// eligible records whose derived fields could not be computed
    pub failed: usize,
    pub written: usize,
    pub flushes: usize,
    pub missing_columns: usize,
}

impl FileReport {
    fn reject(&mut self, rejection: &Rejection) {
        self.ineligible += 1;
        *self.rejections.entry(rejection.kind()).or_default() += 1;
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    /// files abandoned because of a [`FileError`], with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.files.iter().map(|f| f.written).sum()
    }

    pub fn ineligible(&self) -> usize {
        self.files.iter().map(|f| f.ineligible).sum()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().map(|f| f.failed).sum()
    }
}

/// Reads accounting files batch by batch, filters with the analysis, derives its fields in
/// parallel and appends one line per eligible record to the output.
pub struct Pipeline<A> {
    analysis: A,
    config: RunConfig,
    pool: rayon::ThreadPool,
}

impl<A: Analysis> Pipeline<A> {
    pub fn new(analysis: A, config: RunConfig) -> Result<Self, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.unwrap_or(0))
            .thread_name(|i| format!("joblogs-worker-{i}"))
            .build()?;

        Ok(Pipeline { analysis, config, pool })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Columns of interest, then whatever the analysis reads on top.
    pub fn wanted_columns(&self) -> Vec<&str> {
        self.config
            .columns_of_interest
            .iter()
            .map(String::as_str)
            .chain(self.analysis.required_columns().iter().copied())
            .unique()
            .collect_vec()
    }

    /// Mirrors [`Pipeline::render`]: columns of interest, then the analysis' derived columns.
    pub fn header(&self) -> String {
        self.config
            .columns_of_interest
            .iter()
            .map(String::as_str)
            .chain(self.analysis.derived_columns().iter().copied())
            .join(&self.config.delimiter)
    }

    pub fn write_header(&self, sink: &mut impl Write) -> io::Result<()> {
        writeln!(sink, "{}", self.header())
    }

    /// Header once, then every input in order. A file that fails is logged and skipped; only a
    /// failing output ends the run.
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P], sink: &mut impl Write) -> Result<RunReport, FileError> {
        self.write_header(sink).map_err(FileError::Write)?;

        let mut report = RunReport::default();
        for (idx, input) in inputs.iter().enumerate() {
            let path = input.as_ref();
            match self.process_file(path, sink) {
                Ok(file_report) => {
                    info!("finished {}/{}: {path:?}", idx + 1, inputs.len());
                    report.files.push(file_report);
                }
                Err(e @ FileError::Write(_)) => return Err(e),
                Err(e) => {
                    error!("skipping {path:?}: {e:#}");
                    report.skipped.push((path.to_owned(), format!("{e:#}")));
                }
            }
        }

        Ok(report)
    }

    #[instrument(skip(self, sink))]
    pub fn process_file(&self, path: &Path, sink: &mut impl Write) -> Result<FileReport, FileError> {
        let file = File::open(path).map_err(|source| FileError::HeaderUnreadable {
            path: path.to_owned(),
            source,
        })?;
        self.process_reader(path, BufReader::new(file), sink)
    }

    /// `path` only labels diagnostics and the report.
    pub fn process_reader(&self, path: &Path, mut reader: impl BufRead, sink: &mut impl Write) -> Result<FileReport, FileError> {
        let mut buf = Vec::new();
        let header = match read_line_lossy(&mut reader, &mut buf) {
            Ok(Some(header)) => header,
            Err(source) => {
                return Err(FileError::HeaderUnreadable { path: path.to_owned(), source });
            }
            Ok(None) => {
                return Err(FileError::HeaderUnreadable {
                    path: path.to_owned(),
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, "file is empty"),
                });
            }
        };

        let columns = ColumnIndex::resolve(&header, &self.config.delimiter, &self.wanted_columns());
        if !columns.missing().is_empty() {
            warn!(
                missing = ?columns.missing(),
                found = ?columns.found().collect_vec(),
                "{} columns of interest were not found in {path:?}",
                columns.missing().len()
            );
        }

        let mut report = FileReport {
            path: path.to_owned(),
            missing_columns: columns.missing().len(),
            ..Default::default()
        };
        let batch_size = self.config.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);

        while let Some(line) =
            read_line_lossy(&mut reader, &mut buf).map_err(|source| FileError::Read { path: path.to_owned(), source })?
        {
            let record = RawRecord::parse(&line, &self.config.delimiter);
            match self.analysis.admit(record, &columns, &self.config) {
                Ok(eligible) => {
                    batch.push(eligible);
                    report.eligible += 1;
                    if report.eligible % batch_size == 0 {
                        self.flush(&mut batch, &columns, &mut report, sink)?;
                    }
                }
                Err(rejection) => report.reject(&rejection),
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, &columns, &mut report, sink)?;
        }

        info!(
            eligible = report.eligible,
            written = report.written,
            failed = report.failed,
            rejections = ?report.rejections,
            "{} records filtered from {path:?}",
            report.ineligible
        );
        Ok(report)
    }

    /// Derives every record of the batch on the worker pool, then appends all resulting lines in a
    /// single write. Records that fail are logged and left out.
    fn flush(
        &self,
        batch: &mut Vec<EligibleRecord>,
        columns: &ColumnIndex,
        report: &mut FileReport,
        sink: &mut impl Write,
    ) -> Result<(), FileError> {
        let rendered: Vec<Result<String, RecordError>> =
            self.pool.install(|| batch.par_iter().map(|record| self.render(record, columns)).collect());
        let (lines, errors): (Vec<_>, Vec<_>) = rendered.into_iter().partition_result();

        for e in &errors {
            warn!("skipping record: {e}");
        }

        let mut buf = String::new();
        for line in &lines {
            buf.push_str(line);
            buf.push('\n');
        }
        sink.write_all(buf.as_bytes()).map_err(FileError::Write)?;

        debug!(records = batch.len(), written = lines.len(), failed = errors.len(), "flushed batch");
        report.written += lines.len();
        report.failed += errors.len();
        report.flushes += 1;
        batch.clear();
        Ok(())
    }

    /// One output row. Field order is [`Pipeline::header`]'s.
    fn render(&self, record: &EligibleRecord, columns: &ColumnIndex) -> Result<String, RecordError> {
        let copied: Vec<&str> = self
            .config
            .columns_of_interest
            .iter()
            .map(|name| record.raw().get(columns, name))
            .collect::<Result<_, _>>()?;
        let derived = self.analysis.derive(record, columns, &self.config)?;

        Ok(copied
            .into_iter()
            .chain(derived.iter().map(String::as_str))
            .join(&self.config.delimiter))
    }
}

/// Next line without its `\n` or `\r\n`, `None` at end of input. Bytes that are not UTF-8 become
/// U+FFFD, so a stray byte only affects the fields it sits in.
fn read_line_lossy(reader: &mut impl BufRead, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

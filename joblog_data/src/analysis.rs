use crate::{
    columns::ColumnIndex,
    config::RunConfig,
    error::RecordError,
    filter::Rejection,
    record::{EligibleRecord, RawRecord},
};

/// One kind of per-job report the batch pipeline can produce.
///
/// `derive` runs on rayon workers, concurrently for every record of a batch, so it must only read
/// its record and the shared read-only inputs.
pub trait Analysis: Sync {
    /// Output header names appended after the columns of interest. Must match `derive` field for field.
    fn derived_columns(&self) -> &'static [&'static str];

    /// Columns `admit`/`derive` read, on top of the columns of interest.
    fn required_columns(&self) -> &'static [&'static str];

    fn admit(&self, record: RawRecord, columns: &ColumnIndex, config: &RunConfig) -> Result<EligibleRecord, Rejection>;

    fn derive(&self, record: &EligibleRecord, columns: &ColumnIndex, config: &RunConfig) -> Result<Vec<String>, RecordError>;
}

//! Decides which accounting records describe analyzable, completed work.

use itertools::Itertools as _;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    columns::{ColumnIndex, ELAPSED, NCPUS, PARTITION, REQ_MEM, STATE},
    config::PartitionLimits,
    error::RecordError,
    misc::parsing::{MemUnit, ReqMemParseError, RequestedMemory},
    record::{EligibleRecord, RawRecord},
};

/// Jobs in these states are still going, or died for reasons the efficiency numbers can't describe.
pub const EXCLUDED_STATES: [&str; 3] = ["RUNNING", "SUSPENDED", "OUT_OF_MEMORY"];
/// Normalized `ReqMem` below this is not worth auditing.
pub const REQ_MEM_THRESHOLD: u64 = 3096;
pub const MIN_ELAPSED_MINUTES: u64 = 5;

/// Why a record was left out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("state {0} is excluded")]
    ExcludedState(String),
    #[error("partition `{0}` has no configured memory limit")]
    UnknownPartition(String),
    #[error("ran less than {MIN_ELAPSED_MINUTES} minutes ({0})")]
    TooShort(String),
    #[error("ReqMem `{0}` is a cancelled-job sentinel")]
    ReqMemSentinel(String),
    #[error("unrecognized ReqMem unit in `{0}`")]
    UnrecognizedUnit(String),
    #[error("requested memory {0} is below {REQ_MEM_THRESHOLD}")]
    BelowMemThreshold(u64),
    #[error(transparent)]
    Unparsable(#[from] RecordError),
}

impl Rejection {
    /// Short label used to aggregate rejection counts.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::ExcludedState(_) => "excluded_state",
            Rejection::UnknownPartition(_) => "unknown_partition",
            Rejection::TooShort(_) => "too_short",
            Rejection::ReqMemSentinel(_) => "reqmem_sentinel",
            Rejection::UnrecognizedUnit(_) => "unrecognized_unit",
            Rejection::BelowMemThreshold(_) => "below_mem_threshold",
            Rejection::Unparsable(_) => "unparsable",
        }
    }
}

pub fn is_eligible(record: &RawRecord, columns: &ColumnIndex, limits: &PartitionLimits) -> bool {
    check(record, columns, limits).is_ok()
}

/// [`check`], handing the record over as an [`EligibleRecord`] if it passes.
pub fn admit(record: RawRecord, columns: &ColumnIndex, limits: &PartitionLimits) -> Result<EligibleRecord, Rejection> {
    check(&record, columns, limits)?;
    Ok(EligibleRecord::admit(record))
}

/// Pure apart from `warn!` on unit and parse anomalies. Malformed fields reject the record, they
/// never propagate.
pub fn check(record: &RawRecord, columns: &ColumnIndex, limits: &PartitionLimits) -> Result<(), Rejection> {
    let result = check_inner(record, columns, limits);
    match &result {
        Err(Rejection::UnrecognizedUnit(req_mem)) => warn!(req_mem = %req_mem, "unrecognized units for ReqMem"),
        // already reported once per file by the pipeline
        Err(Rejection::Unparsable(e @ RecordError::MissingColumn(_))) => debug!("record rejected: {e}"),
        Err(Rejection::Unparsable(e)) => warn!("record rejected: {e}"),
        _ => {}
    }
    result
}

fn check_inner(record: &RawRecord, columns: &ColumnIndex, limits: &PartitionLimits) -> Result<(), Rejection> {
    let state = record.get(columns, STATE)?;
    if EXCLUDED_STATES.contains(&state) {
        return Err(Rejection::ExcludedState(state.to_owned()));
    }

    let partition = record.get(columns, PARTITION)?;
    if limits.max_req_mem(partition).is_none() {
        return Err(Rejection::UnknownPartition(partition.to_owned()));
    }

    let elapsed = record.get(columns, ELAPSED)?;
    if ran_too_short(elapsed)? {
        return Err(Rejection::TooShort(elapsed.to_owned()));
    }

    let req_mem_text = record.get(columns, REQ_MEM)?;
    let req_mem = match req_mem_text.parse::<RequestedMemory>() {
        Ok(req_mem) => req_mem,
        Err(ReqMemParseError::TooShort(text)) => return Err(Rejection::ReqMemSentinel(text)),
        Err(ReqMemParseError::UnrecognizedUnit(text)) => return Err(Rejection::UnrecognizedUnit(text)),
        Err(e) => return Err(RecordError::from(e).into()),
    };
    let ncpus = match req_mem.unit {
        MemUnit::PerNode => 1,
        MemUnit::PerCore => record.parse_field::<u32>(columns, NCPUS)?,
    };
    let normalized = req_mem.normalized(ncpus).map_err(RecordError::from)?;
    if normalized < REQ_MEM_THRESHOLD {
        return Err(Rejection::BelowMemThreshold(normalized));
    }

    Ok(())
}

/// Without a day prefix, `HH:MM:...` with HH == 0 and MM below the minimum.
fn ran_too_short(elapsed: &str) -> Result<bool, RecordError> {
    if elapsed.contains('-') {
        return Ok(false);
    }
    let malformed = || RecordError::MalformedField {
        column: ELAPSED.to_owned(),
        value: elapsed.to_owned(),
    };
    let parts = elapsed.split(':').collect_vec();
    let (hh, mm) = match parts.as_slice() {
        [hh, mm, ..] => (
            hh.parse::<u64>().map_err(|_| malformed())?,
            mm.parse::<u64>().map_err(|_| malformed())?,
        ),
        _ => return Err(malformed()),
    };

    Ok(hh == 0 && mm < MIN_ELAPSED_MINUTES)
}

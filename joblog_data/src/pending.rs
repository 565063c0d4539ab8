//! How long jobs waited in the queue, binned by job size.

use chrono::NaiveDateTime;
use derive_more::derive::Display;

use crate::{
    analysis::Analysis,
    columns::{ColumnIndex, ELAPSED, NCPUS, START, STATE, SUBMIT},
    config::RunConfig,
    error::RecordError,
    filter::Rejection,
    metrics::round2,
    misc::parsing::SlurmDuration,
    record::{EligibleRecord, RawRecord},
};

/// Jobs still in these states have no meaningful start time yet.
pub const PENDING_EXCLUDED_STATES: [&str; 2] = ["RUNNING", "SUSPENDED"];

/// sacct prints local time without an offset
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum JobSize {
    Small,
    Medium,
    Large,
    Huge,
}

impl JobSize {
    pub fn bin(ncpus: u32, hrs_elapsed: u64) -> Self {
        match (ncpus, hrs_elapsed) {
            (101.., 37..) => JobSize::Huge,
            (41.., 25..) => JobSize::Large,
            (13.., _) => JobSize::Medium,
            _ => JobSize::Small,
        }
    }
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn timestamp_field(record: &RawRecord, columns: &ColumnIndex, name: &str) -> Result<NaiveDateTime, RecordError> {
    let value = record.get(columns, name)?;
    parse_timestamp(value).ok_or_else(|| RecordError::MalformedField {
        column: name.to_owned(),
        value: value.to_owned(),
    })
}

/// Hours between submit and start, two decimals.
pub fn pend_hours(submit: NaiveDateTime, start: NaiveDateTime) -> f64 {
    round2((start - submit).num_seconds() as f64 / 3600f64)
}

/// The `pend` report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingTime;

impl PendingTime {
    pub const HEADERS: [&'static str; 2] = ["PendHours", "JobSize"];
}

impl Analysis for PendingTime {
    fn derived_columns(&self) -> &'static [&'static str] {
        &Self::HEADERS
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[STATE, SUBMIT, START, NCPUS, ELAPSED]
    }

    fn admit(&self, record: RawRecord, columns: &ColumnIndex, _config: &RunConfig) -> Result<EligibleRecord, Rejection> {
        let state = record.get(columns, STATE)?;
        if PENDING_EXCLUDED_STATES.contains(&state) {
            return Err(Rejection::ExcludedState(state.to_owned()));
        }
        // never-started jobs have `Unknown` or `None` as Start
        timestamp_field(&record, columns, SUBMIT)?;
        timestamp_field(&record, columns, START)?;

        Ok(EligibleRecord::admit(record))
    }

    fn derive(&self, record: &EligibleRecord, columns: &ColumnIndex, _config: &RunConfig) -> Result<Vec<String>, RecordError> {
        let raw = record.raw();
        let submit = timestamp_field(raw, columns, SUBMIT)?;
        let start = timestamp_field(raw, columns, START)?;
        let ncpus: u32 = raw.parse_field(columns, NCPUS)?;
        let hrs_elapsed = raw.get(columns, ELAPSED)?.parse::<SlurmDuration>()?.hours();

        Ok(vec![
            pend_hours(submit, start).to_string(),
            JobSize::bin(ncpus, hrs_elapsed.trunc() as u64).to_string(),
        ])
    }
}

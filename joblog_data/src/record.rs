use std::str::FromStr;

use itertools::Itertools as _;

use crate::{columns::ColumnIndex, error::RecordError};

/// The fields of one delimited input line. Meaningless without the file's [`ColumnIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<String>,
}

impl RawRecord {
    pub fn parse(line: &str, delimiter: &str) -> Self {
        RawRecord {
            fields: line.split(delimiter).map(String::from).collect_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field of column `name`, looked up through `columns`.
    pub fn get<'a>(&'a self, columns: &ColumnIndex, name: &str) -> Result<&'a str, RecordError> {
        let index = columns
            .get(name)
            .ok_or_else(|| RecordError::MissingColumn(name.to_owned()))?;
        self.fields
            .get(index)
            .map(|field| field.trim())
            .ok_or_else(|| RecordError::ShortRow {
                column: name.to_owned(),
                index,
                len: self.fields.len(),
            })
    }

    /// [`RawRecord::get`], then [`FromStr`]. Parse failures become [`RecordError::MalformedField`].
    pub fn parse_field<T: FromStr>(&self, columns: &ColumnIndex, name: &str) -> Result<T, RecordError> {
        let value = self.get(columns, name)?;
        value.parse().map_err(|_| RecordError::MalformedField {
            column: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// A record that passed an analysis' eligibility check. Only the filters in this crate create these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRecord(RawRecord);

impl EligibleRecord {
    pub(crate) fn admit(record: RawRecord) -> Self {
        EligibleRecord(record)
    }

    pub fn raw(&self) -> &RawRecord {
        &self.0
    }
}

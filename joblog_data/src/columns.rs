use std::collections::HashMap;

use itertools::Itertools as _;

pub const USER: &str = "User";
pub const ACCOUNT: &str = "Account";
pub const JOB_ID: &str = "JobID";
pub const PARTITION: &str = "Partition";
pub const STATE: &str = "State";
pub const MAX_RSS: &str = "MaxRSS";
pub const REQ_MEM: &str = "ReqMem";
pub const REQ_CPUS: &str = "ReqCPUS";
pub const NCPUS: &str = "NCPUS";
pub const TOTAL_CPU: &str = "TotalCPU";
pub const ELAPSED: &str = "Elapsed";
pub const TIMELIMIT: &str = "Timelimit";
pub const SUBMIT: &str = "Submit";
pub const START: &str = "Start";

/// Columns copied verbatim into the output, in output order.
pub const DEFAULT_COLUMNS_OF_INTEREST: [&str; 12] = [
    USER, ACCOUNT, JOB_ID, PARTITION, STATE, MAX_RSS, REQ_MEM, REQ_CPUS, NCPUS, TOTAL_CPU, ELAPSED, TIMELIMIT,
];

/// Position of each wanted column in one input file, resolved from that file's header.
///
/// Wanted names absent from the header are kept in [`ColumnIndex::missing`] instead of failing,
/// lookups for them return `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
    missing: Vec<String>,
}

impl ColumnIndex {
    pub fn resolve<S: AsRef<str>>(header: &str, delimiter: &str, wanted: &[S]) -> Self {
        let in_file = header.split(delimiter).map(str::trim).collect_vec();

        let (positions, missing): (Vec<_>, Vec<_>) = wanted
            .iter()
            .map(AsRef::as_ref)
            .unique()
            .map(|name| match in_file.iter().position(|&col| col == name) {
                Some(index) => Ok((name.to_owned(), index)),
                None => Err(name.to_owned()),
            })
            .partition_result();

        ColumnIndex {
            positions: positions.into_iter().collect(),
            missing,
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `(name, index)` pairs sorted by position in the file.
    pub fn found(&self) -> impl Iterator<Item = (&str, usize)> {
        self.positions
            .iter()
            .map(|(name, &index)| (name.as_str(), index))
            .sorted_by_key(|&(_, index)| index)
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "JobID|User|Account|State|Partition|NCPUS|User";

    #[test]
    fn ColumnIndex__resolve__all_found() {
        let index = ColumnIndex::resolve(HEADER, "|", &[STATE, JOB_ID, NCPUS]);
        assert_eq!(index.get(STATE), Some(3));
        assert_eq!(index.get(JOB_ID), Some(0));
        assert_eq!(index.get(NCPUS), Some(5));
        assert!(index.missing().is_empty());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn ColumnIndex__resolve__first_occurrence_wins() {
        let index = ColumnIndex::resolve(HEADER, "|", &[USER]);
        assert_eq!(index.get(USER), Some(1));
    }

    #[test]
    fn ColumnIndex__resolve__missing_is_reported() {
        let index = ColumnIndex::resolve(HEADER, "|", &[STATE, MAX_RSS, ELAPSED]);
        assert_eq!(index.get(MAX_RSS), None);
        assert_eq!(index.missing(), [MAX_RSS.to_owned(), ELAPSED.to_owned()]);
        assert_eq!(index.found().collect_vec(), vec![(STATE, 3)]);
    }

    #[test]
    fn ColumnIndex__resolve__other_delimiter_and_duplicates() {
        let index = ColumnIndex::resolve("State,Partition", ",", &[PARTITION, PARTITION, STATE]);
        assert_eq!(index.get(PARTITION), Some(1));
        assert!(index.missing().is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn ColumnIndex__default_is_empty() {
        let index = ColumnIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.get(STATE), None);
    }
}

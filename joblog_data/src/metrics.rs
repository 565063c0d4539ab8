//! Per-job resource efficiency: cpu, memory, weighted memory and GB-hours.

use crate::{
    analysis::Analysis,
    columns::{ColumnIndex, ELAPSED, MAX_RSS, NCPUS, PARTITION, REQ_MEM, STATE, TOTAL_CPU},
    config::{PartitionLimits, RunConfig},
    error::RecordError,
    filter::{self, Rejection},
    misc::parsing::{format_hours, RequestedMemory, SlurmDuration},
    record::{EligibleRecord, RawRecord},
};

/// Jobs using more than this share of their requested memory are not weighted.
// older report drafts used 89
pub const EFFICIENT_ENOUGH_PCT: f64 = 80.0;
/// Below this share of requested memory, the absolute-size penalties kick in.
pub const PENALTY_ZONE_PCT: f64 = 60.0;
/// 11 days, the longest a job may run
pub const MAX_RUNTIME_HOURS: f64 = 264.0;
pub const MAX_REQUESTABLE_CPUS: f64 = 256.0;

const WEIGHT_UNUSED_MEM: f64 = 0.5;
const WEIGHT_ELAPSED: f64 = 0.3;
const WEIGHT_NCPUS: f64 = 0.2;

/// `(threshold, penalty)`, every exceeded threshold adds its penalty.
const REQ_MEM_PENALTIES: [(u64, f64); 2] = [(30_000, 0.20), (100_000, 0.40)];
const NCPUS_PENALTIES: [(u32, f64); 2] = [(12, 0.15), (40, 0.15)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub cpu_efficiency_pct: f64,
    pub mem_efficiency_pct: f64,
    pub weighted_mem_efficiency_pct: f64,
    pub gb_hours_requested: i64,
    pub gb_hours_used: i64,
}

impl DerivedMetrics {
    /// Header names, in the order of [`DerivedMetrics::fields`].
    pub const HEADERS: [&'static str; 5] = [
        "CPUEffeciency",
        "MemEffeciency",
        "WeightedMemEffeciency",
        "GBHoursRequested",
        "GBHoursUsed",
    ];

    pub fn fields(&self) -> [String; 5] {
        [
            self.cpu_efficiency_pct.to_string(),
            self.mem_efficiency_pct.to_string(),
            self.weighted_mem_efficiency_pct.to_string(),
            self.gb_hours_requested.to_string(),
            self.gb_hours_used.to_string(),
        ]
    }
}

/// Two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100f64).round_ties_even() / 100f64
}

/// `ncpus * elapsed`, passed through the `[D-]HH:MM:SS` text form so it carries the same
/// whole-second precision as the TotalCPU it gets compared with.
pub fn core_wall_time_hours(hrs_elapsed: f64, ncpus: u32) -> Result<f64, RecordError> {
    Ok(format_hours(hrs_elapsed * f64::from(ncpus)).parse::<SlurmDuration>()?.hours())
}

pub fn cpu_efficiency(total_cpu_hours: f64, core_wall_time_hours: f64) -> Result<f64, RecordError> {
    if core_wall_time_hours <= 0f64 {
        return Err(RecordError::ZeroCoreWallTime);
    }
    Ok(total_cpu_hours / core_wall_time_hours * 100f64)
}

/// Memory efficiency penalized by how much memory was left unused relative to the partition's
/// ceiling, by runtime and by core count. Jobs above [`EFFICIENT_ENOUGH_PCT`] are returned as is.
pub fn weighted_score(mem_eff: f64, hrs_elapsed: f64, req_mem: u64, ncpus: u32, partition_max_req_mem: f64) -> f64 {
    if mem_eff > EFFICIENT_ENOUGH_PCT {
        return mem_eff;
    }

    let unused = (100f64 - mem_eff) / 100f64 * req_mem as f64;
    let unused_norm = unused / partition_max_req_mem;
    let elapsed_norm = hrs_elapsed / MAX_RUNTIME_HOURS;
    let ncpus_norm = f64::from(ncpus) / MAX_REQUESTABLE_CPUS;

    let mut multiplier = WEIGHT_UNUSED_MEM * unused_norm + WEIGHT_ELAPSED * elapsed_norm + WEIGHT_NCPUS * ncpus_norm;

    if mem_eff < PENALTY_ZONE_PCT {
        let penalty: f64 = REQ_MEM_PENALTIES
            .iter()
            .filter(|&&(threshold, _)| req_mem > threshold)
            .map(|&(_, penalty)| penalty)
            .chain(
                NCPUS_PENALTIES
                    .iter()
                    .filter(|&&(threshold, _)| ncpus > threshold)
                    .map(|&(_, penalty)| penalty),
            )
            .sum();
        multiplier += (1f64 - multiplier) * penalty;
    }

    mem_eff * (1f64 - multiplier)
}

pub fn compute(record: &EligibleRecord, columns: &ColumnIndex, limits: &PartitionLimits) -> Result<DerivedMetrics, RecordError> {
    let raw = record.raw();

    let ncpus: u32 = raw.parse_field(columns, NCPUS)?;
    let hrs_elapsed = raw.get(columns, ELAPSED)?.parse::<SlurmDuration>()?.hours();
    let total_cpu = raw.get(columns, TOTAL_CPU)?.parse::<SlurmDuration>()?.hours();
    let cpu_eff = cpu_efficiency(total_cpu, core_wall_time_hours(hrs_elapsed, ncpus)?)?;

    let req_mem = raw.get(columns, REQ_MEM)?.parse::<RequestedMemory>()?.normalized(ncpus)?;
    let max_rss: f64 = raw.parse_field(columns, MAX_RSS)?;
    // `f64::from_str` takes `NaN` and `inf`
    if !max_rss.is_finite() || max_rss < 0f64 {
        return Err(RecordError::MalformedField {
            column: MAX_RSS.to_owned(),
            value: raw.get(columns, MAX_RSS)?.to_owned(),
        });
    }
    let partition = raw.get(columns, PARTITION)?;
    let partition_max = limits
        .max_req_mem(partition)
        .filter(|&max| max > 0)
        .ok_or_else(|| RecordError::UnknownPartition(partition.to_owned()))?;

    let mem_eff = round2(max_rss / req_mem as f64 * 100f64);
    let weighted = weighted_score(mem_eff, hrs_elapsed, req_mem, ncpus, partition_max as f64);

    Ok(DerivedMetrics {
        cpu_efficiency_pct: round2(cpu_eff),
        mem_efficiency_pct: mem_eff,
        weighted_mem_efficiency_pct: round2(weighted),
        gb_hours_requested: (req_mem as f64 / 1000f64 * hrs_elapsed).trunc() as i64,
        gb_hours_used: (max_rss / 1000f64 * hrs_elapsed).trunc() as i64,
    })
}

/// The `memeff` report: [`filter`] for eligibility, [`compute`] for the derived fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryEfficiency;

impl Analysis for MemoryEfficiency {
    fn derived_columns(&self) -> &'static [&'static str] {
        &DerivedMetrics::HEADERS
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[STATE, PARTITION, ELAPSED, REQ_MEM, NCPUS, TOTAL_CPU, MAX_RSS]
    }

    fn admit(&self, record: RawRecord, columns: &ColumnIndex, config: &RunConfig) -> Result<EligibleRecord, Rejection> {
        filter::admit(record, columns, &config.partition_limits)
    }

    fn derive(&self, record: &EligibleRecord, columns: &ColumnIndex, config: &RunConfig) -> Result<Vec<String>, RecordError> {
        compute(record, columns, &config.partition_limits).map(|metrics| metrics.fields().to_vec())
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::misc::parsing::DurationParseError;

    const ε: f64 = 1e-9;
    const HEADER: &str = "JobID|Partition|State|MaxRSS|ReqMem|NCPUS|TotalCPU|Elapsed";

    fn columns() -> ColumnIndex {
        ColumnIndex::resolve(HEADER, "|", MemoryEfficiency.required_columns())
    }

    fn compute_line(line: &str) -> Result<DerivedMetrics, RecordError> {
        let limits = PartitionLimits::default();
        let record = filter::admit(RawRecord::parse(line, "|"), &columns(), &limits).unwrap();
        compute(&record, &columns(), &limits)
    }

    #[test]
    fn weighted_score__exempt_above_threshold() {
        assert_eq!(weighted_score(85.0, 10.0, 150_000, 50, 750_000.0), 85.0);
        assert_eq!(weighted_score(80.01, 200.0, 3_000_000, 256, 80_000.0), 80.01);
    }

    #[test]
    fn weighted_score__all_penalties() {
        // multiplier = 0.5*0.1 + 0.3*(10/264) + 0.2*(50/256), then += (1 - multiplier) * 0.9
        let base = 0.05 + 0.3 * (10.0 / 264.0) + 0.2 * (50.0 / 256.0);
        let multiplier = base + (1.0 - base) * 0.9;
        let score = weighted_score(50.0, 10.0, 150_000, 50, 750_000.0);
        assert!((score - 50.0 * (1.0 - multiplier)).abs() < ε);
        assert!((score - 4.497869318181818).abs() < 1e-9);
    }

    #[test]
    fn weighted_score__no_penalty_between_60_and_80() {
        let score = weighted_score(70.0, 0.0, 100_000, 100, 100_000.0);
        let multiplier = 0.5 * 0.3 + 0.2 * (100.0 / 256.0);
        assert!((score - 70.0 * (1.0 - multiplier)).abs() < ε);
    }

    #[test]
    fn weighted_score__partial_penalty() {
        // reqmem > 30000 only, ncpus > 12 only
        let base = 0.5 * (0.5 * 40_000.0 / 80_000.0) + 0.3 * (1.0 / 264.0) + 0.2 * (16.0 / 256.0);
        let multiplier = base + (1.0 - base) * 0.35;
        let score = weighted_score(50.0, 1.0, 40_000, 16, 80_000.0);
        assert!((score - 50.0 * (1.0 - multiplier)).abs() < ε);
    }

    #[test]
    fn round2__ties_to_even() {
        assert_eq!(round2(49.209280303), 49.21);
        assert_eq!(round2(50.0000001), 50.0);
        assert_eq!(round2(0.125), 0.12);
    }

    #[test]
    fn core_wall_time_hours__truncates_to_seconds() {
        assert!((core_wall_time_hours(1.0 / 6.0, 4).unwrap() - 2.0 / 3.0).abs() < ε);
        assert_eq!(core_wall_time_hours(2.0, 24).unwrap(), 48.0);
        assert_eq!(core_wall_time_hours(0.0, 4).unwrap(), 0.0);
    }

    #[test]
    fn cpu_efficiency__zero_core_wall_time() {
        assert_eq!(cpu_efficiency(1.0, 0.0), Err(RecordError::ZeroCoreWallTime));
        assert_eq!(cpu_efficiency(1.0, 2.0), Ok(50.0));
    }

    #[test]
    fn compute__per_node() {
        let metrics = compute_line("1|general|COMPLETED|2000|4000Mn|4|00:20:00|00:10:00").unwrap();
        assert_eq!(metrics.cpu_efficiency_pct, 50.0);
        assert_eq!(metrics.mem_efficiency_pct, 50.0);
        assert_eq!(metrics.weighted_mem_efficiency_pct, 49.21);
        assert_eq!(metrics.gb_hours_requested, 0);
        assert_eq!(metrics.gb_hours_used, 0);
        assert_eq!(metrics.fields(), ["50", "50", "49.21", "0", "0"].map(String::from));
    }

    #[test]
    fn compute__per_core_and_fractional_total_cpu() {
        // ReqMem 2000Mc * 8 cpus = 16000, 10h elapsed, TotalCPU 40:00.5 = 40 minutes
        let metrics = compute_line("2|general|COMPLETED|12000|2000Mc|8|40:00.500|10:00:00").unwrap();
        assert_eq!(metrics.cpu_efficiency_pct, round2(100.0 * (40.0 / 60.0) / 80.0));
        assert_eq!(metrics.mem_efficiency_pct, 75.0);
        let weighted = weighted_score(75.0, 10.0, 16_000, 8, 80_000.0);
        assert_eq!(metrics.weighted_mem_efficiency_pct, round2(weighted));
        assert_eq!(metrics.gb_hours_requested, 160);
        assert_eq!(metrics.gb_hours_used, 120);
    }

    #[test]
    fn compute__gb_hours_truncate() {
        // 5000/1000 * 1.999722h = 9.99861 -> 9
        let metrics = compute_line("3|general|COMPLETED|4999|5000Mn|1|01:00:00|01:59:59").unwrap();
        assert_eq!(metrics.gb_hours_requested, 9);
        assert_eq!(metrics.gb_hours_used, 9);
    }

    #[test]
    fn compute__malformed_max_rss() {
        assert!(matches!(
            compute_line("4|general|COMPLETED||4000Mn|4|00:20:00|00:10:00"),
            Err(RecordError::MalformedField { .. })
        ));
    }

    #[test]
    fn compute__non_finite_or_negative_max_rss() {
        for max_rss in ["NaN", "inf", "-inf", "-2000"] {
            let line = format!("4|general|COMPLETED|{max_rss}|4000Mn|4|00:20:00|00:10:00");
            assert_eq!(
                compute_line(&line),
                Err(RecordError::MalformedField {
                    column: MAX_RSS.to_owned(),
                    value: max_rss.to_owned(),
                }),
                "{max_rss}"
            );
        }
    }

    #[test]
    fn compute__elapsed_days_out_of_range() {
        assert!(matches!(
            compute_line("6|general|COMPLETED|2000|4000Mn|4|00:20:00|768614336404564651-00:00:00"),
            Err(RecordError::Duration(DurationParseError::MalformedDuration { .. }))
        ));
    }

    #[test]
    fn compute__zero_ncpus() {
        assert_eq!(
            compute_line("5|general|COMPLETED|2000|4000Mn|0|00:20:00|00:10:00"),
            Err(RecordError::ZeroCoreWallTime)
        );
    }

    #[test]
    fn MemoryEfficiency__headers_match_fields() {
        let metrics = compute_line("1|general|COMPLETED|2000|4000Mn|4|00:20:00|00:10:00").unwrap();
        assert_eq!(MemoryEfficiency.derived_columns().len(), metrics.fields().len());
    }
}

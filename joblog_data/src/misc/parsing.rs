pub mod duration {
    use std::{fmt, num::ParseIntError, ops::Deref, str::FromStr};

    use itertools::Itertools as _;
    use thiserror::Error;

    /// A slurm elapsed/cpu time (`[D-]HH:MM:SS`, `MM:SS.fff`, ...) as fractional hours.
    #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
    pub struct SlurmDuration(pub f64);

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum DurationParseError {
        #[error("malformed duration `{text}`: expected [D-]HH:MM:SS or MM:SS[.frac]")]
        MalformedDuration { text: String },
        #[error("malformed duration `{text}`: non-numeric component")]
        NonNumeric {
            text: String,
            #[source]
            source: ParseIntError,
        },
    }

    impl SlurmDuration {
        pub fn hours(&self) -> f64 {
            self.0
        }
    }

    impl FromStr for SlurmDuration {
        type Err = DurationParseError;

        /// A `-` separates a day count from the clock part. A `.` marks fractional seconds, which are
        /// dropped. Without a day or hour field (`MM:SS.fff`, the form sacct prints for short
        /// TotalCPU values) the clock part is minutes:seconds with hours forced to 00.
        fn from_str(text: &str) -> Result<Self, Self::Err> {
            let malformed = || DurationParseError::MalformedDuration { text: text.to_owned() };
            let number = |part: &str| {
                part.trim().parse::<u64>().map_err(|source| DurationParseError::NonNumeric {
                    text: text.to_owned(),
                    source,
                })
            };

            let trimmed = text.trim();
            let whole = match trimmed.split_once('.') {
                Some((whole, _fraction)) => whole,
                None => trimmed,
            };

            let (days, clock) = match whole.split_once('-') {
                Some((days, clock)) => (number(days)?, clock),
                None => (0, whole),
            };

            let parts = clock.split(':').collect_vec();
            let (h, m, s) = match parts.as_slice() {
                &[h, m, s] => (number(h)?, number(m)?, number(s)?),
                &[m, s] => (0, number(m)?, number(s)?),
                _ => return Err(malformed()),
            };

            let hours = days
                .checked_mul(24)
                .and_then(|day_hours| day_hours.checked_add(h))
                .ok_or_else(malformed)?;

            Ok(SlurmDuration(hours as f64 + m as f64 / 60f64 + s as f64 / 3600f64))
        }
    }

    /// Inverse of [`SlurmDuration::from_str`]. Anything above a day gets a `<days>-` prefix,
    /// sub-second precision is rounded to milliseconds, then truncated to whole seconds.
    impl fmt::Display for SlurmDuration {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let hours = if self.0.is_finite() { self.0.max(0f64) } else { 0f64 };
            let total_secs = ((hours * 3_600_000f64).round() as u64) / 1000;

            if hours > 24f64 {
                let days = total_secs / 86_400;
                let rem = total_secs % 86_400;
                write!(f, "{days}-{:02}:{:02}:{:02}", rem / 3600, rem % 3600 / 60, rem % 60)
            } else {
                write!(f, "{:02}:{:02}:{:02}", total_secs / 3600, total_secs % 3600 / 60, total_secs % 60)
            }
        }
    }

    impl Deref for SlurmDuration {
        type Target = f64;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    /// Shorthand for `text.parse::<SlurmDuration>()`, in hours.
    pub fn parse_duration_hours(text: &str) -> Result<f64, DurationParseError> {
        text.parse::<SlurmDuration>().map(|d| d.0)
    }

    pub fn format_hours(hours: f64) -> String {
        SlurmDuration(hours).to_string()
    }
}

pub mod memory {
    use std::{num::ParseIntError, str::FromStr};

    use derive_more::derive::Display;
    use thiserror::Error;

    /// Unit suffix of `ReqMem`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
    pub enum MemUnit {
        /// `Mn`, megabytes per node (one node per job on our clusters)
        #[display("Mn")]
        PerNode,
        /// `Mc`, megabytes per core
        #[display("Mc")]
        PerCore,
    }

    /// `ReqMem` as sacct reports it, e.g. `4000Mn` or `2000Mc`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequestedMemory {
        pub amount: u64,
        pub unit: MemUnit,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ReqMemParseError {
        /// cancelled jobs show up as `0n` and similar
        #[error("`{0}` is too short to carry a unit")]
        TooShort(String),
        #[error("unrecognized ReqMem unit in `{0}`")]
        UnrecognizedUnit(String),
        #[error("{amount}Mc on {ncpus} cpus does not fit in 64 bits")]
        Overflow { amount: u64, ncpus: u32 },
        #[error("ReqMem amount in `{text}` is not an integer")]
        InvalidAmount {
            text: String,
            #[source]
            source: ParseIntError,
        },
    }

    impl RequestedMemory {
        /// Requested memory for the whole job, in the same unit as the partition limits.
        pub fn normalized(&self, ncpus: u32) -> Result<u64, ReqMemParseError> {
            match self.unit {
                MemUnit::PerNode => Ok(self.amount),
                MemUnit::PerCore => self
                    .amount
                    .checked_mul(u64::from(ncpus))
                    .ok_or(ReqMemParseError::Overflow { amount: self.amount, ncpus }),
            }
        }
    }

    impl FromStr for RequestedMemory {
        type Err = ReqMemParseError;

        fn from_str(text: &str) -> Result<Self, Self::Err> {
            use ReqMemParseError::*;

            if text.len() < 3 {
                return Err(TooShort(text.to_owned()));
            }
            let (amount, unit) = text
                .split_at_checked(text.len() - 2)
                .ok_or_else(|| UnrecognizedUnit(text.to_owned()))?;
            let unit = match unit {
                "Mn" => MemUnit::PerNode,
                "Mc" => MemUnit::PerCore,
                _ => return Err(UnrecognizedUnit(text.to_owned())),
            };
            let amount = amount.parse().map_err(|source| InvalidAmount {
                text: text.to_owned(),
                source,
            })?;

            Ok(RequestedMemory { amount, unit })
        }
    }
}

pub use duration::{format_hours, parse_duration_hours, DurationParseError, SlurmDuration};
pub use memory::{MemUnit, ReqMemParseError, RequestedMemory};

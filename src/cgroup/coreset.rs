//! Encoding and decoding of CPU core-set expressions as used by `cpuset.cpus`.
//!
//! A core-set expression is a comma separated list of single core indices and inclusive
//! `start-end` ranges, e.g. `0-3,7`. [`decode`] expands an expression into the listed cores
//! and [`encode`] collapses an ascending core list into its shortest expression.
//! [`CoreSet`] wraps both into a normalized, ascending, duplicate-free set.
//!
//! # Examples
//!
//! ```rust
//! use cpu_warden::cgroup::coreset::{self, CoreSet};
//!
//! assert_eq!(coreset::decode("0-3,7").unwrap(), vec![0, 1, 2, 3, 7]);
//! assert_eq!(coreset::encode(&[0, 1, 2, 3, 7]).unwrap(), "0-3,7");
//!
//! let set: CoreSet = "7,0-2,1".parse().unwrap();
//! assert_eq!(set.len(), 4);
//! assert_eq!(set.to_string(), "0-2,7");
//! ```

use std::collections::BTreeSet;
use std::fmt::{self, Write};
use std::num::ParseIntError;
use std::str::FromStr;

/// Upper bound on core indices, the kernel's `NR_CPUS` ceiling.
pub const MAX_CORES: u32 = 8192;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreSetError {
    #[error("invalid core index `{token}` in core-set expression `{expression}`: {source}")]
    InvalidToken {
        token: String,
        expression: String,
        #[source]
        source: ParseIntError,
    },

    #[error("reversed range `{start}-{end}` in core-set expression `{expression}`")]
    ReversedRange {
        start: u32,
        end: u32,
        expression: String,
    },

    #[error(
        "core index {core} in core-set expression `{expression}` exceeds the limit of {max} cores",
        max = MAX_CORES
    )]
    CoreOutOfRange { core: u32, expression: String },

    #[error("cannot encode an empty core list")]
    Empty,

    #[error("core list is not strictly ascending: {next} follows {prev}")]
    Unsorted { prev: u32, next: u32 },
}

/// Decodes a core-set expression into the listed core indices.
///
/// Cores appear in input order, ranges expand in ascending order. Surrounding whitespace is
/// ignored and an empty expression decodes to an empty list (a cgroup without cores).
///
/// # Errors
///
/// - [`CoreSetError::InvalidToken`] if a token is not a non-negative integer or range.
/// - [`CoreSetError::ReversedRange`] if a range ends before it starts.
/// - [`CoreSetError::CoreOutOfRange`] if an index is not below [`MAX_CORES`].
pub fn decode(expression: &str) -> Result<Vec<u32>, CoreSetError> {
    let expression = expression.trim();
    let mut cores = Vec::new();
    if expression.is_empty() {
        return Ok(cores);
    }

    let parse = |token: &str| {
        let core = token
            .trim()
            .parse::<u32>()
            .map_err(|source| CoreSetError::InvalidToken {
                token: token.to_owned(),
                expression: expression.to_owned(),
                source,
            })?;
        if core >= MAX_CORES {
            return Err(CoreSetError::CoreOutOfRange {
                core,
                expression: expression.to_owned(),
            });
        }
        Ok(core)
    };

    for token in expression.split(',') {
        match token.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(CoreSetError::ReversedRange {
                        start,
                        end,
                        expression: expression.to_owned(),
                    });
                }
                cores.extend(start..=end);
            }
            None => cores.push(parse(token)?),
        }
    }

    Ok(cores)
}

/// Encodes a strictly ascending core list into its shortest core-set expression.
///
/// # Errors
///
/// - [`CoreSetError::Empty`] if `cores` is empty.
/// - [`CoreSetError::Unsorted`] if `cores` is not strictly ascending.
pub fn encode(cores: &[u32]) -> Result<String, CoreSetError> {
    let (&first, rest) = cores.split_first().ok_or(CoreSetError::Empty)?;

    let mut expression = String::new();
    let (mut start, mut end) = (first, first);
    for &core in rest {
        if core <= end {
            return Err(CoreSetError::Unsorted {
                prev: end,
                next: core,
            });
        }
        if core == end + 1 {
            end = core;
            continue;
        }
        push_run(&mut expression, start, end);
        expression.push(',');
        (start, end) = (core, core);
    }
    push_run(&mut expression, start, end);

    Ok(expression)
}

fn push_run(expression: &mut String, start: u32, end: u32) {
    // Writing into a String cannot fail.
    let _ = if start == end {
        write!(expression, "{start}")
    } else {
        write!(expression, "{start}-{end}")
    };
}

/// A normalized set of core indices: ascending and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreSet(BTreeSet<u32>);

impl CoreSet {
    /// Number of cores in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, core: u32) -> bool {
        self.0.contains(&core)
    }

    /// Returns the cores in ascending order.
    pub fn to_vec(&self) -> Vec<u32> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<u32> for CoreSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for CoreSet {
    type Err = CoreSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(decode(s)?.into_iter().collect())
    }
}

impl fmt::Display for CoreSet {
    /// Writes the canonical expression; an empty set is written as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match encode(&self.to_vec()) {
            Ok(expression) => f.write_str(&expression),
            Err(_) => Ok(()),
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::network::Line;
use super::network::Segment;
use super::time_periods::Period;


#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse config as yaml: {0}")]
    Yaml(#[from] yaml_rust::ScanError),
    #[error("config file contains no yaml document")]
    EmptyDocument,
    #[error("config key '{0}' is missing")]
    MissingKey(String),
    #[error("config key '{key}' should be {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("unknown line '{0}'")]
    UnknownLine(String),
    #[error("unknown period '{0}'")]
    UnknownPeriod(String),
    #[error("line {line} references undeclared station '{station}'")]
    UndeclaredStation { line: Line, station: String },
    #[error("line {line} visits station '{station}' more than once")]
    DuplicateStation { line: Line, station: String },
    #[error("line {0} needs at least two stations")]
    LineTooShort(Line),
    #[error("line {0} is defined twice")]
    DuplicateLine(Line),
    #[error("no round-trip time given for line {0}")]
    MissingRoundTrip(Line),
    #[error("travel time override {from} -> {to} is not a segment of any line")]
    UnknownSegment { from: String, to: String },
    #[error("hour {0} is outside 0..=23")]
    HourOutOfRange(i64),
    #[error("hour {hour} is mapped to both {first} and {second}")]
    OverlappingHour { hour: u8, first: Period, second: Period },
    #[error("period {0} has no hours")]
    EmptyPeriod(Period),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("couldn't open OD data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed OD csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: couldn't parse field '{field}' from '{value}'")]
    BadField { row: usize, field: &'static str, value: String },
    #[error("row {row}: missing field '{field}'")]
    MissingField { row: usize, field: &'static str },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("segment {segment} carries demand in {period} but no optimised line serves it")]
    UnservedSegment { segment: Segment, period: Period },
    #[error("demand for {segment} in {period} is not a finite non-negative number: {value}")]
    InvalidDemand { segment: Segment, period: Period, value: f64 },
}

/// Which stage of the lexicographic solve a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    MinUnmetDemand,
    MinFleetUsage,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, ff: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Phase::MinUnmetDemand => write!(ff, "phase 1 (unmet demand)"),
            Phase::MinFleetUsage => write!(ff, "phase 2 (fleet usage)"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("phase 1 is infeasible: no frequency assignment satisfies the frequency and fleet \
             bounds, even with unlimited unmet demand")]
    Phase1Infeasible,
    #[error("phase 2 is infeasible after bounding unmet demand at {unmet_bound}; the phase 1 \
             optimum could not be reproduced")]
    Phase2Infeasible { unmet_bound: f64 },
    #[error("{phase} is unbounded")]
    Unbounded { phase: Phase },
    #[error("{phase} exceeded the solver time limit of {limit:?}")]
    TimedOut { phase: Phase, limit: Duration },
    #[error("solver failure in {phase}: {message}")]
    Solver { phase: Phase, message: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Solve(#[from] SolveError),
}

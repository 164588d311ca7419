use std::{io, path::PathBuf};

use crate::{
    archive::ArchiveError, config::ConfigurationError, export::ExportError, pool::TaskPanicked,
    render::RenderError,
};

/// Violations of the invariants an interaction sequence must satisfy.
///
/// `t` is the offending record's timestep, or `None` for a record judged on
/// its own.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SequenceError {
    #[display("record sequence is empty")]
    Empty,
    #[display("{} has no value estimate", record_label(*t))]
    MissingValue { t: Option<usize> },
    #[display("{} has action factors {found:?}, expected {expected:?}", record_label(*t))]
    FactorMismatch {
        t: Option<usize>,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[display("records carry no action factors")]
    NoActionFactors,
    #[display(
        "{}: factor '{factor}' has no distributions or their sizes differ",
        record_label(*t)
    )]
    InvalidDistributions { t: Option<usize>, factor: String },
    #[display("series '{column}' has {found} values but episodes cover {expected} timesteps")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

fn record_label(t: Option<usize>) -> String {
    t.map_or_else(|| "record".to_owned(), |t| format!("record {t}"))
}

/// Errors raised while running or querying an analysis.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AnalysisError {
    #[display("invalid analysis configuration: {_0}")]
    Configuration(ConfigurationError),
    #[display("{analysis}: timestep {t} is out of range [0, {len})")]
    OutOfRange {
        analysis: String,
        t: usize,
        len: usize,
    },
    #[display("{analysis}: malformed interaction sequence: {source}")]
    MalformedSequence {
        analysis: String,
        source: SequenceError,
    },
    #[display("{analysis}: no interestingness elements computed yet, run `analyze` first")]
    NotAnalyzed { analysis: String },
    #[display("{analysis}: no interaction records attached")]
    MissingRecords { analysis: String },
    #[display("{_0}")]
    Archive(ArchiveError),
    #[display("{_0}")]
    Render(RenderError),
    #[display("{_0}")]
    Export(ExportError),
    #[display("failed to create output directory {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("{analysis}: {source}")]
    Panicked {
        analysis: String,
        source: TaskPanicked,
    },
}

impl AnalysisError {
    pub(crate) fn malformed(analysis: &str, source: SequenceError) -> Self {
        Self::MalformedSequence {
            analysis: analysis.to_owned(),
            source,
        }
    }
}

impl From<ConfigurationError> for AnalysisError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err)
    }
}

impl From<ArchiveError> for AnalysisError {
    fn from(err: ArchiveError) -> Self {
        Self::Archive(err)
    }
}

impl From<RenderError> for AnalysisError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<ExportError> for AnalysisError {
    fn from(err: ExportError) -> Self {
        Self::Export(err)
    }
}

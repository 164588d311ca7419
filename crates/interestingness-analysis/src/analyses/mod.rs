//! Concrete interestingness analyses
//!
//! | Analysis | Criterion |
//! |---|---|
//! | [`ValueAnalysis`] (`value`) | extremes of the agent's value estimate |
//! | [`ActionFactorDivergenceAnalysis`] (`action-factor-divergence`) | disagreement between ensemble policies, per action factor |

use std::{fmt, path::Path, str::FromStr};

pub use self::{action_divergence::ActionFactorDivergenceAnalysis, value::ValueAnalysis};
use crate::{
    archive::{self, Archivable, ArchiveError},
    config::AnalysisConfiguration,
    engine::DynPersistentAnalysis,
    error::AnalysisError,
    record::Records,
};

mod action_divergence;
mod value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Value,
    ActionFactorDivergence,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown analysis '{name}', expected one of: {}", AnalysisKind::names().join(", "))]
pub struct UnknownAnalysis {
    pub name: String,
}

impl AnalysisKind {
    pub const ALL: [Self; 2] = [Self::Value, Self::ActionFactorDivergence];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Value => ValueAnalysis::KIND,
            Self::ActionFactorDivergence => ActionFactorDivergenceAnalysis::KIND,
        }
    }

    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.into_iter().map(Self::name).collect()
    }

    /// Constructs a fresh analysis of this kind over `records`.
    #[must_use]
    pub fn build(
        self,
        records: Records,
        config: AnalysisConfiguration,
        image_format: &str,
    ) -> Box<dyn DynPersistentAnalysis> {
        match self {
            Self::Value => Box::new(ValueAnalysis::new(records, config, image_format)),
            Self::ActionFactorDivergence => Box::new(ActionFactorDivergenceAnalysis::new(
                records,
                config,
                image_format,
            )),
        }
    }

    /// Loads an archived analysis of this kind.
    pub fn load(self, path: &Path) -> Result<Box<dyn DynPersistentAnalysis>, AnalysisError> {
        Ok(match self {
            Self::Value => Box::new(archive::load::<ValueAnalysis>(path)?),
            Self::ActionFactorDivergence => {
                Box::new(archive::load::<ActionFactorDivergenceAnalysis>(path)?)
            }
        })
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisKind {
    type Err = UnknownAnalysis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownAnalysis { name: s.to_owned() })
    }
}

/// Loads an archived analysis of whatever kind its header names.
pub fn load_archive(path: &Path) -> Result<Box<dyn DynPersistentAnalysis>, AnalysisError> {
    let header = archive::peek_header(&archive::read_file(path)?)?;
    let kind = header
        .kind
        .parse::<AnalysisKind>()
        .map_err(|e| ArchiveError::KindMismatch {
            expected: AnalysisKind::names().join("|"),
            found: e.name,
        })?;
    kind.load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Analysis as _;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in AnalysisKind::ALL {
            assert_eq!(kind.name().parse::<AnalysisKind>().unwrap(), kind);
        }
        let err = "novelty".parse::<AnalysisKind>().unwrap_err();
        assert!(err.to_string().contains("value, action-factor-divergence"));
    }

    #[test]
    fn test_load_archive_dispatches_on_kind() {
        let dir = tempfile::tempdir().unwrap();
        let records = (0..3)
            .map(|t| crate::record::InteractionRecord {
                values: vec![f64::from(t)],
                ..Default::default()
            })
            .collect::<Records>();
        let mut analysis = ValueAnalysis::new(records, AnalysisConfiguration::default(), "png");
        let path = dir.path().join("value.ixa");
        crate::engine::PersistentAnalysis::save(&mut analysis, &path).unwrap();

        let loaded = load_archive(&path).unwrap();
        assert_eq!(loaded.name(), "value");
        assert!(AnalysisKind::ActionFactorDivergence.load(&path).is_err());
    }
}

//! Deep availability analysis of loaded candidates.
//!
//! Candidates without requirement metadata are always available. Candidates
//! with metadata get a freshly constructed probe evaluated against the
//! environment snapshot; a probe that cannot be constructed counts as
//! unavailable.

use super::CATEGORY;
use crate::analyzer::EnvironmentAnalyzer;
use crate::context::Diagnostics;
use crate::model::LoadedCandidate;
use tracing::debug;

pub trait DeepAnalyzer: Send + Sync {
    fn is_available(
        &self,
        candidate: &LoadedCandidate,
        capability: &str,
        analyzer: &EnvironmentAnalyzer,
        diagnostics: &Diagnostics,
    ) -> bool;
}

/// Used for candidates without requirement metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAnalyzer;

impl DeepAnalyzer for DefaultAnalyzer {
    fn is_available(
        &self,
        _candidate: &LoadedCandidate,
        _capability: &str,
        _analyzer: &EnvironmentAnalyzer,
        _diagnostics: &Diagnostics,
    ) -> bool {
        true
    }
}

/// Constructs a probe and runs the environment predicate on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementsAnalyzer;

impl DeepAnalyzer for RequirementsAnalyzer {
    fn is_available(
        &self,
        candidate: &LoadedCandidate,
        capability: &str,
        analyzer: &EnvironmentAnalyzer,
        diagnostics: &Diagnostics,
    ) -> bool {
        let Some(factory) = &candidate.probe else {
            return true;
        };
        match factory() {
            Ok(probe) => {
                let available = analyzer.is_available(&probe);
                debug!(candidate = %candidate.name, available, "Evaluated requirements");
                available
            }
            Err(err) => {
                diagnostics.add(
                    CATEGORY,
                    format!(
                        "Skipping service {} implementation {} because of missing dependencies: {}",
                        capability, candidate.name, err.reason
                    ),
                );
                false
            }
        }
    }
}

/// Analyzer appropriate for a candidate.
pub fn analyzer_for(candidate: &LoadedCandidate) -> &'static dyn DeepAnalyzer {
    if candidate.probe.is_some() {
        &RequirementsAnalyzer
    } else {
        &DefaultAnalyzer
    }
}

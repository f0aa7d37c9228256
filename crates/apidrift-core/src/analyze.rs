//! End-to-end analysis: diff the surfaces, plan the call sites, aggregate
//! the diagnostics.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::diagnostics;
use crate::diff;
use crate::errors::DriftResult;
use crate::models::{
    CallSite, ChangeSet, Diagnostic, DiagnosticKind, MigrationPlan, SurfaceModel, SymbolId,
};
use crate::plan;

/// Maps a new parameter's value from the argument a call site passed for a
/// removed parameter, for library upgrades where a parameter was replaced
/// rather than dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapRule {
    pub symbol: SymbolId,
    pub new_param: String,
    pub from_removed_param: String,
}

/// How to handle call sites whose return value handling must change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Emit wrap edits for recognizably simple usage, flag the rest.
    #[default]
    InsertGuard,
    /// Never rewrite result handling, only flag it.
    FlagOnly,
}

/// Tunables for one analysis run.
#[derive(Clone, Debug)]
pub struct AnalyzeOptions {
    /// Minimum confidence for accepting a rename pair.
    pub rename_threshold: f64,
    /// Scores in `[floor, threshold)` surface an informational near-miss.
    pub low_confidence_floor: f64,
    pub value_map: Vec<ValueMapRule>,
    pub guard_policy: GuardPolicy,
    /// Soft wall-clock budget; on expiry partial results are returned with
    /// a blocking diagnostic.
    pub deadline: Option<Duration>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            rename_threshold: 0.5,
            low_confidence_floor: 0.35,
            value_map: Vec::new(),
            guard_policy: GuardPolicy::default(),
            deadline: None,
        }
    }
}

impl AnalyzeOptions {
    pub fn with_rename_threshold(mut self, threshold: f64) -> Self {
        self.rename_threshold = threshold;
        self
    }

    pub fn with_low_confidence_floor(mut self, floor: f64) -> Self {
        self.low_confidence_floor = floor;
        self
    }

    pub fn with_value_map(mut self, rule: ValueMapRule) -> Self {
        self.value_map.push(rule);
        self
    }

    pub fn with_guard_policy(mut self, policy: GuardPolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Complete output of one analysis run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub change_set: ChangeSet,
    pub plan: MigrationPlan,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    /// True when at least one diagnostic blocks a safe automated migration.
    pub fn has_blocking(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::models::Severity::Blocking)
    }
}

/// Run the full pipeline over two surface models and the observed call
/// sites. Pure over its inputs; identical inputs produce identical reports.
pub fn analyze(
    v1: &SurfaceModel,
    v2: &SurfaceModel,
    sites: &[CallSite],
    options: &AnalyzeOptions,
) -> DriftResult<AnalysisReport> {
    let started = Instant::now();
    let deadline = options.deadline.map(|d| started + d);
    info!(
        v1_symbols = v1.len(),
        v2_symbols = v2.len(),
        sites = sites.len(),
        "analysis started"
    );

    let (change_set, diff_diags) = diff::diff(v1, v2, options)?;

    if let Some(deadline) = deadline {
        if Instant::now() >= deadline {
            warn!("deadline expired before planning");
            let timed_out = Diagnostic::blocking(
                DiagnosticKind::AnalysisTimedOut,
                "analysis deadline expired before call-site planning".to_string(),
            );
            return Ok(AnalysisReport {
                change_set,
                plan: MigrationPlan::default(),
                diagnostics: diagnostics::aggregate(vec![diff_diags, vec![timed_out]]),
            });
        }
    }

    let (migration, plan_diags) = plan::plan(&change_set, sites, options, deadline)?;
    let report = AnalysisReport {
        change_set,
        plan: migration,
        diagnostics: diagnostics::aggregate(vec![diff_diags, plan_diags]),
    };
    info!(
        changes = report.change_set.len(),
        planned_sites = report.plan.len(),
        diagnostics = report.diagnostics.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParameterSpec, Symbol, SymbolKind};

    #[test]
    fn test_noop_analysis() {
        let symbols = vec![Symbol::function("lib.f")
            .with_params(vec![ParameterSpec::new("x", 0)])
            .with_return_type("int")];
        let v1 = SurfaceModel::new(symbols.clone()).unwrap();
        let v2 = SurfaceModel::new(symbols).unwrap();
        let sites = vec![CallSite::new(
            "app.py:1",
            SymbolId::new("lib.f", SymbolKind::Function),
        )];
        let report = analyze(&v1, &v2, &sites, &AnalyzeOptions::default()).unwrap();
        assert!(report.change_set.is_empty());
        assert!(report.plan.edits_for("app.py:1").is_empty());
        assert!(report.diagnostics.is_empty());
        assert!(!report.has_blocking());
    }

    #[test]
    fn test_zero_deadline_times_out_with_partial_change_set() {
        let v1 = SurfaceModel::new(vec![Symbol::function("lib.a")]).unwrap();
        let v2 = SurfaceModel::new(vec![]).unwrap();
        let sites = vec![CallSite::new(
            "app.py:1",
            SymbolId::new("lib.a", SymbolKind::Function),
        )];
        let options = AnalyzeOptions::default().with_deadline(Duration::ZERO);
        let report = analyze(&v1, &v2, &sites, &options).unwrap();
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::AnalysisTimedOut));
        assert!(report.has_blocking());
        // The diff phase still ran to completion.
        assert_eq!(report.change_set.len(), 1);
    }
}

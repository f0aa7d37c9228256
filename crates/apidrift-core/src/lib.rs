//! Apidrift core library — semantic API diffing and migration planning.
//!
//! This crate compares two versions of a library's public surface, produces
//! a typed change set (renames, parameter and return-type changes, removals,
//! additions), and turns observed call sites into a per-site migration plan
//! with diagnostics for everything that cannot be rewritten safely. Source
//! parsing, call-site scanning, and edit rendering are external
//! collaborators; this crate only consumes and produces structured models.

pub mod analyze;
pub mod diagnostics;
pub mod diff;
pub mod errors;
pub mod models;
pub mod plan;

pub use analyze::{analyze, AnalysisReport, AnalyzeOptions, GuardPolicy, ValueMapRule};
pub use diff::diff;
pub use errors::{DriftError, DriftResult};
pub use models::{
    ArgTarget, CallSite, Change, ChangeSet, Diagnostic, DiagnosticKind, Edit, MigrationPlan,
    ParamMove, ParameterSpec, ResultUsage, Severity, Signature, SurfaceModel, Symbol, SymbolId,
    SymbolKind, WrapStrategy,
};
pub use plan::plan;

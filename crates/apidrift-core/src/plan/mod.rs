//! Per-call-site migration planning.
//!
//! Consumes a finished change set plus observed call sites and emits ordered
//! edit lists keyed by location, with diagnostics for anything that cannot
//! be rewritten safely. Sites are planned independently and in parallel;
//! the plan is keyed by a `BTreeMap` so completion order never shows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analyze::{AnalyzeOptions, GuardPolicy};
use crate::diff::introduced_symbols;
use crate::errors::{DriftError, DriftResult};
use crate::models::{
    is_optional_type, is_result_type, ArgTarget, CallSite, Change, ChangeSet, Diagnostic,
    DiagnosticKind, Edit, MigrationPlan, ResultUsage, WrapStrategy,
};

/// Plan edits for every call site against the given change set.
///
/// `deadline` is cooperative: once it passes, remaining sites are skipped
/// and a blocking timeout diagnostic is appended to the partial result.
pub fn plan(
    change_set: &ChangeSet,
    sites: &[CallSite],
    options: &AnalyzeOptions,
    deadline: Option<Instant>,
) -> DriftResult<(MigrationPlan, Vec<Diagnostic>)> {
    for change in &change_set.changes {
        if let Some(symbol) = change.v1_symbol() {
            if !change_set.v1_symbols.contains(symbol) {
                return Err(DriftError::Internal(format!(
                    "change `{}` references {symbol}, which is not in the V1 surface",
                    change.name()
                )));
            }
        }
    }

    let introduced = introduced_symbols(change_set);
    let expired = AtomicBool::new(false);

    let results: Vec<Option<(String, Vec<Edit>, Vec<Diagnostic>)>> = sites
        .par_iter()
        .map(|site| {
            if expired.load(Ordering::Relaxed) {
                return None;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    expired.store(true, Ordering::Relaxed);
                    return None;
                }
            }
            let (edits, diags) = plan_site(change_set, &introduced, site, options);
            Some((site.location.clone(), edits, diags))
        })
        .collect();

    let mut migration = MigrationPlan::default();
    let mut diagnostics = Vec::new();
    let mut planned = 0usize;
    for entry in results.into_iter().flatten() {
        let (location, edits, diags) = entry;
        planned += 1;
        migration.edits.entry(location).or_default().extend(edits);
        diagnostics.extend(diags);
    }

    if expired.load(Ordering::Relaxed) {
        diagnostics.push(Diagnostic::blocking(
            DiagnosticKind::AnalysisTimedOut,
            format!(
                "analysis deadline expired after planning {planned} of {} call sites",
                sites.len()
            ),
        ));
    }

    info!(
        sites = sites.len(),
        planned,
        diagnostics = diagnostics.len(),
        "planning complete"
    );
    Ok((migration, diagnostics))
}

fn plan_site(
    change_set: &ChangeSet,
    introduced: &std::collections::BTreeSet<&crate::models::SymbolId>,
    site: &CallSite,
    options: &AnalyzeOptions,
) -> (Vec<Edit>, Vec<Diagnostic>) {
    let mut edits = Vec::new();
    let mut diags = Vec::new();

    if !change_set.v1_symbols.contains(&site.symbol) {
        // A site already written against the new surface (an added symbol
        // or a rename target) needs nothing.
        if !introduced.contains(&site.symbol) {
            diags.push(
                Diagnostic::warning(
                    DiagnosticKind::UnresolvableCallSite,
                    format!("call site references {}, unknown in both versions", site.symbol),
                )
                .at(site.location.as_str()),
            );
        }
        return (edits, diags);
    }

    let changes = change_set.changes_for(&site.symbol);
    if changes.is_empty() {
        return (edits, diags);
    }
    debug!(location = %site.location, changes = changes.len(), "planning call site");

    if let Some(removed) = changes
        .iter()
        .find(|c| matches!(c, Change::Removed { .. }))
    {
        diags.push(
            Diagnostic::blocking(
                DiagnosticKind::RemovedNoReplacement,
                format!("{} was removed with no detected replacement", site.symbol),
            )
            .at(site.location.as_str())
            .with_change((*removed).clone()),
        );
        return (edits, diags);
    }

    let positional_len = site.positional_args.len();

    // 1. Rename.
    if let Some((to, _)) = change_set.rename_for(&site.symbol) {
        edits.push(Edit::RenameSymbol {
            to: to.qualified_name.clone(),
        });
    }

    // 2. Removed parameters the site actually passes. Positional removals
    // are emitted in ascending V1 order, so each one is renumbered by the
    // removals applied before it.
    let mut removed_params: Vec<&crate::models::ParameterSpec> = Vec::new();
    let mut removed_positional: Vec<usize> = Vec::new();
    for change in &changes {
        if let Change::ParameterRemoved { param, .. } = change {
            removed_params.push(param);
            if site.keyword(&param.name).is_some() {
                edits.push(Edit::RemoveArg {
                    target: ArgTarget::Name(param.name.clone()),
                });
            } else if param.position < positional_len {
                edits.push(Edit::RemoveArg {
                    target: ArgTarget::Position(param.position - removed_positional.len()),
                });
                removed_positional.push(param.position);
            }
        }
    }

    // 3. Reorder, restricted to the positional prefix.
    let reorder = changes.iter().find_map(|c| match c {
        Change::ParameterReordered { permutation, .. } => Some(permutation),
        _ => None,
    });
    if let Some(permutation) = reorder {
        if positional_len == 0 {
            // Keyword-only call: reorder is a no-op, but the keywords must
            // still exist in V2.
            if let Some(v2_params) = change_set.v2_params.get(&site.symbol) {
                for (name, _) in &site.keyword_args {
                    let was_removed = removed_params.iter().any(|p| &p.name == name);
                    if !was_removed && !v2_params.iter().any(|p| p == name) {
                        diags.push(
                            Diagnostic::warning(
                                DiagnosticKind::UnknownKeyword,
                                format!(
                                    "keyword `{name}` does not exist on {} in the new version",
                                    site.symbol
                                ),
                            )
                            .at(site.location.as_str()),
                        );
                    }
                }
            }
        } else {
            // The reorder runs after the removals, so it is expressed over
            // the surviving positional arguments: `from` is the argument's
            // index in the shrunk list, `to` its rank among the surviving
            // parameters' V2 positions.
            let surviving: Vec<usize> = (0..positional_len)
                .filter(|i| !removed_positional.contains(i))
                .collect();
            let prefix: Vec<&crate::models::ParamMove> = permutation
                .iter()
                .filter(|m| surviving.contains(&m.from))
                .collect();
            let rank_of = |to: usize| permutation.iter().filter(|m| m.to < to).count();
            if prefix.iter().any(|m| rank_of(m.to) >= surviving.len()) {
                diags.push(
                    Diagnostic::warning(
                        DiagnosticKind::ReorderNotApplicable,
                        format!(
                            "parameter reorder on {} moves an argument across the \
                             positional/keyword boundary; not auto-applied",
                            site.symbol
                        ),
                    )
                    .at(site.location.as_str()),
                );
            } else {
                let moves: Vec<crate::models::ParamMove> = prefix
                    .iter()
                    .map(|m| crate::models::ParamMove {
                        name: m.name.clone(),
                        from: surviving
                            .iter()
                            .position(|&i| i == m.from)
                            .unwrap_or(m.from),
                        to: prefix.iter().filter(|q| q.to < m.to).count(),
                    })
                    .collect();
                if moves.iter().any(|m| m.from != m.to) {
                    edits.push(Edit::ReorderArgs { permutation: moves });
                }
            }
        }
    }

    // 4. Added parameters, only when a value can be derived.
    for change in &changes {
        if let Change::ParameterAdded {
            param,
            position_in_v2,
            ..
        } = change
        {
            let mapped_value = options
                .value_map
                .iter()
                .find(|rule| rule.symbol == site.symbol && rule.new_param == param.name)
                .and_then(|rule| {
                    let source = removed_params
                        .iter()
                        .find(|p| p.name == rule.from_removed_param)?;
                    site.keyword(&source.name)
                        .map(str::to_owned)
                        .or_else(|| site.positional_args.get(source.position).cloned())
                });
            let value = mapped_value.or_else(|| param.default_value.clone());

            match value {
                Some(value) => {
                    let target = if !site.keyword_args.is_empty() || *position_in_v2 > positional_len
                    {
                        ArgTarget::Name(param.name.clone())
                    } else {
                        ArgTarget::Position(*position_in_v2)
                    };
                    edits.push(Edit::InsertArg { target, value });
                }
                None => {
                    diags.push(
                        Diagnostic::blocking(
                            DiagnosticKind::ManualValueRequired,
                            format!(
                                "new parameter `{}` on {} has no derivable value",
                                param.name, site.symbol
                            ),
                        )
                        .at(site.location.as_str())
                        .with_change((*change).clone()),
                    );
                }
            }
        }
    }

    // 5. Return-type handling.
    let return_change = changes.iter().find_map(|c| match c {
        Change::ReturnTypeChanged {
            from_type, to_type, ..
        } => Some(((*c).clone(), from_type.clone(), to_type.clone())),
        _ => None,
    });
    if let Some((change, from_type, to_type)) = return_change {
        let was_optional = from_type.as_deref().map(is_optional_type).unwrap_or(false);
        let now_optional = to_type.as_deref().map(is_optional_type).unwrap_or(false);
        let was_result = from_type.as_deref().map(is_result_type).unwrap_or(false);
        let now_result = to_type.as_deref().map(is_result_type).unwrap_or(false);

        let strategy = if !was_optional && now_optional {
            Some(WrapStrategy::OptionalGuard)
        } else if !was_result && now_result {
            Some(WrapStrategy::StructuredAccess)
        } else {
            None
        };

        let review = |diags: &mut Vec<Diagnostic>| {
            diags.push(
                Diagnostic::warning(
                    DiagnosticKind::ReturnTypeChangedReview,
                    format!(
                        "return type of {} changed from {} to {}; review usage",
                        site.symbol,
                        from_type.as_deref().unwrap_or("(none)"),
                        to_type.as_deref().unwrap_or("(none)"),
                    ),
                )
                .at(site.location.as_str())
                .with_change(change.clone()),
            );
        };

        match (&site.result_usage, strategy) {
            // No optionality/structure change (e.g. the payload type was
            // renamed): the change set records it, the site needs nothing.
            (_, None) | (ResultUsage::Ignored, _) => {}
            (ResultUsage::Value | ResultUsage::FieldAccess { .. }, Some(strategy)) => {
                match options.guard_policy {
                    GuardPolicy::InsertGuard => edits.push(Edit::WrapResultAccess { strategy }),
                    GuardPolicy::FlagOnly => review(&mut diags),
                }
            }
            (ResultUsage::Complex, Some(_)) => review(&mut diags),
        }
    }

    // 6. Type changes on arguments the site passes: review only, argument
    // type checking is out of scope.
    for change in &changes {
        if let Change::ParameterTypeChanged {
            param, position, ..
        } = change
        {
            let passed =
                site.keyword(param).is_some() || *position < positional_len;
            if passed {
                diags.push(
                    Diagnostic::warning(
                        DiagnosticKind::ArgumentTypeChanged,
                        format!(
                            "type of parameter `{param}` on {} changed; review the argument",
                            site.symbol
                        ),
                    )
                    .at(site.location.as_str())
                    .with_change((*change).clone()),
                );
            }
        }
    }

    (edits, diags)
}

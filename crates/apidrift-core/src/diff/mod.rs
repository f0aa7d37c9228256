//! Two-version surface diffing.
//!
//! Three passes over the surface models: exact identity matching, heuristic
//! rename detection over the leftovers, then `Removed`/`Added` for whatever
//! neither pass claimed. Output order is canonical (V1 order, then V2 order
//! for additions) so identical inputs always produce identical change sets.

pub mod scorer;
pub mod signature;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analyze::AnalyzeOptions;
use crate::errors::DriftResult;
use crate::models::{
    Change, ChangeSet, Diagnostic, DiagnosticKind, SurfaceModel, SymbolId,
};

#[derive(Clone, Copy, Debug)]
struct ScoredPair {
    score: f64,
    v1_idx: usize,
    v2_idx: usize,
}

/// Compute the typed change set between two surface models.
///
/// Returns the change set plus the diagnostics raised during matching
/// (ambiguous renames, low-confidence near-misses).
pub fn diff(
    v1: &SurfaceModel,
    v2: &SurfaceModel,
    options: &AnalyzeOptions,
) -> DriftResult<(ChangeSet, Vec<Diagnostic>)> {
    let mut diagnostics = Vec::new();

    // Exact pass: identities present in both versions.
    let removed_candidates: Vec<usize> = v1
        .symbols()
        .iter()
        .enumerate()
        .filter(|(_, s)| !v2.contains(&s.id()))
        .map(|(i, _)| i)
        .collect();
    let added_candidates: Vec<usize> = v2
        .symbols()
        .iter()
        .enumerate()
        .filter(|(_, s)| !v1.contains(&s.id()))
        .map(|(i, _)| i)
        .collect();
    debug!(
        v1_total = v1.len(),
        v2_total = v2.len(),
        removed_candidates = removed_candidates.len(),
        added_candidates = added_candidates.len(),
        "exact pass complete"
    );

    // Rename pass: score every same-kind (removed, added) pair.
    let mut pairs: Vec<ScoredPair> = removed_candidates
        .par_iter()
        .flat_map_iter(|&v1_idx| {
            let a = &v1.symbols()[v1_idx];
            added_candidates
                .iter()
                .filter(move |&&v2_idx| v2.symbols()[v2_idx].kind == a.kind)
                .map(move |&v2_idx| ScoredPair {
                    score: scorer::score(a, &v2.symbols()[v2_idx]),
                    v1_idx,
                    v2_idx,
                })
        })
        .collect();
    pairs.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.v1_idx.cmp(&b.v1_idx))
            .then(a.v2_idx.cmp(&b.v2_idx))
    });

    let threshold = options.rename_threshold;
    let mut renames: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
    let mut taken_v1: HashSet<usize> = HashSet::new();
    let mut taken_v2: HashSet<usize> = HashSet::new();
    let mut blocked_v1: HashSet<usize> = HashSet::new();
    let mut blocked_v2: HashSet<usize> = HashSet::new();

    let viable = |p: &ScoredPair,
                  taken_v1: &HashSet<usize>,
                  taken_v2: &HashSet<usize>,
                  blocked_v1: &HashSet<usize>,
                  blocked_v2: &HashSet<usize>| {
        p.score >= threshold
            && !taken_v1.contains(&p.v1_idx)
            && !taken_v2.contains(&p.v2_idx)
            && !blocked_v1.contains(&p.v1_idx)
            && !blocked_v2.contains(&p.v2_idx)
    };

    for i in 0..pairs.len() {
        let p = pairs[i];
        if !viable(&p, &taken_v1, &taken_v2, &blocked_v1, &blocked_v2) {
            continue;
        }

        // A tie on score with another viable pair over a shared endpoint
        // means neither assignment can be justified; surface every tied
        // pair and let the endpoints fall through to Removed/Added.
        let tied: Vec<ScoredPair> = pairs
            .iter()
            .enumerate()
            .filter(|&(j, q)| {
                j != i
                    && q.score == p.score
                    && (q.v1_idx == p.v1_idx || q.v2_idx == p.v2_idx)
                    && viable(q, &taken_v1, &taken_v2, &blocked_v1, &blocked_v2)
            })
            .map(|(_, q)| *q)
            .collect();

        if tied.is_empty() {
            renames.insert(p.v1_idx, (p.v2_idx, p.score));
            taken_v1.insert(p.v1_idx);
            taken_v2.insert(p.v2_idx);
            continue;
        }

        for q in std::iter::once(&p).chain(tied.iter()) {
            let from = v1.symbols()[q.v1_idx].id();
            let to = v2.symbols()[q.v2_idx].id();
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::AmbiguousRename,
                    format!(
                        "ambiguous rename: {from} and {to} tie at confidence {:.2}",
                        q.score
                    ),
                )
                .with_change(Change::Renamed {
                    from,
                    to,
                    confidence: q.score,
                }),
            );
            blocked_v1.insert(q.v1_idx);
            blocked_v2.insert(q.v2_idx);
        }
    }

    // Near-miss pass: removed candidates whose best partner landed just
    // below the threshold are worth a human look.
    for &v1_idx in &removed_candidates {
        if taken_v1.contains(&v1_idx) || blocked_v1.contains(&v1_idx) {
            continue;
        }
        let best = pairs
            .iter()
            .filter(|p| p.v1_idx == v1_idx)
            .max_by(|a, b| a.score.total_cmp(&b.score).then(b.v2_idx.cmp(&a.v2_idx)));
        if let Some(best) = best {
            if best.score >= options.low_confidence_floor && best.score < threshold {
                let from = v1.symbols()[best.v1_idx].id();
                let to = v2.symbols()[best.v2_idx].id();
                diagnostics.push(
                    Diagnostic::info(
                        DiagnosticKind::PossibleRename,
                        format!(
                            "possible rename of {from} to {to} at confidence {:.2}, below \
                             acceptance threshold {:.2}",
                            best.score, threshold
                        ),
                    )
                    .with_change(Change::Renamed {
                        from,
                        to,
                        confidence: best.score,
                    }),
                );
            }
        }
    }

    // Assembly in canonical order: V1 symbols first, then V2-only additions.
    let mut change_set = ChangeSet::default();
    let mut v2_matched: HashSet<usize> = HashSet::new();

    for (v1_idx, sym) in v1.symbols().iter().enumerate() {
        let id = sym.id();
        change_set.v1_symbols.insert(id.clone());

        if let Some(v2_sym) = v2.get(&id) {
            change_set
                .changes
                .extend(signature::compare_symbol(&id, sym, v2_sym));
            if let Some(pos) = v2.position(&id) {
                v2_matched.insert(pos);
            }
            if let Some(sig) = &v2_sym.signature {
                change_set.v2_params.insert(
                    id,
                    sig.param_names().into_iter().map(str::to_owned).collect(),
                );
            }
        } else if let Some(&(v2_idx, score)) = renames.get(&v1_idx) {
            let v2_sym = &v2.symbols()[v2_idx];
            change_set.changes.push(Change::Renamed {
                from: id.clone(),
                to: v2_sym.id(),
                confidence: score,
            });
            change_set
                .changes
                .extend(signature::compare_symbol(&id, sym, v2_sym));
            v2_matched.insert(v2_idx);
            if let Some(sig) = &v2_sym.signature {
                change_set.v2_params.insert(
                    id,
                    sig.param_names().into_iter().map(str::to_owned).collect(),
                );
            }
        } else {
            change_set.changes.push(Change::Removed { symbol: id });
        }
    }

    for (v2_idx, sym) in v2.symbols().iter().enumerate() {
        if !v1.contains(&sym.id()) && !v2_matched.contains(&v2_idx) {
            change_set.changes.push(Change::Added { symbol: sym.id() });
        }
    }

    info!(
        changes = change_set.len(),
        renames = renames.len(),
        diagnostics = diagnostics.len(),
        "diff complete"
    );
    Ok((change_set, diagnostics))
}

/// V2 identities the change set introduces (added symbols and rename
/// targets), used by the planner to tell sites already written against the
/// new surface apart from truly unresolvable ones.
pub(crate) fn introduced_symbols(change_set: &ChangeSet) -> BTreeSet<&SymbolId> {
    change_set
        .changes
        .iter()
        .filter_map(|c| match c {
            Change::Added { symbol } => Some(symbol),
            Change::Renamed { to, .. } => Some(to),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::AnalyzeOptions;
    use crate::models::{ParameterSpec, Symbol, SymbolKind};

    fn model(symbols: Vec<Symbol>) -> SurfaceModel {
        SurfaceModel::new(symbols).unwrap()
    }

    fn fid(name: &str) -> SymbolId {
        SymbolId::new(name, SymbolKind::Function)
    }

    // -- Exact pass ---------------------------------------------------------

    #[test]
    fn test_identical_models_yield_empty_set() {
        let symbols = vec![
            Symbol::function("lib.a").with_params(vec![ParameterSpec::new("x", 0)]),
            Symbol::class("lib.Config"),
        ];
        let (set, diags) = diff(
            &model(symbols.clone()),
            &model(symbols),
            &AnalyzeOptions::default(),
        )
        .unwrap();
        assert!(set.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_structural_change_on_exact_match() {
        let v1 = model(vec![Symbol::function("lib.f").with_return_type("int")]);
        let v2 = model(vec![Symbol::function("lib.f").with_return_type("str")]);
        let (set, _) = diff(&v1, &v2, &AnalyzeOptions::default()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(matches!(&set.changes[0], Change::ReturnTypeChanged { .. }));
    }

    // -- Rename pass --------------------------------------------------------

    #[test]
    fn test_confident_rename_detected() {
        let v1 = model(vec![Symbol::function("lib.get_user")
            .with_params(vec![ParameterSpec::new("user_id", 0)])
            .with_return_type("Optional[User]")]);
        let v2 = model(vec![Symbol::function("lib.fetch_user")
            .with_params(vec![ParameterSpec::new("user_id", 0)])
            .with_return_type("Optional[UserAccount]")]);
        let (set, diags) = diff(&v1, &v2, &AnalyzeOptions::default()).unwrap();
        assert!(matches!(
            &set.changes[0],
            Change::Renamed { from, to, confidence }
                if *from == fid("lib.get_user")
                    && *to == fid("lib.fetch_user")
                    && *confidence >= 0.5
        ));
        // The return change rides along, attributed to the V1 identity.
        assert!(set.changes.iter().any(|c| matches!(
            c,
            Change::ReturnTypeChanged { symbol, .. } if *symbol == fid("lib.get_user")
        )));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_rename_requires_same_kind() {
        let v1 = model(vec![Symbol::function("lib.config")]);
        let v2 = model(vec![Symbol::class("lib.config")]);
        let (set, _) = diff(&v1, &v2, &AnalyzeOptions::default()).unwrap();
        assert!(set
            .changes
            .iter()
            .any(|c| matches!(c, Change::Removed { .. })));
        assert!(set.changes.iter().any(|c| matches!(c, Change::Added { .. })));
        assert!(!set
            .changes
            .iter()
            .any(|c| matches!(c, Change::Renamed { .. })));
    }

    #[test]
    fn test_ambiguous_tie_blocks_both_and_warns() {
        // Two added symbols equidistant from one removed symbol: identical
        // signatures, names at the same edit distance.
        let v1 = model(vec![Symbol::function("lib.load_xa")
            .with_params(vec![ParameterSpec::new("path", 0)])]);
        let v2 = model(vec![
            Symbol::function("lib.load_xb").with_params(vec![ParameterSpec::new("path", 0)]),
            Symbol::function("lib.load_xc").with_params(vec![ParameterSpec::new("path", 0)]),
        ]);
        let (set, diags) = diff(&v1, &v2, &AnalyzeOptions::default()).unwrap();
        assert!(!set
            .changes
            .iter()
            .any(|c| matches!(c, Change::Renamed { .. })));
        assert!(set
            .changes
            .iter()
            .any(|c| matches!(c, Change::Removed { symbol } if *symbol == fid("lib.load_xa"))));
        assert_eq!(set.changes.iter().filter(|c| matches!(c, Change::Added { .. })).count(), 2);
        let ambiguous = diags
            .iter()
            .filter(|d| d.kind == DiagnosticKind::AmbiguousRename)
            .count();
        assert_eq!(ambiguous, 2);
    }

    #[test]
    fn test_low_confidence_near_miss_reported() {
        let options = AnalyzeOptions::default().with_rename_threshold(0.9);
        let v1 = model(vec![Symbol::function("lib.get_user")
            .with_params(vec![ParameterSpec::new("user_id", 0)])]);
        let v2 = model(vec![Symbol::function("lib.fetch_user")
            .with_params(vec![ParameterSpec::new("user_id", 0)])]);
        let (set, diags) = diff(&v1, &v2, &options).unwrap();
        assert!(!set
            .changes
            .iter()
            .any(|c| matches!(c, Change::Renamed { .. })));
        assert!(diags
            .iter()
            .any(|d| d.kind == DiagnosticKind::PossibleRename));
    }

    // -- Determinism --------------------------------------------------------

    #[test]
    fn test_output_independent_of_input_order() {
        let symbols_v1 = vec![
            Symbol::function("lib.alpha").with_params(vec![ParameterSpec::new("x", 0)]),
            Symbol::function("lib.beta"),
            Symbol::class("lib.Gamma"),
        ];
        let symbols_v2 = vec![
            Symbol::function("lib.alpha").with_params(vec![ParameterSpec::new("y", 0)]),
            Symbol::class("lib.Gamma"),
            Symbol::function("lib.delta"),
        ];
        let mut reversed_v1 = symbols_v1.clone();
        reversed_v1.reverse();
        let mut reversed_v2 = symbols_v2.clone();
        reversed_v2.reverse();

        let options = AnalyzeOptions::default();
        let (a, _) = diff(&model(symbols_v1), &model(symbols_v2), &options).unwrap();
        let (b, _) = diff(&model(reversed_v1), &model(reversed_v2), &options).unwrap();
        assert_eq!(
            serde_json::to_string(&a.changes).unwrap(),
            serde_json::to_string(&b.changes).unwrap()
        );
    }

    #[test]
    fn test_lookup_tables_populated() {
        let v1 = model(vec![Symbol::function("lib.f")
            .with_params(vec![ParameterSpec::new("a", 0), ParameterSpec::new("b", 1)])]);
        let v2 = model(vec![Symbol::function("lib.f")
            .with_params(vec![ParameterSpec::new("b", 0), ParameterSpec::new("a", 1)])]);
        let (set, _) = diff(&v1, &v2, &AnalyzeOptions::default()).unwrap();
        assert!(set.v1_symbols.contains(&fid("lib.f")));
        assert_eq!(
            set.v2_params.get(&fid("lib.f")).unwrap(),
            &vec!["b".to_string(), "a".to_string()]
        );
    }
}

//! Deterministic diagnostic aggregation.

use std::cmp::Ordering;

use crate::models::Diagnostic;

fn diagnostic_key(a: &Diagnostic, b: &Diagnostic) -> Ordering {
    // Model-level (locationless) findings sort before site findings.
    match (&a.location, &b.location) {
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(la), Some(lb)) => {
            let ord = la.cmp(lb);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        (None, None) => {}
    }
    a.severity
        .cmp(&b.severity)
        .then(a.kind.cmp(&b.kind))
        .then(a.message.cmp(&b.message))
}

/// Merge diagnostics from all phases into one deduplicated, canonically
/// sorted list: locationless first, then by location, severity
/// (blocking > warning > info), kind, and message.
pub fn aggregate(batches: Vec<Vec<Diagnostic>>) -> Vec<Diagnostic> {
    let mut merged: Vec<Diagnostic> = batches.into_iter().flatten().collect();
    merged.sort_by(diagnostic_key);
    merged.dedup();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosticKind, Severity};

    #[test]
    fn test_sort_locationless_first_then_severity() {
        let out = aggregate(vec![vec![
            Diagnostic::info(DiagnosticKind::PossibleRename, "maybe").at("b.py:2"),
            Diagnostic::blocking(DiagnosticKind::RemovedNoReplacement, "gone").at("b.py:2"),
            Diagnostic::warning(DiagnosticKind::AmbiguousRename, "tie"),
            Diagnostic::blocking(DiagnosticKind::ManualValueRequired, "value").at("a.py:1"),
        ]]);
        assert_eq!(out[0].location, None);
        assert_eq!(out[1].location.as_deref(), Some("a.py:1"));
        assert_eq!(out[2].severity, Severity::Blocking);
        assert_eq!(out[3].severity, Severity::Info);
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let d = Diagnostic::warning(DiagnosticKind::UnknownKeyword, "keyword `x`").at("a.py:1");
        let out = aggregate(vec![vec![d.clone()], vec![d.clone(), d]]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_same_key_different_payload_survives() {
        let a = Diagnostic::warning(DiagnosticKind::UnknownKeyword, "keyword `x`").at("a.py:1");
        let b = Diagnostic::warning(DiagnosticKind::UnknownKeyword, "keyword `y`").at("a.py:1");
        let out = aggregate(vec![vec![a, b]]);
        assert_eq!(out.len(), 2);
    }
}

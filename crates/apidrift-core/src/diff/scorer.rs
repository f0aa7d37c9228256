//! Confidence scoring for rename candidates.
//!
//! Scores a removed-from-V1 symbol against an added-in-V2 symbol of the same
//! kind, combining up to four signals into a value in [0, 1]:
//!
//! - name similarity (normalized Levenshtein), weight 0.4
//! - parameter-name Jaccard overlap, weight 0.3
//! - enclosing-scope equality, weight 0.2
//! - doc token overlap, weight 0.1
//!
//! Signals that are unavailable for a pair (a symbol without a signature, a
//! missing doc string) drop out and the remaining weights are renormalized,
//! so a pair is never penalized for data its kind does not carry.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Symbol;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]+").unwrap());

const WEIGHT_NAME: f64 = 0.4;
const WEIGHT_PARAMS: f64 = 0.3;
const WEIGHT_SCOPE: f64 = 0.2;
const WEIGHT_DOC: f64 = 0.1;

fn tokens(value: &str) -> HashSet<String> {
    TOKEN_RE
        .find_iter(value)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized name similarity: 1.0 for equal strings, 0.0 for disjoint.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

fn doc_overlap(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

/// Score a (removed, added) same-kind pair.
///
/// Callers only propose pairs at or above their acceptance threshold; this
/// function itself never filters.
pub fn score(removed: &Symbol, added: &Symbol) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;

    total += WEIGHT_NAME * name_similarity(&removed.qualified_name, &added.qualified_name);
    weight_sum += WEIGHT_NAME;

    if let (Some(sig_a), Some(sig_b)) = (&removed.signature, &added.signature) {
        let names_a: HashSet<&str> = sig_a.param_names().into_iter().collect();
        let names_b: HashSet<&str> = sig_b.param_names().into_iter().collect();
        total += WEIGHT_PARAMS * jaccard(&names_a, &names_b);
        weight_sum += WEIGHT_PARAMS;
    }

    let scope_match = removed.enclosing_scope == added.enclosing_scope;
    total += WEIGHT_SCOPE * if scope_match { 1.0 } else { 0.0 };
    weight_sum += WEIGHT_SCOPE;

    if let (Some(doc_a), Some(doc_b)) = (&removed.doc, &added.doc) {
        total += WEIGHT_DOC * doc_overlap(doc_a, doc_b);
        weight_sum += WEIGHT_DOC;
    }

    total / weight_sum
}

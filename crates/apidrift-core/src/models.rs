//! Shared typed models used across diffing, planning, and aggregation.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{DriftError, DriftResult};

// ---------------------------------------------------------------------------
// Type-string helpers
// ---------------------------------------------------------------------------

/// Check whether a declared type string is an optional/nullable wrapper.
///
/// Declared types are opaque strings supplied by the extractor, so the check
/// is purely syntactic: `Optional[T]`, `Option<T>`, `T | None`, `T?`.
pub fn is_optional_type(type_name: &str) -> bool {
    let t = type_name.trim();
    t.starts_with("Optional[")
        || t.starts_with("Option<")
        || t.ends_with("| None")
        || t.ends_with("|None")
        || t.ends_with('?')
}

/// Strip one level of optional wrapping, if present.
pub fn strip_optional(type_name: &str) -> &str {
    let t = type_name.trim();
    if let Some(inner) = t.strip_prefix("Optional[").and_then(|s| s.strip_suffix(']')) {
        return inner;
    }
    if let Some(inner) = t.strip_prefix("Option<").and_then(|s| s.strip_suffix('>')) {
        return inner;
    }
    if let Some(inner) = t.strip_suffix("| None").or_else(|| t.strip_suffix("|None")) {
        return inner.trim_end();
    }
    if let Some(inner) = t.strip_suffix('?') {
        return inner;
    }
    t
}

/// Check whether a declared type string is a structured result wrapper
/// (`Result[T, E]`, `Result<T, E>`) around some payload.
pub fn is_result_type(type_name: &str) -> bool {
    let t = type_name.trim();
    t.starts_with("Result[") || t.starts_with("Result<")
}

// ---------------------------------------------------------------------------
// 1. SymbolKind / SymbolId
// ---------------------------------------------------------------------------

/// Kind of a public API symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Field,
    Enum,
    EnumMember,
}

impl SymbolKind {
    /// Human-readable name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Field => "field",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum member",
        }
    }
}

/// Unique identity of a symbol within one surface model.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId {
    pub qualified_name: String,
    pub kind: SymbolKind,
}

impl SymbolId {
    pub fn new(qualified_name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
        }
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} `{}`", self.kind.name(), self.qualified_name)
    }
}

// ---------------------------------------------------------------------------
// 2. ParameterSpec / Signature
// ---------------------------------------------------------------------------

/// A single declared parameter of a function or method signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// 0-based position within the declaring signature.
    pub position: usize,
    #[serde(default)]
    pub has_default: bool,
    /// Renderable expression for the declared default, when one can be
    /// derived mechanically (e.g. a literal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            position,
            has_default: false,
            default_value: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.has_default = true;
        self.default_value = Some(value.into());
        self
    }
}

/// An ordered parameter list plus return type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<ParameterSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl Signature {
    pub fn new(parameters: Vec<ParameterSpec>, return_type: Option<String>) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

// ---------------------------------------------------------------------------
// 3. Symbol
// ---------------------------------------------------------------------------

/// One public symbol of a library version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// Qualified name of the enclosing scope (class for a method, enum for a
    /// member), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_scope: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    /// Present for functions and methods; field shapes are carried as a
    /// signature-less symbol with a `type_name`-style doc line if needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    /// Doc comment / description, used only as a similarity signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Symbol {
    /// Create a free function symbol.
    pub fn function(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind: SymbolKind::Function,
            enclosing_scope: None,
            is_static: false,
            signature: Some(Signature::default()),
            doc: None,
        }
    }

    /// Create a method symbol inside `scope`.
    pub fn method(qualified_name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind: SymbolKind::Method,
            enclosing_scope: Some(scope.into()),
            is_static: false,
            signature: Some(Signature::default()),
            doc: None,
        }
    }

    /// Create a class symbol.
    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind: SymbolKind::Class,
            enclosing_scope: None,
            is_static: false,
            signature: None,
            doc: None,
        }
    }

    /// Create a symbol of an arbitrary kind.
    pub fn of_kind(qualified_name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            enclosing_scope: None,
            is_static: false,
            signature: None,
            doc: None,
        }
    }

    pub fn with_params(mut self, params: Vec<ParameterSpec>) -> Self {
        let sig = self.signature.get_or_insert_with(Signature::default);
        sig.parameters = params;
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        let sig = self.signature.get_or_insert_with(Signature::default);
        sig.return_type = Some(return_type.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.enclosing_scope = Some(scope.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Identity of this symbol within its model.
    pub fn id(&self) -> SymbolId {
        SymbolId::new(self.qualified_name.clone(), self.kind)
    }
}

// ---------------------------------------------------------------------------
// 4. SurfaceModel
// ---------------------------------------------------------------------------

/// Immutable, validated table of one library version's public symbols.
///
/// Symbols are held in canonical order (sorted by qualified name, then
/// kind). Every "declaration order" tie-break in the engine refers to this
/// canonical order, so the output is independent of the order in which the
/// extractor emitted symbols.
#[derive(Clone, Debug, Serialize)]
pub struct SurfaceModel {
    symbols: Vec<Symbol>,
    #[serde(skip)]
    index: IndexMap<SymbolId, usize>,
}

// Deserialization goes through `new` so the lookup index is rebuilt and the
// extractor contract is re-checked.
impl<'de> Deserialize<'de> for SurfaceModel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            symbols: Vec<Symbol>,
        }
        let raw = Raw::deserialize(deserializer)?;
        SurfaceModel::new(raw.symbols).map_err(serde::de::Error::custom)
    }
}

impl SurfaceModel {
    /// Build a surface model, validating the extractor contract.
    ///
    /// Fails with [`DriftError::Extraction`] on a duplicate
    /// (qualified name, kind) pair or a duplicate parameter name within one
    /// signature.
    pub fn new(mut symbols: Vec<Symbol>) -> DriftResult<Self> {
        symbols.sort_by(|a, b| {
            a.qualified_name
                .cmp(&b.qualified_name)
                .then(a.kind.cmp(&b.kind))
        });

        let mut index = IndexMap::with_capacity(symbols.len());
        for (pos, symbol) in symbols.iter().enumerate() {
            if let Some(sig) = &symbol.signature {
                let mut seen = std::collections::HashSet::new();
                for param in &sig.parameters {
                    if !seen.insert(param.name.as_str()) {
                        return Err(DriftError::Extraction(format!(
                            "duplicate parameter `{}` in {}",
                            param.name,
                            symbol.id()
                        )));
                    }
                }
            }
            if index.insert(symbol.id(), pos).is_some() {
                return Err(DriftError::Extraction(format!(
                    "duplicate symbol {}",
                    symbol.id()
                )));
            }
        }

        Ok(Self { symbols, index })
    }

    /// Symbols in canonical order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn get(&self, id: &SymbolId) -> Option<&Symbol> {
        self.index.get(id).map(|&pos| &self.symbols[pos])
    }

    pub fn contains(&self, id: &SymbolId) -> bool {
        self.index.contains_key(id)
    }

    /// Canonical position of a symbol, used as a deterministic tie-break key.
    pub fn position(&self, id: &SymbolId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 5. Change / ChangeSet
// ---------------------------------------------------------------------------

/// One entry of a parameter permutation: the parameter `name` moved from
/// V1 position `from` to V2 position `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMove {
    pub name: String,
    pub from: usize,
    pub to: usize,
}

/// A single typed difference between two surface models.
///
/// Every variant references the V1 symbol it affects, except `Added`, which
/// references the new V2 symbol. Structural changes detected on a renamed
/// symbol are attributed to the V1 identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Renamed {
        from: SymbolId,
        to: SymbolId,
        confidence: f64,
    },
    ParameterAdded {
        symbol: SymbolId,
        param: ParameterSpec,
        position_in_v2: usize,
    },
    ParameterRemoved {
        symbol: SymbolId,
        param: ParameterSpec,
    },
    ParameterReordered {
        symbol: SymbolId,
        /// Full old-position → new-position map over the common parameters,
        /// sorted by old position.
        permutation: Vec<ParamMove>,
    },
    ParameterTypeChanged {
        symbol: SymbolId,
        param: String,
        /// V1 position of the parameter, so the planner can tell whether a
        /// positional argument covers it.
        position: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        to_type: Option<String>,
    },
    ReturnTypeChanged {
        symbol: SymbolId,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        to_type: Option<String>,
    },
    Removed {
        symbol: SymbolId,
    },
    Added {
        symbol: SymbolId,
    },
}

impl Change {
    /// The V1 symbol this change is keyed under, if any (`Added` has none).
    pub fn v1_symbol(&self) -> Option<&SymbolId> {
        match self {
            Change::Renamed { from, .. } => Some(from),
            Change::ParameterAdded { symbol, .. }
            | Change::ParameterRemoved { symbol, .. }
            | Change::ParameterReordered { symbol, .. }
            | Change::ParameterTypeChanged { symbol, .. }
            | Change::ReturnTypeChanged { symbol, .. }
            | Change::Removed { symbol } => Some(symbol),
            Change::Added { .. } => None,
        }
    }

    /// Human-readable name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Change::Renamed { .. } => "renamed",
            Change::ParameterAdded { .. } => "parameter added",
            Change::ParameterRemoved { .. } => "parameter removed",
            Change::ParameterReordered { .. } => "parameters reordered",
            Change::ParameterTypeChanged { .. } => "parameter type changed",
            Change::ReturnTypeChanged { .. } => "return type changed",
            Change::Removed { .. } => "removed",
            Change::Added { .. } => "added",
        }
    }
}

/// Ordered list of typed differences between two surface models.
///
/// Order is canonical: changes keyed by V1 symbols in V1 canonical order,
/// then `Added` changes in V2 canonical order. The set also carries two
/// read-only lookup tables so the planner can resolve call sites without
/// re-reading the surface models: the V1 symbol identities, and the V2
/// parameter-name list of every symbol that survives into V2.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
    pub v1_symbols: std::collections::BTreeSet<SymbolId>,
    /// Keyed by V1 identity; value is the V2 parameter-name list of the
    /// matched (exact or renamed) V2 symbol, for symbols that carry one.
    /// Serialized as a sequence of pairs: JSON maps require string keys.
    #[serde(with = "serde_symbol_id_map")]
    pub v2_params: BTreeMap<SymbolId, Vec<String>>,
}

mod serde_symbol_id_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::SymbolId;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<SymbolId, Vec<String>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        map.iter().collect::<Vec<_>>().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<SymbolId, Vec<String>>, D::Error> {
        let pairs: Vec<(SymbolId, Vec<String>)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl ChangeSet {
    /// All changes keyed under the given V1 symbol, in canonical order.
    pub fn changes_for<'a>(&'a self, symbol: &SymbolId) -> Vec<&'a Change> {
        self.changes
            .iter()
            .filter(|c| c.v1_symbol() == Some(symbol))
            .collect()
    }

    /// The rename affecting the given V1 symbol, if one was accepted.
    pub fn rename_for(&self, symbol: &SymbolId) -> Option<(&SymbolId, f64)> {
        self.changes.iter().find_map(|c| match c {
            Change::Renamed {
                from,
                to,
                confidence,
            } if from == symbol => Some((to, *confidence)),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

// ---------------------------------------------------------------------------
// 6. CallSite
// ---------------------------------------------------------------------------

/// How the scanner observed the call's result being consumed.
///
/// The planner only rewrites usages it can recognize without data-flow
/// analysis; anything else is `Complex` and gets flagged instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum ResultUsage {
    /// Result discarded.
    #[default]
    Ignored,
    /// Result bound or used directly as a value.
    Value,
    /// Immediate access of a single field on the result.
    FieldAccess { field: String },
    /// Anything the scanner could not classify.
    Complex,
}

/// One concrete invocation of a V1 symbol found in client code.
///
/// Argument expressions and the location token are opaque strings owned by
/// the scanner; the engine never interprets them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub location: String,
    pub symbol: SymbolId,
    #[serde(default)]
    pub positional_args: Vec<String>,
    /// Keyword name → argument expression, in source order.
    #[serde(default)]
    pub keyword_args: Vec<(String, String)>,
    #[serde(default)]
    pub result_usage: ResultUsage,
}

impl CallSite {
    pub fn new(location: impl Into<String>, symbol: SymbolId) -> Self {
        Self {
            location: location.into(),
            symbol,
            positional_args: Vec::new(),
            keyword_args: Vec::new(),
            result_usage: ResultUsage::Ignored,
        }
    }

    pub fn with_positional(mut self, args: Vec<&str>) -> Self {
        self.positional_args = args.into_iter().map(str::to_owned).collect();
        self
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keyword_args.push((name.into(), value.into()));
        self
    }

    pub fn with_usage(mut self, usage: ResultUsage) -> Self {
        self.result_usage = usage;
        self
    }

    /// The keyword expression passed for `name`, if any.
    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.keyword_args
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// 7. Edit / MigrationPlan
// ---------------------------------------------------------------------------

/// Where an argument edit applies within the call expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgTarget {
    /// 0-based index into the original positional argument list.
    Position(usize),
    /// Keyword argument name.
    Name(String),
}

/// How a changed return type should be handled at the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapStrategy {
    /// The result became optional: guard the access against absence.
    OptionalGuard,
    /// The result became a structured wrapper: access the payload first.
    StructuredAccess,
}

/// One concrete rewrite operation for a call site.
///
/// Edits apply sequentially: every position in an edit refers to the
/// argument list as left by the edits before it, so a renderer can apply
/// them one at a time without tracking original indices. The planner
/// renumbers `RemoveArg` and `ReorderArgs` positions accordingly, and emits
/// `InsertArg` edits in ascending target order so each insertion point is
/// already valid when its turn comes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Edit {
    RenameSymbol { to: String },
    ReorderArgs { permutation: Vec<ParamMove> },
    RemoveArg { target: ArgTarget },
    InsertArg { target: ArgTarget, value: String },
    WrapResultAccess { strategy: WrapStrategy },
}

/// Per-call-site ordered edit lists, keyed by location token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub edits: BTreeMap<String, Vec<Edit>>,
}

impl MigrationPlan {
    pub fn edits_for(&self, location: &str) -> &[Edit] {
        self.edits.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 8. Diagnostic
// ---------------------------------------------------------------------------

/// Severity of a diagnostic.
///
/// Variant order is the canonical sort order: blocking entries sort first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Migration cannot proceed safely without manual action.
    Blocking,
    /// Worth a human look; partial edits may still apply.
    Warning,
    Info,
}

/// Machine-readable classification of a diagnostic.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    RemovedNoReplacement,
    AmbiguousRename,
    PossibleRename,
    UnknownKeyword,
    ManualValueRequired,
    ReorderNotApplicable,
    ArgumentTypeChanged,
    ReturnTypeChangedReview,
    UnresolvableCallSite,
    AnalysisTimedOut,
}

/// One unresolved or noteworthy case surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Call-site location token, absent for model-level findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// The change this diagnostic refers to, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Change>,
}

impl Diagnostic {
    pub fn blocking(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            location: None,
            severity: Severity::Blocking,
            kind,
            message: message.into(),
            change: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            location: None,
            severity: Severity::Warning,
            kind,
            message: message.into(),
            change: None,
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            location: None,
            severity: Severity::Info,
            kind,
            message: message.into(),
            change: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_change(mut self, change: Change) -> Self {
        self.change = Some(change);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_optional_type() {
        assert!(is_optional_type("Optional[User]"));
        assert!(is_optional_type("Option<User>"));
        assert!(is_optional_type("User | None"));
        assert!(is_optional_type("User?"));
        assert!(!is_optional_type("User"));
        assert!(!is_optional_type("Result[User, Error]"));
    }

    #[test]
    fn test_strip_optional() {
        assert_eq!(strip_optional("Optional[User]"), "User");
        assert_eq!(strip_optional("Option<User>"), "User");
        assert_eq!(strip_optional("User | None"), "User");
        assert_eq!(strip_optional("User?"), "User");
        assert_eq!(strip_optional("User"), "User");
    }

    #[test]
    fn test_surface_model_canonical_order() {
        let a = SurfaceModel::new(vec![
            Symbol::function("zebra"),
            Symbol::function("alpha"),
        ])
        .unwrap();
        let b = SurfaceModel::new(vec![
            Symbol::function("alpha"),
            Symbol::function("zebra"),
        ])
        .unwrap();
        let names_a: Vec<_> = a.symbols().iter().map(|s| &s.qualified_name).collect();
        let names_b: Vec<_> = b.symbols().iter().map(|s| &s.qualified_name).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(names_a, vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_surface_model_rejects_duplicate_symbol() {
        let err = SurfaceModel::new(vec![Symbol::function("f"), Symbol::function("f")])
            .unwrap_err();
        assert!(matches!(err, DriftError::Extraction(_)));
    }

    #[test]
    fn test_surface_model_allows_same_name_different_kind() {
        let model = SurfaceModel::new(vec![
            Symbol::function("config"),
            Symbol::class("config"),
        ])
        .unwrap();
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn test_surface_model_rejects_duplicate_parameter() {
        let sym = Symbol::function("f").with_params(vec![
            ParameterSpec::new("x", 0),
            ParameterSpec::new("x", 1),
        ]);
        let err = SurfaceModel::new(vec![sym]).unwrap_err();
        assert!(matches!(err, DriftError::Extraction(_)));
    }

    #[test]
    fn test_severity_sort_order() {
        let mut severities = vec![Severity::Info, Severity::Blocking, Severity::Warning];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Blocking, Severity::Warning, Severity::Info]
        );
    }

    #[test]
    fn test_change_serde_tagging() {
        let change = Change::Removed {
            symbol: SymbolId::new("lib.deprecated_fn", SymbolKind::Function),
        };
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["type"], "removed");
        assert_eq!(value["symbol"]["qualified_name"], "lib.deprecated_fn");
    }

    #[test]
    fn test_call_site_keyword_lookup() {
        let site = CallSite::new("app.py:10", SymbolId::new("lib.f", SymbolKind::Function))
            .with_keyword("host", "cfg.host");
        assert_eq!(site.keyword("host"), Some("cfg.host"));
        assert_eq!(site.keyword("port"), None);
    }
}

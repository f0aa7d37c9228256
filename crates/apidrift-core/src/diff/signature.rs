//! Structural comparison of two versions of one symbol's signature.

use crate::models::{Change, ParamMove, Signature, Symbol, SymbolId};

/// Compute the structural changes between two versions of one symbol,
/// attributed to the V1 identity `id`.
///
/// Per-symbol change order is fixed: removals in V1 position order,
/// additions in V2 position order, one reorder over the common parameters,
/// type changes in V1 position order, then the return-type change.
pub fn compare_symbol(id: &SymbolId, v1: &Symbol, v2: &Symbol) -> Vec<Change> {
    let mut changes = Vec::new();

    match (&v1.signature, &v2.signature) {
        (Some(sig1), Some(sig2)) => {
            compare_signatures(id, sig1, sig2, &mut changes);
        }
        // A symbol gaining or losing its whole signature is out of model
        // (kinds are fixed per identity), so only return types remain
        // comparable when either side has no parameter list.
        _ => {}
    }

    let ret1 = v1.signature.as_ref().and_then(|s| s.return_type.as_deref());
    let ret2 = v2.signature.as_ref().and_then(|s| s.return_type.as_deref());
    if ret1 != ret2 {
        changes.push(Change::ReturnTypeChanged {
            symbol: id.clone(),
            from_type: ret1.map(str::to_owned),
            to_type: ret2.map(str::to_owned),
        });
    }

    changes
}

fn compare_signatures(id: &SymbolId, sig1: &Signature, sig2: &Signature, out: &mut Vec<Change>) {
    // Removed: in V1 but not V2, by V1 position.
    for param in &sig1.parameters {
        if sig2.param(&param.name).is_none() {
            out.push(Change::ParameterRemoved {
                symbol: id.clone(),
                param: param.clone(),
            });
        }
    }

    // Added: in V2 but not V1, by V2 position.
    for param in &sig2.parameters {
        if sig1.param(&param.name).is_none() {
            out.push(Change::ParameterAdded {
                symbol: id.clone(),
                param: param.clone(),
                position_in_v2: param.position,
            });
        }
    }

    // Reorder: the common-name subsequence changed relative order.
    if let Some(permutation) = common_permutation(sig1, sig2) {
        out.push(Change::ParameterReordered {
            symbol: id.clone(),
            permutation,
        });
    }

    // Retype: common parameters whose declared type differs, by V1 position.
    for param in &sig1.parameters {
        if let Some(other) = sig2.param(&param.name) {
            if param.type_name != other.type_name {
                out.push(Change::ParameterTypeChanged {
                    symbol: id.clone(),
                    param: param.name.clone(),
                    position: param.position,
                    from_type: param.type_name.clone(),
                    to_type: other.type_name.clone(),
                });
            }
        }
    }
}

/// Full old→new position map over the parameters present in both versions,
/// or `None` when their relative order is unchanged.
fn common_permutation(sig1: &Signature, sig2: &Signature) -> Option<Vec<ParamMove>> {
    let common: Vec<&crate::models::ParameterSpec> = sig1
        .parameters
        .iter()
        .filter(|p| sig2.param(&p.name).is_some())
        .collect();
    if common.len() < 2 {
        return None;
    }

    let v2_order: Vec<&str> = sig2
        .parameters
        .iter()
        .filter(|p| sig1.param(&p.name).is_some())
        .map(|p| p.name.as_str())
        .collect();
    let v1_order: Vec<&str> = common.iter().map(|p| p.name.as_str()).collect();
    if v1_order == v2_order {
        return None;
    }

    let moves = common
        .iter()
        .map(|p| {
            // The filter above guarantees presence in sig2.
            let to = sig2.param(&p.name).map(|q| q.position).unwrap_or(p.position);
            ParamMove {
                name: p.name.clone(),
                from: p.position,
                to,
            }
        })
        .collect();
    Some(moves)
}

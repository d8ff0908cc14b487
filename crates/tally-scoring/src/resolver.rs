//! Concept resolution.
//!
//! Every lookup goes through [`resolve`]: the first concept of a fallback chain
//! that is *present* in a snapshot wins, even when its value is zero. A missing
//! key is unknown; a reported zero is a known fact.

use crate::config::{ConceptChains, WorkingCapitalTable};
use std::collections::BTreeMap;
use tally_data::BalancePolarity;

/// Concept name to value for one reporting period.
pub type Snapshot = BTreeMap<String, f64>;

/// Value of the first chain member present in `snapshot`, else `default`.
pub fn resolve(snapshot: &Snapshot, chain: &[String], default: Option<f64>) -> Option<f64> {
    chain
        .iter()
        .find_map(|concept| snapshot.get(concept).copied())
        .or(default)
}

fn resolve_or_zero(snapshot: &Snapshot, chain: &[String]) -> f64 {
    resolve(snapshot, chain, None).unwrap_or(0.0)
}

/// Stockholders' equity attributable to the parent.
///
/// The base is the first available of `LiabilitiesAndEquity − Liabilities`,
/// `Assets − Liabilities`, the direct equity chain and the members' equity
/// chain. Non-controlling interest (direct, else VIE) and redeemable NCI are
/// then subtracted from the base, each defaulting to zero.
pub fn resolve_equity(snapshot: &Snapshot, chains: &ConceptChains) -> Option<f64> {
    let liabilities = resolve(snapshot, &chains.liabilities, None);
    let derived = |total: Option<f64>| match (total, liabilities) {
        (Some(total), Some(liabilities)) => Some(total - liabilities),
        _ => None,
    };

    let base = derived(resolve(snapshot, &chains.liabilities_and_equity, None))
        .or_else(|| derived(resolve(snapshot, &chains.assets, None)))
        .or_else(|| resolve(snapshot, &chains.equity, None))
        .or_else(|| resolve(snapshot, &chains.members_equity, None))?;

    let nci = resolve_or_zero(snapshot, &chains.noncontrolling_interest);
    let redeemable_nci = resolve_or_zero(snapshot, &chains.redeemable_noncontrolling_interest);
    Some(base - nci - redeemable_nci)
}

/// Depletion plus amortization of intangibles.
///
/// Falls back to `combined D&A − depreciation` when neither is tagged, and to
/// zero when that is not derivable either.
pub fn resolve_depletion_and_amortization(snapshot: &Snapshot, chains: &ConceptChains) -> f64 {
    let depletion = resolve(snapshot, &chains.depletion, None);
    let amortization = resolve(snapshot, &chains.amortization, None);
    if depletion.is_some() || amortization.is_some() {
        return depletion.unwrap_or(0.0) + amortization.unwrap_or(0.0);
    }

    match (
        resolve(snapshot, &chains.depreciation_and_amortization, None),
        resolve(snapshot, &chains.depreciation, None),
    ) {
        (Some(total), Some(depreciation)) => total - depreciation,
        _ => 0.0,
    }
}

/// Deferred income tax: the aggregate tag, else the sum of whichever
/// components are present, else zero.
pub fn resolve_deferred_tax(snapshot: &Snapshot, chains: &ConceptChains) -> f64 {
    resolve(snapshot, &chains.deferred_tax, None).unwrap_or_else(|| {
        chains
            .deferred_tax_components
            .iter()
            .filter_map(|c| snapshot.get(c))
            .sum()
    })
}

/// Other non-cash items: the aggregate tag, else `expense − income` with each
/// side defaulting to zero.
pub fn resolve_other_non_cash(snapshot: &Snapshot, chains: &ConceptChains) -> f64 {
    resolve(snapshot, &chains.other_noncash, None).unwrap_or_else(|| {
        resolve_or_zero(snapshot, &chains.other_noncash_expense)
            - resolve_or_zero(snapshot, &chains.other_noncash_income)
    })
}

/// Signed change in operating working capital, as a cash-flow adjustment.
///
/// An aggregate tag is used verbatim. Otherwise each group in the table is
/// resolved through its own chain, skipped if a group that supersedes it has
/// already contributed, negated for `Credit` groups and summed.
pub fn resolve_working_capital_change(snapshot: &Snapshot, table: &WorkingCapitalTable) -> f64 {
    if let Some(aggregate) = resolve(snapshot, &table.aggregate, None) {
        return aggregate;
    }

    let mut contributed: Vec<&str> = Vec::new();
    let mut total = 0.0;

    for group in &table.groups {
        if group
            .superseded_by
            .iter()
            .any(|earlier| contributed.contains(&earlier.as_str()))
        {
            continue;
        }
        if let Some(value) = resolve(snapshot, &group.concepts, None) {
            total += match group.polarity {
                BalancePolarity::Credit => -value,
                _ => value,
            };
            contributed.push(&group.name);
        }
    }

    total
}

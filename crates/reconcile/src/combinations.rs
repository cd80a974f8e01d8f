use std::ops::ControlFlow;

use netzero_core::{LegStore, Money, ReconcileConfig, Sign};
use serde::Serialize;

use crate::detector::GroupBalance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Credit,
    Debit,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Side::Credit => Side::Debit,
            Side::Debit => Side::Credit,
        }
    }

    fn holds(self, sign: &Sign) -> bool {
        matches!(
            (self, sign),
            (Side::Credit, Sign::Credit) | (Side::Debit, Sign::Debit)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub external_id: String,
    pub side: Side,
    pub leg_indices: Vec<usize>,
    /// Magnitude of the combination sum.
    pub sum: Money,
    /// Magnitude of the opposite side's total.
    pub target: Money,
    pub deviation: Money,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub candidates: Vec<MatchCandidate>,
    pub evaluations: u64,
    pub exhausted: bool,
}

/// The side with the larger total; credits win ties.
pub fn dominant_side(group: &GroupBalance) -> Side {
    if group.credit_total >= group.debit_total {
        Side::Credit
    } else {
        Side::Debit
    }
}

/// Search combinations of the dominant side's legs whose sum lands within
/// `match_tolerance` of the opposite side's total. Every accepted combination
/// is returned, in size order and lexicographic leg order within a size.
///
/// When the dominant side cannot form a combination of
/// `min_combination_size` legs and `search_target_side_when_dominant_short`
/// is set, the opposite side is searched against the dominant total instead.
/// Running out of `max_evaluations_per_group` discards everything found so
/// far and reports the group as exhausted.
pub fn find_combinations(
    store: &LegStore,
    group: &GroupBalance,
    config: &ReconcileConfig,
) -> SearchOutcome {
    let dominant = dominant_side(group);
    let mut side = dominant;
    let mut pool = side_legs(store, group, side);

    if pool.len() < config.min_combination_size && config.search_target_side_when_dominant_short {
        let other = side_legs(store, group, dominant.other());
        if other.len() >= config.min_combination_size {
            tracing::debug!(
                group = %group.external_id,
                dominant = ?dominant,
                "dominant side too small, searching opposite side"
            );
            side = dominant.other();
            pool = other;
        }
    }

    let target = match side {
        Side::Credit => group.debit_total,
        Side::Debit => group.credit_total,
    };

    if pool.len() > config.max_search_legs {
        tracing::warn!(
            group = %group.external_id,
            legs = pool.len(),
            limit = config.max_search_legs,
            "search narrowed to largest legs"
        );
        pool = largest_legs(pool, config.max_search_legs);
    }

    search(&group.external_id, side, &pool, target, config)
}

/// `(store index, magnitude)` of every valued leg on `side`, in input order.
fn side_legs(store: &LegStore, group: &GroupBalance, side: Side) -> Vec<(usize, Money)> {
    group
        .leg_indices
        .iter()
        .map(|&i| (i, store.leg(i)))
        .filter(|(_, leg)| side.holds(&leg.sign))
        .filter_map(|(i, leg)| leg.value.map(|v| (i, v.abs())))
        .collect()
}

/// Keep the `limit` largest legs (earlier legs win ties), restoring input
/// order afterwards so enumeration stays lexicographic.
fn largest_legs(mut pool: Vec<(usize, Money)>, limit: usize) -> Vec<(usize, Money)> {
    pool.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    pool.truncate(limit);
    pool.sort_by_key(|(i, _)| *i);
    pool
}

fn search(
    external_id: &str,
    side: Side,
    pool: &[(usize, Money)],
    target: Money,
    config: &ReconcileConfig,
) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    let max_size = config.max_combination_size.min(pool.len());

    for r in config.min_combination_size..=max_size {
        let flow = for_each_combination(pool.len(), r, |positions| {
            if outcome.evaluations >= config.max_evaluations_per_group {
                return ControlFlow::Break(());
            }
            outcome.evaluations += 1;

            let sum: Money = positions.iter().map(|&p| pool[p].1).sum();
            let deviation = (sum.abs() - target.abs()).abs();
            if deviation.as_decimal() <= config.match_tolerance {
                outcome.candidates.push(MatchCandidate {
                    external_id: external_id.to_string(),
                    side,
                    leg_indices: positions.iter().map(|&p| pool[p].0).collect(),
                    sum,
                    target,
                    deviation,
                });
            }
            ControlFlow::Continue(())
        });

        if flow.is_break() {
            tracing::warn!(
                group = %external_id,
                evaluations = outcome.evaluations,
                "combination budget exhausted, group left unresolved"
            );
            return SearchOutcome {
                candidates: Vec::new(),
                evaluations: outcome.evaluations,
                exhausted: true,
            };
        }
    }

    outcome
}

/// Visit every size-`r` subset of `0..n` in lexicographic order.
pub(crate) fn for_each_combination<F>(n: usize, r: usize, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&[usize]) -> ControlFlow<()>,
{
    if r == 0 || r > n {
        return ControlFlow::Continue(());
    }

    let mut positions: Vec<usize> = (0..r).collect();
    loop {
        visit(&positions)?;

        let Some(i) = (0..r).rev().find(|&i| positions[i] < n - r + i) else {
            return ControlFlow::Continue(());
        };
        positions[i] += 1;
        for j in i + 1..r {
            positions[j] = positions[j - 1] + 1;
        }
    }
}

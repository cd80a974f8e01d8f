use netzero_core::{LegStore, ReconcileConfig};

use crate::detector::Detection;
use crate::model::{
    GroupOutcome, LegRecord, LegWarning, MatchKind, MatchedLeg, ReconcileSummary,
    ReconciliationResult, Resolution,
};

/// What the resolution stage produced for one imbalanced group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResolution {
    pub outcome: GroupOutcome,
    /// Accepted leg sets, each a list of store indices.
    pub leg_sets: Vec<(MatchKind, Vec<usize>)>,
}

/// Merge per-group resolutions into the two output record sets. The
/// unresolved set is the detector's full output; groups explained by a
/// partial match stay in it unless `exclude_resolved_groups` is set.
/// `resolutions` must be in the same order as `detection.imbalanced`.
pub fn collect_results(
    store: &LegStore,
    detection: &Detection,
    resolutions: Vec<GroupResolution>,
    warnings: Vec<LegWarning>,
    config: &ReconcileConfig,
) -> ReconciliationResult {
    let mut unresolved_imbalances = Vec::new();
    let mut partial_matches = Vec::new();
    let mut outcomes = Vec::with_capacity(resolutions.len());

    for (group, resolution) in detection.imbalanced.iter().zip(resolutions) {
        let resolved = resolution.outcome.resolution.is_resolved();

        if !(resolved && config.exclude_resolved_groups) {
            unresolved_imbalances.extend(group.leg_indices.iter().map(|&i| LegRecord {
                leg_index: i,
                leg: store.leg(i).clone(),
            }));
        }

        for (match_index, (kind, indices)) in resolution.leg_sets.into_iter().enumerate() {
            partial_matches.extend(indices.into_iter().map(|i| MatchedLeg {
                group: group.external_id.clone(),
                match_kind: kind,
                match_index,
                leg_index: i,
                leg: store.leg(i).clone(),
            }));
        }

        outcomes.push(resolution.outcome);
    }

    let summary = summarize(store, detection, &outcomes, partial_matches.len(), warnings.len());

    ReconciliationResult {
        summary,
        unresolved_imbalances,
        partial_matches,
        outcomes,
        warnings,
    }
}

fn summarize(
    store: &LegStore,
    detection: &Detection,
    outcomes: &[GroupOutcome],
    partial_match_legs: usize,
    warnings: usize,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary {
        total_legs: store.len(),
        total_groups: detection.total_groups(),
        balanced_groups: detection.balanced.len(),
        imbalanced_groups: detection.imbalanced.len(),
        partial_match_legs,
        warnings,
        ..Default::default()
    };

    for outcome in outcomes {
        match outcome.resolution {
            Resolution::SimilarityClusters { .. } => summary.resolved_by_similarity += 1,
            Resolution::Combinations { .. } => summary.resolved_by_combination += 1,
            Resolution::Unresolved => summary.unresolved_groups += 1,
            Resolution::BudgetExhausted => {
                summary.unresolved_groups += 1;
                summary.budget_exhausted_groups += 1;
            }
        }
    }

    summary
}

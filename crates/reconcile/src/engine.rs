use netzero_core::{ConfigError, LegStore, ReconcileConfig, Sign, TransactionLeg};

use crate::aggregate::{collect_results, GroupResolution};
use crate::combinations::find_combinations;
use crate::detector::{detect, GroupBalance};
use crate::grouper::find_clusters;
use crate::model::{GroupOutcome, LegWarning, MatchKind, ReconciliationResult, Resolution};

/// Run one reconciliation over `legs`. The only error is an invalid
/// configuration; problems with individual legs come back as warnings.
pub fn reconcile(
    legs: Vec<TransactionLeg>,
    config: &ReconcileConfig,
) -> Result<ReconciliationResult, ConfigError> {
    reconcile_store(&LegStore::new(legs), config)
}

pub fn reconcile_store(
    store: &LegStore,
    config: &ReconcileConfig,
) -> Result<ReconciliationResult, ConfigError> {
    config.validate()?;

    let warnings = leg_warnings(store);
    let detection = detect(store, config.balance_tolerance);
    tracing::debug!(
        groups = detection.total_groups(),
        imbalanced = detection.imbalanced.len(),
        "imbalance detection done"
    );

    let resolutions = resolve_all(store, &detection.imbalanced, config);
    let result = collect_results(store, &detection, resolutions, warnings, config);

    let s = &result.summary;
    tracing::info!(
        legs = s.total_legs,
        groups = s.total_groups,
        imbalanced = s.imbalanced_groups,
        by_similarity = s.resolved_by_similarity,
        by_combination = s.resolved_by_combination,
        unresolved = s.unresolved_groups,
        "reconciliation finished"
    );

    Ok(result)
}

/// Similarity clusters first; the combination search only runs when no
/// cluster is accepted.
pub fn resolve_group(
    store: &LegStore,
    group: &GroupBalance,
    config: &ReconcileConfig,
) -> GroupResolution {
    tracing::debug!(
        group = %group.external_id,
        credit = %group.credit_total,
        debit = %group.debit_total,
        "resolving imbalanced group"
    );

    let clusters = find_clusters(store, group, config);
    let (resolution, leg_sets) = if !clusters.is_empty() {
        (
            Resolution::SimilarityClusters { count: clusters.len() },
            clusters
                .into_iter()
                .map(|c| (MatchKind::SimilarityCluster, c.leg_indices))
                .collect(),
        )
    } else {
        let search = find_combinations(store, group, config);
        if search.exhausted {
            (Resolution::BudgetExhausted, Vec::new())
        } else if search.candidates.is_empty() {
            (Resolution::Unresolved, Vec::new())
        } else {
            (
                Resolution::Combinations { count: search.candidates.len() },
                search
                    .candidates
                    .into_iter()
                    .map(|c| (MatchKind::Combination, c.leg_indices))
                    .collect(),
            )
        }
    };

    GroupResolution {
        outcome: GroupOutcome {
            external_id: group.external_id.clone(),
            credit_total: group.credit_total,
            debit_total: group.debit_total,
            net: group.net,
            resolution,
        },
        leg_sets,
    }
}

/// Groups are independent, so with more than one worker they are split into
/// contiguous chunks on scoped threads. Joining the chunks in order keeps the
/// output identical to a sequential run.
fn resolve_all(
    store: &LegStore,
    groups: &[GroupBalance],
    config: &ReconcileConfig,
) -> Vec<GroupResolution> {
    let workers = config.worker_threads.min(groups.len());
    if workers <= 1 {
        return groups.iter().map(|g| resolve_group(store, g, config)).collect();
    }

    let chunk_size = groups.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|g| resolve_group(store, g, config))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

fn leg_warnings(store: &LegStore) -> Vec<LegWarning> {
    let mut warnings = Vec::new();

    for (leg_index, leg) in store.legs().iter().enumerate() {
        if leg.has_malformed_value() {
            tracing::warn!(leg = leg_index, group = %leg.external_id, "value is not numeric");
            warnings.push(LegWarning::MalformedValue {
                leg_index,
                external_id: leg.external_id.clone(),
            });
        }
        if let Sign::Unknown(marker) = &leg.sign {
            tracing::warn!(leg = leg_index, group = %leg.external_id, marker = %marker, "unknown sign marker");
            warnings.push(LegWarning::UnknownSign {
                leg_index,
                external_id: leg.external_id.clone(),
                marker: marker.clone(),
            });
        }
    }

    warnings
}

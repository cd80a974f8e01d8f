use std::collections::HashSet;

use netzero_core::{LegStore, Money, ReconcileConfig, Sign};
use serde::Serialize;

use crate::detector::GroupBalance;
use crate::util::{fold, ratio};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityCluster {
    pub external_id: String,
    pub anchor: String,
    pub leg_indices: Vec<usize>,
    pub credit_total: Money,
    pub debit_total: Money,
}

impl SimilarityCluster {
    pub fn gap(&self) -> Money {
        (self.credit_total - self.debit_total).abs()
    }
}

/// Cluster the legs of one imbalanced group around each distinct description
/// and keep the clusters whose own credits and debits cancel within
/// `cluster_tolerance`. Anchors are taken in first-seen order; a leg may land
/// in several clusters unless `deduplicate_cluster_legs` is set.
pub fn find_clusters(
    store: &LegStore,
    group: &GroupBalance,
    config: &ReconcileConfig,
) -> Vec<SimilarityCluster> {
    let folded: Vec<(usize, Vec<char>)> = group
        .leg_indices
        .iter()
        .map(|&i| (i, fold(&store.leg(i).description)))
        .collect();

    let mut seen_anchors: HashSet<&str> = HashSet::new();
    let mut emitted: HashSet<usize> = HashSet::new();
    let mut clusters = Vec::new();

    for (anchor_idx, anchor) in &folded {
        let anchor_text = store.leg(*anchor_idx).description.as_str();
        if !seen_anchors.insert(anchor_text) {
            continue;
        }

        let members: Vec<usize> = folded
            .iter()
            .filter(|(_, desc)| ratio(anchor, desc) > config.similarity_threshold)
            .map(|(i, _)| *i)
            .collect();

        if members.is_empty() {
            continue;
        }

        let (credit_total, debit_total) = side_totals(store, &members);
        let cluster = SimilarityCluster {
            external_id: group.external_id.clone(),
            anchor: anchor_text.to_string(),
            leg_indices: members,
            credit_total,
            debit_total,
        };

        if cluster.gap().as_decimal() > config.cluster_tolerance {
            continue;
        }

        if config.deduplicate_cluster_legs {
            let fresh: Vec<usize> = cluster
                .leg_indices
                .iter()
                .copied()
                .filter(|i| emitted.insert(*i))
                .collect();
            if fresh.is_empty() {
                continue;
            }
            clusters.push(SimilarityCluster { leg_indices: fresh, ..cluster });
        } else {
            clusters.push(cluster);
        }
    }

    clusters
}

/// Magnitude totals of the credit and debit legs among `indices`.
pub(crate) fn side_totals(store: &LegStore, indices: &[usize]) -> (Money, Money) {
    indices
        .iter()
        .map(|&i| store.leg(i))
        .fold((Money::zero(), Money::zero()), |(c, d), leg| match (&leg.sign, leg.value) {
            (Sign::Credit, Some(v)) => (c + v.abs(), d),
            (Sign::Debit, Some(v)) => (c, d + v.abs()),
            _ => (c, d),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netzero_core::TransactionLeg;

    fn m(v: i64) -> Money {
        Money::from(v)
    }

    fn group(store: &LegStore, idx: usize) -> GroupBalance {
        GroupBalance::of(store, &store.groups()[idx])
    }

    fn rent_store() -> LegStore {
        LegStore::new(vec![
            TransactionLeg::credit("T3", m(30), "rent jan"),
            TransactionLeg::debit("T3", m(-28), "rent january"),
            TransactionLeg::credit("T3", m(1000), "unrelated"),
        ])
    }

    #[test]
    fn rent_legs_clustered_apart_from_unrelated() {
        let store = rent_store();
        let clusters = find_clusters(&store, &group(&store, 0), &ReconcileConfig::default());
        let anchors: Vec<&str> = clusters.iter().map(|c| c.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["rent jan", "rent january"]);
        let legs: Vec<usize> = clusters.iter().flat_map(|c| c.leg_indices.clone()).collect();
        assert_eq!(legs, vec![0, 1]);
        for c in &clusters {
            assert!(c.gap().as_decimal() <= ReconcileConfig::default().cluster_tolerance);
        }
    }

    #[test]
    fn looser_threshold_joins_rent_legs() {
        let store = rent_store();
        let config = ReconcileConfig {
            similarity_threshold: 0.75,
            ..Default::default()
        };
        let clusters = find_clusters(&store, &group(&store, 0), &config);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].leg_indices, vec![0, 1]);
        assert_eq!(clusters[0].credit_total, m(30));
        assert_eq!(clusters[0].debit_total, m(28));
        assert_eq!(clusters[0].gap(), m(2));
        // duplicates across anchors are kept by default
        assert_eq!(clusters[1].leg_indices, vec![0, 1]);
    }

    #[test]
    fn dedup_emits_each_leg_once() {
        let store = rent_store();
        let config = ReconcileConfig {
            similarity_threshold: 0.75,
            deduplicate_cluster_legs: true,
            ..Default::default()
        };
        let clusters = find_clusters(&store, &group(&store, 0), &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].leg_indices, vec![0, 1]);
    }

    #[test]
    fn repeated_description_is_one_anchor() {
        let store = LegStore::new(vec![
            TransactionLeg::credit("T1", m(500), "payroll"),
            TransactionLeg::debit("T1", m(480), "payroll"),
            TransactionLeg::credit("T1", m(700), "payroll"),
        ]);
        let clusters = find_clusters(&store, &group(&store, 0), &ReconcileConfig::default());
        // one anchor, cluster 1200 vs 480 is rejected
        assert!(clusters.is_empty());
    }

    #[test]
    fn cluster_gap_at_tolerance_is_accepted() {
        let store = LegStore::new(vec![
            TransactionLeg::credit("T1", m(150), "fee"),
            TransactionLeg::debit("T1", m(100), "fee"),
            TransactionLeg::credit("T1", m(900), "other"),
        ]);
        let clusters = find_clusters(&store, &group(&store, 0), &ReconcileConfig::default());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].gap(), m(50));
    }

    #[test]
    fn malformed_and_unknown_legs_join_but_do_not_count() {
        let store = LegStore::new(vec![
            TransactionLeg::credit("T1", m(200), "transfer"),
            TransactionLeg::new("T1", None, Sign::Debit, "", "transfer"),
            TransactionLeg::new("T1", Some(m(200)), Sign::parse("X"), "", "transfer"),
        ]);
        let clusters = find_clusters(&store, &group(&store, 0), &ReconcileConfig::default());
        assert!(clusters.is_empty());
        assert_eq!(side_totals(&store, &[0, 1, 2]), (m(200), Money::zero()));
    }

    #[test]
    fn threshold_of_one_matches_nothing() {
        let store = rent_store();
        let config = ReconcileConfig {
            similarity_threshold: 1.0,
            ..Default::default()
        };
        assert!(find_clusters(&store, &group(&store, 0), &config).is_empty());
    }
}

use netzero_core::{Money, TransactionLeg};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Record sets
// ---------------------------------------------------------------------------

/// A leg of an imbalanced group, with its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegRecord {
    pub leg_index: usize,
    #[serde(flatten)]
    pub leg: TransactionLeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    SimilarityCluster,
    Combination,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SimilarityCluster => write!(f, "similarity_cluster"),
            Self::Combination => write!(f, "combination"),
        }
    }
}

/// A leg belonging to an accepted cluster or combination. `match_index`
/// numbers the accepted leg sets within their group, starting at 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedLeg {
    pub group: String,
    pub match_kind: MatchKind,
    pub match_index: usize,
    pub leg_index: usize,
    #[serde(flatten)]
    pub leg: TransactionLeg,
}

// ---------------------------------------------------------------------------
// Per-group outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    SimilarityClusters { count: usize },
    Combinations { count: usize },
    Unresolved,
    BudgetExhausted,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            Resolution::SimilarityClusters { .. } | Resolution::Combinations { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupOutcome {
    pub external_id: String,
    pub credit_total: Money,
    pub debit_total: Money,
    pub net: Money,
    pub resolution: Resolution,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Problems with individual legs that were recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegWarning {
    /// Value could not be parsed; the leg is left out of every sum and its
    /// group is treated as imbalanced.
    MalformedValue { leg_index: usize, external_id: String },
    /// Sign marker is neither credit nor debit; the leg is left out of both
    /// totals.
    UnknownSign {
        leg_index: usize,
        external_id: String,
        marker: String,
    },
}

impl std::fmt::Display for LegWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedValue { leg_index, external_id } => {
                write!(f, "leg {leg_index} ({external_id}): value is not numeric")
            }
            Self::UnknownSign { leg_index, external_id, marker } => {
                write!(f, "leg {leg_index} ({external_id}): unknown sign marker '{marker}'")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub total_legs: usize,
    pub total_groups: usize,
    pub balanced_groups: usize,
    pub imbalanced_groups: usize,
    pub resolved_by_similarity: usize,
    pub resolved_by_combination: usize,
    pub unresolved_groups: usize,
    pub budget_exhausted_groups: usize,
    pub partial_match_legs: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub summary: ReconcileSummary,
    pub unresolved_imbalances: Vec<LegRecord>,
    pub partial_matches: Vec<MatchedLeg>,
    pub outcomes: Vec<GroupOutcome>,
    pub warnings: Vec<LegWarning>,
}

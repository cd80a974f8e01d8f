//! Imbalance detection and partial-match search over transaction legs.
//!
//! Pure engine crate: receives normalized legs, returns the unresolved
//! imbalances and the partial matches that explain them. No IO.

pub mod aggregate;
pub mod combinations;
pub mod detector;
pub mod engine;
pub mod grouper;
pub mod model;
pub(crate) mod util;

pub use combinations::{find_combinations, MatchCandidate, SearchOutcome, Side};
pub use detector::{detect, Detection, GroupBalance};
pub use engine::{reconcile, reconcile_store, resolve_group};
pub use grouper::{find_clusters, SimilarityCluster};
pub use model::{
    GroupOutcome, LegRecord, LegWarning, MatchKind, MatchedLeg, ReconcileSummary,
    ReconciliationResult, Resolution,
};
pub use util::similarity;

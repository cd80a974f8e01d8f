pub mod config;
pub mod leg;
pub mod money;
pub mod store;

pub use config::{ConfigError, ReconcileConfig};
pub use leg::{Sign, TransactionLeg};
pub use money::Money;
pub use store::{LegGroup, LegStore};

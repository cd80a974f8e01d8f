use netzero_core::{LegGroup, LegStore, Money, Sign};
use rust_decimal::Decimal;
use serde::Serialize;

/// Totals of one group. `net` is the plain sum of every parsed value,
/// whatever its marker; it decides whether the group balances. The credit and
/// debit totals are magnitudes per marker and drive clustering and the
/// combination search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBalance {
    pub external_id: String,
    #[serde(skip)]
    pub leg_indices: Vec<usize>,
    pub credit_total: Money,
    pub debit_total: Money,
    pub net: Money,
    pub malformed_legs: usize,
    pub unknown_sign_legs: usize,
}

impl GroupBalance {
    pub fn of(store: &LegStore, group: &LegGroup) -> Self {
        let mut credit_total = Money::zero();
        let mut debit_total = Money::zero();
        let mut net = Money::zero();
        let mut malformed_legs = 0;
        let mut unknown_sign_legs = 0;

        for (_, leg) in store.group_legs(group) {
            if !leg.sign.is_known() {
                unknown_sign_legs += 1;
            }
            let Some(value) = leg.value else {
                malformed_legs += 1;
                continue;
            };
            net = net + value;
            match leg.sign {
                Sign::Credit => credit_total = credit_total + value.abs(),
                Sign::Debit => debit_total = debit_total + value.abs(),
                Sign::Unknown(_) => {}
            }
        }

        GroupBalance {
            external_id: group.external_id.clone(),
            leg_indices: group.indices.clone(),
            credit_total,
            debit_total,
            net,
            malformed_legs,
            unknown_sign_legs,
        }
    }

    /// A group with any unparsable value has an indeterminate sum and is
    /// never balanced.
    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        self.malformed_legs == 0 && self.net.within(Money::zero(), tolerance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub balanced: Vec<GroupBalance>,
    pub imbalanced: Vec<GroupBalance>,
}

impl Detection {
    pub fn total_groups(&self) -> usize {
        self.balanced.len() + self.imbalanced.len()
    }
}

/// Split every group of the store into balanced and imbalanced, both in
/// first-appearance order of the external id.
pub fn detect(store: &LegStore, balance_tolerance: Decimal) -> Detection {
    let mut detection = Detection::default();

    for group in store.groups() {
        let balance = GroupBalance::of(store, group);
        if balance.is_balanced(balance_tolerance) {
            detection.balanced.push(balance);
        } else {
            detection.imbalanced.push(balance);
        }
    }

    detection
}

use std::collections::HashMap;

use super::leg::TransactionLeg;

/// Legs sharing one external id, as indices into the owning [`LegStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegGroup {
    pub external_id: String,
    pub indices: Vec<usize>,
}

/// Arena of legs plus a group index. Groups are kept in first-appearance
/// order of their external id and leg indices in input order. Nothing can be
/// added once the store is built, so group membership never changes.
#[derive(Debug, Clone, Default)]
pub struct LegStore {
    legs: Vec<TransactionLeg>,
    groups: Vec<LegGroup>,
}

impl LegStore {
    pub fn new(legs: Vec<TransactionLeg>) -> Self {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<LegGroup> = Vec::new();

        for (idx, leg) in legs.iter().enumerate() {
            let slot = *position.entry(leg.external_id.as_str()).or_insert_with(|| {
                groups.push(LegGroup {
                    external_id: leg.external_id.clone(),
                    indices: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].indices.push(idx);
        }

        LegStore { legs, groups }
    }

    pub fn legs(&self) -> &[TransactionLeg] {
        &self.legs
    }

    pub fn leg(&self, idx: usize) -> &TransactionLeg {
        &self.legs[idx]
    }

    pub fn groups(&self) -> &[LegGroup] {
        &self.groups
    }

    pub fn group_legs<'a>(&'a self, group: &'a LegGroup) -> impl Iterator<Item = (usize, &'a TransactionLeg)> + 'a {
        group.indices.iter().map(move |&i| (i, &self.legs[i]))
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}

impl FromIterator<TransactionLeg> for LegStore {
    fn from_iter<I: IntoIterator<Item = TransactionLeg>>(iter: I) -> Self {
        LegStore::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn leg(id: &str, v: i64) -> TransactionLeg {
        TransactionLeg::credit(id, Money::from(v), "")
    }

    #[test]
    fn groups_follow_first_appearance() {
        let store = LegStore::new(vec![leg("B", 1), leg("A", 2), leg("B", 3), leg("C", 4), leg("A", 5)]);
        let ids: Vec<&str> = store.groups().iter().map(|g| g.external_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert_eq!(store.groups()[0].indices, vec![0, 2]);
        assert_eq!(store.groups()[1].indices, vec![1, 4]);
        assert_eq!(store.groups()[2].indices, vec![3]);
    }

    #[test]
    fn group_legs_resolves_indices() {
        let store: LegStore = vec![leg("A", 10), leg("B", 20), leg("A", 30)].into_iter().collect();
        let values: Vec<Option<Money>> = store
            .group_legs(&store.groups()[0])
            .map(|(_, l)| l.value)
            .collect();
        assert_eq!(values, vec![Some(Money::from(10)), Some(Money::from(30))]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn empty_store_has_no_groups() {
        let store = LegStore::new(Vec::new());
        assert!(store.is_empty());
        assert!(store.groups().is_empty());
    }
}

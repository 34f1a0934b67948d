//! Tabular policy: the best action seen so far for every state key.
//!
//! A [`Policy`] maps each [`StateKey`] to a [`PolicyEntry`] holding the best
//! action observed in that state and the reward it earned. It is not a
//! Q-table: only one action is kept per key, and values are never averaged
//! or discounted.
//!
//! # Monotonic Update Rule
//!
//! [`Policy::update`] only writes when the candidate value is **strictly**
//! greater than the stored one. For every key the stored value therefore
//! never decreases over the lifetime of the policy.
//!
//! # Unseen Keys
//!
//! Looking up a key that was never written yields
//! [`PolicyEntry::unseen`]: a uniformly random action valued at `-∞`, so
//! the first observed reward always replaces it. Lookups do not write the
//! default into the table.

use std::collections::{BTreeMap, btree_map};

use rand::Rng;
use safezone_engine::Action;

use crate::state_key::StateKey;

/// An action together with the best reward it has earned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyEntry {
    pub action: Action,
    pub value: f64,
}

impl PolicyEntry {
    /// Value of an entry that has never been observed.
    pub const UNSEEN_VALUE: f64 = f64::NEG_INFINITY;

    /// The default entry for an unseen key.
    #[must_use]
    pub const fn unseen(action: Action) -> Self {
        Self {
            action,
            value: Self::UNSEEN_VALUE,
        }
    }
}

/// Mapping from state key to best known entry.
///
/// Entries are kept in key order so that iteration, and therefore seeded
/// crossover, is reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Policy {
    entries: BTreeMap<StateKey, PolicyEntry>,
}

impl Policy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a policy from existing entries, e.g. from a crossover or a saved model.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (StateKey, PolicyEntry)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &StateKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &StateKey) -> Option<&PolicyEntry> {
        self.entries.get(key)
    }

    /// Returns the stored entry for `key`, or [`PolicyEntry::unseen`] with a
    /// random action drawn from `rng`.
    pub fn lookup<R>(&self, key: &StateKey, rng: &mut R) -> PolicyEntry
    where
        R: Rng + ?Sized,
    {
        match self.entries.get(key) {
            Some(entry) => *entry,
            None => PolicyEntry::unseen(rng.random()),
        }
    }

    /// Stores `(action, value)` for `key` if `value` beats the stored value.
    ///
    /// Returns `true` if the table changed. Equal or worse values are ignored.
    pub fn update(&mut self, key: StateKey, action: Action, value: f64) -> bool {
        let candidate = PolicyEntry { action, value };
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(e) => {
                if value > PolicyEntry::UNSEEN_VALUE {
                    e.insert(candidate);
                    return true;
                }
                false
            }
            btree_map::Entry::Occupied(mut e) => {
                if value > e.get().value {
                    e.insert(candidate);
                    return true;
                }
                false
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &PolicyEntry)> + '_ {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> + '_ {
        self.entries.keys()
    }
}

impl<'a> IntoIterator for &'a Policy {
    type Item = (&'a StateKey, &'a PolicyEntry);
    type IntoIter = btree_map::Iter<'a, StateKey, PolicyEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;
    use safezone_engine::Direction;

    use super::*;
    use crate::state_key::SafeZoneBearing;

    fn key(bearing: SafeZoneBearing) -> StateKey {
        StateKey::new([false; Direction::LEN], bearing)
    }

    fn entry(action: Action, value: f64) -> PolicyEntry {
        PolicyEntry { action, value }
    }

    const UP: Action = Action::decision(Direction::Up);
    const DOWN: Action = Action::decision(Direction::Down);

    #[test]
    fn test_lookup_unseen_returns_default_without_storing() {
        let policy = Policy::new();
        let mut rng = Pcg32::seed_from_u64(1);
        let entry = policy.lookup(&key(SafeZoneBearing::Up), &mut rng);
        assert_eq!(entry.value, f64::NEG_INFINITY);
        assert!(entry.action.interact);
        assert!(policy.is_empty());
    }

    #[test]
    fn test_first_update_replaces_default() {
        let mut policy = Policy::new();
        assert!(policy.update(key(SafeZoneBearing::Up), UP, -100.0));
        let mut rng = Pcg32::seed_from_u64(1);
        let stored = policy.lookup(&key(SafeZoneBearing::Up), &mut rng);
        assert_eq!(stored, entry(UP, -100.0));
    }

    #[test]
    fn test_update_is_monotonic() {
        let mut policy = Policy::new();
        let k = key(SafeZoneBearing::DownLeft);
        assert!(policy.update(k, UP, 2.0));

        // equal value does not overwrite
        assert!(!policy.update(k, DOWN, 2.0));
        // worse value does not overwrite
        assert!(!policy.update(k, DOWN, -1.0));
        assert_eq!(policy.get(&k), Some(&entry(UP, 2.0)));

        assert!(policy.update(k, DOWN, 7.0));
        assert_eq!(policy.get(&k), Some(&entry(DOWN, 7.0)));
    }

    #[test]
    fn test_stored_values_never_decrease() {
        let mut policy = Policy::new();
        let mut rng = Pcg32::seed_from_u64(99);
        let keys = [key(SafeZoneBearing::Up), key(SafeZoneBearing::Left)];
        let mut last = [f64::NEG_INFINITY; 2];
        for _ in 0..1000 {
            let i = rng.random_range(0..keys.len());
            let value = rng.random_range(-100.0..100.0);
            policy.update(keys[i], rng.random(), value);
            let stored = policy.get(&keys[i]).unwrap().value;
            assert!(stored >= last[i]);
            last[i] = stored;
        }
    }

    #[test]
    fn test_negative_infinity_is_never_stored() {
        let mut policy = Policy::new();
        let k = key(SafeZoneBearing::Here);
        assert!(!policy.update(k, UP, f64::NEG_INFINITY));
        assert!(policy.is_empty());
    }
}

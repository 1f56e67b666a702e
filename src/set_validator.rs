//! The rule deciding which groups of cards form a set.
//!
//! The arbiter only talks to the [`SetValidator`] trait, so any combinatorial rule can be
//! plugged in. [`FeatureRule`] implements the classic one: every card is a tuple of features,
//! and a group is a set when, for each feature, its values are either all equal or all
//! different.

use tracing::warn;

use crate::Card;

/// A pure predicate over groups of cards.
pub trait SetValidator: Send + Sync {
    /// Number of cards in a group.
    fn feature_size(&self) -> usize;

    /// True if `cards` is a valid set.
    ///
    /// Must be deterministic and must not depend on the order of `cards`. A group of the wrong
    /// size is never valid.
    fn is_valid_set(&self, cards: &[Card]) -> bool;

    /// Search `cards` for valid sets, stopping after `limit` of them.
    ///
    /// Groups are enumerated in lexicographic order of their positions in `cards`.
    fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<Vec<Card>> {
        let mut found = vec![];
        if limit == 0 {
            return found;
        }
        for indices in Combinations::new(cards.len(), self.feature_size()) {
            let group = indices.iter().map(|&i| cards[i]).collect::<Vec<_>>();
            if self.is_valid_set(&group) {
                found.push(group);
                if found.len() >= limit {
                    break;
                }
            }
        }
        found
    }

    /// True if at least one valid set can be made out of `cards`.
    fn exists_valid_set(&self, cards: &[Card]) -> bool {
        !self.find_sets(cards, 1).is_empty()
    }
}

/// All-equal-or-all-different rule over `feature_count` features of `feature_size` values.
///
/// Card `c` has, as feature `i`, the `i`-th digit of `c` written in base `feature_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRule {
    feature_size: usize,
    feature_count: usize,
}

impl FeatureRule {
    /// Create the rule for cards of `feature_count` features with `feature_size` values each.
    pub fn new(feature_size: usize, feature_count: usize) -> Self {
        Self {
            feature_size,
            feature_count,
        }
    }

    /// Decode the features of a card, least significant feature first.
    pub fn card_to_features(&self, card: Card) -> Vec<usize> {
        let mut rest = card;
        (0..self.feature_count)
            .map(|_| {
                let value = rest % self.feature_size;
                rest /= self.feature_size;
                value
            })
            .collect()
    }
}

impl SetValidator for FeatureRule {
    fn feature_size(&self) -> usize {
        self.feature_size
    }

    fn is_valid_set(&self, cards: &[Card]) -> bool {
        if cards.len() != self.feature_size {
            warn!(
                "asked to validate {} cards, groups have {}",
                cards.len(),
                self.feature_size
            );
            return false;
        }
        let features = cards
            .iter()
            .map(|&card| self.card_to_features(card))
            .collect::<Vec<_>>();

        (0..self.feature_count).all(|feature| {
            let mut values = features.iter().map(|f| f[feature]).collect::<Vec<_>>();
            values.sort_unstable();
            values.dedup();
            values.len() == 1 || values.len() == cards.len()
        })
    }
}

/// Iterator over the `k`-element index combinations of `0..n`, in lexicographic order.
struct Combinations {
    indices: Vec<usize>,
    n: usize,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            indices: (0..k).collect(),
            n,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        // advance the rightmost index that still has room
        let k = self.indices.len();
        match (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None => self.done = true,
        }
        Some(current)
    }
}

#[cfg(test)]
mod set_validator_tests {
    use super::*;

    fn standard() -> FeatureRule {
        FeatureRule::new(3, 4)
    }

    #[test]
    fn decodes_features() {
        // 5 = 2 + 1*3
        assert_eq!(standard().card_to_features(5), vec![2, 1, 0, 0]);
        assert_eq!(standard().card_to_features(80), vec![2, 2, 2, 2]);
    }

    #[test]
    fn all_different_everywhere_is_valid() {
        // 0000, 1111, 2222
        assert!(standard().is_valid_set(&[0, 40, 80]));
    }

    #[test]
    fn all_equal_but_one_feature_is_valid() {
        // 0000, 1000, 2000
        assert!(standard().is_valid_set(&[0, 1, 2]));
    }

    #[test]
    fn one_mismatched_feature_is_invalid() {
        // 0000, 1000, 2100: second feature is 0, 0, 1
        assert!(!standard().is_valid_set(&[0, 1, 5]));
    }

    #[test]
    fn wrong_arity_is_invalid() {
        assert!(!standard().is_valid_set(&[0, 40]));
        assert!(!standard().is_valid_set(&[0, 40, 80, 1]));
    }

    #[test]
    fn order_does_not_matter() {
        let rule = standard();
        for group in [[0, 40, 80], [0, 1, 5], [3, 31, 59], [7, 8, 9]] {
            let expected = rule.is_valid_set(&group);
            let permutations = [
                [group[0], group[1], group[2]],
                [group[0], group[2], group[1]],
                [group[1], group[0], group[2]],
                [group[1], group[2], group[0]],
                [group[2], group[0], group[1]],
                [group[2], group[1], group[0]],
            ];
            for p in permutations {
                assert_eq!(rule.is_valid_set(&p), expected, "{p:?}");
            }
        }
    }

    #[test]
    fn every_pair_completes_to_exactly_one_set() {
        let rule = FeatureRule::new(3, 2);
        let cards = (0..9).collect::<Vec<_>>();
        // the 9-card plane has 12 lines
        assert_eq!(rule.find_sets(&cards, usize::MAX).len(), 12);
    }

    #[test]
    fn find_sets_stops_at_limit() {
        let rule = FeatureRule::new(3, 2);
        let cards = (0..9).collect::<Vec<_>>();
        assert_eq!(rule.find_sets(&cards, 3).len(), 3);
        assert!(rule.find_sets(&cards, 0).is_empty());
    }

    #[test]
    fn no_set_in_cap() {
        let rule = FeatureRule::new(3, 2);
        // 00, 10, 01, 11 never contains three cards on a line
        assert!(!rule.exists_valid_set(&[0, 1, 3, 4]));
        assert!(rule.exists_valid_set(&[0, 1, 2, 4]));
        assert!(!rule.exists_valid_set(&[0, 1]));
    }

    #[test]
    fn combinations_are_lexicographic() {
        let all = Combinations::new(4, 2).collect::<Vec<_>>();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }
}

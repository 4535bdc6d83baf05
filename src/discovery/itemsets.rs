//! Frequent itemset mining
//!
//! [`ItemsetMiner`] isolates the mining algorithm from the rule derivation and
//! its fallback. [`Apriori`] is the reference implementation: level-wise
//! candidate generation with subset pruning, over interned item ids.
//!
//! Items are any ordered type, so callers can keep distinct kinds of item in
//! separate enum variants instead of encoding them into one string space.

use crate::budget::Budget;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Frequent itemsets with their absolute transaction counts
#[derive(Debug, Clone, PartialEq)]
pub struct FrequentItemsets<T> {
    counts: BTreeMap<Vec<T>, usize>,
    transaction_count: usize,
    truncated: bool,
}

impl<T: Ord + Clone> FrequentItemsets<T> {
    pub fn new(transaction_count: usize) -> Self {
        Self {
            counts: BTreeMap::new(),
            transaction_count,
            truncated: false,
        }
    }

    pub fn insert(&mut self, mut items: Vec<T>, count: usize) {
        items.sort();
        self.counts.insert(items, count);
    }

    /// Count of an itemset, in any item order
    pub fn count(&self, items: &[T]) -> Option<usize> {
        let mut key = items.to_vec();
        key.sort();
        self.counts.get(&key).copied()
    }

    /// Itemsets as sorted item lists
    pub fn iter(&self) -> impl Iterator<Item = (&[T], usize)> {
        self.counts.iter().map(|(items, &count)| (items.as_slice(), count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// Whether mining stopped before the last level
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }
}

/// Finds itemsets whose support reaches a threshold
pub trait ItemsetMiner {
    fn mine<T: Ord + Clone>(
        &self,
        transactions: &[Vec<T>],
        budget: &mut Budget,
    ) -> FrequentItemsets<T>;
}

/// Level-wise Apriori
#[derive(Debug, Clone, PartialEq)]
pub struct Apriori {
    /// Minimum support as a fraction of transactions (inclusive)
    min_support: f64,
    max_len: usize,
}

impl Apriori {
    pub fn new(min_support: f64, max_len: usize) -> Self {
        Self {
            min_support,
            max_len,
        }
    }

    fn is_frequent(&self, count: usize, total: usize) -> bool {
        count > 0 && count as f64 / total as f64 >= self.min_support
    }
}

impl ItemsetMiner for Apriori {
    fn mine<T: Ord + Clone>(
        &self,
        transactions: &[Vec<T>],
        budget: &mut Budget,
    ) -> FrequentItemsets<T> {
        let total = transactions.len();
        let mut result = FrequentItemsets::new(total);
        if total == 0 || self.max_len == 0 {
            return result;
        }

        // Ids follow item order, so sorted id vectors are sorted item lists
        let vocabulary: BTreeSet<&T> = transactions.iter().flatten().collect();
        let names: Vec<&T> = vocabulary.into_iter().collect();
        let ids: BTreeMap<&T, u32> = names
            .iter()
            .enumerate()
            .map(|(i, &item)| (item, i as u32))
            .collect();
        let encoded: Vec<HashSet<u32>> = transactions
            .iter()
            .map(|t| t.iter().filter_map(|item| ids.get(item).copied()).collect())
            .collect();

        let mut singles: BTreeMap<u32, usize> = BTreeMap::new();
        for transaction in &encoded {
            for &id in transaction {
                *singles.entry(id).or_default() += 1;
            }
        }
        let mut level: BTreeMap<Vec<u32>, usize> = singles
            .into_iter()
            .filter(|&(_, count)| self.is_frequent(count, total))
            .map(|(id, count)| (vec![id], count))
            .collect();

        let mut k = 1;
        loop {
            for (itemset, &count) in &level {
                let items = itemset
                    .iter()
                    .map(|&id| names[id as usize].clone())
                    .collect();
                result.insert(items, count);
            }
            debug!("Apriori level {k}: {} frequent itemsets", level.len());
            if k >= self.max_len || level.len() < 2 {
                break;
            }

            let candidates = generate_candidates(&level);
            let mut next: BTreeMap<Vec<u32>, usize> = BTreeMap::new();
            'count: for candidate in candidates {
                let mut count = 0;
                for transaction in &encoded {
                    if !budget.tick() {
                        result.mark_truncated();
                        break 'count;
                    }
                    if candidate.iter().all(|id| transaction.contains(id)) {
                        count += 1;
                    }
                }
                if self.is_frequent(count, total) {
                    next.insert(candidate, count);
                }
            }
            // A partially counted level is discarded
            if result.is_truncated() || next.is_empty() {
                break;
            }
            level = next;
            k += 1;
        }

        result
    }
}

/// Join itemsets sharing all but the last id, then drop candidates with an
/// infrequent subset
fn generate_candidates(level: &BTreeMap<Vec<u32>, usize>) -> Vec<Vec<u32>> {
    let itemsets: Vec<&Vec<u32>> = level.keys().collect();
    let mut candidates = Vec::new();

    for (i, a) in itemsets.iter().enumerate() {
        for b in &itemsets[i + 1..] {
            let prefix = a.len() - 1;
            if a[..prefix] != b[..prefix] {
                // Sorted keys: no later itemset shares this prefix
                break;
            }
            let mut candidate = a.to_vec();
            candidate.push(b[prefix]);

            let all_subsets_frequent = (0..candidate.len()).all(|skip| {
                let subset: Vec<u32> = candidate
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != skip)
                    .map(|(_, &id)| id)
                    .collect();
                level.contains_key(&subset)
            });
            if all_subsets_frequent {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

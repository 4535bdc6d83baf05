//! Association rules between session contents and dropout
//!
//! Each session becomes a transaction of event items plus an outcome item.
//! Rules are read off the frequent itemsets that contain the dropout outcome.
//! Event names, repeated events and outcomes are separate [`Item`] variants,
//! so no event name can be mistaken for an outcome.
//! When mining finds nothing at all, a per-event contingency count takes over;
//! that path is the normal behavior for sparse data, not an error.

use crate::budget::Budget;
use crate::config::DiscoveryConfig;
use crate::discovery::itemsets::{Apriori, FrequentItemsets, ItemsetMiner};
use crate::discovery::types::{
    AssociationRule, InterventionRules, RuleAlgorithm, RulePredicate, DROPOUT_OUTCOME,
};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// One element of a session transaction
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Item {
    /// Event seen at most the repeat threshold times
    Event(String),
    /// Event seen more than the repeat threshold times
    Repeated(String),
    Dropout,
    Success,
}

impl Item {
    /// Rule predicate for an event item; outcomes have none
    fn predicate(&self) -> Option<RulePredicate> {
        match self {
            Item::Event(name) => Some(RulePredicate {
                event_name: name.clone(),
                repeated: false,
            }),
            Item::Repeated(name) => Some(RulePredicate {
                event_name: name.clone(),
                repeated: true,
            }),
            Item::Dropout | Item::Success => None,
        }
    }
}

/// One session as seen by the rule miner
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTransaction {
    /// Event items, sorted
    pub items: Vec<Item>,
    /// Events seen more than the repeat threshold
    pub repeated: Vec<String>,
    pub success: bool,
}

impl SessionTransaction {
    fn outcome(&self) -> Item {
        if self.success {
            Item::Success
        } else {
            Item::Dropout
        }
    }
}

/// Mines `condition => dropout_likely` rules
#[derive(Debug, Clone)]
pub struct RuleMiner<M: ItemsetMiner = Apriori> {
    miner: M,
    min_confidence: f64,
    max_rules: usize,
    repeat_threshold: usize,
    success_min_length: usize,
    success_min_distinct: usize,
    fallback_min_sessions: usize,
}

impl RuleMiner<Apriori> {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::with_miner(
            Apriori::new(config.min_support, config.max_itemset_len),
            config,
        )
    }
}

impl<M: ItemsetMiner> RuleMiner<M> {
    pub fn with_miner(miner: M, config: &DiscoveryConfig) -> Self {
        Self {
            miner,
            min_confidence: config.min_confidence,
            max_rules: config.max_rules,
            repeat_threshold: config.repeat_threshold,
            success_min_length: config.success_min_length,
            success_min_distinct: config.success_min_distinct,
            fallback_min_sessions: config.fallback_min_sessions,
        }
    }

    /// Encode one session's event sequence
    pub fn transaction(&self, sequence: &[&str]) -> SessionTransaction {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &name in sequence {
            *counts.entry(name).or_default() += 1;
        }

        let success =
            sequence.len() > self.success_min_length && counts.len() > self.success_min_distinct;

        let mut items = Vec::with_capacity(counts.len());
        let mut repeated = Vec::new();
        for (&name, &count) in &counts {
            if count > self.repeat_threshold {
                items.push(Item::Repeated(name.to_string()));
                repeated.push(name.to_string());
            } else {
                items.push(Item::Event(name.to_string()));
            }
        }
        items.sort();

        SessionTransaction {
            items,
            repeated,
            success,
        }
    }

    pub fn mine(&self, sequences: &[Vec<&str>], budget: &mut Budget) -> InterventionRules {
        let transactions: Vec<SessionTransaction> =
            sequences.iter().map(|s| self.transaction(s)).collect();

        let baskets: Vec<Vec<Item>> = transactions
            .iter()
            .map(|t| {
                let mut basket = t.items.clone();
                basket.push(t.outcome());
                basket
            })
            .collect();

        let itemsets = self.miner.mine(&baskets, budget);
        let truncated = itemsets.is_truncated();
        if truncated {
            warn!("Itemset mining truncated after {} checks", budget.used());
        }

        if itemsets.is_empty() {
            warn!("No frequent itemsets at the configured support; using per-event fallback");
            let mut rules = self.manual_rules(&transactions);
            rules.truncated = truncated;
            return rules;
        }
        debug!("{} frequent itemsets", itemsets.len());

        let mut rules = self.rules_from_itemsets(&itemsets);
        sort_rules(&mut rules);
        rules.truncate(self.max_rules);
        info!("{} dropout rules (apriori)", rules.len());

        InterventionRules {
            algorithm: RuleAlgorithm::Apriori,
            total_transactions: transactions.len(),
            total_rules: rules.len(),
            intervention_triggers: rules,
            truncated,
        }
    }

    fn rules_from_itemsets(&self, itemsets: &FrequentItemsets<Item>) -> Vec<AssociationRule> {
        let total = itemsets.transaction_count() as f64;
        let Some(dropout_count) = itemsets.count(&[Item::Dropout]) else {
            return Vec::new();
        };
        let dropout_support = dropout_count as f64 / total;

        itemsets
            .iter()
            .filter(|(items, _)| items.len() >= 2 && items.contains(&Item::Dropout))
            .filter_map(|(items, count)| {
                let antecedent: Vec<Item> = items
                    .iter()
                    .filter(|&i| *i != Item::Dropout)
                    .cloned()
                    .collect();
                let antecedent_count = itemsets.count(&antecedent)?;
                let confidence = count as f64 / antecedent_count as f64;
                if confidence < self.min_confidence {
                    return None;
                }

                let predicates: Vec<RulePredicate> =
                    antecedent.iter().filter_map(Item::predicate).collect();
                if predicates.len() != antecedent.len() {
                    return None;
                }
                let condition = self.condition(&predicates);

                Some(AssociationRule {
                    recommendation: recommendation(&condition),
                    condition,
                    predicates,
                    outcome: DROPOUT_OUTCOME.to_string(),
                    confidence,
                    support: count,
                    lift: Some(confidence / dropout_support),
                })
            })
            .collect()
    }

    /// Per-event `> threshold` conditions scored directly against the outcome
    fn manual_rules(&self, transactions: &[SessionTransaction]) -> InterventionRules {
        // event -> (sessions, dropouts)
        let mut outcomes: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for transaction in transactions {
            for name in &transaction.repeated {
                let entry = outcomes.entry(name.as_str()).or_default();
                entry.0 += 1;
                if !transaction.success {
                    entry.1 += 1;
                }
            }
        }

        let mut rules: Vec<AssociationRule> = outcomes
            .into_iter()
            .filter(|&(_, (sessions, _))| sessions >= self.fallback_min_sessions)
            .filter_map(|(name, (sessions, dropouts))| {
                let confidence = dropouts as f64 / sessions as f64;
                if confidence <= self.min_confidence {
                    return None;
                }
                let predicates = vec![RulePredicate {
                    event_name: name.to_string(),
                    repeated: true,
                }];
                let condition = self.condition(&predicates);
                Some(AssociationRule {
                    recommendation: recommendation(&condition),
                    condition,
                    predicates,
                    outcome: DROPOUT_OUTCOME.to_string(),
                    confidence,
                    support: sessions,
                    lift: None,
                })
            })
            .collect();

        sort_rules(&mut rules);
        rules.truncate(self.max_rules);
        info!("{} dropout rules (manual)", rules.len());

        InterventionRules {
            algorithm: RuleAlgorithm::Manual,
            total_transactions: transactions.len(),
            total_rules: rules.len(),
            intervention_triggers: rules,
            truncated: false,
        }
    }

    fn condition(&self, predicates: &[RulePredicate]) -> String {
        predicates
            .iter()
            .map(|p| {
                if p.repeated {
                    format!("{} > {}x", p.event_name, self.repeat_threshold)
                } else {
                    p.event_name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

fn recommendation(condition: &str) -> String {
    format!("Intervene when user triggers: {condition}")
}

fn sort_rules(rules: &mut [AssociationRule]) {
    rules.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.support.cmp(&a.support))
            .then_with(|| a.condition.cmp(&b.condition))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct NoItemsets;

    impl ItemsetMiner for NoItemsets {
        fn mine<T: Ord + Clone>(
            &self,
            transactions: &[Vec<T>],
            _budget: &mut Budget,
        ) -> FrequentItemsets<T> {
            FrequentItemsets::new(transactions.len())
        }
    }

    /// 21 events over 11 distinct names, plus `extra`
    fn long_session(extra: &'static str) -> Vec<&'static str> {
        let names = ["e0", "e1", "e2", "e3", "e4", "e5", "e6", "e7", "e8", "e9", "e10"];
        let mut session: Vec<&str> = names.iter().cycle().take(21).copied().collect();
        session.push(extra);
        session
    }

    #[test]
    fn test_transaction_encoding() {
        let miner = RuleMiner::from_config(&DiscoveryConfig::default());
        let t = miner.transaction(&["search", "search", "search", "search", "home"]);
        assert_eq!(
            t.items,
            vec![
                Item::Event("home".to_string()),
                Item::Repeated("search".to_string())
            ]
        );
        assert_eq!(t.repeated, vec!["search".to_string()]);
        assert!(!t.success);

        let long = long_session("home");
        assert!(miner.transaction(&long).success);
    }

    #[test]
    fn test_dropout_rules_from_apriori() {
        let mut sequences: Vec<Vec<&str>> = Vec::new();
        for _ in 0..8 {
            sequences.push(vec!["search", "search", "search", "search", "search", "home"]);
        }
        sequences.push(long_session("home"));
        sequences.push(long_session("home"));

        let config = DiscoveryConfig {
            min_support: 0.5,
            ..DiscoveryConfig::default()
        };
        let rules = RuleMiner::from_config(&config).mine(&sequences, &mut Budget::unlimited());

        assert_eq!(rules.algorithm, RuleAlgorithm::Apriori);
        assert_eq!(rules.total_transactions, 10);
        let conditions: Vec<&str> = rules
            .intervention_triggers
            .iter()
            .map(|r| r.condition.as_str())
            .collect();
        assert_eq!(
            conditions,
            vec!["home AND search > 3x", "search > 3x", "home"]
        );

        let top = &rules.intervention_triggers[1];
        assert_eq!(top.confidence, 1.0);
        assert_eq!(top.support, 8);
        assert_eq!(top.lift, Some(1.25));
        assert_eq!(top.outcome, "dropout_likely");
        assert_eq!(top.recommendation, "Intervene when user triggers: search > 3x");
        assert_eq!(
            top.predicates,
            vec![RulePredicate {
                event_name: "search".to_string(),
                repeated: true
            }]
        );

        for rule in &rules.intervention_triggers {
            assert!(rule.confidence >= config.min_confidence);
            assert_eq!(rule.outcome, DROPOUT_OUTCOME);
        }
    }

    #[test]
    fn test_no_item_cooccurs_with_dropout_above_support() {
        let mut sequences: Vec<Vec<&str>> = Vec::new();
        for _ in 0..8 {
            sequences.push(long_session("home"));
        }
        sequences.push(vec!["a"]);
        sequences.push(vec!["b"]);

        let config = DiscoveryConfig {
            min_support: 0.5,
            ..DiscoveryConfig::default()
        };
        let rules = RuleMiner::from_config(&config).mine(&sequences, &mut Budget::unlimited());

        assert_eq!(rules.algorithm, RuleAlgorithm::Apriori);
        assert!(rules.intervention_triggers.is_empty());
        assert_eq!(rules.total_rules, 0);
    }

    #[test]
    fn test_manual_fallback() {
        let mut sequences: Vec<Vec<&str>> = Vec::new();
        for _ in 0..12 {
            sequences.push(vec!["retry", "retry", "retry", "retry"]);
        }
        // Fewer than 10 sessions: never scored
        for _ in 0..3 {
            sequences.push(vec!["zoom", "zoom", "zoom", "zoom"]);
        }

        let miner = RuleMiner::with_miner(NoItemsets, &DiscoveryConfig::default());
        let rules = miner.mine(&sequences, &mut Budget::unlimited());

        assert_eq!(rules.algorithm, RuleAlgorithm::Manual);
        assert_eq!(rules.total_rules, 1);
        let rule = &rules.intervention_triggers[0];
        assert_eq!(rule.condition, "retry > 3x");
        assert_eq!(rule.support, 12);
        assert_eq!(rule.confidence, 1.0);
        assert_eq!(rule.lift, None);
    }

    #[test]
    fn test_event_names_never_act_as_outcomes() {
        // Every session succeeds; one event is literally named "dropout"
        let sequences: Vec<Vec<&str>> = (0..10).map(|_| long_session("dropout")).collect();
        let miner = RuleMiner::from_config(&DiscoveryConfig::default());
        assert!(miner.transaction(&sequences[0]).success);

        let rules = miner.mine(&sequences, &mut Budget::unlimited());
        assert_eq!(rules.algorithm, RuleAlgorithm::Apriori);
        assert!(rules.intervention_triggers.is_empty());
    }

    #[test]
    fn test_repeated_suffix_does_not_collide() {
        let miner = RuleMiner::from_config(&DiscoveryConfig::default());
        let t = miner.transaction(&["search_repeated", "search", "search", "search", "search"]);
        assert_eq!(
            t.items,
            vec![
                Item::Event("search_repeated".to_string()),
                Item::Repeated("search".to_string())
            ]
        );
        assert_eq!(t.repeated, vec!["search".to_string()]);
    }

    #[test]
    fn test_rules_are_capped_after_sorting() {
        let mut sequences: Vec<Vec<&str>> = Vec::new();
        for _ in 0..8 {
            sequences.push(vec!["search", "search", "search", "search", "search", "home"]);
        }
        sequences.push(long_session("home"));
        sequences.push(long_session("home"));

        let config = DiscoveryConfig {
            min_support: 0.5,
            max_rules: 2,
            ..DiscoveryConfig::default()
        };
        let rules = RuleMiner::from_config(&config).mine(&sequences, &mut Budget::unlimited());

        assert_eq!(rules.total_rules, 2);
        let conditions: Vec<&str> = rules
            .intervention_triggers
            .iter()
            .map(|r| r.condition.as_str())
            .collect();
        assert_eq!(conditions, vec!["home AND search > 3x", "search > 3x"]);
        for pair in rules.intervention_triggers.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_manual_fallback_on_empty_input() {
        let miner = RuleMiner::from_config(&DiscoveryConfig::default());
        let rules = miner.mine(&[], &mut Budget::unlimited());

        assert_eq!(rules.algorithm, RuleAlgorithm::Manual);
        assert!(rules.intervention_triggers.is_empty());
    }
}

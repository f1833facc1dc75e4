//! Policies, rules, and rule targets.

use crate::{DataCategory, PolicyError, Result};
use lethe_types::ActionType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// The masking strategy an erasure rule applies, by registry name plus
/// strategy-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingSpec {
    /// Registry name of the strategy, e.g. `hash` or `null_rewrite`.
    pub strategy: String,

    /// Strategy-specific options, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub configuration: Map<String, Value>,
}

impl MaskingSpec {
    #[must_use]
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            configuration: Map::new(),
        }
    }

    /// Adds one configuration option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.configuration.insert(key.into(), value);
        self
    }

    /// Looks up a configuration option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }
}

/// One data-category predicate of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Fields tagged with this category, or a descendant of it, match.
    pub data_category: DataCategory,
}

impl Target {
    #[must_use]
    pub fn new(data_category: impl Into<DataCategory>) -> Self {
        Self {
            data_category: data_category.into(),
        }
    }
}

/// One policy rule: an action, the categories it covers, and (for
/// erasure) how matched values are masked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable key identifying the rule in logs and audit entries.
    pub key: String,

    /// Which request action this rule participates in.
    pub action_type: ActionType,

    /// Data-category predicates; a field matches if any target covers
    /// any of its tags.
    #[serde(default)]
    pub targets: Vec<Target>,

    /// Masking strategy, required when `action_type` is erasure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masking_strategy: Option<MaskingSpec>,
}

impl Rule {
    /// Creates an access rule.
    #[must_use]
    pub fn access(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action_type: ActionType::Access,
            targets: Vec::new(),
            masking_strategy: None,
        }
    }

    /// Creates an erasure rule with its masking strategy.
    #[must_use]
    pub fn erasure(key: impl Into<String>, masking_strategy: MaskingSpec) -> Self {
        Self {
            key: key.into(),
            action_type: ActionType::Erasure,
            targets: Vec::new(),
            masking_strategy: Some(masking_strategy),
        }
    }

    /// Adds a data-category target.
    #[must_use]
    pub fn with_target(mut self, data_category: impl Into<DataCategory>) -> Self {
        self.targets.push(Target::new(data_category));
        self
    }

    /// Whether this rule participates in the given action.
    #[must_use]
    pub fn applies_to(&self, action_type: ActionType) -> bool {
        self.action_type == action_type
    }

    /// Whether any target covers any of the given field tags.
    #[must_use]
    pub fn matches_tags<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'a DataCategory>,
        I::IntoIter: Clone,
    {
        let tags = tags.into_iter();
        self.targets
            .iter()
            .any(|target| target.data_category.matches_any(tags.clone()))
    }
}

/// A named group of rules, evaluated in declaration order.
///
/// Declaration order is load-bearing: when two erasure rules resolve to
/// the same field path, the later-declared rule's strategy is the one
/// applied. Callers that need a different precedence must reorder the
/// rules, not rely on the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Stable key identifying the policy.
    pub key: String,

    /// Rules in declaration order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Policy {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule, keeping declaration order.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The rules participating in the given action, in declaration order.
    pub fn rules_for(&self, action_type: ActionType) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(move |rule| rule.applies_to(action_type))
    }

    /// Checks the structural constraints the planner relies on: unique
    /// rule keys, no empty target lists, and a masking strategy on every
    /// erasure rule.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(&rule.key) {
                return Err(PolicyError::DuplicateRule(rule.key.clone()));
            }
            if rule.targets.is_empty() {
                return Err(PolicyError::EmptyTargets(rule.key.clone()));
            }
            if rule.action_type == ActionType::Erasure && rule.masking_strategy.is_none() {
                return Err(PolicyError::MissingMaskingStrategy(rule.key.clone()));
            }
        }
        Ok(())
    }
}

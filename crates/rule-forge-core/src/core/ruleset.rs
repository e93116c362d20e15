// crates/rule-forge-core/src/core/ruleset.rs
// ============================================================================
// Module: Rule Forge Ruleset Documents
// Description: Nested boolean rule trees and their persisted JSON shape.
// Purpose: Define rule nodes with structural validation for adoption gates.
// Dependencies: crate::core::{identifiers, record}, serde, smallvec
// ============================================================================

//! ## Overview
//! A ruleset is a nested boolean tree of groups (`all`/`any`/`none`) over
//! field-level leaf conditions. The JSON shape here is the persisted and
//! oracle-exchanged contract: parsers accept exactly this shape and reject
//! unknown logic or condition values. Trees are replaced wholesale on
//! adoption, never mutated in place, so any prior snapshot remains valid for
//! rollback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

use crate::core::identifiers::FieldPath;
use crate::core::record::FieldValue;

// ============================================================================
// SECTION: Group Logic
// ============================================================================

/// Boolean combinator applied to a group's children.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupLogic {
    /// True iff every child is true (empty children are trivially true).
    All,
    /// True iff at least one child is true (empty children are false).
    Any,
    /// True iff no child is true (empty children are trivially true).
    None,
}

impl GroupLogic {
    /// Returns the stable wire name for the combinator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::None => "none",
        }
    }
}

impl fmt::Display for GroupLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Leaf Conditions
// ============================================================================

/// Comparison kind applied at a leaf.
///
/// # Invariants
/// - Variants are stable for serialization; unknown kinds are rejected at parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Exact value match (case-sensitive for text).
    Equals,
    /// Exact value mismatch.
    NotEquals,
    /// Membership in a non-empty value set.
    In,
    /// Absence from a non-empty value set.
    NotIn,
    /// Strict numeric greater-than.
    GreaterThan,
    /// Strict numeric less-than.
    LessThan,
    /// Inclusive numeric range check.
    Between,
}

impl ConditionKind {
    /// Returns the stable wire name for the condition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Between => "between",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Rule Nodes
// ============================================================================

/// Leaf rule holding one field-level condition.
///
/// # Invariants
/// - Exactly one operand encoding is meaningful per condition: `threshold`
///   for scalar comparisons, `values` for set membership, `low`/`high` for
///   ranges. [`LeafRule::validate`] enforces presence and typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafRule {
    /// Dotted field path the condition reads.
    pub field: FieldPath,
    /// Comparison kind.
    pub condition: ConditionKind,
    /// Scalar operand for equality and ordering comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<FieldValue>,
    /// Value-set operand for membership comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<FieldValue>>,
    /// Lower inclusive bound for range comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Upper inclusive bound for range comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
}

impl LeafRule {
    /// Validates operand presence and typing for the leaf's condition.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRuleError`] naming the offending field when an
    /// operand is missing, empty, non-numeric, or inverted.
    pub fn validate(&self) -> Result<(), MalformedRuleError> {
        match self.condition {
            ConditionKind::Equals | ConditionKind::NotEquals => {
                if self.threshold.is_none() {
                    return Err(MalformedRuleError::MissingOperand {
                        field: self.field.clone(),
                        condition: self.condition,
                    });
                }
            }
            ConditionKind::GreaterThan | ConditionKind::LessThan => {
                let Some(threshold) = &self.threshold else {
                    return Err(MalformedRuleError::MissingOperand {
                        field: self.field.clone(),
                        condition: self.condition,
                    });
                };
                if threshold.as_number().is_none() {
                    return Err(MalformedRuleError::NonNumericOperand {
                        field: self.field.clone(),
                    });
                }
            }
            ConditionKind::In | ConditionKind::NotIn => {
                let Some(values) = &self.values else {
                    return Err(MalformedRuleError::MissingOperand {
                        field: self.field.clone(),
                        condition: self.condition,
                    });
                };
                if values.is_empty() {
                    return Err(MalformedRuleError::EmptyValueSet {
                        field: self.field.clone(),
                    });
                }
            }
            ConditionKind::Between => {
                let (Some(low), Some(high)) = (self.low, self.high) else {
                    return Err(MalformedRuleError::MissingOperand {
                        field: self.field.clone(),
                        condition: self.condition,
                    });
                };
                if low > high {
                    return Err(MalformedRuleError::InvertedBounds {
                        field: self.field.clone(),
                        low,
                        high,
                    });
                }
            }
        }
        Ok(())
    }
}

/// One node in a rule tree: a nested group or a leaf condition.
///
/// # Invariants
/// - The serialized shape is fixed: groups carry `logic` + `rules`, leaves
///   carry `field` + `condition` + operands. Unknown logic and condition
///   values are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    /// Nested boolean group.
    Group {
        /// Combinator applied to the children.
        logic: GroupLogic,
        /// Ordered child nodes.
        rules: SmallVec<[Box<RuleNode>; 4]>,
    },
    /// Field-level leaf condition.
    Leaf(LeafRule),
}

impl RuleNode {
    /// Creates a nested group node.
    #[must_use]
    pub fn group(logic: GroupLogic, rules: Vec<Self>) -> Self {
        Self::Group {
            logic,
            rules: rules.into_iter().map(Box::new).collect(),
        }
    }

    /// Creates an `equals` leaf.
    #[must_use]
    pub fn equals(field: impl Into<FieldPath>, value: impl Into<FieldValue>) -> Self {
        Self::scalar_leaf(field, ConditionKind::Equals, value)
    }

    /// Creates a `not_equals` leaf.
    #[must_use]
    pub fn not_equals(field: impl Into<FieldPath>, value: impl Into<FieldValue>) -> Self {
        Self::scalar_leaf(field, ConditionKind::NotEquals, value)
    }

    /// Creates a `greater_than` leaf.
    #[must_use]
    pub fn greater_than(field: impl Into<FieldPath>, value: f64) -> Self {
        Self::scalar_leaf(field, ConditionKind::GreaterThan, value)
    }

    /// Creates a `less_than` leaf.
    #[must_use]
    pub fn less_than(field: impl Into<FieldPath>, value: f64) -> Self {
        Self::scalar_leaf(field, ConditionKind::LessThan, value)
    }

    /// Creates an `in` membership leaf.
    #[must_use]
    pub fn in_set(field: impl Into<FieldPath>, values: Vec<FieldValue>) -> Self {
        Self::set_leaf(field, ConditionKind::In, values)
    }

    /// Creates a `not_in` membership leaf.
    #[must_use]
    pub fn not_in_set(field: impl Into<FieldPath>, values: Vec<FieldValue>) -> Self {
        Self::set_leaf(field, ConditionKind::NotIn, values)
    }

    /// Creates an inclusive `between` leaf.
    #[must_use]
    pub fn between(field: impl Into<FieldPath>, low: f64, high: f64) -> Self {
        Self::Leaf(LeafRule {
            field: field.into(),
            condition: ConditionKind::Between,
            threshold: None,
            values: None,
            low: Some(low),
            high: Some(high),
        })
    }

    /// Builds a scalar-operand leaf.
    fn scalar_leaf(
        field: impl Into<FieldPath>,
        condition: ConditionKind,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self::Leaf(LeafRule {
            field: field.into(),
            condition,
            threshold: Some(value.into()),
            values: None,
            low: None,
            high: None,
        })
    }

    /// Builds a set-operand leaf.
    fn set_leaf(field: impl Into<FieldPath>, condition: ConditionKind, values: Vec<FieldValue>) -> Self {
        Self::Leaf(LeafRule {
            field: field.into(),
            condition,
            threshold: None,
            values: Some(values),
            low: None,
            high: None,
        })
    }

    /// Validates this node and every descendant.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRuleError`] for the first structural defect found.
    pub fn validate(&self) -> Result<(), MalformedRuleError> {
        match self {
            Self::Group {
                rules, ..
            } => {
                for rule in rules {
                    rule.validate()?;
                }
                Ok(())
            }
            Self::Leaf(leaf) => leaf.validate(),
        }
    }

    /// Returns the number of nodes in this subtree.
    #[must_use]
    pub fn complexity(&self) -> usize {
        match self {
            Self::Group {
                rules, ..
            } => 1 + rules.iter().map(|rule| rule.complexity()).sum::<usize>(),
            Self::Leaf(_) => 1,
        }
    }
}

// ============================================================================
// SECTION: Ruleset Documents
// ============================================================================

/// Root rule document: a group combinator over an ordered rule list.
///
/// # Invariants
/// - The root is always a group; leaves appear only inside `rules`.
/// - Documents are replaced wholesale on adoption, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesetDocument {
    /// Combinator applied to the top-level rules.
    pub logic: GroupLogic,
    /// Ordered top-level rule nodes.
    pub rules: Vec<RuleNode>,
}

impl RulesetDocument {
    /// Creates a document from a root combinator and rule list.
    #[must_use]
    pub const fn new(logic: GroupLogic, rules: Vec<RuleNode>) -> Self {
        Self {
            logic,
            rules,
        }
    }

    /// Returns the seed posture: an empty `any` group that declines everything.
    #[must_use]
    pub const fn always_decline() -> Self {
        Self {
            logic: GroupLogic::Any,
            rules: Vec::new(),
        }
    }

    /// Validates every rule in the document.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRuleError`] for the first structural defect found.
    pub fn validate(&self) -> Result<(), MalformedRuleError> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// Returns the total node count across the document.
    #[must_use]
    pub fn complexity(&self) -> usize {
        self.rules.iter().map(RuleNode::complexity).sum()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural defects that disqualify a rule tree from adoption.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRuleError {
    /// A leaf is missing the operand its condition requires.
    #[error("rule on `{field}` is missing the operand required by `{condition}`")]
    MissingOperand {
        /// Field path of the offending leaf.
        field: FieldPath,
        /// Condition lacking its operand.
        condition: ConditionKind,
    },
    /// A membership leaf carries an empty value set.
    #[error("rule on `{field}` has an empty value set")]
    EmptyValueSet {
        /// Field path of the offending leaf.
        field: FieldPath,
    },
    /// An ordering comparison carries a non-numeric operand.
    #[error("rule on `{field}` requires a numeric operand")]
    NonNumericOperand {
        /// Field path of the offending leaf.
        field: FieldPath,
    },
    /// A range leaf has inverted bounds.
    #[error("rule on `{field}` has inverted bounds ({low} > {high})")]
    InvertedBounds {
        /// Field path of the offending leaf.
        field: FieldPath,
        /// Lower bound as supplied.
        low: f64,
        /// Upper bound as supplied.
        high: f64,
    },
}

//! Declarative conditions gating event eligibility.
//!
//! Conditions are plain data (`field`, `op`, `value`) so catalogs can be
//! authored and stored outside the engine. This module is the only place
//! that interprets them.

use serde::{Deserialize, Serialize};

use crate::state::{RunState, StateField};

/// Comparison operator. Wire form is the symbol itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparison {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Greater => lhs > rhs,
            Comparison::Less => lhs < rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
        }
    }
}

/// `field op value`, e.g. `stress >= 40`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: StateField,
    pub op: Comparison,
    pub value: f64,
}

impl Condition {
    pub fn new(field: StateField, op: Comparison, value: f64) -> Self {
        Self { field, op, value }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.symbol(), self.value)
    }
}

pub fn evaluate(state: &RunState, condition: &Condition) -> bool {
    condition.op.apply(state.get(condition.field), condition.value)
}

/// AND over all conditions. An empty list holds vacuously.
pub fn evaluate_all(state: &RunState, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| evaluate(state, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_stress(stress: f64) -> RunState {
        RunState {
            stress,
            ..RunState::default()
        }
    }

    #[test]
    fn test_operators_match_arithmetic() {
        let values = [0.0, 39.5, 40.0, 40.5, 100.0];
        let threshold = 40.0;
        for &v in &values {
            let s = state_with_stress(v);
            let check = |op| evaluate(&s, &Condition::new(StateField::Stress, op, threshold));
            assert_eq!(check(Comparison::Greater), v > threshold);
            assert_eq!(check(Comparison::Less), v < threshold);
            assert_eq!(check(Comparison::GreaterOrEqual), v >= threshold);
            assert_eq!(check(Comparison::LessOrEqual), v <= threshold);
            assert_eq!(check(Comparison::Equal), v == threshold);
            assert_eq!(check(Comparison::NotEqual), v != threshold);
        }
    }

    #[test]
    fn test_evaluate_reads_named_field() {
        let s = RunState {
            privilege: 5.0,
            security: 90.0,
            ..RunState::default()
        };
        assert!(evaluate(
            &s,
            &Condition::new(StateField::Privilege, Comparison::Less, 10.0)
        ));
        assert!(!evaluate(
            &s,
            &Condition::new(StateField::Security, Comparison::Less, 10.0)
        ));
    }

    #[test]
    fn test_evaluate_all_empty_is_true() {
        assert!(evaluate_all(&RunState::default(), &[]));
    }

    #[test]
    fn test_evaluate_all_requires_every_condition() {
        let s = state_with_stress(50.0);
        let both = [
            Condition::new(StateField::Stress, Comparison::GreaterOrEqual, 40.0),
            Condition::new(StateField::Stress, Comparison::Less, 60.0),
        ];
        assert!(evaluate_all(&s, &both));

        let one_fails = [
            Condition::new(StateField::Stress, Comparison::GreaterOrEqual, 40.0),
            Condition::new(StateField::Stress, Comparison::Greater, 60.0),
        ];
        assert!(!evaluate_all(&s, &one_fails));
    }

    #[test]
    fn test_condition_wire_format() {
        let c: Condition =
            serde_json::from_str(r#"{ "field": "privilege", "op": ">=", "value": 25 }"#).unwrap();
        assert_eq!(
            c,
            Condition::new(StateField::Privilege, Comparison::GreaterOrEqual, 25.0)
        );
        assert_eq!(c.to_string(), "privilege >= 25");

        let bad = serde_json::from_str::<Condition>(r#"{ "field": "stress", "op": "=>", "value": 1 }"#);
        assert!(bad.is_err());
    }
}

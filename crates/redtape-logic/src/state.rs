//! Run state: the numeric world a run mutates.
//!
//! Every field is an `f64`. Each field belongs to one of three domains:
//!
//! | Field | Domain |
//! |-------|--------|
//! | `stress`, `bureaucracy`, `security` | [0, 100] |
//! | `time_remaining`, `privilege`, `influence` | [0, ∞) |
//! | `score` | unbounded |
//!
//! Effects are applied unclamped, then [`clamp`] restores the domains.
//! Out-of-range deltas are never rejected.

use serde::{Deserialize, Serialize};

/// Upper bound of the two-sided fields.
pub const TWO_SIDED_MAX: f64 = 100.0;

/// Named numeric field of [`RunState`].
///
/// Serialized in snake_case; this enum is the closed set of names a catalog
/// may reference, so unknown names fail at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    TimeRemaining,
    Stress,
    Privilege,
    Bureaucracy,
    Security,
    Influence,
    Score,
}

/// Domain a field is clamped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDomain {
    /// Closed interval `[min, max]`.
    Bounded { min: f64, max: f64 },
    /// Bounded below only.
    AtLeast(f64),
    /// Passed through unchanged.
    Unbounded,
}

impl FieldDomain {
    pub fn clamp(self, value: f64) -> f64 {
        match self {
            FieldDomain::Bounded { min, max } => value.clamp(min, max),
            FieldDomain::AtLeast(min) => value.max(min),
            FieldDomain::Unbounded => value,
        }
    }

    pub fn contains(self, value: f64) -> bool {
        match self {
            FieldDomain::Bounded { min, max } => (min..=max).contains(&value),
            FieldDomain::AtLeast(min) => value >= min,
            FieldDomain::Unbounded => true,
        }
    }
}

impl StateField {
    pub const ALL: [StateField; 7] = [
        StateField::TimeRemaining,
        StateField::Stress,
        StateField::Privilege,
        StateField::Bureaucracy,
        StateField::Security,
        StateField::Influence,
        StateField::Score,
    ];

    pub fn domain(self) -> FieldDomain {
        match self {
            StateField::Stress | StateField::Bureaucracy | StateField::Security => {
                FieldDomain::Bounded {
                    min: 0.0,
                    max: TWO_SIDED_MAX,
                }
            }
            StateField::TimeRemaining | StateField::Privilege | StateField::Influence => {
                FieldDomain::AtLeast(0.0)
            }
            StateField::Score => FieldDomain::Unbounded,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StateField::TimeRemaining => "time_remaining",
            StateField::Stress => "stress",
            StateField::Privilege => "privilege",
            StateField::Bureaucracy => "bureaucracy",
            StateField::Security => "security",
            StateField::Influence => "influence",
            StateField::Score => "score",
        }
    }
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single signed delta applied to one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub field: StateField,
    pub delta: f64,
}

impl Effect {
    pub fn new(field: StateField, delta: f64) -> Self {
        Self { field, delta }
    }
}

/// The numeric state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Ticks left before the run is lost.
    pub time_remaining: f64,
    /// Reaching 100 loses the run.
    pub stress: f64,
    /// Dropping to 0 loses the run.
    pub privilege: f64,
    pub bureaucracy: f64,
    pub security: f64,
    pub influence: f64,
    pub score: f64,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            time_remaining: 180.0,
            stress: 20.0,
            privilege: 10.0,
            bureaucracy: 50.0,
            security: 50.0,
            influence: 10.0,
            score: 0.0,
        }
    }
}

impl RunState {
    /// Default state with the given fields overridden.
    pub fn initialize(overrides: &[(StateField, f64)]) -> Self {
        Self::from_defaults(Self::default(), overrides)
    }

    /// `defaults` with the given fields overridden. Later overrides win.
    pub fn from_defaults(defaults: RunState, overrides: &[(StateField, f64)]) -> Self {
        let mut state = defaults;
        for &(field, value) in overrides {
            state.set(field, value);
        }
        state
    }

    pub fn get(&self, field: StateField) -> f64 {
        match field {
            StateField::TimeRemaining => self.time_remaining,
            StateField::Stress => self.stress,
            StateField::Privilege => self.privilege,
            StateField::Bureaucracy => self.bureaucracy,
            StateField::Security => self.security,
            StateField::Influence => self.influence,
            StateField::Score => self.score,
        }
    }

    pub fn set(&mut self, field: StateField, value: f64) {
        let slot = match field {
            StateField::TimeRemaining => &mut self.time_remaining,
            StateField::Stress => &mut self.stress,
            StateField::Privilege => &mut self.privilege,
            StateField::Bureaucracy => &mut self.bureaucracy,
            StateField::Security => &mut self.security,
            StateField::Influence => &mut self.influence,
            StateField::Score => &mut self.score,
        };
        *slot = value;
    }

    /// Whether every field lies within its domain.
    pub fn is_within_domains(&self) -> bool {
        StateField::ALL
            .iter()
            .all(|&field| field.domain().contains(self.get(field)))
    }
}

/// Add each effect's delta to its field. The result is not clamped.
pub fn apply_effects(state: &RunState, effects: &[Effect]) -> RunState {
    let mut next = *state;
    for effect in effects {
        next.set(effect.field, next.get(effect.field) + effect.delta);
    }
    next
}

/// Constrain every bounded field to its domain.
pub fn clamp(state: &RunState) -> RunState {
    let mut next = *state;
    for field in StateField::ALL {
        next.set(field, field.domain().clamp(state.get(field)));
    }
    next
}

/// Why a run was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    TimeExhausted,
    StressExhausted,
    PrivilegeExhausted,
    /// Acted on an authored terminal "lose" event.
    CriticalEvent,
}

impl LossReason {
    pub fn describe(self) -> &'static str {
        match self {
            LossReason::TimeExhausted => "ran out of time",
            LossReason::StressExhausted => "burned out",
            LossReason::PrivilegeExhausted => "lost all privileges",
            LossReason::CriticalEvent => "hit a critical incident",
        }
    }
}

/// Stat-exhaustion check. Ties resolve time, then stress, then privilege.
pub fn check_lose_condition(state: &RunState) -> Option<LossReason> {
    if state.time_remaining <= 0.0 {
        Some(LossReason::TimeExhausted)
    } else if state.stress >= TWO_SIDED_MAX {
        Some(LossReason::StressExhausted)
    } else if state.privilege <= 0.0 {
        Some(LossReason::PrivilegeExhausted)
    } else {
        None
    }
}

//! Run configuration: starting state, randomized starting ranges, tick decay.
//!
//! Every field has a default, so a JSON override only needs the keys it
//! changes:
//!
//! ```
//! use redtape_logic::config::RunConfig;
//!
//! let config = RunConfig::from_json(r#"{ "tick_decay": 2.0 }"#).unwrap();
//! assert_eq!(config.tick_decay, 2.0);
//! assert_eq!(config.journal_limit, RunConfig::default().journal_limit);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::{RunState, StateField};

/// Uniform range `[min, max)` a starting field is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartingRange {
    pub field: StateField,
    pub min: f64,
    pub max: f64,
}

impl StartingRange {
    pub fn new(field: StateField, min: f64, max: f64) -> Self {
        Self { field, min, max }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        sample_uniform(self.min, self.max, rng)
    }
}

/// Uniform draw from `[min, max)`.
fn sample_uniform(min: f64, max: f64, rng: &mut impl Rng) -> f64 {
    min + rng.gen::<f64>() * (max - min)
}

/// Range environment modifiers are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ModifierRange {
    fn default() -> Self {
        Self { min: 0.8, max: 1.2 }
    }
}

impl ModifierRange {
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        sample_uniform(self.min, self.max, rng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// State before randomized starting values are applied.
    pub defaults: RunState,
    /// Fields re-rolled at every run start.
    pub starting_ranges: Vec<StartingRange>,
    /// Subtracted from `time_remaining` on each tick.
    pub tick_decay: f64,
    /// Real-time interval the host should tick at.
    pub tick_interval_ms: u64,
    pub modifier_range: ModifierRange,
    /// Oldest journal entries are dropped past this length.
    pub journal_limit: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            defaults: RunState::default(),
            starting_ranges: vec![
                StartingRange::new(StateField::Stress, 10.0, 30.0),
                StartingRange::new(StateField::Privilege, 5.0, 15.0),
                StartingRange::new(StateField::Bureaucracy, 40.0, 60.0),
                StartingRange::new(StateField::Security, 40.0, 60.0),
            ],
            tick_decay: 1.0,
            tick_interval_ms: 1000,
            modifier_range: ModifierRange::default(),
            journal_limit: 200,
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Draw one value per starting range, in declaration order.
    pub fn roll_starting_overrides(&self, rng: &mut impl Rng) -> Vec<(StateField, f64)> {
        self.starting_ranges
            .iter()
            .map(|range| (range.field, range.sample(rng)))
            .collect()
    }

    /// A fresh run state with randomized starting values.
    pub fn initial_state(&self, rng: &mut impl Rng) -> RunState {
        let overrides = self.roll_starting_overrides(rng);
        RunState::from_defaults(self.defaults, &overrides)
    }
}

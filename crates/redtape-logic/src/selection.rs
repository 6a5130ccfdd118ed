//! Event selection: eligibility filtering and weighted sampling.
//!
//! Picking the next event runs three steps:
//! 1. keep events whose conditions hold and which are off cooldown,
//! 2. weight each as `base_weight * state modifier * environment modifier`,
//! 3. draw one by linear-scan weighted sampling.
//!
//! An empty result is a normal outcome (every event gated or cooling down),
//! and the run controller retries on the next tick.
//!
//! Sampling is O(n) per pick, which is fine for catalogs up to roughly a
//! thousand events. A prefix-sum + binary search or alias table would give
//! the same distribution in O(log n) / O(1).

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::EventDefinition;
use crate::condition::evaluate_all;
use crate::config::ModifierRange;
use crate::cooldown::CooldownTable;
use crate::state::RunState;

/// Weight multiplier derived from run state. Fixed until events declare
/// state-dependent weighting.
const STATE_MODIFIER: f64 = 1.0;

/// Per-event multiplier drawn once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentModifiers {
    modifiers: HashMap<String, f64>,
}

impl EnvironmentModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modifier for `event_id`; 1.0 for events not in the table.
    pub fn get(&self, event_id: &str) -> f64 {
        self.modifiers.get(event_id).copied().unwrap_or(1.0)
    }

    pub fn insert(&mut self, event_id: &str, modifier: f64) {
        self.modifiers.insert(event_id.to_string(), modifier);
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

/// Draw one modifier per catalog event, uniformly from `range`.
pub fn generate_environment_modifiers(
    catalog: &[EventDefinition],
    range: ModifierRange,
    rng: &mut impl Rng,
) -> EnvironmentModifiers {
    let mut env = EnvironmentModifiers::new();
    for event in catalog {
        env.insert(&event.id, range.sample(rng));
    }
    env
}

/// Events whose conditions all hold and which are not cooling down.
pub fn eligible_events<'a>(
    catalog: &'a [EventDefinition],
    state: &RunState,
    cooldowns: &CooldownTable,
    now: u64,
) -> Vec<&'a EventDefinition> {
    catalog
        .iter()
        .filter(|e| evaluate_all(state, &e.conditions))
        .filter(|e| !cooldowns.event_on_cooldown(&e.id, now))
        .collect()
}

pub fn compute_weight(event: &EventDefinition, env: &EnvironmentModifiers) -> f64 {
    event.base_weight * STATE_MODIFIER * env.get(&event.id)
}

/// Negative and non-finite weights carry no probability mass.
fn sampling_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Index drawn proportionally to `weights`. `None` when there is no
/// positive weight to draw from.
pub fn weighted_index(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    let total: f64 = weights.iter().map(|&w| sampling_weight(w)).sum();
    if total <= 0.0 {
        return None;
    }

    let mut roll = rng.gen::<f64>() * total;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        let w = sampling_weight(w);
        if w <= 0.0 {
            continue;
        }
        roll -= w;
        last_positive = Some(i);
        if roll <= 0.0 {
            return Some(i);
        }
    }
    // Rounding in the running subtraction can leave a sliver of roll.
    last_positive
}

/// Pick one item proportionally to its weight. Items beyond the length of
/// `weights` are never picked.
pub fn weighted_pick<'a, T>(items: &'a [T], weights: &[f64], rng: &mut impl Rng) -> Option<&'a T> {
    let len = items.len().min(weights.len());
    weighted_index(&weights[..len], rng).map(|i| &items[i])
}

/// Filter → weight → pick.
pub fn select_next<'a>(
    catalog: &'a [EventDefinition],
    state: &RunState,
    cooldowns: &CooldownTable,
    env: &EnvironmentModifiers,
    now: u64,
    rng: &mut impl Rng,
) -> Option<&'a EventDefinition> {
    let eligible = eligible_events(catalog, state, cooldowns, now);
    let weights: Vec<f64> = eligible.iter().map(|e| compute_weight(e, env)).collect();
    let picked = weighted_pick(&eligible, &weights, rng).copied();

    match picked {
        Some(event) => log::debug!(
            "Selected event '{}' from {} eligible",
            event.id,
            eligible.len()
        ),
        None => log::debug!("No eligible event at t={}ms", now),
    }
    picked
}

//! Action application and run outcome.
//!
//! Applying an action and deciding whether the run is over are separate
//! calls: [`apply_action`] only produces the next state and cooldowns,
//! [`check_run_outcome`] inspects the result.

use serde::{Deserialize, Serialize};

use crate::catalog::{ActionDefinition, EventDefinition, TerminalOutcome};
use crate::cooldown::CooldownTable;
use crate::state::{
    apply_effects, check_lose_condition, clamp, Effect, LossReason, RunState, StateField,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "reason")]
pub enum RunOutcome {
    Win,
    Loss(LossReason),
}

impl RunOutcome {
    pub fn is_win(self) -> bool {
        matches!(self, RunOutcome::Win)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Win => write!(f, "won"),
            RunOutcome::Loss(reason) => write!(f, "lost: {}", reason.describe()),
        }
    }
}

/// Declared effects plus the implicit score effect when `score_impact`
/// is non-zero.
pub fn effective_effects(action: &ActionDefinition) -> Vec<Effect> {
    let mut effects = action.effects.clone();
    if action.score_impact != 0.0 {
        effects.push(Effect::new(StateField::Score, action.score_impact));
    }
    effects
}

/// Apply `action` taken in event `event_id`: mutate and clamp state, then
/// start the action's cooldown followed by the event's, both at `now`.
pub fn apply_action(
    state: &RunState,
    cooldowns: CooldownTable,
    action: &ActionDefinition,
    event_id: &str,
    event_cooldown_secs: u64,
    now: u64,
) -> (RunState, CooldownTable) {
    let next_state = clamp(&apply_effects(state, &effective_effects(action)));
    let next_cooldowns = cooldowns
        .start_action(&action.id, action.cooldown_secs, now)
        .start_event(event_id, event_cooldown_secs, now);
    (next_state, next_cooldowns)
}

/// Stat exhaustion first, then the terminal tag of `selected_event`.
pub fn check_run_outcome(
    state: &RunState,
    selected_event: Option<&EventDefinition>,
) -> Option<RunOutcome> {
    if let Some(reason) = check_lose_condition(state) {
        return Some(RunOutcome::Loss(reason));
    }
    match selected_event.and_then(EventDefinition::terminal_outcome) {
        Some(TerminalOutcome::Win) => Some(RunOutcome::Win),
        Some(TerminalOutcome::Lose) => Some(RunOutcome::Loss(LossReason::CriticalEvent)),
        None => None,
    }
}

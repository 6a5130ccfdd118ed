//! Run controller owning one run's lifecycle.
//!
//! ```text
//! Idle ──start──▶ Playing ──outcome──▶ Over
//!                  │  ▲                  │
//!                  └──┘ action / tick    └──start──▶ Playing
//! ```
//!
//! Starts, actions, and ticks all go through [`RunController::handle`].
//! Every transition takes `&mut self`, so a tick and an action can never
//! interleave mid-mutation. The controller never reads a clock: callers
//! pass `now` in milliseconds with every input.
//!
//! A tick with no event on screen retries selection. Without that retry a
//! run whose eligible events are all cooling down at once would stall
//! forever even after the cooldowns lapse.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{fetch_or_fallback, CatalogProvider, EventDefinition};
use crate::config::RunConfig;
use crate::cooldown::CooldownTable;
use crate::outcome::{apply_action, check_run_outcome, RunOutcome};
use crate::selection::{generate_environment_modifiers, select_next, EnvironmentModifiers};
use crate::state::{apply_effects, clamp, Effect, RunState, StateField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Playing,
    Over,
}

/// External input to the run state machine.
pub enum RunInput<'a> {
    /// Begin a new run with events from `provider`.
    Start(&'a dyn CatalogProvider),
    /// The player chose `action_id` in the event `event_id`.
    Action { action_id: &'a str, event_id: &'a str },
    /// Periodic time decay.
    Tick,
}

impl std::fmt::Debug for RunInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunInput::Start(_) => f.write_str("Start(..)"),
            RunInput::Action { action_id, event_id } => f
                .debug_struct("Action")
                .field("action_id", action_id)
                .field("event_id", event_id)
                .finish(),
            RunInput::Tick => f.write_str("Tick"),
        }
    }
}

/// Everything the UI needs to render the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub state: RunState,
    pub cooldowns: CooldownTable,
    pub current_event: Option<EventDefinition>,
    pub outcome: Option<RunOutcome>,
    pub journal: Vec<String>,
}

pub struct RunController<R: Rng> {
    config: RunConfig,
    rng: R,
    phase: RunPhase,
    catalog: Arc<[EventDefinition]>,
    state: RunState,
    cooldowns: CooldownTable,
    env: EnvironmentModifiers,
    /// Index into `catalog` of the event on screen.
    current: Option<usize>,
    outcome: Option<RunOutcome>,
    journal: VecDeque<String>,
}

impl<R: Rng> RunController<R> {
    pub fn new(config: RunConfig, rng: R) -> Self {
        let state = config.defaults;
        Self {
            config,
            rng,
            phase: RunPhase::Idle,
            catalog: Arc::from(Vec::<EventDefinition>::new()),
            state,
            cooldowns: CooldownTable::new(),
            env: EnvironmentModifiers::new(),
            current: None,
            outcome: None,
            journal: VecDeque::new(),
        }
    }

    /// Single transition function for every input.
    pub fn handle(&mut self, input: RunInput<'_>, now: u64) -> RunSnapshot {
        match input {
            RunInput::Start(provider) => self.begin(provider, now),
            RunInput::Action {
                action_id,
                event_id,
            } => self.act(action_id, event_id, now),
            RunInput::Tick => self.advance(now),
        }
        self.snapshot()
    }

    pub fn start_run(&mut self, provider: &dyn CatalogProvider, now: u64) -> RunSnapshot {
        self.handle(RunInput::Start(provider), now)
    }

    pub fn submit_action(&mut self, action_id: &str, event_id: &str, now: u64) -> RunSnapshot {
        self.handle(
            RunInput::Action {
                action_id,
                event_id,
            },
            now,
        )
    }

    pub fn tick(&mut self, now: u64) -> RunSnapshot {
        self.handle(RunInput::Tick, now)
    }

    /// Seconds left on `id`'s cooldown: the larger of its action and event
    /// entries.
    pub fn remaining(&self, id: &str, now: u64) -> f64 {
        self.cooldowns
            .actions
            .remaining_seconds(id, now)
            .max(self.cooldowns.events.remaining_seconds(id, now))
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            phase: self.phase,
            state: self.state,
            cooldowns: self.cooldowns.clone(),
            current_event: self.current_event().cloned(),
            outcome: self.outcome,
            journal: self.journal.iter().cloned().collect(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn cooldowns(&self) -> &CooldownTable {
        &self.cooldowns
    }

    pub fn environment(&self) -> &EnvironmentModifiers {
        &self.env
    }

    pub fn catalog(&self) -> &[EventDefinition] {
        &self.catalog
    }

    pub fn current_event(&self) -> Option<&EventDefinition> {
        self.current.and_then(|i| self.catalog.get(i))
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn begin(&mut self, provider: &dyn CatalogProvider, now: u64) {
        self.catalog = Arc::from(fetch_or_fallback(provider));
        self.state = self.config.initial_state(&mut self.rng);
        self.env =
            generate_environment_modifiers(&self.catalog, self.config.modifier_range, &mut self.rng);
        self.cooldowns = CooldownTable::new();
        self.current = None;
        self.outcome = None;
        self.phase = RunPhase::Playing;

        log::info!("Run started with {} events", self.catalog.len());
        self.record(format!("Run started with {} events", self.catalog.len()));
        self.select(now);
    }

    fn act(&mut self, action_id: &str, event_id: &str, now: u64) {
        if self.phase != RunPhase::Playing {
            log::debug!(
                "Ignoring action '{}' while {:?}",
                action_id,
                self.phase
            );
            return;
        }

        let catalog = Arc::clone(&self.catalog);
        let Some(event) = self.current.and_then(|i| catalog.get(i)) else {
            log::warn!("Ignoring action '{}': no event on screen", action_id);
            return;
        };
        if event.id != event_id {
            log::warn!(
                "Ignoring action '{}' for stale event '{}' (current '{}')",
                action_id,
                event_id,
                event.id
            );
            return;
        }
        let Some(action) = event.action(action_id) else {
            log::warn!("Event '{}' has no action '{}'", event.id, action_id);
            return;
        };
        if self.cooldowns.action_on_cooldown(&action.id, now) {
            log::debug!(
                "Ignoring action '{}': {:.1}s cooldown left",
                action.id,
                self.cooldowns.actions.remaining_seconds(&action.id, now)
            );
            return;
        }

        let (state, cooldowns) = apply_action(
            &self.state,
            std::mem::take(&mut self.cooldowns),
            action,
            &event.id,
            event.cooldown_secs,
            now,
        );
        self.state = state;
        self.cooldowns = cooldowns;
        log::debug!("Applied action '{}' in event '{}'", action.id, event.id);
        self.record(format!("{} → {}", event.text, action.label));

        match check_run_outcome(&self.state, Some(event)) {
            Some(outcome) => self.finish(outcome),
            None => self.select(now),
        }
    }

    fn advance(&mut self, now: u64) {
        if self.phase != RunPhase::Playing {
            return;
        }

        let decay = Effect::new(StateField::TimeRemaining, -self.config.tick_decay);
        self.state = clamp(&apply_effects(&self.state, &[decay]));

        if let Some(outcome) = check_run_outcome(&self.state, None) {
            self.finish(outcome);
        } else if self.current.is_none() {
            self.select(now);
        }
    }

    fn select(&mut self, now: u64) {
        let catalog = Arc::clone(&self.catalog);
        let picked = select_next(
            &catalog,
            &self.state,
            &self.cooldowns,
            &self.env,
            now,
            &mut self.rng,
        );
        self.current = picked.and_then(|p| catalog.iter().position(|e| e.id == p.id));
    }

    fn finish(&mut self, outcome: RunOutcome) {
        self.phase = RunPhase::Over;
        self.outcome = Some(outcome);
        self.current = None;
        log::info!("Run over: {} (score {:.0})", outcome, self.state.score);
        self.record(format!("Run {} with score {:.0}", outcome, self.state.score));
    }

    fn record(&mut self, entry: String) {
        self.journal.push_back(entry);
        while self.journal.len() > self.config.journal_limit {
            self.journal.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionDefinition, StaticCatalog, TerminalOutcome};
    use crate::condition::Comparison;
    use crate::state::LossReason;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zero_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    fn single_event_catalog() -> StaticCatalog {
        StaticCatalog(vec![EventDefinition::new("memo", 1.0, 10).with_action(
            ActionDefinition::new("read", 5, 1.0).with_effect(StateField::Stress, 5.0),
        )])
    }

    #[test]
    fn test_new_controller_is_idle() {
        let run = RunController::new(RunConfig::default(), zero_rng());
        let snap = run.snapshot();
        assert_eq!(snap.phase, RunPhase::Idle);
        assert!(snap.current_event.is_none());
        assert!(snap.outcome.is_none());
    }

    #[test]
    fn test_start_selects_event() {
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let snap = run.start_run(&single_event_catalog(), 0);
        assert_eq!(snap.phase, RunPhase::Playing);
        assert_eq!(snap.current_event.map(|e| e.id), Some("memo".to_string()));
        assert_eq!(run.environment().len(), 1);
        assert_eq!(snap.journal.len(), 1);
    }

    #[test]
    fn test_action_ignored_when_idle() {
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let before = run.snapshot();
        let after = run.submit_action("read", "memo", 0);
        assert_eq!(before, after);
    }

    #[test]
    fn test_tick_ignored_when_idle() {
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let snap = run.tick(1_000);
        assert_eq!(snap.phase, RunPhase::Idle);
        assert_eq!(snap.state, RunConfig::default().defaults);
    }

    #[test]
    fn test_action_for_wrong_event_ignored() {
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let before = run.start_run(&single_event_catalog(), 0);
        let after = run.submit_action("read", "some_other_event", 100);
        assert_eq!(before, after);
        let after = run.submit_action("unknown_action", "memo", 100);
        assert_eq!(before, after);
    }

    #[test]
    fn test_action_applies_and_reselects_none_while_cooling_down() {
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let start = run.start_run(&single_event_catalog(), 0);
        let snap = run.submit_action("read", "memo", 1_000);

        assert_eq!(snap.phase, RunPhase::Playing);
        assert_eq!(snap.state.stress, start.state.stress + 5.0);
        assert_eq!(snap.state.score, 1.0);
        // The only event is cooling down, nothing to show
        assert!(snap.current_event.is_none());
        assert!((run.remaining("memo", 1_000) - 10.0).abs() < 1e-9);
        assert!((run.remaining("read", 1_000) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_takes_longer_of_shared_id() {
        // Action shares its id with the event, and outlasts it
        let catalog = StaticCatalog(vec![EventDefinition::new("memo", 1.0, 10)
            .with_action(ActionDefinition::new("memo", 30, 0.0))]);
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        run.start_run(&catalog, 0);
        run.submit_action("memo", "memo", 0);
        assert!((run.remaining("memo", 5_000) - 25.0).abs() < 1e-9);
        assert!((run.cooldowns().events.remaining_seconds("memo", 5_000) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_input_debug_format() {
        let provider = single_event_catalog();
        assert_eq!(format!("{:?}", RunInput::Tick), "Tick");
        assert_eq!(format!("{:?}", RunInput::Start(&provider)), "Start(..)");
        let action = RunInput::Action {
            action_id: "read",
            event_id: "memo",
        };
        assert_eq!(
            format!("{:?}", action),
            r#"Action { action_id: "read", event_id: "memo" }"#
        );
    }

    #[test]
    fn test_tick_retries_selection_after_cooldown() {
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        run.start_run(&single_event_catalog(), 0);
        run.submit_action("read", "memo", 0);

        let snap = run.tick(5_000);
        assert!(snap.current_event.is_none());
        let snap = run.tick(10_000);
        assert_eq!(snap.current_event.map(|e| e.id), Some("memo".to_string()));
    }

    #[test]
    fn test_time_runs_out() {
        let config = RunConfig {
            defaults: RunState {
                time_remaining: 3.0,
                ..RunState::default()
            },
            ..RunConfig::default()
        };
        let mut run = RunController::new(config, zero_rng());
        run.start_run(&single_event_catalog(), 0);
        run.tick(1_000);
        run.tick(2_000);
        let snap = run.tick(3_000);
        assert_eq!(snap.phase, RunPhase::Over);
        assert_eq!(snap.outcome, Some(RunOutcome::Loss(LossReason::TimeExhausted)));
        assert!(snap.current_event.is_none());

        // Over is terminal: further ticks and actions change nothing
        assert_eq!(run.tick(4_000), snap);
        assert_eq!(run.submit_action("read", "memo", 4_000), snap);
    }

    #[test]
    fn test_terminal_win() {
        let catalog = StaticCatalog(vec![EventDefinition::new("promotion", 1.0, 0)
            .with_action(ActionDefinition::new("accept", 0, 100.0))
            .with_terminal(TerminalOutcome::Win)]);
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        run.start_run(&catalog, 0);
        let snap = run.submit_action("accept", "promotion", 500);
        assert_eq!(snap.phase, RunPhase::Over);
        assert_eq!(snap.outcome, Some(RunOutcome::Win));
        assert_eq!(snap.state.score, 100.0);
    }

    #[test]
    fn test_terminal_event_selected_but_not_acted_on_keeps_playing() {
        let catalog = StaticCatalog(vec![EventDefinition::new("breach", 1.0, 0)
            .with_action(ActionDefinition::new("answer", 0, 0.0))
            .with_terminal(TerminalOutcome::Lose)]);
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let snap = run.start_run(&catalog, 0);
        assert_eq!(snap.current_event.map(|e| e.id), Some("breach".to_string()));
        let snap = run.tick(1_000);
        assert_eq!(snap.phase, RunPhase::Playing);
        let snap = run.submit_action("answer", "breach", 2_000);
        assert_eq!(snap.outcome, Some(RunOutcome::Loss(LossReason::CriticalEvent)));
    }

    #[test]
    fn test_restart_after_over_resets_run() {
        let catalog = StaticCatalog(vec![EventDefinition::new("promotion", 1.0, 0)
            .with_action(ActionDefinition::new("accept", 0, 50.0))
            .with_terminal(TerminalOutcome::Win)]);
        let mut run = RunController::new(RunConfig::default(), StdRng::seed_from_u64(3));
        run.start_run(&catalog, 0);
        run.submit_action("accept", "promotion", 0);
        assert_eq!(run.phase(), RunPhase::Over);

        let snap = run.start_run(&catalog, 10_000);
        assert_eq!(snap.phase, RunPhase::Playing);
        assert_eq!(snap.outcome, None);
        assert_eq!(snap.state.score, 0.0);
        assert!(snap.cooldowns.actions.is_empty());
        // Journal survives across runs
        assert_eq!(snap.journal.len(), 4);
    }

    #[test]
    fn test_action_on_cooldown_ignored() {
        let catalog = StaticCatalog(vec![EventDefinition::new("memo", 1.0, 0)
            .with_action(ActionDefinition::new("read", 30, 1.0))
            .with_action(ActionDefinition::new("skim", 0, 0.0))]);
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        run.start_run(&catalog, 0);
        let snap = run.submit_action("read", "memo", 0);
        // Zero event cooldown: the same event is presented again
        assert_eq!(snap.current_event.as_ref().map(|e| e.id.as_str()), Some("memo"));
        let again = run.submit_action("read", "memo", 1_000);
        assert_eq!(again.state.score, 1.0);
        let skimmed = run.submit_action("skim", "memo", 1_000);
        assert_eq!(skimmed.journal.len(), 3);
    }

    #[test]
    fn test_failed_provider_uses_bundled_catalog() {
        let mut run = RunController::new(RunConfig::default(), StdRng::seed_from_u64(1));
        let snap = run.start_run(&crate::catalog::JsonCatalog::new("not json"), 0);
        assert_eq!(snap.phase, RunPhase::Playing);
        assert!(!run.catalog().is_empty());
    }

    #[test]
    fn test_catalog_with_actionless_event_uses_bundled_catalog() {
        let catalog = StaticCatalog(vec![
            EventDefinition::new("void", 1.0, 10),
            EventDefinition::new("memo", 1.0, 10)
                .with_action(ActionDefinition::new("read", 0, 1.0)),
        ]);
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let snap = run.start_run(&catalog, 0);
        assert_eq!(snap.phase, RunPhase::Playing);
        assert_eq!(run.catalog(), crate::catalog::fallback_catalog().as_slice());
        assert!(run.catalog().iter().all(|e| !e.actions.is_empty()));
        let current = snap.current_event.expect("bundled catalog offers an event");
        assert_ne!(current.id, "void");
        assert!(!current.actions.is_empty());
    }

    #[test]
    fn test_journal_limit() {
        let config = RunConfig {
            journal_limit: 2,
            ..RunConfig::default()
        };
        let catalog = StaticCatalog(vec![EventDefinition::new("memo", 1.0, 0)
            .with_action(ActionDefinition::new("read", 0, 0.0))]);
        let mut run = RunController::new(config, zero_rng());
        run.start_run(&catalog, 0);
        for t in 1..5 {
            run.submit_action("read", "memo", t);
        }
        let snap = run.snapshot();
        assert_eq!(snap.journal.len(), 2);
        assert!(snap.journal.iter().all(|e| e.contains("read")));
    }

    #[test]
    fn test_conditions_gate_selection_during_run() {
        let catalog = StaticCatalog(vec![
            EventDefinition::new("panic", 1.0, 0)
                .with_condition(StateField::Stress, Comparison::GreaterOrEqual, 50.0)
                .with_action(ActionDefinition::new("breathe", 0, 0.0)),
            EventDefinition::new("memo", 1.0, 0).with_action(
                ActionDefinition::new("read", 0, 0.0).with_effect(StateField::Stress, 60.0),
            ),
        ]);
        let mut run = RunController::new(RunConfig::default(), zero_rng());
        let snap = run.start_run(&catalog, 0);
        assert_eq!(snap.current_event.map(|e| e.id), Some("memo".to_string()));
        // Stress starts at 10 with a zero roll; 70 unlocks "panic", which comes first
        let snap = run.submit_action("read", "memo", 1);
        assert_eq!(snap.state.stress, 70.0);
        assert_eq!(snap.current_event.map(|e| e.id), Some("panic".to_string()));
    }
}

//! Event catalog definitions, the JSON boundary, and the bundled fallback.
//!
//! Catalog data arrives from an external provider as JSON. Decoding already
//! rejects unknown field names, unknown operators, and non-numeric values
//! (the field and operator sets are closed enums); [`validate_catalog`]
//! checks the rest. Nothing malformed reaches the engine.
//!
//! ```
//! use redtape_logic::catalog::parse_catalog;
//!
//! let events = parse_catalog(r#"[{
//!     "id": "memo", "text": "A memo.", "base_weight": 1.0, "cooldown_secs": 5,
//!     "actions": [{ "id": "read", "label": "Read it",
//!                   "effects": [{ "field": "stress", "delta": 2 }] }]
//! }]"#).unwrap();
//! assert_eq!(events[0].actions[0].effects.len(), 1);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::condition::{Comparison, Condition};
use crate::error::CatalogError;
use crate::state::{Effect, StateField};

const BUNDLED_CATALOG_JSON: &str = include_str!("../../../data/events.json");

/// Result tag of a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalOutcome {
    Win,
    Lose,
}

/// A player-selectable choice within an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub cooldown_secs: u64,
    /// Added to `score` as an implicit effect when non-zero.
    #[serde(default)]
    pub score_impact: f64,
}

impl ActionDefinition {
    pub fn new(id: &str, cooldown_secs: u64, score_impact: f64) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            effects: Vec::new(),
            cooldown_secs,
            score_impact,
        }
    }

    pub fn with_effect(mut self, field: StateField, delta: f64) -> Self {
        self.effects.push(Effect::new(field, delta));
        self
    }
}

/// A situation presented to the player. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub text: String,
    pub base_weight: f64,
    #[serde(default)]
    pub cooldown_secs: u64,
    /// All must hold for the event to be eligible.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TerminalOutcome>,
}

impl EventDefinition {
    pub fn new(id: &str, base_weight: f64, cooldown_secs: u64) -> Self {
        Self {
            id: id.to_string(),
            text: id.to_string(),
            base_weight,
            cooldown_secs,
            conditions: Vec::new(),
            actions: Vec::new(),
            terminal: false,
            outcome: None,
        }
    }

    pub fn with_condition(mut self, field: StateField, op: Comparison, value: f64) -> Self {
        self.conditions.push(Condition::new(field, op, value));
        self
    }

    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_terminal(mut self, outcome: TerminalOutcome) -> Self {
        self.terminal = true;
        self.outcome = Some(outcome);
        self
    }

    /// The outcome tag, only when the event is marked terminal.
    pub fn terminal_outcome(&self) -> Option<TerminalOutcome> {
        if self.terminal {
            self.outcome
        } else {
            None
        }
    }

    pub fn action(&self, action_id: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| a.id == action_id)
    }
}

/// Decode and validate a JSON catalog.
pub fn parse_catalog(json: &str) -> Result<Vec<EventDefinition>, CatalogError> {
    let events: Vec<EventDefinition> = serde_json::from_str(json)?;
    validate_catalog(&events)?;
    Ok(events)
}

/// Check the invariants decoding cannot express.
pub fn validate_catalog(events: &[EventDefinition]) -> Result<(), CatalogError> {
    if events.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut seen_events = HashSet::new();
    for (index, event) in events.iter().enumerate() {
        if event.id.is_empty() {
            return Err(CatalogError::MissingEventId { index });
        }
        if !seen_events.insert(event.id.as_str()) {
            return Err(CatalogError::DuplicateEventId(event.id.clone()));
        }
        if !event.base_weight.is_finite() || event.base_weight <= 0.0 {
            return Err(CatalogError::InvalidWeight {
                event: event.id.clone(),
                weight: event.base_weight,
            });
        }
        if event.terminal && event.outcome.is_none() {
            return Err(CatalogError::MissingTerminalOutcome(event.id.clone()));
        }
        if event.actions.is_empty() {
            return Err(CatalogError::NoActions(event.id.clone()));
        }
        for condition in &event.conditions {
            if !condition.value.is_finite() {
                return Err(CatalogError::NonFiniteValue {
                    event: event.id.clone(),
                    detail: format!("condition '{}'", condition),
                });
            }
        }

        let mut seen_actions = HashSet::new();
        for action in &event.actions {
            if !seen_actions.insert(action.id.as_str()) {
                return Err(CatalogError::DuplicateActionId {
                    event: event.id.clone(),
                    action: action.id.clone(),
                });
            }
            if !action.score_impact.is_finite() {
                return Err(CatalogError::NonFiniteValue {
                    event: event.id.clone(),
                    detail: format!("score impact of action '{}'", action.id),
                });
            }
            if let Some(effect) = action.effects.iter().find(|e| !e.delta.is_finite()) {
                return Err(CatalogError::NonFiniteValue {
                    event: event.id.clone(),
                    detail: format!("{} delta of action '{}'", effect.field, action.id),
                });
            }
        }
    }
    Ok(())
}

/// Source of event definitions for a run.
pub trait CatalogProvider {
    fn fetch(&self) -> Result<Vec<EventDefinition>, CatalogError>;
}

/// Catalog held as a JSON document (e.g. a cached API response).
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    pub json: String,
}

impl JsonCatalog {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl CatalogProvider for JsonCatalog {
    fn fetch(&self) -> Result<Vec<EventDefinition>, CatalogError> {
        parse_catalog(&self.json)
    }
}

/// Catalog built in code.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog(pub Vec<EventDefinition>);

impl CatalogProvider for StaticCatalog {
    fn fetch(&self) -> Result<Vec<EventDefinition>, CatalogError> {
        validate_catalog(&self.0)?;
        Ok(self.0.clone())
    }
}

/// The catalog shipped in `data/events.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl CatalogProvider for BundledCatalog {
    fn fetch(&self) -> Result<Vec<EventDefinition>, CatalogError> {
        parse_catalog(BUNDLED_CATALOG_JSON)
    }
}

/// The bundled catalog, or an empty one if it somehow fails to parse.
pub fn fallback_catalog() -> Vec<EventDefinition> {
    match BundledCatalog.fetch() {
        Ok(events) => events,
        Err(e) => {
            log::error!("Bundled catalog is invalid: {}", e);
            Vec::new()
        }
    }
}

/// Fetch from `provider`, degrading to [`fallback_catalog`] on failure.
pub fn fetch_or_fallback(provider: &dyn CatalogProvider) -> Vec<EventDefinition> {
    match provider.fetch() {
        Ok(events) => events,
        Err(e) => {
            log::warn!("Catalog fetch failed ({}), using bundled catalog", e);
            fallback_catalog()
        }
    }
}

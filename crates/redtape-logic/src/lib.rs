//! Pure run-state engine for Redtape.
//!
//! This crate contains all game logic that is independent of any UI, clock,
//! or storage backend. Functions take plain data and return new values, so
//! every transition is unit-testable on its own. Callers supply the current
//! time in milliseconds and a `rand::Rng`; the engine never reads either
//! from the environment.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Event/action definitions, JSON parsing, validation, bundled catalog |
//! | [`condition`] | Declarative field comparisons evaluated against run state |
//! | [`config`] | Run configuration: defaults, starting ranges, tick decay |
//! | [`cooldown`] | Absolute-expiry cooldown tables for events and actions |
//! | [`error`] | Catalog boundary errors |
//! | [`outcome`] | Action application and win/lose determination |
//! | [`run`] | Run controller state machine (start, action, tick) |
//! | [`selection`] | Eligibility filtering and weighted event sampling |
//! | [`state`] | Run state fields, domains, clamping, lose conditions |
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use redtape_logic::catalog::BundledCatalog;
//! use redtape_logic::config::RunConfig;
//! use redtape_logic::run::{RunController, RunPhase};
//!
//! let mut run = RunController::new(RunConfig::default(), StdRng::seed_from_u64(7));
//! let snapshot = run.start_run(&BundledCatalog, 0);
//! assert_eq!(snapshot.phase, RunPhase::Playing);
//!
//! let snapshot = run.tick(1_000);
//! assert!(snapshot.state.time_remaining < RunConfig::default().defaults.time_remaining);
//! ```

pub mod catalog;
pub mod condition;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod outcome;
pub mod run;
pub mod selection;
pub mod state;

//! Redtape Headless Run Harness
//!
//! Validates the event catalog and the run engine without a UI.
//! Runs entirely in-process, with no rendering, storage, or real clock.
//!
//! Usage:
//!   cargo run -p redtape-simtest
//!   cargo run -p redtape-simtest -- --verbose
//!   cargo run -p redtape-simtest -- --runs 500 --seed 7 --json
//!   cargo run -p redtape-simtest -- --catalog my_events.json --config run.json

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use redtape_logic::catalog::{
    parse_catalog, BundledCatalog, CatalogProvider, EventDefinition, JsonCatalog, TerminalOutcome,
};
use redtape_logic::condition::evaluate_all;
use redtape_logic::config::RunConfig;
use redtape_logic::cooldown::CooldownTable;
use redtape_logic::outcome::RunOutcome;
use redtape_logic::run::{RunController, RunPhase, RunSnapshot};
use redtape_logic::selection::{select_next, weighted_pick, EnvironmentModifiers};
use redtape_logic::state::{clamp, RunState, StateField};
use serde::Serialize;

// ── Command line ────────────────────────────────────────────────────────

struct Options {
    verbose: bool,
    json: bool,
    runs: u64,
    seed: u64,
    catalog_path: Option<String>,
    config_path: Option<String>,
}

fn parse_options() -> Options {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    Options {
        verbose: args.iter().any(|a| a == "--verbose"),
        json: args.iter().any(|a| a == "--json"),
        runs: value_of("--runs").and_then(|v| v.parse().ok()).unwrap_or(200),
        seed: value_of("--seed").and_then(|v| v.parse().ok()).unwrap_or(1),
        catalog_path: value_of("--catalog"),
        config_path: value_of("--config"),
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let opts = parse_options();
    println!("=== Redtape Run Harness ===\n");

    let mut results = Vec::new();

    let config = match load_config(&opts) {
        Ok(c) => c,
        Err(detail) => {
            results.push(TestResult {
                name: "config_load".into(),
                passed: false,
                detail,
            });
            RunConfig::default()
        }
    };

    let provider: Box<dyn CatalogProvider> = match &opts.catalog_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(json) => Box::new(JsonCatalog::new(json)),
            Err(e) => {
                results.push(TestResult {
                    name: "catalog_read".into(),
                    passed: false,
                    detail: format!("{}: {}", path, e),
                });
                Box::new(BundledCatalog)
            }
        },
        None => Box::new(BundledCatalog),
    };

    // 1. Catalog validation
    let catalog = validate_catalog(provider.as_ref(), &config, opts.verbose, &mut results);

    // 2. State model sweep
    results.extend(validate_state_model(opts.verbose));

    // 3. Weighted sampling
    results.extend(validate_sampling(opts.seed, opts.verbose));

    // 4. Cooldown deadlock recovery
    results.extend(validate_deadlock_recovery(&catalog, opts.seed, opts.verbose));

    // 5. Batch of automated runs
    let summary = play_batch(provider.as_ref(), &config, &opts);
    results.extend(validate_batch(&summary, provider.as_ref(), &config, &opts));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    if opts.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("\n{}", json),
            Err(e) => println!("\nfailed to encode summary: {}", e),
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_config(opts: &Options) -> Result<RunConfig, String> {
    let Some(path) = &opts.config_path else {
        return Ok(RunConfig::default());
    };
    let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    RunConfig::from_json(&json).map_err(|e| format!("{}: {}", path, e))
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(
    provider: &dyn CatalogProvider,
    config: &RunConfig,
    verbose: bool,
    results: &mut Vec<TestResult>,
) -> Vec<EventDefinition> {
    println!("--- Catalog ---");

    let catalog = match provider.fetch() {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "catalog_parse".into(),
                passed: false,
                detail: e.to_string(),
            });
            return Vec::new();
        }
    };

    results.push(TestResult {
        name: "catalog_parse".into(),
        passed: true,
        detail: format!("{} events loaded", catalog.len()),
    });

    // Every event offers at least one action
    let no_actions: Vec<_> = catalog
        .iter()
        .filter(|e| e.actions.is_empty())
        .map(|e| e.id.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_actions_present".into(),
        passed: no_actions.is_empty(),
        detail: if no_actions.is_empty() {
            "every event has actions".into()
        } else {
            format!("events without actions: {:?}", no_actions)
        },
    });

    // Something is selectable from the default starting state
    let start = config.defaults;
    let eligible_at_start = catalog
        .iter()
        .filter(|e| evaluate_all(&start, &e.conditions))
        .count();
    results.push(TestResult {
        name: "catalog_start_eligible".into(),
        passed: eligible_at_start > 0,
        detail: format!("{} events eligible at start", eligible_at_start),
    });

    // The catalog can be won
    let winnable = catalog
        .iter()
        .any(|e| e.terminal_outcome() == Some(TerminalOutcome::Win));
    results.push(TestResult {
        name: "catalog_has_win".into(),
        passed: winnable,
        detail: if winnable {
            "terminal win event present".into()
        } else {
            "no terminal win event".into()
        },
    });

    // Re-encoding and parsing again yields the same catalog
    let reparsed = serde_json::to_string(&catalog)
        .map_err(|e| e.to_string())
        .and_then(|json| parse_catalog(&json).map_err(|e| e.to_string()));
    results.push(TestResult {
        name: "catalog_reencode".into(),
        passed: reparsed.as_ref().is_ok_and(|c| *c == catalog),
        detail: match &reparsed {
            Ok(_) => "re-encoded catalog parses identically".into(),
            Err(e) => e.clone(),
        },
    });

    if verbose {
        for e in &catalog {
            println!(
                "  {} (w={}, cd={}s, {} conditions, {} actions{})",
                e.id,
                e.base_weight,
                e.cooldown_secs,
                e.conditions.len(),
                e.actions.len(),
                match e.terminal_outcome() {
                    Some(o) => format!(", terminal {:?}", o),
                    None => String::new(),
                }
            );
        }
    }

    catalog
}

// ── 2. State model ──────────────────────────────────────────────────────

fn validate_state_model(verbose: bool) -> Vec<TestResult> {
    println!("--- State Model ---");
    let mut results = Vec::new();

    let magnitudes = [-1e9, -250.0, -1.0, 0.0, 50.0, 100.0, 101.0, 1e9];
    let mut out_of_domain = 0;
    let mut not_idempotent = 0;
    for &m in &magnitudes {
        let mut s = RunState::default();
        for field in StateField::ALL {
            s.set(field, m);
        }
        let c = clamp(&s);
        if !c.is_within_domains() {
            out_of_domain += 1;
        }
        if clamp(&c) != c {
            not_idempotent += 1;
        }
        if verbose {
            println!("  clamp({:e}) = {:?}", m, c);
        }
    }

    results.push(TestResult {
        name: "clamp_domains".into(),
        passed: out_of_domain == 0,
        detail: format!("{} of {} sweeps out of domain", out_of_domain, magnitudes.len()),
    });
    results.push(TestResult {
        name: "clamp_idempotent".into(),
        passed: not_idempotent == 0,
        detail: format!(
            "{} of {} sweeps changed on second clamp",
            not_idempotent,
            magnitudes.len()
        ),
    });

    results
}

// ── 3. Sampling ─────────────────────────────────────────────────────────

fn validate_sampling(seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Weighted Sampling ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let trials = 40_000;
    let mut first = 0;
    for _ in 0..trials {
        if weighted_pick(&[0, 1], &[1.0, 3.0], &mut rng) == Some(&0) {
            first += 1;
        }
    }
    let share = first as f64 / trials as f64;
    if verbose {
        println!("  weights [1, 3]: first picked {:.3}", share);
    }
    results.push(TestResult {
        name: "sampling_distribution".into(),
        passed: (share - 0.25).abs() < 0.01,
        detail: format!("expected 0.250, got {:.3}", share),
    });

    let only_last =
        (0..1000).all(|_| weighted_pick(&[0, 1, 2], &[0.0, 0.0, 5.0], &mut rng) == Some(&2));
    results.push(TestResult {
        name: "sampling_zero_weights".into(),
        passed: only_last,
        detail: "zero-weight items never picked".into(),
    });

    let none = weighted_pick(&[0, 1], &[0.0, -2.0], &mut rng).is_none();
    results.push(TestResult {
        name: "sampling_no_mass".into(),
        passed: none,
        detail: "no positive weight yields none".into(),
    });

    results
}

// ── 4. Deadlock recovery ────────────────────────────────────────────────

fn validate_deadlock_recovery(
    catalog: &[EventDefinition],
    seed: u64,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Deadlock Recovery ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let cooling: Vec<_> = catalog.iter().filter(|e| e.cooldown_secs > 0).cloned().collect();
    if cooling.is_empty() {
        results.push(TestResult {
            name: "deadlock_setup".into(),
            passed: false,
            detail: "no events with cooldowns".into(),
        });
        return results;
    }

    // Unconditional copies so eligibility depends on cooldowns alone
    let cooling: Vec<_> = cooling
        .into_iter()
        .map(|mut e| {
            e.conditions.clear();
            e
        })
        .collect();

    let now = 1_000_000;
    let cooldowns = cooling.iter().fold(CooldownTable::new(), |t, e| {
        t.start_event(&e.id, e.cooldown_secs, now)
    });
    let env = EnvironmentModifiers::new();
    let state = RunState::default();

    let blocked = select_next(&cooling, &state, &cooldowns, &env, now, &mut rng).is_none();
    results.push(TestResult {
        name: "deadlock_blocked".into(),
        passed: blocked,
        detail: format!("{} events all cooling down", cooling.len()),
    });

    // Simulate the tick loop: advance one second at a time and retry
    let mut t = now;
    let mut recovered_at = None;
    for _ in 0..3600 {
        t += 1000;
        if let Some(e) = select_next(&cooling, &state, &cooldowns, &env, t, &mut rng) {
            recovered_at = Some((t, e.id.clone()));
            break;
        }
    }
    let earliest = cooldowns.events.next_expiry(now);
    if verbose {
        println!("  earliest expiry {:?}, recovered {:?}", earliest, recovered_at);
    }
    results.push(TestResult {
        name: "deadlock_recovers".into(),
        passed: recovered_at.as_ref().map(|(t, _)| Some(*t)) == Some(earliest),
        detail: match &recovered_at {
            Some((t, id)) => format!("'{}' eligible again after {}s", id, (t - now) / 1000),
            None => "never recovered".into(),
        },
    });

    results
}

// ── 5. Automated runs ───────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
struct BatchSummary {
    runs: u64,
    finished: u64,
    wins: u64,
    outcomes: BTreeMap<String, u64>,
    mean_score: f64,
    mean_duration_secs: f64,
    domain_violations: u64,
}

/// Play one run: first ready action whenever an event is shown, one tick
/// per simulated second. Returns the final snapshot and elapsed seconds.
fn autoplay<R: Rng>(
    run: &mut RunController<R>,
    provider: &dyn CatalogProvider,
    domain_violations: &mut u64,
) -> (RunSnapshot, u64) {
    let mut snap = run.start_run(provider, 0);
    let mut now = 0;
    for _ in 0..100_000 {
        if snap.phase == RunPhase::Over {
            break;
        }
        if let Some(event) = snap.current_event.clone() {
            let ready = event
                .actions
                .iter()
                .find(|a| !snap.cooldowns.action_on_cooldown(&a.id, now));
            if let Some(action) = ready {
                snap = run.submit_action(&action.id, &event.id, now);
                if !snap.state.is_within_domains() {
                    *domain_violations += 1;
                }
                if snap.phase == RunPhase::Over {
                    break;
                }
            }
        }
        now += run.config().tick_interval_ms;
        snap = run.tick(now);
    }
    (snap, now / 1000)
}

fn outcome_label(outcome: Option<RunOutcome>) -> String {
    match outcome {
        Some(o) => o.to_string(),
        None => "unfinished".into(),
    }
}

fn play_batch(provider: &dyn CatalogProvider, config: &RunConfig, opts: &Options) -> BatchSummary {
    println!("--- Automated Runs ---");
    let mut summary = BatchSummary {
        runs: opts.runs,
        ..Default::default()
    };
    let mut total_score = 0.0;
    let mut total_secs = 0;

    for i in 0..opts.runs {
        let rng = StdRng::seed_from_u64(opts.seed.wrapping_add(i));
        let mut run = RunController::new(config.clone(), rng);
        let (snap, secs) = autoplay(&mut run, provider, &mut summary.domain_violations);

        if snap.phase == RunPhase::Over {
            summary.finished += 1;
        }
        if snap.outcome.is_some_and(RunOutcome::is_win) {
            summary.wins += 1;
        }
        *summary.outcomes.entry(outcome_label(snap.outcome)).or_default() += 1;
        total_score += snap.state.score;
        total_secs += secs;

        if opts.verbose && i < 5 {
            println!(
                "  run {}: {} after {}s, score {:.0}",
                i,
                outcome_label(snap.outcome),
                secs,
                snap.state.score
            );
        }
    }

    if opts.runs > 0 {
        summary.mean_score = total_score / opts.runs as f64;
        summary.mean_duration_secs = total_secs as f64 / opts.runs as f64;
    }
    summary
}

fn validate_batch(
    summary: &BatchSummary,
    provider: &dyn CatalogProvider,
    config: &RunConfig,
    opts: &Options,
) -> Vec<TestResult> {
    let mut results = Vec::new();

    results.push(TestResult {
        name: "runs_finish".into(),
        passed: summary.finished == summary.runs,
        detail: format!("{}/{} runs reached an outcome", summary.finished, summary.runs),
    });
    results.push(TestResult {
        name: "runs_within_domains".into(),
        passed: summary.domain_violations == 0,
        detail: format!("{} post-action states out of domain", summary.domain_violations),
    });

    // Same seed, same run
    let replay = |seed: u64| {
        let mut run = RunController::new(config.clone(), StdRng::seed_from_u64(seed));
        autoplay(&mut run, provider, &mut 0).0
    };
    results.push(TestResult {
        name: "runs_deterministic".into(),
        passed: replay(opts.seed) == replay(opts.seed),
        detail: format!("seed {} replays identically", opts.seed),
    });

    results.push(TestResult {
        name: "runs_summary".into(),
        passed: true,
        detail: format!(
            "{} wins, mean score {:.1}, mean length {:.0}s, outcomes {:?}",
            summary.wins, summary.mean_score, summary.mean_duration_secs, summary.outcomes
        ),
    });

    results
}

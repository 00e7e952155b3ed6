// Headless command-line driver for the Entropy studio simulation.
//
// Creates runs, resolves weeks with a plan given as flags, previews a plan
// without committing it, and inspects saved runs. State lives in a
// directory of JSON saves (`DirStore`), one file per storage key, so a run
// can be continued across invocations.
//
// Usage:
//   entropy [--save-dir <DIR>] [--slot <KEY>] [--config <JSON>] <COMMAND>
//     new --seed <N>            Start a new run and save it
//     play --weeks <N> [plan]   Resolve up to N weeks, then save
//     preview [plan]            Print projected deltas for a plan as JSON
//     show                      Print the saved run and the slot list
//
// Plan flags: --focus, --management, --feature, --refactor, --marketing,
// --qa, --accept-scope-creep, --release. Unset flags keep the stored plan.
//
// This is the only crate that installs a tracing subscriber; the filter is
// read from `RUST_LOG` and defaults to `info`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use entropy_sim::Engine;
use entropy_sim::config::GameConfig;
use entropy_sim::plan::{AllocationOverride, PlanOverride};
use entropy_sim::save::{AUTOSAVE_KEY, DirStore, SaveStore, list_slots};
use entropy_sim::state::GameState;
use entropy_sim::types::ScopeCreepPolicy;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the Entropy studio simulation", long_about = None)]
struct Cli {
    /// Directory holding one `<key>.json` file per save
    #[arg(long, global = true, default_value = "./saves")]
    save_dir: PathBuf,

    /// Storage key to read and write
    #[arg(long, global = true, default_value = AUTOSAVE_KEY)]
    slot: String,

    /// Game config JSON replacing the built-in balance
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new run and save it
    New {
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Resolve weeks with the given plan, stopping early if the run ends
    Play {
        #[arg(long, default_value_t = 1)]
        weeks: u32,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Print the projected effect of a plan on the saved run
    Preview {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Print the saved run and the manual save slots
    Show,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Focus card id
    #[arg(long)]
    focus: Option<String>,

    /// Management card id
    #[arg(long)]
    management: Option<String>,

    /// CP on the feature lane
    #[arg(long)]
    feature: Option<i64>,

    /// CP on the refactor lane
    #[arg(long)]
    refactor: Option<i64>,

    /// CP on the marketing lane
    #[arg(long)]
    marketing: Option<i64>,

    /// CP on the QA lane
    #[arg(long)]
    qa: Option<i64>,

    /// Accept scope-creep requests instead of rejecting them
    #[arg(long)]
    accept_scope_creep: bool,

    /// Request a release this week
    #[arg(long)]
    release: bool,
}

impl PlanArgs {
    fn to_override(&self) -> PlanOverride {
        PlanOverride {
            focus_card_id: self.focus.clone(),
            management_card_id: self.management.clone(),
            scope_creep_policy: self.accept_scope_creep.then_some(ScopeCreepPolicy::Accept),
            allocations: AllocationOverride {
                feature: self.feature,
                refactor: self.refactor,
                marketing: self.marketing,
                qa: self.qa,
            },
            release_requested: self.release.then_some(true),
            ..PlanOverride::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let engine = build_engine(cli.config.as_deref())?;
    let mut store = DirStore::new(&cli.save_dir);

    match &cli.command {
        Command::New { seed } => {
            let state = engine.new_run(*seed);
            let bytes = store
                .save(&cli.slot, &state)
                .with_context(|| format!("Failed to save new run to '{}'", cli.slot))?;
            println!(
                "Created run {} (seed {}) in {} ({bytes} bytes)",
                state.meta.run_id,
                state.meta.seed,
                store.path_for(&cli.slot).display()
            );
        }
        Command::Play { weeks, plan } => {
            let mut state = load_state(&store, &cli.slot)?;
            let overrides = plan.to_override();
            for _ in 0..*weeks {
                if state.is_terminal() {
                    break;
                }
                if !engine.can_advance_week(&state, Some(&overrides)) {
                    bail!("Plan leaves all available capacity unallocated");
                }
                state = engine.resolve_week(&state, Some(&overrides));
                println!("{}", week_summary(&state));
            }
            store
                .save(&cli.slot, &state)
                .with_context(|| format!("Failed to save run to '{}'", cli.slot))?;
            if let Some(result) = &state.run.result {
                println!("Run over ({}): {}", result.kind, result.message);
            }
        }
        Command::Preview { plan } => {
            let state = load_state(&store, &cli.slot)?;
            let preview = engine.preview_week(&state, Some(&plan.to_override()));
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Command::Show => {
            match store.load(&cli.slot) {
                Ok(Some(state)) => print_state(&state),
                Ok(None) => println!("No run saved under '{}'", cli.slot),
                Err(err) => println!("Save '{}' is unreadable: {err}", cli.slot),
            }
            println!("=== slots ===");
            println!("{}", serde_json::to_string_pretty(&list_slots(&store))?);
        }
    }

    Ok(())
}

fn build_engine(config_path: Option<&Path>) -> Result<Engine> {
    let config = match config_path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load game config from {}", path.display()))?,
        None => GameConfig::default(),
    };
    Engine::new(config).context("Game config cannot drive a run")
}

fn load_state(store: &DirStore, key: &str) -> Result<GameState> {
    store
        .load(key)
        .with_context(|| format!("Failed to load run from '{key}'"))?
        .with_context(|| format!("No run saved under '{key}'; start one with `entropy new`"))
}

/// One line describing the week that was just resolved.
fn week_summary(state: &GameState) -> String {
    let Some(snapshot) = state.history.last() else {
        return format!("week {}: nothing resolved", state.run.week);
    };
    let event = snapshot
        .event
        .as_ref()
        .map_or("none", |event| event.id.as_str());
    format!(
        "week {:>3} | {:<15} {:<15} | cash {:>8} | morale {:>6.2} | debt {:>6.2} | bugs {:>3} | done {:>6.1}/{:<6.1} | build {:?} | event {event}",
        snapshot.week,
        snapshot.plan.focus_card_id,
        snapshot.plan.management_card_id,
        snapshot.after.cash,
        snapshot.after.morale,
        snapshot.after.tech_debt,
        snapshot.after.bug_backlog,
        snapshot.after.completion,
        snapshot.after.scope_target,
        snapshot.build.result,
    )
}

fn print_state(state: &GameState) {
    println!("=== run {} ===", state.meta.run_id);
    println!(
        "week {} | status {:?} | updated {}",
        state.run.week, state.run.status, state.meta.updated_at_iso
    );
    println!(
        "cash {} (burn {}, runway {}) | morale {:.2}",
        state.resources.cash,
        state.resources.weekly_burn,
        state
            .resources
            .runway_weeks
            .map_or_else(|| "n/a".to_string(), |weeks| weeks.to_string()),
        state.resources.morale,
    );
    println!(
        "completion {:.1}/{:.1} | quality {:.1} | debt {:.2} | bugs {} | hype {:.1}",
        state.project.completion,
        state.project.scope_target,
        state.project.quality,
        state.entropy.tech_debt,
        state.entropy.bug_backlog,
        state.market.hype,
    );
    if let Some(outcome) = state.market.launch_outcome {
        println!(
            "launched week {} as {outcome} | lifetime sales {}",
            state.run.launch_week.unwrap_or_default(),
            state.market.lifetime_sales
        );
    }
    if let Some(result) = &state.run.result {
        println!("result: {} ({})", result.kind, result.message);
    }
    for log in state.logs.iter().rev().take(5).rev() {
        println!("  [week {}] {}", log.week, log.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_plan(args: &[&str]) -> PlanOverride {
        let argv = ["entropy", "play"].iter().chain(args).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Play { plan, .. } => plan.to_override(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unset_flags_leave_the_stored_plan_alone() {
        let plan = play_plan(&[]);
        assert_eq!(plan, PlanOverride::default());
    }

    #[test]
    fn set_flags_override_the_plan() {
        let plan = play_plan(&["--focus", "polishing", "--qa", "9", "--accept-scope-creep", "--release"]);
        assert_eq!(plan.focus_card_id.as_deref(), Some("polishing"));
        assert_eq!(plan.management_card_id, None);
        assert_eq!(plan.allocations.qa, Some(9));
        assert_eq!(plan.allocations.feature, None);
        assert_eq!(plan.scope_creep_policy, Some(ScopeCreepPolicy::Accept));
        assert_eq!(plan.release_requested, Some(true));
    }

    #[test]
    fn global_flags_have_defaults() {
        let cli = Cli::try_parse_from(["entropy", "show"]).unwrap();
        assert_eq!(cli.slot, AUTOSAVE_KEY);
        assert_eq!(cli.save_dir, PathBuf::from("./saves"));
        assert!(cli.config.is_none());
    }
}

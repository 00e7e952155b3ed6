// entropy_sim: pure Rust turn-resolution library.
//
// This crate contains all simulation logic for the studio-management game:
// the configuration and catalogs, the `GameState` aggregate, every stage of
// week resolution, and the save/load boundary. It has no UI dependencies and
// can be tested, benchmarked and driven headless (see `entropy_cli`).
//
// Module overview:
// - `sim.rs`:      `Engine` facade and the week pipeline (`resolve_week`).
// - `state.rs`:    `GameState`, its sections, and `WeekSnapshot` history records.
// - `plan.rs`:     Plan / PlanOverride, allocation normalization, the sanitizer.
// - `capacity.rs`: Weekly CP from team, morale, debt and the management card.
// - `event.rs`:    Friction event roll and effects, plus the narrative log.
// - `economy.rs`:  Work output, hype, morale and cash formulas.
// - `build.rs`:    Build stability, ghost tasks, milestones.
// - `launch.rs`:   Release guardrails, launch check, post-launch sales.
// - `terminal.rs`: Insolvency / mutiny / delisting / success checks.
// - `save.rs`:     Save format, shape check, migration, `SaveStore`.
// - `config.rs`:   GameConfig: every tunable constant and the catalogs.
// - `clock.rs`:    Injected wall clock for save timestamps.
// - `types.rs`:    Shared enums, `Allocations`, rounding helpers.
// - `prng`:        Re-exported from `entropy_prng`: xorshift32 PRNG.
//
// **Critical constraint: determinism.** Week resolution is a pure function:
// `(config, state, plan override) -> new state`. All randomness comes from
// the xorshift32 stream whose state lives in `meta.rng_state`. No `HashMap`,
// no OS entropy, and the clock only stamps `updated_at_iso`. Use `BTreeMap`
// for keyed collections.

pub mod build;
pub mod capacity;
pub mod clock;
pub mod config;
pub mod economy;
pub mod event;
pub mod launch;
pub mod plan;
pub use entropy_prng as prng;
pub mod save;
pub mod sim;
pub mod state;
pub mod terminal;
pub mod types;

pub use sim::Engine;

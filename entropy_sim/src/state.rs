// The `GameState` aggregate and its weekly history records.
//
// `GameState` is the single source of truth for a run and the only value that
// is persisted. It is treated as an immutable value: `Engine::resolve_week()`
// reads a `&GameState` and returns a brand-new one, never mutating its input.
// Sections mirror the save format: `meta`, `run`, `resources`, `team`,
// `project`, `entropy`, `market`, `plan`, `counters`, plus the append-only
// `history` of `WeekSnapshot`s and the bounded narrative `logs`.
//
// `GameState::new_run()` builds the week-1 state from the config's starting
// values, including the derived capacity and entropy index. Derived fields
// are refreshed by each resolved week.
//
// See also: `sim.rs` for the week orchestrator that produces new states,
// `plan.rs` for `Plan`, `event.rs` for `LogEntry`, `save.rs` for the
// persistence boundary and schema version.
//
// **Critical constraint: determinism.** `meta.rng_state` is the PRNG's full
// state. It must round-trip through save/load unchanged, or a resumed run
// diverges from the original.

use crate::capacity::{Capacity, compute_capacity};
use crate::clock::{Clock, format_iso8601};
use crate::config::GameConfig;
use crate::event::{LogEntry, LogKind};
use crate::plan::Plan;
use crate::prng::normalize_seed;
use crate::save::SAVE_SCHEMA_VERSION;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level run state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub meta: Meta,
    pub run: Run,
    pub resources: Resources,
    pub team: Team,
    pub project: Project,
    pub entropy: Entropy,
    pub market: Market,
    pub plan: Plan,
    #[serde(default)]
    pub counters: Counters,
    /// One snapshot per resolved week, oldest first. Never rewritten.
    pub history: Vec<WeekSnapshot>,
    /// Narrative feed, trimmed to `GameConfig::log_limit` entries.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub schema_version: u32,
    pub run_id: String,
    pub created_at_iso: String,
    pub updated_at_iso: String,
    /// Normalized seed the run started from.
    pub seed: u32,
    /// Current PRNG state; the next week resumes the stream from here.
    pub rng_state: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Current (not yet resolved) week, starting at 1.
    pub week: u32,
    pub status: RunStatus,
    pub result: Option<RunResult>,
    /// Weeks since launch, counting the launch week as 1.
    pub post_launch_weeks: u32,
    pub post_launch_non_negative_cash_streak: u32,
    pub launch_week: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// May go negative; two negative weeks in a row end the run.
    pub cash: i64,
    pub morale: f64,
    pub weekly_burn: i64,
    /// `None` when the burn rate is zero.
    pub runway_weeks: Option<i64>,
    pub morale_below_20_streak: u32,
    pub cash_negative_streak: u32,
    pub crunch_streak: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub base_cp: f64,
    pub salary: i64,
    /// Reset to 1 every week.
    pub availability_multiplier: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub members: Vec<TeamMember>,
    pub cp_base: i64,
    pub cp_effective: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub scope_target: f64,
    /// Never exceeds `scope_target`.
    pub completion: f64,
    pub quality: f64,
    /// Append-only, in the order milestones were reached.
    pub milestones_reached: Vec<String>,
    pub release_ready: bool,
    pub released: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entropy {
    pub tech_debt: f64,
    pub bug_backlog: i64,
    pub entropy_index: f64,
    pub latest_stability_score: f64,
    pub latest_build_result: BuildResult,
    pub latest_ghost_tasks: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub hype: f64,
    pub reputation: f64,
    pub product_strength: f64,
    /// Locked in at launch; `None` before release.
    pub launch_outcome: Option<LaunchOutcome>,
    pub week_sales: i64,
    pub lifetime_sales: i64,
    pub refunds: i64,
}

/// Cumulative run statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub total_weeks_simulated: u32,
    pub total_feature_points_done: i64,
    pub total_debt_reduced: f64,
    pub total_bugs_fixed: i64,
    pub total_ghost_tasks: i64,
    pub total_milestones: u32,
    pub total_events_triggered: u32,
}

// ---------------------------------------------------------------------------
// Weekly history records
// ---------------------------------------------------------------------------

/// Tracked metrics before or after a week. `after` carries the week's
/// unrounded values; the state stores some of them rounded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricVector {
    pub cash: i64,
    pub morale: f64,
    pub tech_debt: f64,
    pub bug_backlog: i64,
    pub completion: f64,
    pub scope_target: f64,
    pub quality: f64,
    pub hype: f64,
}

impl MetricVector {
    pub fn of(state: &GameState) -> Self {
        Self {
            cash: state.resources.cash,
            morale: state.resources.morale,
            tech_debt: state.entropy.tech_debt,
            bug_backlog: state.entropy.bug_backlog,
            completion: state.project.completion,
            scope_target: state.project.scope_target,
            quality: state.project.quality,
            hype: state.market.hype,
        }
    }

    /// `self - before`, float components rounded to two decimals.
    pub fn delta_from(&self, before: &Self) -> MetricDeltas {
        MetricDeltas {
            cash: self.cash - before.cash,
            morale: round2(self.morale - before.morale),
            tech_debt: round2(self.tech_debt - before.tech_debt),
            bug_backlog: self.bug_backlog - before.bug_backlog,
            completion: round2(self.completion - before.completion),
            quality: round2(self.quality - before.quality),
            hype: round2(self.hype - before.hype),
        }
    }
}

/// Week-over-week change of the tracked metrics. Scope changes are read
/// from `before`/`after` directly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub cash: i64,
    pub morale: f64,
    pub tech_debt: f64,
    pub bug_backlog: i64,
    pub completion: f64,
    pub quality: f64,
    pub hype: f64,
}

/// The plan as it was actually resolved (after sanitizing and event effects).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPlan {
    pub focus_card_id: String,
    pub management_card_id: String,
    pub scope_creep_policy: ScopeCreepPolicy,
    pub release_requested: bool,
    pub allocations: Allocations,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    pub id: String,
    pub name: String,
    pub chance: f64,
    pub roll: f64,
    pub decision: Option<ScopeCreepPolicy>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBuild {
    pub stability_score: f64,
    pub result: BuildResult,
    pub ghost_tasks: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRelease {
    pub attempted: bool,
    pub executed: bool,
    pub available_before_week: bool,
    pub outcome: Option<LaunchOutcome>,
    pub product_strength: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSales {
    pub week_sales: i64,
    pub lifetime_sales: i64,
    pub refunds: i64,
}

/// Immutable record of one resolved week.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekSnapshot {
    pub week: u32,
    pub plan: SnapshotPlan,
    /// Capacity for the week; `cp_effective` includes the event's
    /// capacity delta.
    pub capacity: Capacity,
    pub event: Option<SnapshotEvent>,
    pub build: SnapshotBuild,
    /// Milestones newly reached this week.
    pub milestones: Vec<String>,
    pub release: SnapshotRelease,
    pub sales: SnapshotSales,
    pub before: MetricVector,
    pub after: MetricVector,
    pub deltas: MetricDeltas,
    pub terminal: Option<RunResult>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Runway in whole weeks at the given burn, or `None` for zero burn.
pub fn runway_weeks(cash: i64, weekly_burn: i64) -> Option<i64> {
    let burn = weekly_burn.max(0);
    if burn == 0 {
        return None;
    }
    Some(cash.div_euclid(burn).max(0))
}

impl GameState {
    /// Create the week-1 state for a new run.
    pub fn new_run(config: &GameConfig, seed: u64, clock: &dyn Clock) -> Self {
        let seed = normalize_seed(seed);
        let now_ms = clock.now_unix_ms();
        let now = format_iso8601(now_ms);
        let start = &config.starting;
        let weekly_burn = config.weekly_burn();

        let cooldowns: BTreeMap<String, u32> = config
            .management_cards
            .iter()
            .filter(|card| card.cooldown_weeks > 0)
            .map(|card| (card.id.clone(), 0))
            .collect();

        let mut state = Self {
            meta: Meta {
                schema_version: SAVE_SCHEMA_VERSION,
                run_id: format!("save-{seed}-{now_ms}"),
                created_at_iso: now.clone(),
                updated_at_iso: now,
                seed,
                rng_state: seed,
            },
            run: Run {
                week: 1,
                status: RunStatus::Active,
                result: None,
                post_launch_weeks: 0,
                post_launch_non_negative_cash_streak: 0,
                launch_week: None,
            },
            resources: Resources {
                cash: start.cash,
                morale: start.morale,
                weekly_burn,
                runway_weeks: runway_weeks(start.cash, weekly_burn),
                morale_below_20_streak: 0,
                cash_negative_streak: 0,
                crunch_streak: 0,
            },
            team: Team {
                members: config
                    .team
                    .iter()
                    .map(|dev| TeamMember {
                        id: dev.id.clone(),
                        name: dev.name.clone(),
                        base_cp: dev.base_cp,
                        salary: dev.salary,
                        availability_multiplier: 1.0,
                    })
                    .collect(),
                cp_base: 0,
                cp_effective: 0,
            },
            project: Project {
                scope_target: start.scope_target,
                completion: start.completion,
                quality: start.quality,
                milestones_reached: Vec::new(),
                release_ready: false,
                released: false,
            },
            entropy: Entropy {
                tech_debt: start.tech_debt,
                bug_backlog: start.bug_backlog,
                entropy_index: compute_entropy_index(start.tech_debt, start.bug_backlog),
                latest_stability_score: 0.0,
                latest_build_result: BuildResult::None,
                latest_ghost_tasks: 0,
            },
            market: Market {
                hype: start.hype,
                reputation: start.reputation,
                product_strength: 0.0,
                launch_outcome: None,
                week_sales: 0,
                lifetime_sales: 0,
                refunds: 0,
            },
            plan: Plan {
                focus_card_id: config
                    .focus_cards
                    .first()
                    .map(|card| card.id.clone())
                    .unwrap_or_default(),
                management_card_id: config
                    .management_cards
                    .first()
                    .map(|card| card.id.clone())
                    .unwrap_or_default(),
                scope_creep_policy: ScopeCreepPolicy::Reject,
                allocations: Allocations::new(8, 6, 4, 6),
                cooldowns,
                release_requested: false,
            },
            counters: Counters::default(),
            history: Vec::new(),
            logs: vec![LogEntry::new(1, LogKind::System, "New run initialized.")],
        };
        if let Some(management) = config.management_cards.first() {
            let capacity = compute_capacity(config, &state, management);
            state.team.cp_base = capacity.cp_base;
            state.team.cp_effective = capacity.cp_effective;
        }
        state
    }

    /// The plan resolved in the most recent week, if any.
    pub fn last_week_plan(&self) -> Option<&SnapshotPlan> {
        self.history.last().map(|snapshot| &snapshot.plan)
    }

    pub fn is_terminal(&self) -> bool {
        self.run.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn new_state() -> GameState {
        GameState::new_run(&GameConfig::default(), 42, &FixedClock(1_700_000_000_000))
    }

    #[test]
    fn new_run_uses_starting_values() {
        let state = new_state();
        assert_eq!(state.run.week, 1);
        assert_eq!(state.run.status, RunStatus::Active);
        assert_eq!(state.resources.cash, 220_000);
        assert_eq!(state.resources.weekly_burn, 22_000);
        assert_eq!(state.resources.runway_weeks, Some(10));
        assert_eq!(state.team.members.len(), 3);
        // 24 base CP at morale 70 and debt 8 under sustainable pace.
        assert_eq!(state.team.cp_base, 24);
        assert_eq!(state.team.cp_effective, 23);
        assert_eq!(state.project.scope_target, 120.0);
        assert_eq!(state.entropy.bug_backlog, 4);
        assert_eq!(state.plan.focus_card_id, "featureSprint");
        assert_eq!(state.plan.management_card_id, "sustainablePace");
        assert_eq!(state.plan.allocations.total(), 24);
        assert!(state.history.is_empty());
        assert_eq!(state.logs.len(), 1);
    }

    #[test]
    fn new_run_seeds_rng_state() {
        let state = new_state();
        assert_eq!(state.meta.seed, 42);
        assert_eq!(state.meta.rng_state, 42);
        let zero = GameState::new_run(&GameConfig::default(), 0, &FixedClock(0));
        assert_eq!(zero.meta.rng_state, 0x9e37_79b9);
    }

    #[test]
    fn new_run_tracks_cooldowns_for_locking_cards() {
        let state = new_state();
        let keys: Vec<&str> = state.plan.cooldowns.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["crunch", "teamBuilding"]);
        assert!(state.plan.cooldowns.values().all(|&v| v == 0));
    }

    #[test]
    fn new_run_stamps_timestamps_and_id() {
        let state = new_state();
        assert_eq!(state.meta.created_at_iso, "2023-11-14T22:13:20.000Z");
        assert_eq!(state.meta.updated_at_iso, state.meta.created_at_iso);
        assert_eq!(state.meta.run_id, "save-42-1700000000000");
        assert_eq!(state.meta.schema_version, SAVE_SCHEMA_VERSION);
    }

    #[test]
    fn runway_handles_zero_and_negative() {
        assert_eq!(runway_weeks(100, 0), None);
        assert_eq!(runway_weeks(-50, 10), Some(0));
        assert_eq!(runway_weeks(95, 10), Some(9));
    }

    #[test]
    fn metric_delta_rounds_floats() {
        let state = new_state();
        let before = MetricVector::of(&state);
        let mut after = before;
        after.tech_debt += 1.234_567;
        after.cash -= 500;
        let delta = after.delta_from(&before);
        assert_eq!(delta.tech_debt, 1.23);
        assert_eq!(delta.cash, -500);
        assert_eq!(delta.hype, 0.0);
    }

    #[test]
    fn state_json_roundtrip() {
        let state = new_state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
    }
}

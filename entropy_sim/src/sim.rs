// The week resolver and the `Engine` facade.
//
// `Engine` owns the immutable `GameConfig` and an injected `Clock`, and
// exposes every operation the UI (or CLI) needs: `new_run()`,
// `sanitize_plan()`, `preview_week()`, `resolve_week()`,
// `can_advance_week()`, `is_release_available()` and `card_availability()`.
// The engine is a pure function of its inputs:
// `(state, plan override) -> new state`. The input state is never mutated.
//
// ## Week pipeline
//
// `resolve_week()` runs these stages in order. Each stage reads the pre-week
// state unless noted:
//
//   1. Terminal runs short-circuit to an unchanged copy.
//   2. Sanitize the plan (`plan.rs`); an empty allocation with positive
//      capacity goes entirely to the feature lane.
//   3. Event roll (`event.rs`): one float draw, plus a weighted pick when it
//      fires. The event's capacity and feature deltas adjust the allocation,
//      which is re-normalized.
//   4. Work output (`economy.rs`): completion, debt, bugs, quality, scope.
//   5. Milestones (`build.rs`) on the new completion and backlog.
//   6. Hype, then build stability and ghost tasks (one int draw unless the
//      build is clean). Ghost tasks inflate scope.
//   7. Crunch streak and morale.
//   8. Post-launch sales for released runs, then the launch check
//      (`launch.rs`) if a release was requested and the guardrails held on
//      the pre-week state. The launch check scores post-week values.
//   9. Cash and the cash/morale/post-launch streaks.
//  10. Terminal checks (`terminal.rs`).
//  11. The stored cooldowns tick down by one (override values only gate
//      card selection), then the used card's cooldown is applied.
//  12. Snapshot, narrative logs, and the new state with the RNG state and
//      `updated_at_iso` refreshed. The snapshot's `after` metrics are the
//      unrounded week values; the state stores debt and scope rounded.
//
// See also: `state.rs` for `GameState` and `WeekSnapshot`, `save.rs` for
// persistence, `config.rs` for every constant used here.
//
// **Critical constraint: determinism.** Given the same config, input state
// and plan override, `resolve_week()` produces the same state except for
// `meta.updated_at_iso`. The RNG is rebuilt from `meta.rng_state` and its
// final state is written back; the clock never feeds a formula.

use crate::build::{resolve_build, resolve_milestones, stability_score};
use crate::capacity::Capacity;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, GameConfig};
use crate::economy::{
    MoraleInputs, crunch_streak, next_streak, resolve_cash, resolve_hype, resolve_morale,
    resolve_work, weekly_burn,
};
use crate::event::{
    EventDelta, LogEntry, LogKind, append_logs, apply_event_to_allocation, materialize_effect,
    roll_event,
};
use crate::launch::{LaunchInputs, post_launch_week_sales, run_launch_check};
use crate::plan::{CardAvailability, Plan, PlanOverride, SanitizedPlan, card_availability, sanitize_plan};
use crate::prng::GameRng;
use crate::state::*;
use crate::terminal::{TerminalInputs, evaluate_terminal};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Projected one-week deltas for a plan, without events, milestones or a
/// build roll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectedDeltas {
    pub completion_delta: f64,
    pub debt_delta: f64,
    pub bug_delta: i64,
    pub quality_delta: f64,
    pub morale_delta: f64,
    pub hype_delta: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekPreview {
    /// The sanitized plan the projection was computed for.
    pub plan: Plan,
    pub capacity: Capacity,
    pub projected: ProjectedDeltas,
    pub release_available: bool,
}

pub struct Engine {
    config: GameConfig,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(GameConfig::default()).expect("built-in config is valid")
    }
}

impl Engine {
    /// Create an engine reading the system clock. Fails if the config cannot
    /// drive a run (see `GameConfig::validate`).
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn new_run(&self, seed: u64) -> GameState {
        let state = GameState::new_run(&self.config, seed, self.clock.as_ref());
        tracing::info!(
            target: "entropy::sim",
            run_id = %state.meta.run_id,
            seed = state.meta.seed,
            "run.created"
        );
        state
    }

    pub fn sanitize_plan<'a>(
        &'a self,
        state: &GameState,
        overrides: Option<&PlanOverride>,
    ) -> SanitizedPlan<'a> {
        sanitize_plan(&self.config, state, overrides)
    }

    pub fn is_release_available(&self, state: &GameState) -> bool {
        crate::launch::is_release_available(&self.config, state)
    }

    pub fn card_availability(&self, state: &GameState) -> CardAvailability {
        card_availability(&self.config, state)
    }

    /// False for terminal runs, and for a plan that leaves positive capacity
    /// completely unallocated.
    pub fn can_advance_week(&self, state: &GameState, overrides: Option<&PlanOverride>) -> bool {
        if state.is_terminal() {
            return false;
        }
        let sanitized = self.sanitize_plan(state, overrides);
        sanitized.capacity.cp_effective == 0 || sanitized.plan.allocations.total() > 0
    }

    /// Project the plan's effect on the current state. Reads nothing from
    /// the RNG and touches neither history nor the state.
    pub fn preview_week(&self, state: &GameState, overrides: Option<&PlanOverride>) -> WeekPreview {
        let config = &self.config;
        let SanitizedPlan {
            plan,
            capacity,
            focus,
            management,
        } = self.sanitize_plan(state, overrides);
        let alloc = plan.allocations;

        let work = resolve_work(
            config,
            state,
            alloc,
            capacity.cp_effective,
            focus,
            management,
            &EventDelta::default(),
        );
        let morale = resolve_morale(
            config,
            state.resources.morale,
            MoraleInputs {
                management_delta: management.flat_deltas.morale,
                focus_delta: focus.flat_deltas.morale,
                ..MoraleInputs::default()
            },
        );
        let hype = resolve_hype(config, state.market.hype, alloc.marketing, focus, 0.0, 0.0);

        WeekPreview {
            projected: ProjectedDeltas {
                completion_delta: work.completion - state.project.completion,
                debt_delta: round2(work.tech_debt - state.entropy.tech_debt),
                bug_delta: work.bug_backlog - state.entropy.bug_backlog,
                quality_delta: work.quality - state.project.quality,
                morale_delta: round2(morale - state.resources.morale),
                hype_delta: hype - state.market.hype,
            },
            release_available: self.is_release_available(state),
            plan,
            capacity,
        }
    }

    /// Resolve one week. See the module docs for the stage order.
    pub fn resolve_week(&self, current: &GameState, overrides: Option<&PlanOverride>) -> GameState {
        if current.is_terminal() {
            return current.clone();
        }

        let config = &self.config;
        let week = current.run.week;
        let before = MetricVector::of(current);

        // Plan and capacity.
        let SanitizedPlan {
            plan,
            capacity,
            focus,
            management,
        } = self.sanitize_plan(current, overrides);
        let mut allocations = plan.allocations;
        let mut cp_effective = capacity.cp_effective;
        if allocations.total() <= 0 && cp_effective > 0 {
            allocations = Allocations::new(cp_effective, 0, 0, 0);
        }

        // Friction event.
        let mut rng = GameRng::from_state(current.meta.rng_state);
        let roll = roll_event(
            &config.event_trigger,
            &config.friction_events,
            current.entropy.tech_debt,
            current.resources.morale,
            &mut rng,
        );
        let event_delta = materialize_effect(plan.scope_creep_policy, roll.event);
        (cp_effective, allocations) =
            apply_event_to_allocation(allocations, cp_effective, &event_delta);
        if let Some(event) = roll.event {
            tracing::info!(
                target: "entropy::sim",
                week,
                event_id = %event.id,
                chance = roll.chance,
                roll = roll.roll,
                "event.triggered"
            );
        }

        // Work, milestones, hype, build.
        let work = resolve_work(
            config,
            current,
            allocations,
            cp_effective,
            focus,
            management,
            &event_delta,
        );
        let milestones = resolve_milestones(
            config,
            &current.project.milestones_reached,
            work.completion,
            work.bug_backlog,
        );
        for id in &milestones.newly_reached {
            tracing::info!(target: "entropy::sim", week, milestone = %id, "milestone.reached");
        }
        let hype = resolve_hype(
            config,
            current.market.hype,
            allocations.marketing,
            focus,
            milestones.hype_bonus,
            event_delta.hype_delta,
        );
        let stability = stability_score(config, work.tech_debt, work.bug_backlog, work.qa_share);
        let build = resolve_build(config, stability, &mut rng);
        let scope_target =
            work.scope_target + build.ghost_tasks as f64 * config.ghost_tasks.scope_per_task;

        // Morale.
        let (crunch_streak, crunch_penalty) =
            crunch_streak(config, current.resources.crunch_streak, management);
        let morale = resolve_morale(
            config,
            current.resources.morale,
            MoraleInputs {
                milestone_bonus: milestones.morale_bonus,
                management_delta: management.flat_deltas.morale,
                focus_delta: focus.flat_deltas.morale,
                event_delta: event_delta.morale_delta,
                crunch_penalty,
                build: build.result,
            },
        );

        // Sales and launch.
        let mut status = current.run.status;
        let mut week_sales = 0;
        let mut refunds = current.market.refunds;
        let mut product_strength = current.market.product_strength;
        let mut launch_outcome = current.market.launch_outcome;
        let mut launch_week = current.run.launch_week;
        let mut post_launch_weeks = current.run.post_launch_weeks;

        let available_before_week = self.is_release_available(current);
        let release_attempted = plan.release_requested && current.run.status == RunStatus::Active;
        let release_executed = release_attempted && available_before_week;

        if current.run.status == RunStatus::Released {
            post_launch_weeks = current.run.post_launch_weeks + 1;
            let outcome = current.market.launch_outcome.unwrap_or(LaunchOutcome::MixedFair);
            week_sales = post_launch_week_sales(config, outcome, post_launch_weeks);
        }

        let launch = if release_executed {
            let result = run_launch_check(
                config,
                &LaunchInputs {
                    completion: work.completion,
                    scope_target,
                    quality: work.quality,
                    bug_backlog: work.bug_backlog,
                    morale,
                    hype,
                },
            );
            week_sales = result.week_sales;
            refunds += result.refunds;
            product_strength = result.product_strength;
            launch_outcome = Some(result.outcome);
            status = RunStatus::Released;
            launch_week = Some(week);
            post_launch_weeks = 1;
            tracing::info!(
                target: "entropy::sim",
                week,
                outcome = %result.outcome,
                product_strength = result.product_strength,
                week_sales = result.week_sales,
                "launch.executed"
            );
            Some(result)
        } else {
            if release_attempted {
                tracing::warn!(target: "entropy::sim", week, "release.rejected");
            }
            None
        };
        let lifetime_sales = current.market.lifetime_sales + week_sales;

        // Cash and streaks.
        let burn = weekly_burn(config, &current.team.members);
        let cash = resolve_cash(
            config,
            current.resources.cash,
            burn,
            allocations.marketing,
            management,
            week_sales,
        );
        let cash_negative_streak = next_streak(current.resources.cash_negative_streak, cash < 0);
        let morale_below_20_streak = next_streak(
            current.resources.morale_below_20_streak,
            morale < config.terminal.mutiny_morale_line,
        );
        let post_launch_streak = if status == RunStatus::Released {
            next_streak(current.run.post_launch_non_negative_cash_streak, cash >= 0)
        } else {
            0
        };

        // Terminal checks.
        let terminal = evaluate_terminal(
            config,
            &TerminalInputs {
                cash_negative_streak,
                morale_below_20_streak,
                released: status == RunStatus::Released,
                product_strength,
                post_launch_non_negative_cash_streak: post_launch_streak,
            },
        );
        if let Some(result) = &terminal {
            status = result.kind.status();
            tracing::info!(
                target: "entropy::sim",
                week,
                kind = %result.kind,
                "run.terminal"
            );
        }

        // Cooldowns.
        let mut cooldowns: BTreeMap<String, u32> = current
            .plan
            .cooldowns
            .iter()
            .map(|(id, weeks)| (id.clone(), weeks.saturating_sub(1)))
            .collect();
        if management.cooldown_weeks > 0 {
            cooldowns.insert(management.id.clone(), management.cooldown_weeks);
        }

        // Narrative log.
        let mut entries = Vec::new();
        if let Some(event) = roll.event {
            entries.push(LogEntry {
                event_id: Some(event.id.clone()),
                decision: event_delta.decision,
                ..LogEntry::new(
                    week,
                    LogKind::Event,
                    event_delta.message.clone().unwrap_or_else(|| event.name.clone()),
                )
            });
        }
        if !milestones.newly_reached.is_empty() {
            entries.push(LogEntry::new(
                week,
                LogKind::Milestone,
                format!("Reached milestones: {}.", milestones.newly_reached.join(", ")),
            ));
        }
        if let Some(result) = &launch {
            entries.push(LogEntry::new(
                week,
                LogKind::Launch,
                format!("Launch outcome: {}.", result.outcome),
            ));
        }
        if release_attempted && !release_executed {
            entries.push(LogEntry::new(
                week,
                LogKind::Warning,
                "Release request ignored because guardrails were not met.",
            ));
        }
        if let Some(result) = &terminal {
            let kind = if result.kind == TerminalKind::Success {
                LogKind::Success
            } else {
                LogKind::Failure
            };
            entries.push(LogEntry::new(week, kind, result.message.clone()));
        }

        // Assemble the new state.
        let mut next = current.clone();

        next.meta.rng_state = rng.state();
        next.meta.updated_at_iso = self.clock.now_iso();

        next.run.week = if status.is_terminal() { week } else { week + 1 };
        next.run.status = status;
        if terminal.is_some() {
            next.run.result = terminal.clone();
        }
        next.run.launch_week = launch_week;
        next.run.post_launch_weeks = post_launch_weeks;
        next.run.post_launch_non_negative_cash_streak = post_launch_streak;

        next.resources.cash = cash;
        next.resources.morale = morale;
        next.resources.weekly_burn = burn;
        next.resources.runway_weeks = runway_weeks(cash, burn);
        next.resources.morale_below_20_streak = morale_below_20_streak;
        next.resources.cash_negative_streak = cash_negative_streak;
        next.resources.crunch_streak = crunch_streak;

        next.team.cp_base = capacity.cp_base;
        next.team.cp_effective = cp_effective;
        for member in &mut next.team.members {
            member.availability_multiplier = 1.0;
        }

        next.project.completion = work.completion;
        next.project.scope_target = round2(scope_target);
        next.project.quality = work.quality;
        next.project.milestones_reached = milestones.reached;
        next.project.release_ready = work.completion >= config.release_ready.min_completion
            && work.bug_backlog <= config.release_ready.max_bug_backlog;
        next.project.released = matches!(status, RunStatus::Released | RunStatus::Won);

        next.entropy.tech_debt = round2(work.tech_debt);
        next.entropy.bug_backlog = work.bug_backlog;
        next.entropy.entropy_index = compute_entropy_index(work.tech_debt, work.bug_backlog);
        next.entropy.latest_stability_score = round2(stability);
        next.entropy.latest_build_result = build.result;
        next.entropy.latest_ghost_tasks = build.ghost_tasks;

        next.market.hype = hype;
        next.market.product_strength = product_strength;
        next.market.launch_outcome = launch_outcome;
        next.market.week_sales = week_sales;
        next.market.lifetime_sales = lifetime_sales;
        next.market.refunds = refunds;

        let snapshot_plan = SnapshotPlan {
            focus_card_id: focus.id.clone(),
            management_card_id: management.id.clone(),
            scope_creep_policy: plan.scope_creep_policy,
            release_requested: plan.release_requested,
            allocations,
        };
        next.plan = Plan {
            allocations,
            cooldowns,
            release_requested: false,
            ..plan
        };

        let counters = &mut next.counters;
        counters.total_weeks_simulated += 1;
        counters.total_feature_points_done += work.feature_points;
        counters.total_debt_reduced += round2(work.debt_reduction).max(0.0);
        counters.total_bugs_fixed += work.bugs_fixed;
        counters.total_ghost_tasks += build.ghost_tasks;
        counters.total_milestones += milestones.newly_reached.len() as u32;
        if roll.event.is_some() {
            counters.total_events_triggered += 1;
        }

        let after = MetricVector {
            cash,
            morale,
            tech_debt: work.tech_debt,
            bug_backlog: work.bug_backlog,
            completion: work.completion,
            scope_target,
            quality: work.quality,
            hype,
        };
        next.history.push(WeekSnapshot {
            week,
            plan: snapshot_plan,
            capacity: Capacity {
                cp_effective,
                ..capacity
            },
            event: roll.event.map(|event| SnapshotEvent {
                id: event.id.clone(),
                name: event.name.clone(),
                chance: round2(roll.chance),
                roll: round2(roll.roll),
                decision: event_delta.decision,
                message: event_delta.message.clone(),
            }),
            build: SnapshotBuild {
                stability_score: round2(stability),
                result: build.result,
                ghost_tasks: build.ghost_tasks,
            },
            milestones: milestones.newly_reached,
            release: SnapshotRelease {
                attempted: release_attempted,
                executed: release_executed,
                available_before_week,
                outcome: launch.map(|result| result.outcome),
                product_strength: launch.map(|result| result.product_strength),
            },
            sales: SnapshotSales {
                week_sales,
                lifetime_sales,
                refunds,
            },
            before,
            after,
            deltas: after.delta_from(&before),
            terminal,
        });
        append_logs(&mut next.logs, entries, config.log_limit);

        tracing::debug!(
            target: "entropy::sim",
            week,
            status = ?next.run.status,
            cash = next.resources.cash,
            morale = next.resources.morale,
            tech_debt = next.entropy.tech_debt,
            bug_backlog = next.entropy.bug_backlog,
            completion = next.project.completion,
            build = ?build.result,
            "week.resolved"
        );
        next
    }
}

// Economic and quality resolution for one week.
//
// Takes the final per-lane allocation (after sanitizing and event effects)
// and the resolved cards, and computes the week's work output: feature
// points, completion, tech debt, bug backlog, quality and scope. Hype,
// morale and cash are resolved separately because they depend on the
// milestone and build outcomes evaluated in between (see `sim.rs`).
//
// Every formula reads the pre-week state; the only exception is the quality
// decay check, which looks at the new tech debt.
//
// `preview_week()` runs the same functions with a zero `EventDelta` and no
// milestone or build effects, so the preview can never drift from the real
// resolution.

use crate::config::{FocusCard, GameConfig, ManagementCard};
use crate::event::EventDelta;
use crate::state::{GameState, TeamMember};
use crate::types::*;

/// Lane-level results of a week's work.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkOutput {
    pub feature_share: f64,
    pub qa_share: f64,
    pub complexity_ratio: f64,
    pub bug_pressure: f64,
    pub feature_points: i64,
    pub completion: f64,
    pub debt_gain: f64,
    pub debt_reduction: f64,
    /// Clamped, unrounded.
    pub tech_debt: f64,
    pub bugs_generated: i64,
    pub bugs_fixed: i64,
    pub bug_backlog: i64,
    pub quality_gain: f64,
    pub quality_decay: f64,
    pub quality: f64,
    /// Scope after the event's scope delta; ghost tasks are added later.
    pub scope_target: f64,
}

/// Resolve feature, refactor and QA work against the pre-week state.
pub fn resolve_work(
    config: &GameConfig,
    state: &GameState,
    alloc: Allocations,
    cp_effective: i64,
    focus: &FocusCard,
    management: &ManagementCard,
    event: &EventDelta,
) -> WorkOutput {
    let f = &config.formulas;
    let divisor = cp_effective.max(1) as f64;
    let feature = alloc.feature as f64;
    let refactor = alloc.refactor as f64;
    let qa = alloc.qa as f64;

    let feature_share = feature / divisor;
    let qa_share = qa / divisor;
    let complexity_ratio = (state.project.scope_target - state.project.completion) / divisor;

    let bug_pressure = (state.entropy.bug_backlog as f64 / f.bugs.feature_bug_pressure_divisor)
        .min(f.bugs.feature_bug_pressure_cap);
    let feature_points = (feature * focus.multipliers.feature * (1.0 - bug_pressure)).floor();
    let completion = (state.project.completion + feature_points).min(state.project.scope_target);

    let debt_reduction = refactor
        * f.debt.refactor_base_efficiency
        * focus.multipliers.refactor
        * (1.0 + qa / divisor);

    let mut debt_gain = 0.0;
    if feature_share > f.debt.feature_rush_threshold {
        debt_gain += (feature_share - f.debt.feature_rush_threshold) * f.debt.feature_rush_multiplier;
    }
    if qa_share < f.debt.qa_share_floor {
        debt_gain += (f.debt.qa_share_floor - qa_share) * f.debt.qa_penalty_multiplier;
    }
    if complexity_ratio > f.debt.complexity_ratio_threshold {
        debt_gain += f.debt.complexity_flat_gain;
    }
    debt_gain *= management.multipliers.debt_gain;
    debt_gain += focus.flat_deltas.debt;

    let tech_debt = config
        .ranges
        .debt
        .clamp(state.entropy.tech_debt + debt_gain - debt_reduction + event.debt_delta);

    let bugs_generated = (feature
        * (f.bugs.generation_base + state.entropy.tech_debt / f.bugs.generation_debt_divisor))
        .ceil() as i64;
    let bugs_fixed = (qa * f.bugs.fix_per_qa_cp * focus.multipliers.qa).floor() as i64;
    let bug_backlog =
        (state.entropy.bug_backlog + bugs_generated - bugs_fixed + event.bug_delta).max(0);

    let quality_gain = (qa * f.quality.qa_contribution * focus.multipliers.qa
        + feature * f.quality.feature_contribution)
        .floor()
        * focus.multipliers.quality;
    let quality_decay = if tech_debt > f.quality.high_debt_decay_threshold {
        f.quality.high_debt_decay_value
    } else {
        0.0
    };
    let quality = config
        .ranges
        .quality
        .clamp(state.project.quality + quality_gain - quality_decay + event.quality_delta);

    WorkOutput {
        feature_share,
        qa_share,
        complexity_ratio,
        bug_pressure,
        feature_points: feature_points as i64,
        completion,
        debt_gain,
        debt_reduction,
        tech_debt,
        bugs_generated,
        bugs_fixed,
        bug_backlog,
        quality_gain,
        quality_decay,
        quality,
        scope_target: state.project.scope_target + event.scope_delta,
    }
}

pub fn resolve_hype(
    config: &GameConfig,
    hype: f64,
    marketing: i64,
    focus: &FocusCard,
    milestone_hype: f64,
    event_hype: f64,
) -> f64 {
    let params = &config.formulas.hype;
    let gain = (marketing as f64 * params.cp_to_hype * focus.multipliers.marketing).floor();
    let decay = if marketing == 0 {
        params.no_marketing_decay
    } else {
        0.0
    };
    config
        .ranges
        .hype
        .clamp(hype + gain + milestone_hype - decay + event_hype)
}

/// Crunch streak after this week and the morale penalty it carries.
pub fn crunch_streak(
    config: &GameConfig,
    previous_streak: u32,
    management: &ManagementCard,
) -> (u32, f64) {
    if !management.is_crunch {
        return (0, 0.0);
    }
    let streak = previous_streak + 1;
    let penalty =
        f64::from(streak.saturating_sub(1)) * config.formulas.morale.crunch_streak_penalty_per_week;
    (streak, penalty)
}

/// Everything that moves morale in a week besides the base decay.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoraleInputs {
    pub milestone_bonus: f64,
    pub management_delta: f64,
    pub focus_delta: f64,
    pub event_delta: f64,
    pub crunch_penalty: f64,
    pub build: BuildResult,
}

pub fn resolve_morale(config: &GameConfig, morale: f64, inputs: MoraleInputs) -> f64 {
    let params = &config.formulas.morale;
    let mut next = morale - params.base_decay_per_week;
    next += inputs.milestone_bonus;
    next += inputs.management_delta;
    next += inputs.focus_delta;
    next += inputs.event_delta;
    next -= inputs.crunch_penalty;
    match inputs.build {
        BuildResult::Clean => next += params.clean_build_bonus,
        BuildResult::Failed => next -= params.failed_build_penalty,
        BuildResult::Warning | BuildResult::None => {}
    }
    config.ranges.morale.clamp(next)
}

/// Office rent plus the current roster's salaries.
pub fn weekly_burn(config: &GameConfig, members: &[TeamMember]) -> i64 {
    config.economy.office_rent_per_week + members.iter().map(|member| member.salary).sum::<i64>()
}

/// Cash after burn, marketing spend, the management card's flat cash delta
/// and the week's sales, floored to whole currency.
pub fn resolve_cash(
    config: &GameConfig,
    cash: i64,
    weekly_burn: i64,
    marketing: i64,
    management: &ManagementCard,
    week_sales: i64,
) -> i64 {
    let marketing_spend = marketing as f64 * config.economy.marketing_extra_spend_per_cp;
    (cash as f64 - weekly_burn as f64 - marketing_spend
        + management.flat_deltas.cash as f64
        + week_sales as f64)
        .floor() as i64
}

/// Increment `streak` while `condition` holds, reset to 0 otherwise.
pub fn next_streak(streak: u32, condition: bool) -> u32 {
    if condition { streak + 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn setup() -> (GameConfig, GameState) {
        let config = GameConfig::default();
        let state = GameState::new_run(&config, 1, &FixedClock(0));
        (config, state)
    }

    fn cards<'a>(config: &'a GameConfig, focus: &str, mgmt: &str) -> (&'a FocusCard, &'a ManagementCard) {
        (
            config.focus_card(focus).unwrap(),
            config.management_card(mgmt).unwrap(),
        )
    }

    #[test]
    fn starting_week_work_output() {
        let (config, state) = setup();
        let (focus, mgmt) = cards(&config, "featureSprint", "sustainablePace");
        let alloc = Allocations::new(7, 6, 4, 6);
        let out = resolve_work(&config, &state, alloc, 23, focus, mgmt, &EventDelta::default());

        // bug pressure 4/200 = 0.02; 7 * 1.25 * 0.98 = 8.575
        assert_eq!(out.feature_points, 8);
        assert_eq!(out.completion, 8.0);
        // ceil(7 * (0.08 + 8/250)) = ceil(0.784) = 1; floor(6 * 0.55 * 0.9) = 2
        assert_eq!(out.bugs_generated, 1);
        assert_eq!(out.bugs_fixed, 2);
        assert_eq!(out.bug_backlog, 3);
        // floor(6*0.2*0.9 + 7*0.03) = floor(1.29) = 1
        assert_eq!(out.quality_gain, 1.0);
        assert_eq!(out.quality, 31.0);
        // complexity 120/23 = 5.2 stays under 6; only the focus flat debt applies.
        assert!((out.debt_gain - 1.0).abs() < 1e-9);
        // 6 * 0.35 * (1 + 6/23)
        assert!((out.debt_reduction - 2.647_826_086).abs() < 1e-6);
        assert!((out.tech_debt - 6.352_173_913).abs() < 1e-6);
        assert_eq!(out.scope_target, 120.0);
    }

    #[test]
    fn feature_rush_and_qa_shortfall_add_debt() {
        let (config, state) = setup();
        let (focus, mgmt) = cards(&config, "featureSprint", "sustainablePace");
        let alloc = Allocations::new(23, 0, 0, 0);
        let out = resolve_work(&config, &state, alloc, 23, focus, mgmt, &EventDelta::default());
        // (1 - 0.8) * 25 + (0.1 - 0) * 20 + focus flat 1 = 8
        assert!((out.debt_gain - 8.0).abs() < 1e-9);
        assert!((out.tech_debt - 16.0).abs() < 1e-9);
    }

    #[test]
    fn completion_never_exceeds_scope() {
        let (config, mut state) = setup();
        state.project.completion = 118.0;
        let (focus, mgmt) = cards(&config, "featureSprint", "sustainablePace");
        let out = resolve_work(
            &config,
            &state,
            Allocations::new(20, 0, 0, 3),
            23,
            focus,
            mgmt,
            &EventDelta::default(),
        );
        assert_eq!(out.completion, 120.0);
    }

    #[test]
    fn event_deltas_apply_to_work() {
        let (config, state) = setup();
        let (focus, mgmt) = cards(&config, "featureSprint", "sustainablePace");
        let event = EventDelta {
            bug_delta: 8,
            quality_delta: -2.0,
            scope_delta: 6.0,
            ..EventDelta::default()
        };
        let out = resolve_work(&config, &state, Allocations::new(7, 6, 4, 6), 23, focus, mgmt, &event);
        assert_eq!(out.bug_backlog, 11);
        assert_eq!(out.quality, 29.0);
        assert_eq!(out.scope_target, 126.0);
    }

    #[test]
    fn bug_backlog_floors_at_zero() {
        let (config, mut state) = setup();
        state.entropy.bug_backlog = 0;
        let (focus, mgmt) = cards(&config, "cleanupWeek", "sustainablePace");
        let out = resolve_work(
            &config,
            &state,
            Allocations::new(0, 3, 0, 20),
            23,
            focus,
            mgmt,
            &EventDelta::default(),
        );
        assert_eq!(out.bug_backlog, 0);
        assert_eq!(out.feature_points, 0);
    }

    #[test]
    fn hype_gain_and_decay() {
        let config = GameConfig::default();
        let focus = config.focus_card("featureSprint").unwrap();
        // floor(4 * 1.2) = 4
        assert_eq!(resolve_hype(&config, 10.0, 4, focus, 0.0, 0.0), 14.0);
        assert_eq!(resolve_hype(&config, 10.0, 0, focus, 0.0, 0.0), 7.0);
        assert_eq!(resolve_hype(&config, 1.0, 0, focus, 0.0, -1.0), 0.0);
        assert_eq!(resolve_hype(&config, 199.0, 10, focus, 4.0, 0.0), 200.0);
    }

    #[test]
    fn crunch_streak_penalizes_consecutive_weeks() {
        let config = GameConfig::default();
        let crunch = config.management_card("crunch").unwrap();
        let pace = config.management_card("sustainablePace").unwrap();
        assert_eq!(crunch_streak(&config, 0, crunch), (1, 0.0));
        assert_eq!(crunch_streak(&config, 1, crunch), (2, 2.0));
        assert_eq!(crunch_streak(&config, 2, crunch), (3, 4.0));
        assert_eq!(crunch_streak(&config, 5, pace), (0, 0.0));
    }

    #[test]
    fn morale_applies_build_result() {
        let config = GameConfig::default();
        let clean = MoraleInputs {
            build: BuildResult::Clean,
            ..MoraleInputs::default()
        };
        assert_eq!(resolve_morale(&config, 70.0, clean), 69.0);
        let failed = MoraleInputs {
            build: BuildResult::Failed,
            crunch_penalty: 2.0,
            ..MoraleInputs::default()
        };
        assert_eq!(resolve_morale(&config, 70.0, failed), 61.0);
        let boosted = MoraleInputs {
            management_delta: 10.0,
            milestone_bonus: 5.0,
            build: BuildResult::Warning,
            ..MoraleInputs::default()
        };
        assert_eq!(resolve_morale(&config, 95.0, boosted), 100.0);
    }

    #[test]
    fn cash_subtracts_burn_and_adds_sales() {
        let (config, state) = setup();
        let burn = weekly_burn(&config, &state.team.members);
        assert_eq!(burn, 22_000);
        let team_building = config.management_card("teamBuilding").unwrap();
        assert_eq!(
            resolve_cash(&config, 220_000, burn, 4, team_building, 0),
            190_000
        );
        let pace = config.management_card("sustainablePace").unwrap();
        assert_eq!(resolve_cash(&config, 10_000, burn, 0, pace, 30_000), 18_000);
    }

    #[test]
    fn streaks_reset() {
        assert_eq!(next_streak(3, true), 4);
        assert_eq!(next_streak(3, false), 0);
    }
}

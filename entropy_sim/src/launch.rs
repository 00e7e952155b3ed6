// Release guardrails, the launch check, and post-launch sales.
//
// A release executes only when the plan requests it, the run is `Active`,
// and the guardrails hold on the state *before* the week resolves. The launch
// check itself then scores the product on the *post-week* values:
//
//   ratio    = clamp(completion / scope, 0, 1.2)        (0 when scope <= 0)
//   bug_term = max(0, base - min(base, bugs * factor))
//   strength = ratio * w_c + quality * w_q + bug_term + morale * w_m
//
// and classifies `delta = strength - hype` into one of four outcomes. The
// outcome is locked in for the rest of the run and drives every later
// week's sales through `post_launch_week_sales()`.

use crate::config::GameConfig;
use crate::state::GameState;
use crate::types::*;

/// Whether the guardrails allow a release from `state`.
pub fn is_release_available(config: &GameConfig, state: &GameState) -> bool {
    if state.run.status != RunStatus::Active || state.project.released {
        return false;
    }
    let req = &config.release_guardrails;
    state.project.completion >= req.min_completion
        && state.project.quality >= req.min_quality
        && state.run.week >= req.min_week
        && state.resources.cash >= req.min_cash
}

/// Post-week values the launch check scores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaunchInputs {
    pub completion: f64,
    pub scope_target: f64,
    pub quality: f64,
    pub bug_backlog: i64,
    pub morale: f64,
    pub hype: f64,
}

pub fn product_strength(config: &GameConfig, inputs: &LaunchInputs) -> f64 {
    let params = &config.formulas.launch.product_strength;
    let ratio = if inputs.scope_target > 0.0 {
        (inputs.completion / inputs.scope_target).clamp(0.0, 1.2)
    } else {
        0.0
    };
    let bug_penalty =
        (inputs.bug_backlog as f64 * params.bug_penalty_factor).min(params.bug_quality_base);
    let bug_term = (params.bug_quality_base - bug_penalty).max(0.0);
    ratio * params.completion_weight
        + inputs.quality * params.quality_weight
        + bug_term
        + inputs.morale * params.morale_weight
}

pub fn classify(config: &GameConfig, strength: f64, hype: f64) -> LaunchOutcome {
    let thresholds = &config.formulas.launch.outcomes;
    let delta = strength - hype;
    if delta >= thresholds.miracle_delta_threshold {
        LaunchOutcome::Miracle
    } else if delta <= thresholds.scam_delta_threshold {
        LaunchOutcome::Scam
    } else if strength >= thresholds.hidden_gem_product_strength_threshold
        && hype < thresholds.hidden_gem_hype_ceiling
    {
        LaunchOutcome::HiddenGem
    } else {
        LaunchOutcome::MixedFair
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaunchResult {
    /// Rounded to two decimals.
    pub product_strength: f64,
    pub outcome: LaunchOutcome,
    pub week_sales: i64,
    pub refunds: i64,
    /// `strength - hype`, rounded to two decimals.
    pub delta: f64,
}

pub fn run_launch_check(config: &GameConfig, inputs: &LaunchInputs) -> LaunchResult {
    let launch = &config.formulas.launch;
    let strength = product_strength(config, inputs);
    let outcome = classify(config, strength, inputs.hype);

    let base = launch.base_sales;
    let refund = if outcome == LaunchOutcome::Scam {
        base * launch.refund_penalty_rate_scam
    } else {
        0.0
    };
    let week_sales = ((base * launch.sales_multiplier.get(outcome) - refund).floor() as i64).max(0);

    LaunchResult {
        product_strength: round2(strength),
        outcome,
        week_sales,
        refunds: refund.floor() as i64,
        delta: round2(strength - inputs.hype),
    }
}

/// Sales in post-launch week `week` (the launch week is week 1).
pub fn post_launch_week_sales(config: &GameConfig, outcome: LaunchOutcome, week: u32) -> i64 {
    let launch = &config.formulas.launch;
    let params = launch.weekly_post_launch_sales.get(outcome);
    let base = launch.base_sales;
    let floor_value = base * params.floor_multiplier;

    let raw = if outcome == LaunchOutcome::HiddenGem {
        if week <= params.growth_weeks {
            let growth = 1.0 + params.growth_per_week * (f64::from(week) - 1.0);
            base * params.base_multiplier * growth
        } else {
            let grown = base
                * params.base_multiplier
                * (1.0 + params.growth_per_week * (f64::from(params.growth_weeks) - 1.0));
            grown * params.decay.powi((week - params.growth_weeks) as i32)
        }
    } else {
        base * params.base_multiplier * params.decay.powi(week.saturating_sub(1) as i32)
    };
    raw.max(floor_value).floor() as i64
}

// Build stability and milestone evaluation.
//
// After the week's work resolves, the build is scored:
//
//   stability = 100 - debt_penalty * debt
//                   - min(bug_penalty_cap, bug_penalty * bugs)
//                   + qa_share_bonus * qa_share
//
// and classified `Clean` / `Warning` / `Failed` against two thresholds.
// Warning and failed builds emit ghost tasks (a `next_int` draw from the
// configured range) that inflate the scope target.
//
// Milestones are evaluated in catalog order against the week's new
// completion and bug backlog. Each fires at most once per run.
//
// **Critical constraint: determinism.** A clean build draws nothing; warning
// and failed builds draw exactly one integer.

use crate::config::{GameConfig, Milestone};
use crate::prng::GameRng;
use crate::types::*;

pub fn stability_score(config: &GameConfig, tech_debt: f64, bug_backlog: i64, qa_share: f64) -> f64 {
    let params = &config.formulas.stability;
    100.0 - params.debt_penalty * tech_debt
        - (params.bug_penalty * bug_backlog as f64).min(params.bug_penalty_cap)
        + params.qa_share_bonus_factor * qa_share
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOutcome {
    pub result: BuildResult,
    pub ghost_tasks: i64,
}

pub fn resolve_build(config: &GameConfig, stability: f64, rng: &mut GameRng) -> BuildOutcome {
    let thresholds = &config.formulas.stability;
    let ranges = &config.ghost_tasks;
    if stability >= thresholds.clean_threshold {
        BuildOutcome {
            result: BuildResult::Clean,
            ghost_tasks: 0,
        }
    } else if stability >= thresholds.warning_threshold {
        BuildOutcome {
            result: BuildResult::Warning,
            ghost_tasks: rng.next_int(ranges.warning.min, ranges.warning.max),
        }
    } else {
        BuildOutcome {
            result: BuildResult::Failed,
            ghost_tasks: rng.next_int(ranges.failed.min, ranges.failed.max),
        }
    }
}

/// Milestones reached this week and their summed rewards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MilestoneOutcome {
    /// Every milestone reached so far, previous ones first.
    pub reached: Vec<String>,
    pub newly_reached: Vec<String>,
    pub morale_bonus: f64,
    pub hype_bonus: f64,
}

fn milestone_met(milestone: &Milestone, completion: f64, bug_backlog: i64) -> bool {
    if completion < milestone.threshold_completion {
        return false;
    }
    milestone
        .max_bug_backlog
        .is_none_or(|limit| bug_backlog <= limit)
}

pub fn resolve_milestones(
    config: &GameConfig,
    already_reached: &[String],
    completion: f64,
    bug_backlog: i64,
) -> MilestoneOutcome {
    let mut outcome = MilestoneOutcome {
        reached: already_reached.to_vec(),
        ..MilestoneOutcome::default()
    };
    for milestone in &config.milestones {
        if outcome.reached.contains(&milestone.id) {
            continue;
        }
        if !milestone_met(milestone, completion, bug_backlog) {
            continue;
        }
        outcome.reached.push(milestone.id.clone());
        outcome.newly_reached.push(milestone.id.clone());
        outcome.morale_bonus += milestone.reward.morale;
        outcome.hype_bonus += milestone.reward.hype;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stability_formula() {
        let config = GameConfig::default();
        // 100 - 0.9*10 - min(40, 0.6*5) + 20*0.25 = 93
        assert!((stability_score(&config, 10.0, 5, 0.25) - 93.0).abs() < 1e-9);
        // Bug term caps at 40.
        assert!((stability_score(&config, 0.0, 1000, 0.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn clean_build_draws_nothing() {
        let config = GameConfig::default();
        let mut rng = GameRng::new(9);
        let outcome = resolve_build(&config, 70.0, &mut rng);
        assert_eq!(outcome.result, BuildResult::Clean);
        assert_eq!(outcome.ghost_tasks, 0);
        assert_eq!(rng.state(), GameRng::new(9).state());
    }

    #[test]
    fn warning_and_failed_builds_draw_ghost_tasks() {
        let config = GameConfig::default();
        for seed in 1..50 {
            let mut rng = GameRng::new(seed);
            let warning = resolve_build(&config, 55.0, &mut rng);
            assert_eq!(warning.result, BuildResult::Warning);
            assert!((1..=3).contains(&warning.ghost_tasks));

            let failed = resolve_build(&config, 39.99, &mut rng);
            assert_eq!(failed.result, BuildResult::Failed);
            assert!((4..=8).contains(&failed.ghost_tasks));
        }
    }

    #[test]
    fn milestones_fire_in_order_once() {
        let config = GameConfig::default();
        let first = resolve_milestones(&config, &[], 61.0, 0);
        assert_eq!(first.newly_reached, vec!["prototype", "verticalSlice"]);
        assert_eq!(first.morale_bonus, 11.0);
        assert_eq!(first.hype_bonus, 10.0);

        let second = resolve_milestones(&config, &first.reached, 70.0, 0);
        assert!(second.newly_reached.is_empty());
        assert_eq!(second.reached, first.reached);
        assert_eq!(second.morale_bonus, 0.0);
    }

    #[test]
    fn ship_ready_respects_bug_ceiling() {
        let config = GameConfig::default();
        let buggy = resolve_milestones(&config, &[], 120.0, 26);
        assert!(!buggy.newly_reached.contains(&"shipReady".to_string()));
        assert_eq!(buggy.newly_reached.len(), 3);

        let clean = resolve_milestones(&config, &buggy.reached, 120.0, 25);
        assert_eq!(clean.newly_reached, vec!["shipReady"]);
    }
}

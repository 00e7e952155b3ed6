// Data-driven game configuration.
//
// All tunable simulation parameters live here in `GameConfig`, optionally
// loaded from JSON at startup. The engine never uses magic numbers; every
// formula in `capacity.rs`, `economy.rs`, `build.rs`, `launch.rs` and
// `terminal.rs` reads its constants from this struct. The config also owns
// the static catalogs: focus cards, management cards, milestones and
// friction events. Catalog order is significant: sanitizer fallbacks pick the
// first selectable card, milestones are evaluated in order, and the weighted
// event pick walks the event list in order.
//
// `GameConfig::default()` carries the built-in balance. `load_or_default()`
// reads an override file and falls back to the built-in values (with a
// warning) when the file is missing or malformed.
//
// See also: `sim.rs` whose `Engine` owns the `GameConfig`, `state.rs` for the
// starting state built from `StartingValues`.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation formulas. Two engines only produce identical weeks from the
// same save if they share an identical config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

/// Inclusive numeric range used for clamped resources.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range (`min` wins if the range is inverted).
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Inclusive integer range for random draws. Order of `min`/`max` does not
/// matter to the RNG.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

/// Four values keyed by launch outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PerOutcome<T> {
    pub miracle: T,
    pub mixed_fair: T,
    pub hidden_gem: T,
    pub scam: T,
}

impl<T> PerOutcome<T> {
    pub fn get(&self, outcome: crate::types::LaunchOutcome) -> &T {
        use crate::types::LaunchOutcome;
        match outcome {
            LaunchOutcome::Miracle => &self.miracle,
            LaunchOutcome::MixedFair => &self.mixed_fair,
            LaunchOutcome::HiddenGem => &self.hidden_gem,
            LaunchOutcome::Scam => &self.scam,
        }
    }
}

// ---------------------------------------------------------------------------
// Starting values, team, economy
// ---------------------------------------------------------------------------

/// Resource values for a brand-new run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartingValues {
    pub cash: i64,
    pub morale: f64,
    pub tech_debt: f64,
    pub bug_backlog: i64,
    pub hype: f64,
    pub reputation: f64,
    pub quality: f64,
    pub completion: f64,
    pub scope_target: f64,
}

/// A member of the fixed developer roster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Developer {
    pub id: String,
    pub name: String,
    /// Capacity points this developer contributes per week at full
    /// availability.
    pub base_cp: f64,
    pub salary: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EconomyParams {
    pub office_rent_per_week: i64,
    /// Extra cash spent per CP allocated to marketing.
    pub marketing_extra_spend_per_cp: f64,
}

/// Clamp windows for the bounded resources.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ranges {
    pub morale: Bounds,
    pub debt: Bounds,
    pub quality: Bounds,
    pub hype: Bounds,
    pub reputation: Bounds,
}

// ---------------------------------------------------------------------------
// Formula constants
// ---------------------------------------------------------------------------

/// `morale_multiplier = morale_base + morale_factor * morale`;
/// `debt_multiplier = max(debt_floor, 1 - debt_factor * debt / 100)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapacityParams {
    pub morale_base: f64,
    pub morale_factor: f64,
    pub debt_factor: f64,
    pub debt_floor: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoraleParams {
    pub base_decay_per_week: f64,
    pub clean_build_bonus: f64,
    pub failed_build_penalty: f64,
    /// Applied per crunch week beyond the first in a consecutive streak.
    pub crunch_streak_penalty_per_week: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebtParams {
    pub feature_rush_threshold: f64,
    pub feature_rush_multiplier: f64,
    pub qa_share_floor: f64,
    pub qa_penalty_multiplier: f64,
    pub complexity_ratio_threshold: f64,
    pub complexity_flat_gain: f64,
    pub refactor_base_efficiency: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BugParams {
    pub generation_base: f64,
    pub generation_debt_divisor: f64,
    pub fix_per_qa_cp: f64,
    pub feature_bug_pressure_cap: f64,
    pub feature_bug_pressure_divisor: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityParams {
    pub qa_contribution: f64,
    pub feature_contribution: f64,
    pub high_debt_decay_threshold: f64,
    pub high_debt_decay_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HypeParams {
    pub cp_to_hype: f64,
    /// Hype lost in any week with exactly zero marketing CP.
    pub no_marketing_decay: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StabilityParams {
    pub debt_penalty: f64,
    pub bug_penalty: f64,
    pub bug_penalty_cap: f64,
    pub qa_share_bonus_factor: f64,
    pub clean_threshold: f64,
    pub warning_threshold: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductStrengthParams {
    pub completion_weight: f64,
    pub quality_weight: f64,
    pub morale_weight: f64,
    pub bug_quality_base: f64,
    pub bug_penalty_factor: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutcomeThresholds {
    pub miracle_delta_threshold: f64,
    pub scam_delta_threshold: f64,
    pub hidden_gem_product_strength_threshold: f64,
    pub hidden_gem_hype_ceiling: f64,
}

/// Weekly sales curve after launch, as multiples of `base_sales`.
///
/// With `growth_weeks == 0` sales decay geometrically from post-launch
/// week 1. Otherwise they grow linearly by `growth_per_week` for
/// `growth_weeks` weeks and then decay by `decay` per week. Both shapes are
/// floored at `floor_multiplier * base_sales`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostLaunchSales {
    pub base_multiplier: f64,
    pub decay: f64,
    pub floor_multiplier: f64,
    #[serde(default)]
    pub growth_per_week: f64,
    #[serde(default)]
    pub growth_weeks: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaunchParams {
    pub base_sales: f64,
    pub product_strength: ProductStrengthParams,
    pub outcomes: OutcomeThresholds,
    pub sales_multiplier: PerOutcome<f64>,
    pub refund_penalty_rate_scam: f64,
    pub weekly_post_launch_sales: PerOutcome<PostLaunchSales>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Formulas {
    pub capacity: CapacityParams,
    pub morale: MoraleParams,
    pub debt: DebtParams,
    pub bugs: BugParams,
    pub quality: QualityParams,
    pub hype: HypeParams,
    pub stability: StabilityParams,
    pub launch: LaunchParams,
}

/// Weekly friction-event trigger chance:
/// `clamp(base + debt / debt_divisor + (baseline - morale) / morale_divisor, min, max)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventTriggerParams {
    pub base_chance: f64,
    pub debt_divisor: f64,
    pub morale_offset_baseline: f64,
    pub morale_divisor: f64,
    pub min_chance: f64,
    pub max_chance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GhostTaskParams {
    pub warning: IntRange,
    pub failed: IntRange,
    /// Scope (FP) added to `scope_target` per ghost task.
    pub scope_per_task: f64,
}

/// Minimums that must all hold (on the pre-week state) for a release request
/// to execute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReleaseGuardrails {
    pub min_completion: f64,
    pub min_quality: f64,
    pub min_week: u32,
    pub min_cash: i64,
}

/// Rule for the informational `project.release_ready` flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReleaseReadyRule {
    pub min_completion: f64,
    pub max_bug_backlog: i64,
}

/// Run-ending thresholds, checked in order after every week.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerminalParams {
    pub insolvency_streak: u32,
    pub mutiny_streak: u32,
    /// Morale strictly below this line extends the mutiny streak.
    pub mutiny_morale_line: f64,
    pub delisting_strength_floor: f64,
    pub required_post_launch_weeks: u32,
}

// ---------------------------------------------------------------------------
// Catalogs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FocusMultipliers {
    pub feature: f64,
    pub refactor: f64,
    pub quality: f64,
    pub marketing: f64,
    pub qa: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FocusFlatDeltas {
    #[serde(default)]
    pub debt: f64,
    #[serde(default)]
    pub morale: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FocusConstraints {
    /// The card may not be chosen two weeks in a row.
    #[serde(default)]
    pub cannot_repeat_consecutively: bool,
    /// The card is locked until `completion` reaches this value.
    #[serde(default)]
    pub min_completion: Option<f64>,
}

/// A weekly focus card: throughput/quality multipliers per lane.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FocusCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub multipliers: FocusMultipliers,
    #[serde(default)]
    pub flat_deltas: FocusFlatDeltas,
    #[serde(default)]
    pub constraints: FocusConstraints,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagementMultipliers {
    pub cp_base: f64,
    pub cp_effective: f64,
    pub debt_gain: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ManagementFlatDeltas {
    #[serde(default)]
    pub morale: f64,
    #[serde(default)]
    pub cash: i64,
}

/// A weekly management card: capacity/debt multipliers and flat deltas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagementCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub multipliers: ManagementMultipliers,
    #[serde(default)]
    pub flat_deltas: ManagementFlatDeltas,
    /// Weeks the card stays locked after use. 0 = always available.
    #[serde(default)]
    pub cooldown_weeks: u32,
    /// Using this card extends the crunch streak.
    #[serde(default)]
    pub is_crunch: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MilestoneReward {
    #[serde(default)]
    pub morale: f64,
    #[serde(default)]
    pub hype: f64,
}

/// A one-time reward for reaching a completion threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub threshold_completion: f64,
    /// If set, the milestone only fires while the bug backlog is at most
    /// this value.
    #[serde(default)]
    pub max_bug_backlog: Option<i64>,
    #[serde(default)]
    pub reward: MilestoneReward,
}

/// Numeric deltas carried by a friction event (or one of its decision
/// branches). Every field defaults to zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDeltas {
    pub cp_feature_delta: i64,
    pub cp_total_delta: i64,
    pub debt_delta: f64,
    pub bug_delta: i64,
    pub quality_delta: f64,
    pub morale_delta: f64,
    pub hype_delta: f64,
    pub scope_delta: f64,
    pub message: Option<String>,
}

/// Two-branch effect chosen by the plan's scope-creep policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionBranches {
    pub accept: EffectDeltas,
    pub reject: EffectDeltas,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventEffect {
    #[serde(flatten)]
    pub base: EffectDeltas,
    /// Present when the event requires a player decision.
    #[serde(default)]
    pub decision: Option<DecisionBranches>,
}

/// A weighted random weekly disruption.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrictionEvent {
    pub id: String,
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub effect: EventEffect,
}

// ---------------------------------------------------------------------------
// Top-level game config
// ---------------------------------------------------------------------------

/// Top-level game configuration. Loaded once, never mutated at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    pub starting: StartingValues,
    pub team: Vec<Developer>,
    pub economy: EconomyParams,
    pub ranges: Ranges,
    pub formulas: Formulas,
    pub event_trigger: EventTriggerParams,
    pub ghost_tasks: GhostTaskParams,
    pub release_guardrails: ReleaseGuardrails,
    pub release_ready: ReleaseReadyRule,
    pub terminal: TerminalParams,
    /// Maximum number of narrative log entries kept in the state.
    pub log_limit: usize,
    pub focus_cards: Vec<FocusCard>,
    pub management_cards: Vec<ManagementCard>,
    pub milestones: Vec<Milestone>,
    pub friction_events: Vec<FrictionEvent>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse game config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read game config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid game config: {0}")]
    Invalid(String),
}

impl GameConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Load `path` if given, falling back to the built-in balance on any
    /// failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(
                    target: "entropy::config",
                    path = %path.display(),
                    "config.loaded"
                );
                config
            }
            Err(err) => {
                tracing::warn!(
                    target: "entropy::config",
                    path = %path.display(),
                    error = %err,
                    "config.load_failed"
                );
                Self::default()
            }
        }
    }

    /// Reject configs the engine cannot run: empty card catalogs, duplicate
    /// catalog ids, or a non-positive log limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.focus_cards.is_empty() {
            return Err(ConfigError::Invalid("focus card catalog is empty".into()));
        }
        if self.management_cards.is_empty() {
            return Err(ConfigError::Invalid("management card catalog is empty".into()));
        }
        if self.log_limit == 0 {
            return Err(ConfigError::Invalid("log_limit must be positive".into()));
        }
        let catalogs: [(&str, Vec<&str>); 4] = [
            ("focus card", self.focus_cards.iter().map(|c| c.id.as_str()).collect()),
            (
                "management card",
                self.management_cards.iter().map(|c| c.id.as_str()).collect(),
            ),
            ("milestone", self.milestones.iter().map(|m| m.id.as_str()).collect()),
            (
                "friction event",
                self.friction_events.iter().map(|e| e.id.as_str()).collect(),
            ),
        ];
        for (kind, ids) in catalogs {
            let mut seen = std::collections::BTreeSet::new();
            for id in ids {
                if !seen.insert(id) {
                    return Err(ConfigError::Invalid(format!("duplicate {kind} id {id:?}")));
                }
            }
        }
        Ok(())
    }

    pub fn focus_card(&self, id: &str) -> Option<&FocusCard> {
        self.focus_cards.iter().find(|card| card.id == id)
    }

    pub fn management_card(&self, id: &str) -> Option<&ManagementCard> {
        self.management_cards.iter().find(|card| card.id == id)
    }

    pub fn friction_event(&self, id: &str) -> Option<&FrictionEvent> {
        self.friction_events.iter().find(|event| event.id == id)
    }

    /// Office rent plus all salaries.
    pub fn weekly_burn(&self) -> i64 {
        self.economy.office_rent_per_week + self.team.iter().map(|dev| dev.salary).sum::<i64>()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let developer = |id: &str, name: &str| Developer {
            id: id.into(),
            name: name.into(),
            base_cp: 8.0,
            salary: 6_000,
        };

        Self {
            starting: StartingValues {
                cash: 220_000,
                morale: 70.0,
                tech_debt: 8.0,
                bug_backlog: 4,
                hype: 10.0,
                reputation: 20.0,
                quality: 30.0,
                completion: 0.0,
                scope_target: 120.0,
            },
            team: vec![
                developer("dev-1", "Dev A"),
                developer("dev-2", "Dev B"),
                developer("dev-3", "Dev C"),
            ],
            economy: EconomyParams {
                office_rent_per_week: 4_000,
                marketing_extra_spend_per_cp: 0.0,
            },
            ranges: Ranges {
                morale: Bounds::new(0.0, 100.0),
                debt: Bounds::new(0.0, 100.0),
                quality: Bounds::new(0.0, 100.0),
                hype: Bounds::new(0.0, 200.0),
                reputation: Bounds::new(0.0, 100.0),
            },
            formulas: Formulas {
                capacity: CapacityParams {
                    morale_base: 0.6,
                    morale_factor: 0.006,
                    debt_factor: 0.75,
                    debt_floor: 0.25,
                },
                morale: MoraleParams {
                    base_decay_per_week: 2.0,
                    clean_build_bonus: 1.0,
                    failed_build_penalty: 5.0,
                    crunch_streak_penalty_per_week: 2.0,
                },
                debt: DebtParams {
                    feature_rush_threshold: 0.8,
                    feature_rush_multiplier: 25.0,
                    qa_share_floor: 0.1,
                    qa_penalty_multiplier: 20.0,
                    complexity_ratio_threshold: 6.0,
                    complexity_flat_gain: 1.5,
                    refactor_base_efficiency: 0.35,
                },
                bugs: BugParams {
                    generation_base: 0.08,
                    generation_debt_divisor: 250.0,
                    fix_per_qa_cp: 0.55,
                    feature_bug_pressure_cap: 0.3,
                    feature_bug_pressure_divisor: 200.0,
                },
                quality: QualityParams {
                    qa_contribution: 0.2,
                    feature_contribution: 0.03,
                    high_debt_decay_threshold: 35.0,
                    high_debt_decay_value: 1.0,
                },
                hype: HypeParams {
                    cp_to_hype: 1.2,
                    no_marketing_decay: 3.0,
                },
                stability: StabilityParams {
                    debt_penalty: 0.9,
                    bug_penalty: 0.6,
                    bug_penalty_cap: 40.0,
                    qa_share_bonus_factor: 20.0,
                    clean_threshold: 70.0,
                    warning_threshold: 40.0,
                },
                launch: LaunchParams {
                    base_sales: 30_000.0,
                    product_strength: ProductStrengthParams {
                        completion_weight: 60.0,
                        quality_weight: 0.3,
                        morale_weight: 0.1,
                        bug_quality_base: 20.0,
                        bug_penalty_factor: 0.4,
                    },
                    outcomes: OutcomeThresholds {
                        miracle_delta_threshold: 15.0,
                        scam_delta_threshold: -15.0,
                        hidden_gem_product_strength_threshold: 70.0,
                        hidden_gem_hype_ceiling: 55.0,
                    },
                    sales_multiplier: PerOutcome {
                        miracle: 2.2,
                        mixed_fair: 1.0,
                        hidden_gem: 0.8,
                        scam: 0.5,
                    },
                    refund_penalty_rate_scam: 0.25,
                    weekly_post_launch_sales: PerOutcome {
                        miracle: PostLaunchSales {
                            base_multiplier: 1.1,
                            decay: 0.88,
                            floor_multiplier: 0.2,
                            growth_per_week: 0.0,
                            growth_weeks: 0,
                        },
                        mixed_fair: PostLaunchSales {
                            base_multiplier: 0.8,
                            decay: 0.85,
                            floor_multiplier: 0.15,
                            growth_per_week: 0.0,
                            growth_weeks: 0,
                        },
                        hidden_gem: PostLaunchSales {
                            base_multiplier: 0.65,
                            decay: 0.9,
                            floor_multiplier: 0.2,
                            growth_per_week: 0.1,
                            growth_weeks: 4,
                        },
                        scam: PostLaunchSales {
                            base_multiplier: 0.45,
                            decay: 0.75,
                            floor_multiplier: 0.1,
                            growth_per_week: 0.0,
                            growth_weeks: 0,
                        },
                    },
                },
            },
            event_trigger: EventTriggerParams {
                base_chance: 0.15,
                debt_divisor: 200.0,
                morale_offset_baseline: 50.0,
                morale_divisor: 250.0,
                min_chance: 0.05,
                max_chance: 0.65,
            },
            ghost_tasks: GhostTaskParams {
                warning: IntRange { min: 1, max: 3 },
                failed: IntRange { min: 4, max: 8 },
                scope_per_task: 1.5,
            },
            release_guardrails: ReleaseGuardrails {
                min_completion: 100.0,
                min_quality: 35.0,
                min_week: 8,
                min_cash: 0,
            },
            release_ready: ReleaseReadyRule {
                min_completion: 120.0,
                max_bug_backlog: 25,
            },
            terminal: TerminalParams {
                insolvency_streak: 2,
                mutiny_streak: 4,
                mutiny_morale_line: 20.0,
                delisting_strength_floor: 10.0,
                required_post_launch_weeks: 8,
            },
            log_limit: 200,
            focus_cards: default_focus_cards(),
            management_cards: default_management_cards(),
            milestones: default_milestones(),
            friction_events: default_friction_events(),
        }
    }
}

fn default_focus_cards() -> Vec<FocusCard> {
    vec![
        FocusCard {
            id: "featureSprint".into(),
            name: "Feature Sprint".into(),
            description: "Push output now and borrow against future velocity.".into(),
            multipliers: FocusMultipliers {
                feature: 1.25,
                refactor: 1.0,
                quality: 1.0,
                marketing: 1.0,
                qa: 0.9,
            },
            flat_deltas: FocusFlatDeltas {
                debt: 1.0,
                morale: 0.0,
            },
            constraints: FocusConstraints::default(),
        },
        FocusCard {
            id: "cleanupWeek".into(),
            name: "Cleanup Week".into(),
            description: "Trade output for debt relief and team breathing room.".into(),
            multipliers: FocusMultipliers {
                feature: 0.0,
                refactor: 1.8,
                quality: 1.0,
                marketing: 1.0,
                qa: 1.0,
            },
            flat_deltas: FocusFlatDeltas {
                debt: 0.0,
                morale: 2.0,
            },
            constraints: FocusConstraints {
                cannot_repeat_consecutively: true,
                min_completion: None,
            },
        },
        FocusCard {
            id: "polishing".into(),
            name: "Polishing".into(),
            description: "Raise quality and perceived fit-and-finish at lower throughput.".into(),
            multipliers: FocusMultipliers {
                feature: 0.65,
                refactor: 1.0,
                quality: 2.0,
                marketing: 1.1,
                qa: 1.0,
            },
            flat_deltas: FocusFlatDeltas::default(),
            constraints: FocusConstraints {
                cannot_repeat_consecutively: false,
                min_completion: Some(40.0),
            },
        },
    ]
}

fn default_management_cards() -> Vec<ManagementCard> {
    vec![
        ManagementCard {
            id: "sustainablePace".into(),
            name: "Sustainable Pace".into(),
            description: "Default cadence with no extraordinary modifier.".into(),
            multipliers: ManagementMultipliers {
                cp_base: 1.0,
                cp_effective: 1.0,
                debt_gain: 1.0,
            },
            flat_deltas: ManagementFlatDeltas::default(),
            cooldown_weeks: 0,
            is_crunch: false,
        },
        ManagementCard {
            id: "crunch".into(),
            name: "Crunch".into(),
            description: "Temporary output boost with strong morale and debt penalties.".into(),
            multipliers: ManagementMultipliers {
                cp_base: 1.5,
                cp_effective: 1.0,
                debt_gain: 1.2,
            },
            flat_deltas: ManagementFlatDeltas {
                morale: -8.0,
                cash: 0,
            },
            cooldown_weeks: 2,
            is_crunch: true,
        },
        ManagementCard {
            id: "teamBuilding".into(),
            name: "Team Building".into(),
            description: "Spend cash for morale recovery while sacrificing short-term throughput."
                .into(),
            multipliers: ManagementMultipliers {
                cp_base: 1.0,
                cp_effective: 0.9,
                debt_gain: 1.0,
            },
            flat_deltas: ManagementFlatDeltas {
                morale: 10.0,
                cash: -8_000,
            },
            cooldown_weeks: 3,
            is_crunch: false,
        },
    ]
}

fn default_milestones() -> Vec<Milestone> {
    let milestone = |id: &str, name: &str, threshold: f64, morale: f64, hype: f64| Milestone {
        id: id.into(),
        name: name.into(),
        threshold_completion: threshold,
        max_bug_backlog: None,
        reward: MilestoneReward { morale, hype },
    };

    vec![
        milestone("prototype", "Prototype", 25.0, 5.0, 4.0),
        milestone("verticalSlice", "Vertical Slice", 60.0, 6.0, 6.0),
        milestone("contentComplete", "Content Complete", 95.0, 7.0, 8.0),
        Milestone {
            max_bug_backlog: Some(25),
            ..milestone("shipReady", "Ship Ready", 120.0, 0.0, 0.0)
        },
    ]
}

fn default_friction_events() -> Vec<FrictionEvent> {
    vec![
        FrictionEvent {
            id: "mergeConflict".into(),
            name: "Merge Conflict".into(),
            weight: 30.0,
            effect: EventEffect {
                base: EffectDeltas {
                    cp_feature_delta: -2,
                    debt_delta: 1.0,
                    message: Some("Integration collision consumed feature momentum.".into()),
                    ..EffectDeltas::default()
                },
                decision: None,
            },
        },
        FrictionEvent {
            id: "sickDay".into(),
            name: "Sick Day".into(),
            weight: 25.0,
            effect: EventEffect {
                base: EffectDeltas {
                    cp_total_delta: -2,
                    message: Some("One developer had reduced availability this week.".into()),
                    ..EffectDeltas::default()
                },
                decision: None,
            },
        },
        FrictionEvent {
            id: "toolchainOutage".into(),
            name: "Toolchain Outage".into(),
            weight: 10.0,
            effect: EventEffect {
                base: EffectDeltas {
                    cp_total_delta: -3,
                    message: Some("Build and CI tooling outage reduced total throughput.".into()),
                    ..EffectDeltas::default()
                },
                decision: None,
            },
        },
        FrictionEvent {
            id: "criticalBugEscalation".into(),
            name: "Critical Bug Escalation".into(),
            weight: 20.0,
            effect: EventEffect {
                base: EffectDeltas {
                    bug_delta: 8,
                    quality_delta: -2.0,
                    message: Some("Production-critical issue consumed QA focus.".into()),
                    ..EffectDeltas::default()
                },
                decision: None,
            },
        },
        FrictionEvent {
            id: "scopeCreepRequest".into(),
            name: "Scope Creep Request".into(),
            weight: 15.0,
            effect: EventEffect {
                base: EffectDeltas::default(),
                decision: Some(DecisionBranches {
                    accept: EffectDeltas {
                        scope_delta: 6.0,
                        hype_delta: 5.0,
                        message: Some(
                            "You accepted additional scope and raised expectations.".into(),
                        ),
                        ..EffectDeltas::default()
                    },
                    reject: EffectDeltas {
                        morale_delta: -2.0,
                        hype_delta: -1.0,
                        message: Some(
                            "You rejected request and protected schedule confidence.".into(),
                        ),
                        ..EffectDeltas::default()
                    },
                }),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = GameConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = GameConfig::from_json_str(&json).unwrap();
        assert_eq!(config.starting.cash, restored.starting.cash);
        assert_eq!(config.focus_cards.len(), restored.focus_cards.len());
        assert_eq!(config.friction_events.len(), restored.friction_events.len());
        let scope_creep = restored.friction_event("scopeCreepRequest").unwrap();
        assert!(scope_creep.effect.decision.is_some());
        assert_eq!(
            restored.formulas.launch.weekly_post_launch_sales.hidden_gem.growth_weeks,
            4
        );
    }

    #[test]
    fn event_effect_flattens_base_deltas() {
        let json = r#"{
            "id": "outage",
            "name": "Outage",
            "weight": 3.0,
            "effect": { "cp_total_delta": -4, "message": "down" }
        }"#;
        let event: FrictionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.effect.base.cp_total_delta, -4);
        assert_eq!(event.effect.base.debt_delta, 0.0);
        assert_eq!(event.effect.base.message.as_deref(), Some("down"));
        assert!(event.effect.decision.is_none());
    }

    #[test]
    fn catalog_lookup_is_by_id() {
        let config = GameConfig::default();
        assert_eq!(config.management_card("crunch").unwrap().cooldown_weeks, 2);
        assert!(config.management_card("crunch").unwrap().is_crunch);
        assert!(config.focus_card("nope").is_none());
        assert_eq!(
            config.focus_card("polishing").unwrap().constraints.min_completion,
            Some(40.0)
        );
    }

    #[test]
    fn weekly_burn_is_rent_plus_salaries() {
        assert_eq!(GameConfig::default().weekly_burn(), 22_000);
    }

    #[test]
    fn bounds_clamp() {
        let bounds = Bounds::new(0.0, 100.0);
        assert_eq!(bounds.clamp(-5.0), 0.0);
        assert_eq!(bounds.clamp(150.0), 100.0);
        assert_eq!(bounds.clamp(42.5), 42.5);
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let path = std::env::temp_dir().join("entropy_missing_config_does_not_exist.json");
        let config = GameConfig::load_or_default(Some(&path));
        assert_eq!(config.starting.cash, 220_000);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_and_duplicate_catalogs() {
        let mut config = GameConfig::default();
        config.focus_cards.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GameConfig::default();
        let dup = config.milestones[0].clone();
        config.milestones.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate milestone id"));
    }

    #[test]
    fn from_json_str_rejects_garbage() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}

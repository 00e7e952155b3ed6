// Weekly plan: stored intent, partial overrides, and the sanitizer.
//
// The player's intent for the coming week lives in `GameState::plan`. The UI
// (or CLI) submits a `PlanOverride`, which is merged field-by-field over the
// stored plan; `allocations` and `cooldowns` merge key-wise rather than being
// replaced wholesale.
//
// `sanitize_plan()` never rejects a plan, it repairs it:
// 1. A focus card that is unknown, blocked by "no consecutive repeat", or
//    below its minimum completion falls back to the first selectable focus
//    card in catalog order (or the first card if none is selectable).
// 2. A management card that is unknown or still cooling down falls back the
//    same way.
// 3. Capacity is recomputed for the (possibly replaced) management card and
//    the allocation is integer-normalized to fit it (`normalize_allocations`).
//
// The sanitized result backs both read-only previews and the real week
// resolution in `sim.rs`.

use crate::capacity::{Capacity, compute_capacity};
use crate::config::{FocusCard, GameConfig, ManagementCard};
use crate::state::GameState;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The player's plan for the coming week.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub focus_card_id: String,
    pub management_card_id: String,
    #[serde(default)]
    pub scope_creep_policy: ScopeCreepPolicy,
    pub allocations: Allocations,
    /// Weeks remaining before a management card can be used again, keyed by
    /// card id. Missing entries count as 0.
    #[serde(default)]
    pub cooldowns: BTreeMap<String, u32>,
    #[serde(default)]
    pub release_requested: bool,
}

/// Per-lane allocation override; unset lanes keep the stored value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationOverride {
    pub feature: Option<i64>,
    pub refactor: Option<i64>,
    pub marketing: Option<i64>,
    pub qa: Option<i64>,
}

impl From<Allocations> for AllocationOverride {
    fn from(alloc: Allocations) -> Self {
        Self {
            feature: Some(alloc.feature),
            refactor: Some(alloc.refactor),
            marketing: Some(alloc.marketing),
            qa: Some(alloc.qa),
        }
    }
}

/// A partial plan submitted for the coming week.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOverride {
    pub focus_card_id: Option<String>,
    pub management_card_id: Option<String>,
    pub scope_creep_policy: Option<ScopeCreepPolicy>,
    pub allocations: AllocationOverride,
    pub cooldowns: BTreeMap<String, u32>,
    pub release_requested: Option<bool>,
}

impl PlanOverride {
    pub fn focus(mut self, id: impl Into<String>) -> Self {
        self.focus_card_id = Some(id.into());
        self
    }

    pub fn management(mut self, id: impl Into<String>) -> Self {
        self.management_card_id = Some(id.into());
        self
    }

    pub fn allocations(mut self, alloc: Allocations) -> Self {
        self.allocations = alloc.into();
        self
    }

    pub fn policy(mut self, policy: ScopeCreepPolicy) -> Self {
        self.scope_creep_policy = Some(policy);
        self
    }

    pub fn release(mut self, requested: bool) -> Self {
        self.release_requested = Some(requested);
        self
    }
}

/// Merge an override over the stored plan.
pub fn merge_plan(base: &Plan, overrides: Option<&PlanOverride>) -> Plan {
    let mut merged = base.clone();
    let Some(ov) = overrides else {
        return merged;
    };

    if let Some(id) = &ov.focus_card_id {
        merged.focus_card_id = id.clone();
    }
    if let Some(id) = &ov.management_card_id {
        merged.management_card_id = id.clone();
    }
    if let Some(policy) = ov.scope_creep_policy {
        merged.scope_creep_policy = policy;
    }
    if let Some(requested) = ov.release_requested {
        merged.release_requested = requested;
    }

    let lanes = [
        (Lane::Feature, ov.allocations.feature),
        (Lane::Refactor, ov.allocations.refactor),
        (Lane::Marketing, ov.allocations.marketing),
        (Lane::Qa, ov.allocations.qa),
    ];
    for (lane, value) in lanes {
        if let Some(value) = value {
            *merged.allocations.get_mut(lane) = value;
        }
    }
    for (id, weeks) in &ov.cooldowns {
        merged.cooldowns.insert(id.clone(), *weeks);
    }
    merged
}

// ---------------------------------------------------------------------------
// Allocation normalization
// ---------------------------------------------------------------------------

/// Fit a four-lane allocation into an integer capacity.
///
/// Negative lanes count as zero. If the request already fits it passes
/// through unchanged. Otherwise every lane is scaled by `limit / sum` and
/// floored, and the leftover units go one each to the lanes with the
/// largest fractional remainders (ties keep lane order) until `limit` is
/// reached.
pub fn normalize_allocations(alloc: Allocations, limit: i64) -> Allocations {
    let limit = limit.max(0);
    let mut safe = alloc;
    for lane in Lane::ALL {
        let value = safe.get_mut(lane);
        *value = (*value).max(0);
    }

    if limit == 0 {
        return Allocations::default();
    }
    let total = safe.total();
    if total <= limit {
        return safe;
    }

    let ratio = limit as f64 / total as f64;
    let mut scaled = Allocations::default();
    let mut used = 0;
    let mut remainders: Vec<(Lane, f64)> = Vec::with_capacity(Lane::ALL.len());
    for lane in Lane::ALL {
        let raw = safe.get(lane) as f64 * ratio;
        let floored = raw.floor();
        *scaled.get_mut(lane) = floored as i64;
        used += floored as i64;
        remainders.push((lane, raw - floored));
    }

    // Stable sort keeps lane order among equal fractions.
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (lane, _) in remainders {
        if used >= limit {
            break;
        }
        *scaled.get_mut(lane) += 1;
        used += 1;
    }
    scaled
}

// ---------------------------------------------------------------------------
// Card availability
// ---------------------------------------------------------------------------

pub fn is_focus_card_selectable(state: &GameState, card: &FocusCard) -> bool {
    if card.constraints.cannot_repeat_consecutively
        && state
            .last_week_plan()
            .is_some_and(|last| last.focus_card_id == card.id)
    {
        return false;
    }
    if let Some(min_completion) = card.constraints.min_completion
        && state.project.completion < min_completion
    {
        return false;
    }
    true
}

pub fn is_management_card_selectable(state: &GameState, card: &ManagementCard) -> bool {
    state.plan.cooldowns.get(&card.id).copied().unwrap_or(0) == 0
}

fn resolve_focus_card<'a>(config: &'a GameConfig, state: &GameState, id: &str) -> &'a FocusCard {
    if let Some(card) = config.focus_card(id)
        && is_focus_card_selectable(state, card)
    {
        return card;
    }
    config
        .focus_cards
        .iter()
        .find(|card| is_focus_card_selectable(state, card))
        .unwrap_or(&config.focus_cards[0])
}

fn resolve_management_card<'a>(
    config: &'a GameConfig,
    state: &GameState,
    id: &str,
) -> &'a ManagementCard {
    if let Some(card) = config.management_card(id)
        && is_management_card_selectable(state, card)
    {
        return card;
    }
    config
        .management_cards
        .iter()
        .find(|card| is_management_card_selectable(state, card))
        .unwrap_or(&config.management_cards[0])
}

/// Selectability of one catalog card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStatus {
    pub id: String,
    pub selectable: bool,
}

/// Selectability of every card, in catalog order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAvailability {
    pub focus: Vec<CardStatus>,
    pub management: Vec<CardStatus>,
}

impl CardAvailability {
    pub fn is_focus_selectable(&self, id: &str) -> bool {
        self.focus.iter().any(|c| c.id == id && c.selectable)
    }

    pub fn is_management_selectable(&self, id: &str) -> bool {
        self.management.iter().any(|c| c.id == id && c.selectable)
    }
}

pub fn card_availability(config: &GameConfig, state: &GameState) -> CardAvailability {
    CardAvailability {
        focus: config
            .focus_cards
            .iter()
            .map(|card| CardStatus {
                id: card.id.clone(),
                selectable: is_focus_card_selectable(state, card),
            })
            .collect(),
        management: config
            .management_cards
            .iter()
            .map(|card| CardStatus {
                id: card.id.clone(),
                selectable: is_management_card_selectable(state, card),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Sanitizer
// ---------------------------------------------------------------------------

/// A repaired plan plus the cards and capacity it resolves against.
#[derive(Clone, Debug)]
pub struct SanitizedPlan<'a> {
    pub plan: Plan,
    pub capacity: Capacity,
    pub focus: &'a FocusCard,
    pub management: &'a ManagementCard,
}

/// Repair `overrides` merged over the stored plan. See the module docs.
///
/// The config must have non-empty card catalogs (`GameConfig::validate`).
pub fn sanitize_plan<'a>(
    config: &'a GameConfig,
    state: &GameState,
    overrides: Option<&PlanOverride>,
) -> SanitizedPlan<'a> {
    let mut plan = merge_plan(&state.plan, overrides);

    let focus = resolve_focus_card(config, state, &plan.focus_card_id);
    let management = resolve_management_card(config, state, &plan.management_card_id);
    plan.focus_card_id = focus.id.clone();
    plan.management_card_id = management.id.clone();

    let capacity = compute_capacity(config, state, management);
    plan.allocations = normalize_allocations(plan.allocations, capacity.cp_effective);

    SanitizedPlan {
        plan,
        capacity,
        focus,
        management,
    }
}

// Friction events and the narrative log.
//
// Each week may draw at most one friction event. The trigger chance rises with
// tech debt and with morale below a baseline, clamped to a configured band:
//
//   chance = clamp(base + debt / debt_divisor
//                  + (baseline - morale) / morale_divisor, min, max)
//
// The roll is one `next_f64()` draw; `roll < chance` fires an event, which is
// then chosen by a weighted pick over the catalog (a second draw). A fired
// event is turned into an `EventDelta` by `materialize_effect()`: the base
// deltas, plus the branch picked by the plan's scope-creep policy for events
// that carry a decision.
//
// This file also defines `LogEntry`, the player-visible narrative feed stored
// in `GameState::logs`.
//
// See also: `sim.rs` for where the roll happens in the week pipeline,
// `config.rs` for the `FrictionEvent` catalog.
//
// **Critical constraint: determinism.** The trigger roll is always drawn, and
// the weighted pick only when it fires. Changing either draw shifts every
// later draw of the run.

use crate::config::{EffectDeltas, EventTriggerParams, FrictionEvent};
use crate::plan::normalize_allocations;
use crate::prng::GameRng;
use crate::types::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trigger roll
// ---------------------------------------------------------------------------

pub fn trigger_chance(params: &EventTriggerParams, tech_debt: f64, morale: f64) -> f64 {
    let raw = params.base_chance
        + tech_debt / params.debt_divisor
        + (params.morale_offset_baseline - morale) / params.morale_divisor;
    raw.clamp(params.min_chance, params.max_chance)
}

/// Result of the weekly trigger roll.
#[derive(Clone, Debug)]
pub struct EventRoll<'a> {
    pub chance: f64,
    pub roll: f64,
    pub event: Option<&'a FrictionEvent>,
}

pub fn roll_event<'a>(
    params: &EventTriggerParams,
    catalog: &'a [FrictionEvent],
    tech_debt: f64,
    morale: f64,
    rng: &mut GameRng,
) -> EventRoll<'a> {
    let chance = trigger_chance(params, tech_debt, morale);
    let roll = rng.next_f64();
    let event = if roll >= chance {
        None
    } else {
        rng.pick_weighted(catalog, |event| event.weight)
    };
    EventRoll { chance, roll, event }
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// The fully materialized effect of this week's event. All zero when no
/// event fired.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventDelta {
    pub cp_feature_delta: i64,
    pub cp_total_delta: i64,
    pub debt_delta: f64,
    pub bug_delta: i64,
    pub quality_delta: f64,
    pub morale_delta: f64,
    pub hype_delta: f64,
    pub scope_delta: f64,
    /// Set when the event carried a decision.
    pub decision: Option<ScopeCreepPolicy>,
    pub message: Option<String>,
}

impl EventDelta {
    fn add(&mut self, deltas: &EffectDeltas) {
        self.cp_feature_delta += deltas.cp_feature_delta;
        self.cp_total_delta += deltas.cp_total_delta;
        self.debt_delta += deltas.debt_delta;
        self.bug_delta += deltas.bug_delta;
        self.quality_delta += deltas.quality_delta;
        self.morale_delta += deltas.morale_delta;
        self.hype_delta += deltas.hype_delta;
        self.scope_delta += deltas.scope_delta;
    }
}

/// Resolve an event's effect under the given scope-creep policy. A decision
/// branch's deltas add to the base deltas and its message (if any) replaces
/// the base message.
pub fn materialize_effect(policy: ScopeCreepPolicy, event: Option<&FrictionEvent>) -> EventDelta {
    let mut delta = EventDelta::default();
    let Some(event) = event else {
        return delta;
    };

    let effect = &event.effect;
    delta.add(&effect.base);
    delta.message = effect.base.message.clone();

    if let Some(branches) = &effect.decision {
        let branch = match policy {
            ScopeCreepPolicy::Accept => &branches.accept,
            ScopeCreepPolicy::Reject => &branches.reject,
        };
        delta.decision = Some(policy);
        delta.add(branch);
        if branch.message.is_some() {
            delta.message = branch.message.clone();
        }
    }
    delta
}

/// Apply an event's capacity deltas to the week's allocation. Returns the
/// adjusted effective capacity and the re-normalized allocation.
pub fn apply_event_to_allocation(
    allocations: Allocations,
    cp_effective: i64,
    delta: &EventDelta,
) -> (i64, Allocations) {
    let adjusted_cp = (cp_effective + delta.cp_total_delta).max(0);
    let mut adjusted = allocations;
    adjusted.feature = (adjusted.feature + delta.cp_feature_delta).max(0);
    (adjusted_cp, normalize_allocations(adjusted, adjusted_cp))
}

// ---------------------------------------------------------------------------
// Narrative log
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogKind {
    System,
    Event,
    Milestone,
    Launch,
    Warning,
    Success,
    Failure,
}

/// One line of the narrative feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub week: u32,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ScopeCreepPolicy>,
}

impl LogEntry {
    pub fn new(week: u32, kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            week,
            kind,
            message: message.into(),
            event_id: None,
            decision: None,
        }
    }
}

/// Append `entries` and keep only the newest `limit` lines.
pub fn append_logs(logs: &mut Vec<LogEntry>, entries: Vec<LogEntry>, limit: usize) {
    logs.extend(entries);
    if logs.len() > limit {
        let excess = logs.len() - limit;
        logs.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn chance_follows_debt_and_morale() {
        let params = GameConfig::default().event_trigger;
        // 0.15 + 8/200 + (50-70)/250 = 0.11
        let chance = trigger_chance(&params, 8.0, 70.0);
        assert!((chance - 0.11).abs() < 1e-9);
        assert_eq!(trigger_chance(&params, 0.0, 100.0), 0.05);
        assert_eq!(trigger_chance(&params, 100.0, 0.0), 0.65);
    }

    #[test]
    fn low_roll_fires_and_zero_chance_skips_the_pick() {
        let config = GameConfig::default();
        // Seed 1's first float is 270369 / 2^32, below the minimum chance,
        // so an event fires.
        let mut rng = GameRng::new(1);
        let roll = roll_event(&config.event_trigger, &config.friction_events, 8.0, 70.0, &mut rng);
        assert!(roll.event.is_some());

        // A zero chance band never fires, and only the trigger roll is drawn.
        let mut params = config.event_trigger.clone();
        params.min_chance = 0.0;
        params.max_chance = 0.0;
        let mut rng = GameRng::new(42);
        let roll = roll_event(&params, &config.friction_events, 8.0, 70.0, &mut rng);
        assert!(roll.event.is_none());
        let mut reference = GameRng::new(42);
        reference.next_u32();
        assert_eq!(rng.state(), reference.state());
    }

    #[test]
    fn plain_event_materializes_base_deltas() {
        let config = GameConfig::default();
        let event = config.friction_event("mergeConflict");
        let delta = materialize_effect(ScopeCreepPolicy::Accept, event);
        assert_eq!(delta.cp_feature_delta, -2);
        assert_eq!(delta.debt_delta, 1.0);
        assert_eq!(delta.decision, None);
        assert_eq!(
            delta.message.as_deref(),
            Some("Integration collision consumed feature momentum.")
        );
    }

    #[test]
    fn decision_event_follows_policy() {
        let config = GameConfig::default();
        let event = config.friction_event("scopeCreepRequest");

        let accept = materialize_effect(ScopeCreepPolicy::Accept, event);
        assert_eq!(accept.decision, Some(ScopeCreepPolicy::Accept));
        assert_eq!(accept.scope_delta, 6.0);
        assert_eq!(accept.hype_delta, 5.0);

        let reject = materialize_effect(ScopeCreepPolicy::Reject, event);
        assert_eq!(reject.decision, Some(ScopeCreepPolicy::Reject));
        assert_eq!(reject.scope_delta, 0.0);
        assert_eq!(reject.morale_delta, -2.0);
        assert_eq!(
            reject.message.as_deref(),
            Some("You rejected request and protected schedule confidence.")
        );
    }

    #[test]
    fn no_event_is_all_zero() {
        assert_eq!(
            materialize_effect(ScopeCreepPolicy::Reject, None),
            EventDelta::default()
        );
    }

    #[test]
    fn allocation_absorbs_capacity_loss() {
        let delta = EventDelta {
            cp_total_delta: -3,
            ..EventDelta::default()
        };
        let (cp, alloc) = apply_event_to_allocation(Allocations::new(8, 6, 4, 5), 23, &delta);
        assert_eq!(cp, 20);
        assert_eq!(alloc.total(), 20);
    }

    #[test]
    fn feature_loss_never_goes_negative() {
        let delta = EventDelta {
            cp_feature_delta: -2,
            ..EventDelta::default()
        };
        let (cp, alloc) = apply_event_to_allocation(Allocations::new(1, 6, 4, 5), 16, &delta);
        assert_eq!(cp, 16);
        assert_eq!(alloc, Allocations::new(0, 6, 4, 5));

        let big_loss = EventDelta {
            cp_total_delta: -50,
            ..EventDelta::default()
        };
        let (cp, alloc) = apply_event_to_allocation(Allocations::new(1, 6, 4, 5), 16, &big_loss);
        assert_eq!(cp, 0);
        assert_eq!(alloc, Allocations::default());
    }

    #[test]
    fn logs_are_trimmed_to_newest() {
        let mut logs = Vec::new();
        let entries = (0..5)
            .map(|i| LogEntry::new(i, LogKind::System, format!("line {i}")))
            .collect();
        append_logs(&mut logs, entries, 3);
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "line 2");
        assert_eq!(logs[2].message, "line 4");
    }

    #[test]
    fn log_entry_serializes_kind_as_type() {
        let entry = LogEntry::new(3, LogKind::Warning, "careful");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "warning");
        assert!(json.get("event_id").is_none());
    }
}

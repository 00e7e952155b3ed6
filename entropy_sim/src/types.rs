// Core types shared across the engine.
//
// Small closed enums (run status, build result, launch outcome, scope-creep
// policy), the four-lane effort allocation, and the half-up rounding helper
// used wherever stored values are rounded to two decimals. All types derive
// `Serialize` and `Deserialize` for save/load; enum values serialize as
// camelCase strings (`"active"`, `"mixedFair"`).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of a run: `Active -> Released -> {Won, Failed}` or
/// `Active -> Failed`. There is no path back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Active,
    Released,
    Failed,
    Won,
}

impl RunStatus {
    /// `Failed` and `Won` end the run; no further week resolves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Won)
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalKind {
    Insolvency,
    Mutiny,
    Delisting,
    Success,
}

impl TerminalKind {
    /// The status a run moves to when this condition fires.
    pub fn status(self) -> RunStatus {
        match self {
            Self::Success => RunStatus::Won,
            Self::Insolvency | Self::Mutiny | Self::Delisting => RunStatus::Failed,
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insolvency => "insolvency",
            Self::Mutiny => "mutiny",
            Self::Delisting => "delisting",
            Self::Success => "success",
        };
        f.write_str(name)
    }
}

/// Terminal outcome recorded on the run and in the week snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "type")]
    pub kind: TerminalKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Build and launch classification
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildResult {
    /// No build has run yet (fresh state).
    #[default]
    None,
    Clean,
    Warning,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LaunchOutcome {
    Miracle,
    MixedFair,
    HiddenGem,
    Scam,
}

impl fmt::Display for LaunchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Miracle => "miracle",
            Self::MixedFair => "mixedFair",
            Self::HiddenGem => "hiddenGem",
            Self::Scam => "scam",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Plan vocabulary
// ---------------------------------------------------------------------------

/// How the studio answers a scope-creep request.
///
/// Deserialization is lenient: anything other than exactly `"accept"` or
/// `"reject"` becomes `Reject`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeCreepPolicy {
    Accept,
    #[default]
    Reject,
}

impl ScopeCreepPolicy {
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "accept" => Self::Accept,
            _ => Self::Reject,
        }
    }
}

impl<'de> Deserialize<'de> for ScopeCreepPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => Self::parse_lenient(&s),
            _ => Self::Reject,
        })
    }
}

impl fmt::Display for ScopeCreepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        })
    }
}

/// The four effort lanes a week's capacity is spent across.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    Feature,
    Refactor,
    Marketing,
    Qa,
}

impl Lane {
    /// Canonical lane order, used for tie-breaks during normalization.
    pub const ALL: [Lane; 4] = [Lane::Feature, Lane::Refactor, Lane::Marketing, Lane::Qa];
}

/// Integer CP allocation across the four lanes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocations {
    pub feature: i64,
    pub refactor: i64,
    pub marketing: i64,
    pub qa: i64,
}

impl Allocations {
    pub const fn new(feature: i64, refactor: i64, marketing: i64, qa: i64) -> Self {
        Self {
            feature,
            refactor,
            marketing,
            qa,
        }
    }

    pub fn get(&self, lane: Lane) -> i64 {
        match lane {
            Lane::Feature => self.feature,
            Lane::Refactor => self.refactor,
            Lane::Marketing => self.marketing,
            Lane::Qa => self.qa,
        }
    }

    pub fn get_mut(&mut self, lane: Lane) -> &mut i64 {
        match lane {
            Lane::Feature => &mut self.feature,
            Lane::Refactor => &mut self.refactor,
            Lane::Marketing => &mut self.marketing,
            Lane::Qa => &mut self.qa,
        }
    }

    pub fn total(&self) -> i64 {
        Lane::ALL.iter().map(|&lane| self.get(lane)).sum()
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Round to two decimals, halves toward positive infinity.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Composite instability metric: `0.7 * debt + min(30, 0.8 * bugs)`, rounded
/// to two decimals.
pub fn compute_entropy_index(tech_debt: f64, bug_backlog: i64) -> f64 {
    round2(0.7 * tech_debt + (bug_backlog as f64 * 0.8).min(30.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_creep_policy_is_lenient() {
        let parse = |json: &str| serde_json::from_str::<ScopeCreepPolicy>(json).unwrap();
        assert_eq!(parse(r#""accept""#), ScopeCreepPolicy::Accept);
        assert_eq!(parse(r#""reject""#), ScopeCreepPolicy::Reject);
        assert_eq!(parse(r#""Accept""#), ScopeCreepPolicy::Reject);
        assert_eq!(parse("null"), ScopeCreepPolicy::Reject);
        assert_eq!(parse("7"), ScopeCreepPolicy::Reject);
        assert_eq!(
            serde_json::to_string(&ScopeCreepPolicy::Accept).unwrap(),
            r#""accept""#
        );
    }

    #[test]
    fn enums_serialize_camel_case() {
        assert_eq!(
            serde_json::to_string(&LaunchOutcome::MixedFair).unwrap(),
            r#""mixedFair""#
        );
        assert_eq!(serde_json::to_string(&RunStatus::Won).unwrap(), r#""won""#);
        assert_eq!(serde_json::to_string(&BuildResult::None).unwrap(), r#""none""#);
    }

    #[test]
    fn run_result_uses_type_key() {
        let result = RunResult {
            kind: TerminalKind::Mutiny,
            message: "m".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "mutiny");
    }

    #[test]
    fn terminal_status_mapping() {
        assert_eq!(TerminalKind::Success.status(), RunStatus::Won);
        assert_eq!(TerminalKind::Delisting.status(), RunStatus::Failed);
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Released.is_terminal());
    }

    #[test]
    fn round2_rounds_half_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(2.345678), 2.35);
        assert_eq!(round2(-1.234), -1.23);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn entropy_index_caps_bug_term() {
        assert_eq!(compute_entropy_index(10.0, 5), 11.0);
        assert_eq!(compute_entropy_index(0.0, 1000), 30.0);
        assert_eq!(compute_entropy_index(100.0, 0), 70.0);
    }

    #[test]
    fn allocation_lanes() {
        let mut alloc = Allocations::new(1, 2, 3, 4);
        assert_eq!(alloc.total(), 10);
        *alloc.get_mut(Lane::Qa) += 1;
        assert_eq!(alloc.get(Lane::Qa), 5);
    }
}

// Weekly capacity (CP) from team composition, morale and tech debt.
//
//   cp_base      = floor(sum(base_cp * availability) * card.cp_base)
//   morale_mult  = morale_base + morale_factor * morale
//   debt_mult    = max(debt_floor, 1 - debt_factor * debt / 100)
//   cp_effective = max(0, floor(cp_base * morale_mult * debt_mult * card.cp_effective))
//
// The multipliers are reported rounded to two decimals for display; the
// effective capacity is computed from the unrounded values.

use crate::config::{GameConfig, ManagementCard};
use crate::state::{GameState, TeamMember};
use crate::types::round2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    pub cp_base: i64,
    pub cp_effective: i64,
    pub morale_multiplier: f64,
    pub debt_multiplier: f64,
}

pub fn team_cp_base(members: &[TeamMember], cp_base_multiplier: f64) -> i64 {
    let raw: f64 = members
        .iter()
        .map(|member| member.base_cp * member.availability_multiplier)
        .sum();
    (raw * cp_base_multiplier).floor() as i64
}

pub fn compute_capacity(
    config: &GameConfig,
    state: &GameState,
    management: &ManagementCard,
) -> Capacity {
    let params = &config.formulas.capacity;
    let cp_base = team_cp_base(&state.team.members, management.multipliers.cp_base);

    let morale_multiplier = params.morale_base + params.morale_factor * state.resources.morale;
    let debt_multiplier =
        (1.0 - params.debt_factor * state.entropy.tech_debt / 100.0).max(params.debt_floor);
    let cp_effective = (cp_base as f64
        * morale_multiplier
        * debt_multiplier
        * management.multipliers.cp_effective)
        .floor() as i64;

    Capacity {
        cp_base,
        cp_effective: cp_effective.max(0),
        morale_multiplier: round2(morale_multiplier),
        debt_multiplier: round2(debt_multiplier),
    }
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

    #[test]
    fn starting_capacity() {
        let (config, state) = setup();
        let card = config.management_card("sustainablePace").unwrap();
        let cap = compute_capacity(&config, &state, card);
        // 24 * (0.6 + 0.42) * (1 - 0.06) = 24 * 1.02 * 0.94 = 23.01
        assert_eq!(cap.cp_base, 24);
        assert_eq!(cap.cp_effective, 23);
        assert_eq!(cap.morale_multiplier, 1.02);
        assert_eq!(cap.debt_multiplier, 0.94);
    }

    #[test]
    fn crunch_boosts_base_capacity() {
        let (config, state) = setup();
        let card = config.management_card("crunch").unwrap();
        let cap = compute_capacity(&config, &state, card);
        assert_eq!(cap.cp_base, 36);
        // 36 * 1.02 * 0.94 = 34.5168
        assert_eq!(cap.cp_effective, 34);
    }

    #[test]
    fn team_building_scales_effective_capacity() {
        let (config, state) = setup();
        let card = config.management_card("teamBuilding").unwrap();
        let cap = compute_capacity(&config, &state, card);
        // 24 * 1.02 * 0.94 * 0.9 = 20.71
        assert_eq!(cap.cp_effective, 20);
    }

    #[test]
    fn debt_multiplier_has_floor() {
        let (config, mut state) = setup();
        state.entropy.tech_debt = 100.0;
        state.resources.morale = 0.0;
        let card = config.management_card("sustainablePace").unwrap();
        let cap = compute_capacity(&config, &state, card);
        assert_eq!(cap.debt_multiplier, 0.25);
        // 24 * 0.6 * 0.25 = 3.6
        assert_eq!(cap.cp_effective, 3);
    }

    #[test]
    fn availability_scales_members() {
        let (_, mut state) = setup();
        state.team.members[0].availability_multiplier = 0.5;
        assert_eq!(team_cp_base(&state.team.members, 1.0), 20);
        assert_eq!(team_cp_base(&[], 1.5), 0);
    }
}

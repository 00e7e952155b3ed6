// Run-ending conditions.
//
// Checked once per week after cash and morale resolve. The first matching
// condition wins, in this order: insolvency, mutiny, delisting, success.
// All thresholds come from `TerminalParams`.

use crate::config::GameConfig;
use crate::types::*;

/// Post-week values the terminal checks read.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerminalInputs {
    pub cash_negative_streak: u32,
    pub morale_below_20_streak: u32,
    /// Whether the run is released after this week's launch check.
    pub released: bool,
    pub product_strength: f64,
    pub post_launch_non_negative_cash_streak: u32,
}

pub fn evaluate_terminal(config: &GameConfig, inputs: &TerminalInputs) -> Option<RunResult> {
    let params = &config.terminal;
    let kind = if inputs.cash_negative_streak >= params.insolvency_streak {
        TerminalKind::Insolvency
    } else if inputs.morale_below_20_streak >= params.mutiny_streak {
        TerminalKind::Mutiny
    } else if inputs.released && inputs.product_strength < params.delisting_strength_floor {
        TerminalKind::Delisting
    } else if inputs.released
        && inputs.post_launch_non_negative_cash_streak >= params.required_post_launch_weeks
    {
        TerminalKind::Success
    } else {
        return None;
    };

    let message = match kind {
        TerminalKind::Insolvency => format!(
            "Cash remained below zero for {} consecutive weeks.",
            params.insolvency_streak
        ),
        TerminalKind::Mutiny => format!(
            "Morale stayed below {} for {} consecutive weeks.",
            params.mutiny_morale_line, params.mutiny_streak
        ),
        TerminalKind::Delisting => {
            "Product strength dropped below platform minimum visibility threshold.".to_string()
        }
        TerminalKind::Success => {
            "Studio remained solvent through post-launch stabilization window.".to_string()
        }
    };
    Some(RunResult { kind, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_fires_by_default() {
        let config = GameConfig::default();
        assert_eq!(evaluate_terminal(&config, &TerminalInputs::default()), None);
    }

    #[test]
    fn insolvency_message() {
        let config = GameConfig::default();
        let inputs = TerminalInputs {
            cash_negative_streak: 2,
            ..TerminalInputs::default()
        };
        let result = evaluate_terminal(&config, &inputs).unwrap();
        assert_eq!(result.kind, TerminalKind::Insolvency);
        assert_eq!(result.message, "Cash remained below zero for 2 consecutive weeks.");
    }

    #[test]
    fn mutiny_message() {
        let config = GameConfig::default();
        let inputs = TerminalInputs {
            morale_below_20_streak: 4,
            ..TerminalInputs::default()
        };
        let result = evaluate_terminal(&config, &inputs).unwrap();
        assert_eq!(result.kind, TerminalKind::Mutiny);
        assert_eq!(result.message, "Morale stayed below 20 for 4 consecutive weeks.");
    }

    #[test]
    fn insolvency_beats_mutiny() {
        let config = GameConfig::default();
        let inputs = TerminalInputs {
            cash_negative_streak: 3,
            morale_below_20_streak: 9,
            ..TerminalInputs::default()
        };
        assert_eq!(
            evaluate_terminal(&config, &inputs).map(|r| r.kind),
            Some(TerminalKind::Insolvency)
        );
    }

    #[test]
    fn delisting_and_success_need_release() {
        let config = GameConfig::default();
        let weak = TerminalInputs {
            product_strength: 5.0,
            post_launch_non_negative_cash_streak: 8,
            ..TerminalInputs::default()
        };
        assert_eq!(evaluate_terminal(&config, &weak), None);

        let released_weak = TerminalInputs {
            released: true,
            ..weak
        };
        assert_eq!(
            evaluate_terminal(&config, &released_weak).map(|r| r.kind),
            Some(TerminalKind::Delisting)
        );

        let released_strong = TerminalInputs {
            product_strength: 60.0,
            ..released_weak
        };
        let won = evaluate_terminal(&config, &released_strong).unwrap();
        assert_eq!(won.kind, TerminalKind::Success);
        assert_eq!(won.kind.status(), RunStatus::Won);
    }
}

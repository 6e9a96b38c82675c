use dvr_config::PriorityThresholds;
use dvr_schemas::{BreakCategory, Priority};

/// Assign a remediation priority. Rules evaluate top-down, first match wins:
///
/// 1. missing legs and suspected fx inversions are CRITICAL regardless of
///    amount (these are structural, not monetary, findings);
/// 2. fx / tax breaks escalate on the systemic thresholds;
/// 3. anything else escalates on cash impact alone.
pub fn assign_priority(
    categories: &[BreakCategory],
    cash_impact: f64,
    th: &PriorityThresholds,
) -> Priority {
    let always_critical = categories.iter().any(|c| {
        matches!(
            c,
            BreakCategory::MissingNbim
                | BreakCategory::MissingCust
                | BreakCategory::FxInversionSuspected
        )
    });
    if always_critical {
        return Priority::Critical;
    }

    if categories.iter().any(BreakCategory::is_systemic) {
        if cash_impact > th.systemic_critical {
            return Priority::Critical;
        }
        if cash_impact > th.systemic_high {
            return Priority::High;
        }
    }

    if cash_impact > th.cash_critical {
        Priority::Critical
    } else if cash_impact > th.cash_high {
        Priority::High
    } else if cash_impact > th.cash_medium {
        Priority::Medium
    } else {
        Priority::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BreakCategory::*;

    fn th() -> PriorityThresholds {
        PriorityThresholds::default()
    }

    #[test]
    fn missing_leg_is_critical_regardless_of_amount() {
        assert_eq!(assign_priority(&[MissingNbim], 10.0, &th()), Priority::Critical);
        assert_eq!(assign_priority(&[MissingCust], 0.0, &th()), Priority::Critical);
    }

    #[test]
    fn inversion_is_critical_at_zero_cash_impact() {
        assert_eq!(
            assign_priority(&[FxInversionSuspected], 0.0, &th()),
            Priority::Critical
        );
    }

    #[test]
    fn systemic_break_escalates_earlier_than_cash_rule() {
        // 60k: above systemic_critical (50k) but below cash_critical (100k)
        assert_eq!(assign_priority(&[FxMismatch], 60_000.0, &th()), Priority::Critical);
        // 6k: above systemic_high (5k) but below cash_high (10k)
        assert_eq!(assign_priority(&[TaxRateMismatch], 6_000.0, &th()), Priority::High);
    }

    #[test]
    fn cash_impact_ladder_for_amount_breaks() {
        assert_eq!(
            assign_priority(&[GrossAmountMismatch], 150_000.0, &th()),
            Priority::Critical
        );
        assert_eq!(
            assign_priority(&[NetAmountMismatch], 50_000.0, &th()),
            Priority::High
        );
        assert_eq!(
            assign_priority(&[GrossAmountMismatch], 5_000.0, &th()),
            Priority::Medium
        );
        assert_eq!(
            assign_priority(&[NetAmountMismatch], 500.0, &th()),
            Priority::Low
        );
    }

    #[test]
    fn small_systemic_break_falls_through_to_cash_ladder() {
        // fx break at 2k: under both systemic thresholds, over cash_medium
        assert_eq!(assign_priority(&[FxMismatch], 2_000.0, &th()), Priority::Medium);
    }

    #[test]
    fn custom_thresholds_are_honored() {
        let th = PriorityThresholds {
            cash_medium: 100.0,
            ..PriorityThresholds::default()
        };
        assert_eq!(
            assign_priority(&[NetAmountMismatch], 500.0, &th),
            Priority::Medium
        );
    }
}

use dvr_breaks::{assign_priority, classify};
use dvr_config::{PriorityThresholds, ToleranceConfig};
use dvr_schemas::{BreakCategory, FieldDiffs, LegKey, LegRecord, MatchedPair, Priority};

fn leg(fx: f64) -> LegRecord {
    let mut l = LegRecord::new("E1", "US1", "1");
    l.gross_amount = Some(1000.0);
    l.net_amount = Some(900.0);
    l.tax_rate = Some(0.15);
    l.fx_rate = Some(fx);
    l
}

fn pair(nbim: LegRecord, custody: LegRecord) -> MatchedPair {
    MatchedPair {
        key: LegKey::for_leg(&nbim),
        diffs: FieldDiffs {
            gross: Some(0.0),
            net: Some(0.0),
            tax_rate: Some(0.0),
            fx: Some(nbim.fx_rate.unwrap() - custody.fx_rate.unwrap()),
        },
        nbim,
        custody,
    }
}

#[test]
fn scenario_reciprocal_rates_label_inversion_not_mismatch() {
    // 8.5 vs 0.1176...: product ~ 1.0
    let p = pair(leg(8.5), leg(1.0 / 8.5));
    let rec = classify(&p, &ToleranceConfig::default());
    assert_eq!(rec.label(), "fx_inversion_suspected");
    assert_eq!(rec.categories, vec![BreakCategory::FxInversionSuspected]);
}

#[test]
fn scenario_inversion_is_critical_even_at_zero_cash_impact() {
    let p = pair(leg(8.5), leg(1.0 / 8.5));
    let rec = classify(&p, &ToleranceConfig::default());
    assert_eq!(rec.cash_impact, 0.0);
    let prio = assign_priority(&rec.categories, rec.cash_impact, &PriorityThresholds::default());
    assert_eq!(prio, Priority::Critical);
}

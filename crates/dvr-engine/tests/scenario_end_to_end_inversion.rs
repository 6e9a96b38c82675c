use std::sync::Arc;

use chrono::NaiveDate;
use dvr_config::EngineConfig;
use dvr_engine::ReconEngine;
use dvr_fx::{RateSource, RateSourceError};
use dvr_schemas::{CorrectSide, LegRecord, Priority};

struct FixedMarket(f64);

#[async_trait::async_trait]
impl RateSource for FixedMarket {
    fn source_name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch_spot(
        &self,
        _base: &str,
        _quote: &str,
        _on: chrono::NaiveDate,
    ) -> Result<f64, RateSourceError> {
        Ok(self.0)
    }
}

fn leg(fx: f64) -> LegRecord {
    let mut l = LegRecord::new("E1", "US1", "1");
    l.gross_amount = Some(1000.0);
    l.net_amount = Some(900.0);
    l.tax_rate = Some(0.15);
    l.fx_rate = Some(fx);
    l
}

#[tokio::test]
async fn scenario_inverted_fx_pair_end_to_end() {
    // NBIM booked 8.5, custody booked the reciprocal; market confirms 8.5.
    let engine = ReconEngine::new(EngineConfig::default(), Arc::new(FixedMarket(8.5)));
    let report = engine
        .run(
            &[leg(8.5)],
            &[leg(0.1176)],
            NaiveDate::from_ymd_opt(2025, 4, 25).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.pairs_matched, 1);
    assert_eq!(report.clean_count, 0);
    assert_eq!(report.breaks.len(), 1);
    assert!(report.missing.is_empty());

    let brk = &report.breaks[0];
    assert_eq!(brk.label, "fx_inversion_suspected");
    assert_eq!(brk.record.cash_impact, 0.0);
    // inversion rule escalates regardless of zero cash impact
    assert_eq!(brk.priority, Priority::Critical);
    assert_eq!(brk.market_evidenced, Some(true));

    let decision = brk.record.fx_decision.as_ref().unwrap();
    assert_eq!(decision.correct_side, CorrectSide::Nbim);
    assert!(decision.is_inversion);
    assert_eq!(decision.mandated_rate, Some(8.5));
    assert_eq!(decision.confidence, 1.0);

    assert_eq!(report.priority_counts.get("CRITICAL"), Some(&1));

    // the report is the engine's whole output surface; it must serialize
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"fx_inversion_suspected\""));
    assert!(json.contains("\"correct_side\":\"nbim\""));
}

#[tokio::test]
async fn scenario_clean_pair_produces_no_break_rows() {
    let engine = ReconEngine::new(EngineConfig::default(), Arc::new(FixedMarket(8.5)));
    let report = engine
        .run(
            &[leg(8.5)],
            &[leg(8.5)],
            NaiveDate::from_ymd_opt(2025, 4, 25).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(report.pairs_matched, 1);
    assert_eq!(report.clean_count, 1);
    assert!(report.breaks.is_empty());
    assert!(report.priority_counts.is_empty());
}

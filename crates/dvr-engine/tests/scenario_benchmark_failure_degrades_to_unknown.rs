use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use dvr_config::EngineConfig;
use dvr_engine::ReconEngine;
use dvr_fx::{RateSource, RateSourceError};
use dvr_schemas::{CorrectSide, LegRecord, Priority, Side};

/// Source that always fails, counting attempts.
struct DeadSource {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl RateSource for DeadSource {
    fn source_name(&self) -> &'static str {
        "dead"
    }

    async fn fetch_spot(
        &self,
        _base: &str,
        _quote: &str,
        _on: chrono::NaiveDate,
    ) -> Result<f64, RateSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RateSourceError::Transport("connection refused".to_string()))
    }
}

fn leg(event: &str, fx: f64, net: f64) -> LegRecord {
    let mut l = LegRecord::new(event, "US1", "1");
    l.gross_amount = Some(1000.0);
    l.net_amount = Some(net);
    l.tax_rate = Some(0.15);
    l.fx_rate = Some(fx);
    l.quotation_currency = Some("USD".to_string());
    l.settlement_currency = Some("NOK".to_string());
    l
}

#[tokio::test]
async fn scenario_benchmark_outage_degrades_fx_but_run_completes() {
    let source = Arc::new(DeadSource {
        calls: AtomicUsize::new(0),
    });
    let engine = ReconEngine::new(EngineConfig::default(), source.clone());

    // Two breaks: one fx-flagged, one pure net-amount mismatch.
    let nbim = vec![leg("E1", 8.5, 900.0), leg("E2", 8.5, 900.0)];
    let custody = vec![leg("E1", 9.9, 900.0), leg("E2", 8.5, 880.0)];

    let report = engine
        .run(&nbim, &custody, NaiveDate::from_ymd_opt(2025, 4, 25).unwrap())
        .await
        .unwrap();

    // The outage never aborts the run; both breaks are reported.
    assert_eq!(report.breaks.len(), 2);

    let fx_break = report
        .breaks
        .iter()
        .find(|b| b.label == "fx_mismatch")
        .unwrap();
    let decision = fx_break.record.fx_decision.as_ref().unwrap();
    assert_eq!(decision.correct_side, CorrectSide::Unknown);
    assert_eq!(decision.confidence, 0.0);
    assert_eq!(decision.mandated_rate, None);
    assert!(decision.required_correction.is_none());
    // no benchmark means no measurable error magnitude on either side
    assert_eq!(decision.nbim_error_pct, None);
    assert_eq!(decision.custody_error_pct, None);
    assert_eq!(fx_break.market_evidenced, Some(false));

    let net_break = report
        .breaks
        .iter()
        .find(|b| b.label == "net_amount_mismatch")
        .unwrap();
    assert!(net_break.record.fx_decision.is_none());
    assert_eq!(net_break.market_evidenced, None);
    assert_eq!(net_break.priority, Priority::Low);

    // Single bounded attempt per key per run: one direct fetch, no cross
    // fallback for a USD base, no retry loop.
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scenario_orphan_legs_become_critical_missing_rows() {
    let source = Arc::new(DeadSource {
        calls: AtomicUsize::new(0),
    });
    let engine = ReconEngine::new(EngineConfig::default(), source);

    let nbim = vec![leg("E1", 8.5, 900.0)];
    let custody: Vec<LegRecord> = vec![];

    let report = engine
        .run(&nbim, &custody, NaiveDate::from_ymd_opt(2025, 4, 25).unwrap())
        .await
        .unwrap();

    assert_eq!(report.pairs_matched, 0);
    assert_eq!(report.missing.len(), 1);
    let row = &report.missing[0];
    // custody side lacks the leg
    assert_eq!(row.orphan.missing_on, Side::Custody);
    assert_eq!(row.label, "missing_cust");
    assert_eq!(row.priority, Priority::Critical);
    assert_eq!(row.playbook.action_code, "MISS_C_007");
}

//! dvr-engine
//!
//! Run orchestration: match -> classify -> resolve/decide -> prioritize.
//!
//! Architectural decisions:
//! - A fresh `BenchmarkResolver` per run: the rate cache is run-scoped by
//!   construction, nothing leaks across runs
//! - Only input-schema and duplicate-key errors are fatal; a benchmark
//!   failure degrades that record's decision to `unknown` and the remaining
//!   records keep processing
//! - Orphan legs become missing-leg report rows, never zero-valued pairs
//! - The report is structured data for a downstream narrative layer; the
//!   engine emits no free text

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dvr_breaks::{assign_priority, classify, playbook, PlaybookEntry};
use dvr_config::EngineConfig;
use dvr_fx::{base_currency_from_isin, decide, BenchmarkResolver, RateSource};
use dvr_match::match_legs;
use dvr_schemas::{
    break_label, BreakRecord, FxDecision, LegRecord, OrphanLeg, Priority,
};

/// One reportable break, annotated through all three stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakRow {
    pub label: String,
    pub priority: Priority,
    /// `Some(true)` when the FX decision is backed by a resolved market
    /// rate, `Some(false)` for a best-effort unknown, `None` for non-FX
    /// breaks.
    pub market_evidenced: Option<bool>,
    pub playbook: Vec<PlaybookEntry>,
    pub record: BreakRecord,
}

/// A leg with no counterpart, reported as a data-quality finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissingLegRow {
    pub label: String,
    pub priority: Priority,
    pub playbook: PlaybookEntry,
    pub orphan: OrphanLeg,
}

/// Structured output of one reconciliation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconReport {
    pub run_id: Uuid,
    pub value_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub pairs_matched: usize,
    pub clean_count: usize,
    pub breaks: Vec<BreakRow>,
    pub missing: Vec<MissingLegRow>,
    /// Break + missing counts per priority tier.
    pub priority_counts: BTreeMap<String, usize>,
}

/// The reconciliation engine for one configuration and rate source.
pub struct ReconEngine {
    config: EngineConfig,
    source: Arc<dyn RateSource>,
}

/// Currency pair for one pair's FX benchmark lookup. Quotation currency
/// first (NBIM side, then custody side), ISIN-prefix heuristic as the last
/// resort; settlement currency defaults to NOK (the portfolio currency).
fn currency_pair(nbim: &LegRecord, custody: &LegRecord) -> (String, String) {
    let base = nbim
        .quotation_currency
        .clone()
        .or_else(|| custody.quotation_currency.clone())
        .unwrap_or_else(|| base_currency_from_isin(&nbim.isin).to_string());
    let quote = nbim
        .settlement_currency
        .clone()
        .or_else(|| custody.settlement_currency.clone())
        .unwrap_or_else(|| "NOK".to_string());
    (base, quote)
}

impl ReconEngine {
    pub fn new(config: EngineConfig, source: Arc<dyn RateSource>) -> Self {
        Self { config, source }
    }

    /// Run one full reconciliation.
    ///
    /// Fatal only on duplicate composite keys; every other failure is
    /// degraded per record and the run completes with partial evidence.
    pub async fn run(
        &self,
        nbim_legs: &[LegRecord],
        custody_legs: &[LegRecord],
        value_date: NaiveDate,
    ) -> Result<ReconReport> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, %value_date, "reconciliation run starting");

        let outcome = match_legs(nbim_legs, custody_legs).context("leg matching")?;
        let pairs_matched = outcome.pairs.len();

        let mut records: Vec<BreakRecord> = outcome
            .pairs
            .iter()
            .map(|p| classify(p, &self.config.tolerances))
            .collect();
        let clean_count = records.iter().filter(|r| r.is_clean()).count();
        records.retain(|r| !r.is_clean());

        self.attach_fx_decisions(&mut records, value_date).await;

        for rec in &mut records {
            rec.priority = Some(assign_priority(
                &rec.categories,
                rec.cash_impact,
                &self.config.priority,
            ));
        }

        let breaks: Vec<BreakRow> = records
            .into_iter()
            .map(|record| BreakRow {
                label: record.label(),
                // priority is set for every record in the loop above
                priority: record.priority.unwrap_or(Priority::Low),
                market_evidenced: record
                    .fx_decision
                    .as_ref()
                    .map(FxDecision::is_market_evidenced),
                playbook: record.categories.iter().map(|c| playbook(*c)).collect(),
                record,
            })
            .collect();

        let missing: Vec<MissingLegRow> = outcome
            .orphans
            .into_iter()
            .map(|orphan| {
                let category = orphan.category();
                MissingLegRow {
                    label: break_label(&[category]),
                    priority: assign_priority(&[category], 0.0, &self.config.priority),
                    playbook: playbook(category),
                    orphan,
                }
            })
            .collect();

        let mut priority_counts: BTreeMap<String, usize> = BTreeMap::new();
        for p in breaks
            .iter()
            .map(|b| b.priority)
            .chain(missing.iter().map(|m| m.priority))
        {
            *priority_counts.entry(p.as_str().to_string()).or_default() += 1;
        }

        tracing::info!(
            %run_id,
            pairs_matched,
            clean = clean_count,
            breaks = breaks.len(),
            missing = missing.len(),
            "reconciliation run complete"
        );

        Ok(ReconReport {
            run_id,
            value_date,
            generated_at: Utc::now(),
            pairs_matched,
            clean_count,
            breaks,
            missing,
            priority_counts,
        })
    }

    /// Resolve benchmarks and attach FX decisions to every fx-flagged break.
    ///
    /// Lookups run concurrently; the resolver's per-key single-flight
    /// collapses duplicate pairs into one external fetch. An unavailable
    /// benchmark degrades that record to an unknown decision.
    async fn attach_fx_decisions(&self, records: &mut [BreakRecord], value_date: NaiveDate) {
        let resolver = BenchmarkResolver::new(self.source.clone());

        let lookups: Vec<(usize, Option<f64>, Option<f64>, String, String)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.flags.fx)
            .map(|(i, r)| {
                let (base, quote) = currency_pair(&r.pair.nbim, &r.pair.custody);
                (i, r.pair.nbim.fx_rate, r.pair.custody.fx_rate, base, quote)
            })
            .collect();

        let decisions = futures_util::future::join_all(lookups.into_iter().map(
            |(i, nbim_fx, custody_fx, base, quote)| {
                let resolver = &resolver;
                async move {
                    let decision = match resolver.resolve(&base, &quote, value_date).await {
                        Some(market) => decide(nbim_fx, custody_fx, market, &base, &quote),
                        None => {
                            tracing::warn!(
                                base = %base,
                                quote = %quote,
                                "no market evidence; fx decision degraded to unknown"
                            );
                            FxDecision::unresolved(nbim_fx, custody_fx)
                        }
                    };
                    (i, decision)
                }
            },
        ))
        .await;

        for (i, decision) in decisions {
            records[i].fx_decision = Some(decision);
        }
    }
}

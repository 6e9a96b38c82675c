//! dvr-match
//!
//! Per-leg matcher: joins the NBIM book-of-record and custodian feeds on the
//! normalized composite key `(event_key, isin, bank_account)`.
//!
//! Architectural decisions:
//! - Inner-join semantics: a leg with no counterpart produces no pair, it
//!   lands in `orphans` as a missing-counterpart data-quality finding
//! - A duplicate composite key within one side is a fatal input error,
//!   never silently resolved
//! - Deterministic: both sides indexed into `BTreeMap`s, output ordered by key
//!
//! Pure logic. No IO.

use std::collections::BTreeMap;

use dvr_schemas::{FieldDiffs, LegKey, LegRecord, MatchedPair, OrphanLeg, Side};
use serde::{Deserialize, Serialize};

/// Result of one matching pass over the two feeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Pairs present on both sides, ordered by key.
    pub pairs: Vec<MatchedPair>,
    /// Legs present on exactly one side, ordered by key.
    pub orphans: Vec<OrphanLeg>,
}

/// Fatal matcher errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// Two legs on the same side share one composite key. The natural key is
    /// not guaranteed unique by input data, so this is surfaced loudly.
    DuplicateKey { side: Side, key: LegKey },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::DuplicateKey { side, key } => {
                write!(
                    f,
                    "duplicate composite key on {} side: {}",
                    side.as_str(),
                    key
                )
            }
        }
    }
}

impl std::error::Error for MatchError {}

/// Normalize one leg in place: trimmed identifiers, upper-cased ISIN and
/// currency codes. Keeps key comparison insensitive to feed formatting
/// (e.g. `823456789` vs `" 823456789 "`).
fn normalize_leg(leg: &LegRecord) -> LegRecord {
    let mut out = leg.clone();
    out.event_key = out.event_key.trim().to_string();
    out.isin = out.isin.trim().to_ascii_uppercase();
    out.bank_account = out.bank_account.trim().to_string();
    out.quotation_currency = out
        .quotation_currency
        .take()
        .map(|c| c.trim().to_ascii_uppercase());
    out.settlement_currency = out
        .settlement_currency
        .take()
        .map(|c| c.trim().to_ascii_uppercase());
    out
}

fn index_side(
    side: Side,
    legs: &[LegRecord],
) -> Result<BTreeMap<LegKey, LegRecord>, MatchError> {
    let mut map = BTreeMap::new();
    for leg in legs {
        let leg = normalize_leg(leg);
        let key = LegKey::for_leg(&leg);
        if map.insert(key.clone(), leg).is_some() {
            return Err(MatchError::DuplicateKey { side, key });
        }
    }
    Ok(map)
}

fn diff(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a - b),
        _ => None,
    }
}

/// Join the two feeds per leg.
///
/// Returns matched pairs (with `nbim − custody` field diffs) plus orphans
/// for legs missing a counterpart. Errors on duplicate composite keys.
pub fn match_legs(
    nbim: &[LegRecord],
    custody: &[LegRecord],
) -> Result<MatchOutcome, MatchError> {
    let nbim_by_key = index_side(Side::Nbim, nbim)?;
    let mut custody_by_key = index_side(Side::Custody, custody)?;

    let mut pairs = Vec::new();
    let mut orphans = Vec::new();

    for (key, nbim_leg) in nbim_by_key {
        match custody_by_key.remove(&key) {
            Some(custody_leg) => {
                let diffs = FieldDiffs {
                    gross: diff(nbim_leg.gross_amount, custody_leg.gross_amount),
                    net: diff(nbim_leg.net_amount, custody_leg.net_amount),
                    tax_rate: diff(nbim_leg.tax_rate, custody_leg.tax_rate),
                    fx: diff(nbim_leg.fx_rate, custody_leg.fx_rate),
                };
                pairs.push(MatchedPair {
                    key,
                    nbim: nbim_leg,
                    custody: custody_leg,
                    diffs,
                });
            }
            None => {
                // NBIM holds a leg the custodian never reported.
                orphans.push(OrphanLeg {
                    missing_on: Side::Custody,
                    key,
                    leg: nbim_leg,
                });
            }
        }
    }

    // Remaining custody legs have no NBIM counterpart.
    for (key, leg) in custody_by_key {
        orphans.push(OrphanLeg {
            missing_on: Side::Nbim,
            key,
            leg,
        });
    }
    orphans.sort_by(|a, b| a.key.cmp(&b.key));

    tracing::debug!(
        pairs = pairs.len(),
        orphans = orphans.len(),
        "leg matching complete"
    );

    Ok(MatchOutcome { pairs, orphans })
}

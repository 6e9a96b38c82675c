//! Deterministic FX discrepancy decision.
//!
//! Pure math over the two booked rates and the market benchmark. No clock,
//! no randomness, no IO: the same inputs always produce the same decision.

use dvr_schemas::{CorrectSide, FxDecision, RequiredCorrection, Side};

/// Error threshold above which one side is considered clearly off market.
const CLEAR_ERROR_PCT: f64 = 50.0;
/// Error threshold under which the other side is considered clearly on market.
const CLEAN_ERROR_PCT: f64 = 10.0;
/// Product-of-rates distance from 1.0 that flags a suspected inversion.
const INVERSION_TOL: f64 = 0.01;

fn error_pct(rate: Option<f64>, market: f64) -> f64 {
    // A missing or non-finite rate is treated as 100% error: no evidence the
    // side ever converted.
    match rate {
        Some(r) if r.is_finite() => ((r - market) / market * 100.0).abs(),
        _ => 100.0,
    }
}

/// Decide which side holds the economically correct rate.
///
/// Precedence order:
/// 1. error percentages against the market rate (missing or non-finite
///    side = 100%);
/// 2. inversion detection (informational, does not pick a side);
/// 3. override: a rate of exactly `1.0` cross-currency means "no conversion
///    applied" and is wrong regardless of error percentages (custody checked
///    first when both sides booked 1.0);
/// 4. general rule: clear-error vs clean-error split at 50%/10%, otherwise
///    strictly smaller error wins, exact ties favor custody.
///
/// Callers handle an unresolved market rate upstream via
/// [`FxDecision::unresolved`]; this function requires a usable benchmark.
pub fn decide(
    nbim_rate: Option<f64>,
    custody_rate: Option<f64>,
    market_rate: f64,
    base_currency: &str,
    quote_currency: &str,
) -> FxDecision {
    if !market_rate.is_finite() || market_rate == 0.0 {
        // A zero or non-finite benchmark is no evidence at all.
        return FxDecision::unresolved(nbim_rate, custody_rate);
    }

    // A non-finite booked rate carries no evidence either: fold it into the
    // missing-rate path so NaN never survives a comparison unnoticed.
    let nbim_rate = nbim_rate.filter(|r| r.is_finite());
    let custody_rate = custody_rate.filter(|r| r.is_finite());

    let nbim_error_pct = error_pct(nbim_rate, market_rate);
    let custody_error_pct = error_pct(custody_rate, market_rate);

    let is_inversion = match (nbim_rate, custody_rate) {
        (Some(n), Some(c)) => (n * c - 1.0).abs() < INVERSION_TOL,
        _ => false,
    };

    let cross_currency = !base_currency.eq_ignore_ascii_case(quote_currency);

    let correct = if cross_currency && custody_rate == Some(1.0) {
        Side::Nbim
    } else if cross_currency && nbim_rate == Some(1.0) {
        Side::Custody
    } else if custody_error_pct > CLEAR_ERROR_PCT && nbim_error_pct < CLEAN_ERROR_PCT {
        Side::Nbim
    } else if nbim_error_pct > CLEAR_ERROR_PCT && custody_error_pct < CLEAN_ERROR_PCT {
        Side::Custody
    } else if nbim_error_pct < custody_error_pct {
        Side::Nbim
    } else {
        // Ties favor the custodian side: a fixed, documented policy so the
        // decision is reproducible.
        Side::Custody
    };

    let correct_side = match correct {
        Side::Nbim => CorrectSide::Nbim,
        Side::Custody => CorrectSide::Custody,
    };
    let wrong_side = correct.other();
    let required_correction = Some(RequiredCorrection {
        side: wrong_side,
        from_rate: match wrong_side {
            Side::Nbim => nbim_rate,
            Side::Custody => custody_rate,
        },
        to_rate: market_rate,
    });

    FxDecision {
        correct_side,
        market_rate: Some(market_rate),
        nbim_error_pct: Some(nbim_error_pct),
        custody_error_pct: Some(custody_error_pct),
        is_inversion,
        mandated_rate: Some(market_rate),
        required_correction,
        confidence: 1.0,
    }
}

/// Fallback base-currency inference from the ISIN country prefix, used when
/// a leg carries no quotation currency.
pub fn base_currency_from_isin(isin: &str) -> &'static str {
    let prefix: String = isin
        .trim()
        .chars()
        .take(2)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match prefix.as_str() {
        "US" => "USD",
        "KR" => "KRW",
        "CH" => "CHF",
        "GB" => "GBP",
        "SE" => "SEK",
        "JP" => "JPY",
        "NO" => "NOK",
        "CA" => "CAD",
        "EU" | "DE" | "FR" | "IT" => "EUR",
        _ => "USD",
    }
}

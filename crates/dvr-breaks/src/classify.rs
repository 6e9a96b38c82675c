use dvr_config::ToleranceConfig;
use dvr_schemas::{BreakCategory, BreakFlags, BreakRecord, MatchedPair};

/// An fx pair whose product lands within this distance of 1.0 looks like a
/// quote/base mix-up (one side booked the reciprocal).
pub const INVERSION_PRODUCT_TOL: f64 = 1e-3;

/// Dual-tolerance closeness for monetary / rate fields.
///
/// Close iff `|a - b| <= tol.absolute` OR (`b != 0` and `|a - b| / |b| <=
/// tol.relative`). Absent or non-finite values are never close: a field we
/// cannot evidence is a break, not a pass.
pub fn is_close(a: Option<f64>, b: Option<f64>, tol: &ToleranceConfig) -> bool {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let abs_diff = (a - b).abs();
    if abs_diff <= tol.absolute {
        return true;
    }
    b != 0.0 && abs_diff / b.abs() <= tol.relative
}

fn abs_or_zero(v: Option<f64>) -> f64 {
    v.map(f64::abs).unwrap_or(0.0)
}

/// Classify one matched pair into a break record.
///
/// Pure function of the pair and tolerances: calling it twice yields an
/// identical record. `fx_decision` and `priority` are left unset for the
/// later stages.
pub fn classify(pair: &MatchedPair, tol: &ToleranceConfig) -> BreakRecord {
    let flags = BreakFlags {
        tax: !is_close(pair.nbim.tax_rate, pair.custody.tax_rate, tol),
        fx: !is_close(pair.nbim.fx_rate, pair.custody.fx_rate, tol),
        gross: !is_close(pair.nbim.gross_amount, pair.custody.gross_amount, tol),
        net: !is_close(pair.nbim.net_amount, pair.custody.net_amount, tol),
    };

    // Category order is fixed: tax, fx, gross, net.
    let mut categories = Vec::new();
    if flags.tax {
        categories.push(BreakCategory::TaxRateMismatch);
    }
    if flags.fx {
        categories.push(fx_category(pair.nbim.fx_rate, pair.custody.fx_rate));
    }
    if flags.gross {
        categories.push(BreakCategory::GrossAmountMismatch);
    }
    if flags.net {
        categories.push(BreakCategory::NetAmountMismatch);
    }

    let cash_impact = f64::max(abs_or_zero(pair.diffs.gross), abs_or_zero(pair.diffs.net));

    if !categories.is_empty() {
        tracing::debug!(
            key = %pair.key,
            label = %dvr_schemas::break_label(&categories),
            cash_impact,
            "break classified"
        );
    }

    BreakRecord {
        pair: pair.clone(),
        flags,
        categories,
        cash_impact,
        fx_decision: None,
        priority: None,
    }
}

/// Inversion suspicion beats the generic fx label: when both rates are
/// present and their product sits within [`INVERSION_PRODUCT_TOL`] of 1.0,
/// one side almost certainly booked the reciprocal quote.
fn fx_category(nbim_fx: Option<f64>, custody_fx: Option<f64>) -> BreakCategory {
    if let (Some(n), Some(c)) = (nbim_fx, custody_fx) {
        let prod = n * c;
        if prod.is_finite() && (prod - 1.0).abs() <= INVERSION_PRODUCT_TOL {
            return BreakCategory::FxInversionSuspected;
        }
    }
    BreakCategory::FxMismatch
}

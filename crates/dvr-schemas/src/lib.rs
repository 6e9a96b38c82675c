//! dvr-schemas
//!
//! Shared data model for the dividend reconciliation engine.
//!
//! Architectural decisions:
//! - Leg records are immutable once loaded; absent numerics are `None`,
//!   never zero, so tolerance checks can distinguish "missing" from "0.0"
//! - Composite keys are normalized once (`LegKey::for_leg`) and ordered,
//!   so map iteration and therefore report order is deterministic
//! - Break records accumulate annotations in stages (classifier ->
//!   fx decider -> priority engine) and are terminal after all three
//!
//! Pure types. No IO. No tolerance or decision logic here.

use serde::{Deserialize, Serialize};

/// Which party produced a record, or which side of a break is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Nbim,
    Custody,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Nbim => "nbim",
            Side::Custody => "custody",
        }
    }

    pub fn other(&self) -> Side {
        match self {
            Side::Nbim => Side::Custody,
            Side::Custody => Side::Nbim,
        }
    }
}

/// One party's view of one corporate-action event for one bank account.
///
/// Numeric fields are `Option<f64>`: a feed cell that failed numeric parsing
/// is *absent*, which downstream tolerance rules treat as "never close".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegRecord {
    pub event_key: String,
    pub isin: String,
    pub bank_account: String,
    pub gross_amount: Option<f64>,
    pub net_amount: Option<f64>,
    pub tax_rate: Option<f64>,
    pub fx_rate: Option<f64>,
    pub quotation_currency: Option<String>,
    pub settlement_currency: Option<String>,
}

impl LegRecord {
    pub fn new(
        event_key: impl Into<String>,
        isin: impl Into<String>,
        bank_account: impl Into<String>,
    ) -> Self {
        Self {
            event_key: event_key.into(),
            isin: isin.into(),
            bank_account: bank_account.into(),
            gross_amount: None,
            net_amount: None,
            tax_rate: None,
            fx_rate: None,
            quotation_currency: None,
            settlement_currency: None,
        }
    }
}

/// Normalized composite key joining the two feeds:
/// `(event_key, isin, bank_account)`.
///
/// Identifiers are whitespace-trimmed; the ISIN is upper-cased. Uniqueness
/// within one side is NOT guaranteed by input data; a duplicate is a fatal
/// data-quality error handled by the matcher, never silently resolved.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LegKey {
    pub event_key: String,
    pub isin: String,
    pub bank_account: String,
}

impl LegKey {
    pub fn new(
        event_key: impl Into<String>,
        isin: impl Into<String>,
        bank_account: impl Into<String>,
    ) -> Self {
        Self {
            event_key: event_key.into(),
            isin: isin.into(),
            bank_account: bank_account.into(),
        }
    }

    /// Build the normalized key for a leg: trim all three identifiers,
    /// upper-case the ISIN.
    pub fn for_leg(leg: &LegRecord) -> Self {
        Self {
            event_key: leg.event_key.trim().to_string(),
            isin: leg.isin.trim().to_ascii_uppercase(),
            bank_account: leg.bank_account.trim().to_string(),
        }
    }
}

impl std::fmt::Display for LegKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.event_key, self.isin, self.bank_account)
    }
}

/// Per-field differences (`nbim − custody`), absent when either side is absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDiffs {
    pub gross: Option<f64>,
    pub net: Option<f64>,
    pub tax_rate: Option<f64>,
    pub fx: Option<f64>,
}

/// The join of one NBIM leg and one custody leg sharing a [`LegKey`].
/// Read-only downstream of the matcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub key: LegKey,
    pub nbim: LegRecord,
    pub custody: LegRecord,
    pub diffs: FieldDiffs,
}

/// Break taxonomy. Token order inside a label is fixed by the classifier:
/// tax, fx, gross, net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakCategory {
    TaxRateMismatch,
    FxMismatch,
    FxInversionSuspected,
    GrossAmountMismatch,
    NetAmountMismatch,
    MissingNbim,
    MissingCust,
}

impl BreakCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakCategory::TaxRateMismatch => "tax_rate_mismatch",
            BreakCategory::FxMismatch => "fx_mismatch",
            BreakCategory::FxInversionSuspected => "fx_inversion_suspected",
            BreakCategory::GrossAmountMismatch => "gross_amount_mismatch",
            BreakCategory::NetAmountMismatch => "net_amount_mismatch",
            BreakCategory::MissingNbim => "missing_nbim",
            BreakCategory::MissingCust => "missing_cust",
        }
    }

    /// FX and tax categories escalate earlier in the priority engine
    /// (systemic-risk classes).
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            BreakCategory::TaxRateMismatch
                | BreakCategory::FxMismatch
                | BreakCategory::FxInversionSuspected
        )
    }
}

/// Assemble the break label for a category list: tokens joined by `" | "`,
/// or `"ok"` when no category triggered.
pub fn break_label(categories: &[BreakCategory]) -> String {
    if categories.is_empty() {
        return "ok".to_string();
    }
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Per-field break flags, a pure function of the matched pair and tolerances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakFlags {
    pub tax: bool,
    pub fx: bool,
    pub gross: bool,
    pub net: bool,
}

impl BreakFlags {
    pub fn any(&self) -> bool {
        self.tax || self.fx || self.gross || self.net
    }
}

/// Remediation priority, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// Which side holds the economically correct FX rate.
///
/// Exactly three values; `Unknown` is mandatory whenever no market rate
/// resolved: the decider never guesses without market evidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectSide {
    Nbim,
    Custody,
    Unknown,
}

/// Structured correction instruction: adjust `side`'s rate to `to_rate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequiredCorrection {
    pub side: Side,
    pub from_rate: Option<f64>,
    pub to_rate: f64,
}

/// Deterministic FX discrepancy decision for one break.
///
/// `confidence` is 1.0 when the decision is market-evidenced and 0.0 when
/// the benchmark was unavailable; the final report surfaces this so a reader
/// can tell a fully evidenced decision from a best-effort unknown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxDecision {
    pub correct_side: CorrectSide,
    pub market_rate: Option<f64>,
    /// Absent when no benchmark was resolved: an error percentage only
    /// exists relative to a market rate.
    pub nbim_error_pct: Option<f64>,
    pub custody_error_pct: Option<f64>,
    pub is_inversion: bool,
    pub mandated_rate: Option<f64>,
    pub required_correction: Option<RequiredCorrection>,
    pub confidence: f64,
}

impl FxDecision {
    /// Decision when no market rate could be resolved: no guess, no
    /// correction, zero confidence.
    pub fn unresolved(nbim_rate: Option<f64>, custody_rate: Option<f64>) -> Self {
        let is_inversion = match (nbim_rate, custody_rate) {
            (Some(n), Some(c)) => (n * c - 1.0).abs() < 0.01,
            _ => false,
        };
        Self {
            correct_side: CorrectSide::Unknown,
            market_rate: None,
            nbim_error_pct: None,
            custody_error_pct: None,
            is_inversion,
            mandated_rate: None,
            required_correction: None,
            confidence: 0.0,
        }
    }

    pub fn is_market_evidenced(&self) -> bool {
        self.market_rate.is_some()
    }
}

/// A matched pair annotated through the three engine stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakRecord {
    pub pair: MatchedPair,
    pub flags: BreakFlags,
    pub categories: Vec<BreakCategory>,
    /// Larger of the absolute gross / net mismatches (absent diff counts 0).
    pub cash_impact: f64,
    pub fx_decision: Option<FxDecision>,
    pub priority: Option<Priority>,
}

impl BreakRecord {
    pub fn label(&self) -> String {
        break_label(&self.categories)
    }

    pub fn is_clean(&self) -> bool {
        self.categories.is_empty()
    }
}

/// A leg with no counterpart on the other side.
///
/// `missing_on` names the side that LACKS the leg: `missing_on = Nbim`
/// means the custodian reported a leg the book-of-record does not hold.
/// Orphans are reported as data quality, never fabricated into zero-valued
/// matched pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrphanLeg {
    pub missing_on: Side,
    pub key: LegKey,
    pub leg: LegRecord,
}

impl OrphanLeg {
    pub fn category(&self) -> BreakCategory {
        match self.missing_on {
            Side::Nbim => BreakCategory::MissingNbim,
            Side::Custody => BreakCategory::MissingCust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leg_key_normalizes_trim_and_isin_case() {
        let mut leg = LegRecord::new(" E1 ", "us0378331005", " 823456789 ");
        leg.gross_amount = Some(1000.0);
        let key = LegKey::for_leg(&leg);
        assert_eq!(key, LegKey::new("E1", "US0378331005", "823456789"));
    }

    #[test]
    fn label_ok_when_no_categories() {
        assert_eq!(break_label(&[]), "ok");
    }

    #[test]
    fn label_joins_tokens_in_given_order() {
        let label = break_label(&[
            BreakCategory::TaxRateMismatch,
            BreakCategory::FxInversionSuspected,
            BreakCategory::NetAmountMismatch,
        ]);
        assert_eq!(
            label,
            "tax_rate_mismatch | fx_inversion_suspected | net_amount_mismatch"
        );
    }

    #[test]
    fn unresolved_decision_is_unknown_with_zero_confidence() {
        let d = FxDecision::unresolved(Some(8.5), Some(0.1176));
        assert_eq!(d.correct_side, CorrectSide::Unknown);
        assert_eq!(d.confidence, 0.0);
        assert!(d.is_inversion);
        assert!(!d.is_market_evidenced());
        assert_eq!(d.nbim_error_pct, None);
        assert_eq!(d.custody_error_pct, None);
    }

    #[test]
    fn priority_serializes_uppercase() {
        let j = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(j, "\"CRITICAL\"");
    }
}

use dvr_schemas::BreakCategory;
use serde::{Deserialize, Serialize};

/// Fixed remediation playbook row for one break category.
///
/// Static reference data for the downstream reporting layer; the engine
/// attaches it verbatim and generates no text of its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookEntry {
    pub action_code: String,
    pub standard_step: String,
}

fn entry(action_code: &str, standard_step: &str) -> PlaybookEntry {
    PlaybookEntry {
        action_code: action_code.to_string(),
        standard_step: standard_step.to_string(),
    }
}

/// Remediation table keyed by break category.
pub fn playbook(category: BreakCategory) -> PlaybookEntry {
    match category {
        BreakCategory::FxInversionSuspected => entry(
            "FX_INV_001",
            "Recompute using 1/fx; verify currency direction (QC<->SC) and data source; request custodian correction if confirmed.",
        ),
        BreakCategory::FxMismatch => entry(
            "FX_MIS_002",
            "Compare NBIM vs custodian FX source & timestamp; check cross-currency reversal flag; reprice if stale.",
        ),
        BreakCategory::TaxRateMismatch => entry(
            "TAX_003",
            "Validate country treaty rate & relief-at-source vs reclaim; confirm ADR vs ORD; recalc expected tax.",
        ),
        BreakCategory::GrossAmountMismatch => entry(
            "AMT_G_004",
            "Check nominal/position sizing, splits, rounding; confirm any fees deducted from gross.",
        ),
        BreakCategory::NetAmountMismatch => entry(
            "AMT_N_005",
            "Recompute net from gross - tax - fees; verify ADR fee & restitution lines.",
        ),
        BreakCategory::MissingNbim => entry(
            "MISS_N_006",
            "Create provisional NBIM booking; escalate for approval.",
        ),
        BreakCategory::MissingCust => entry(
            "MISS_C_007",
            "Open ticket with custodian; attach NBIM event facts.",
        ),
    }
}

//! dvr-fx
//!
//! Market-benchmark resolution and the deterministic FX discrepancy decision.
//!
//! Architectural decisions:
//! - The rate source is an injected trait object; the resolver depends on
//!   the narrow fetch contract, never on the transport
//! - The cache is owned by the resolver and scoped to one reconciliation
//!   run: build a fresh resolver per run, rates never leak across runs
//! - Per-key single-flight: at most one outstanding external fetch per
//!   `(base, quote, date)`; a hard failure is cached as unavailable and not
//!   retried within the run
//! - The decider is a pure function; identical inputs always yield the
//!   identical decision (the property the audit trail depends on)

mod decider;
mod norges_bank;
mod resolver;
mod source;

pub use decider::{base_currency_from_isin, decide};
pub use norges_bank::NorgesBankSource;
pub use resolver::{BenchmarkResolver, RateKey, PER_100_UNIT_CURRENCIES};
pub use source::{RateSource, RateSourceError};

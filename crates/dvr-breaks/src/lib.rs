//! dvr-breaks
//!
//! Break classification and remediation priority.
//!
//! Architectural decisions:
//! - Dual-tolerance closeness (absolute OR relative), absent values never
//!   close: missing evidence flags a break, it never passes one
//! - Fixed category evaluation order: tax, fx, gross, net
//! - FX inversion detection takes precedence over the generic fx label
//! - Priority thresholds are configuration, defaults in `dvr-config`
//!
//! Deterministic, pure logic. No IO. No market lookups.

mod classify;
mod playbook;
mod priority;

pub use classify::{classify, is_close, INVERSION_PRODUCT_TOL};
pub use playbook::{playbook, PlaybookEntry};
pub use priority::assign_priority;

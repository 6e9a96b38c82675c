//! Rate-source boundary: the trait the resolver is injected with, and the
//! error taxonomy a source may report. No caching, no normalization, no
//! cross-rate logic here.

use chrono::NaiveDate;
use std::fmt;

/// Errors a [`RateSource`] implementation may return.
///
/// The taxonomy is deliberate: "source unreachable" and "malformed
/// response" and "no quote published for that date" are different facts and
/// are surfaced structurally, never collapsed into a default value.
#[derive(Debug)]
pub enum RateSourceError {
    /// Network or transport failure (timeout included).
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { status: Option<u16>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// The source answered cleanly but published no observation for the
    /// requested pair and date.
    NoObservation,
}

impl fmt::Display for RateSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateSourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            RateSourceError::Api {
                status: Some(s),
                message,
            } => write!(f, "rate source api error status={s}: {message}"),
            RateSourceError::Api {
                status: None,
                message,
            } => write!(f, "rate source api error: {message}"),
            RateSourceError::Decode(msg) => write!(f, "decode error: {msg}"),
            RateSourceError::NoObservation => write!(f, "no observation published"),
        }
    }
}

impl std::error::Error for RateSourceError {}

/// Daily-spot benchmark rate source contract.
///
/// Object-safe and `Send + Sync` so the resolver can hold an
/// `Arc<dyn RateSource>` across async task boundaries. Implementations make
/// one bounded attempt per call; retry discipline belongs to the caller,
/// and the resolver deliberately never retries within a run.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// Human-readable name identifying this source (e.g. `"norges-bank"`).
    fn source_name(&self) -> &'static str;

    /// Fetch the daily spot rate for `base`/`quote` on `on`, as published by
    /// the source (no per-100 normalization; that is the resolver's job).
    async fn fetch_spot(
        &self,
        base: &str,
        quote: &str,
        on: NaiveDate,
    ) -> Result<f64, RateSourceError>;
}

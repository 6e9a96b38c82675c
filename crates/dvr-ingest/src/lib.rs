//! dvr-ingest
//!
//! CSV ingestion for the two dividend-booking feeds. Read side only: this
//! crate produces `LegRecord`s and nothing else: matching, classification,
//! and reporting live downstream.
//!
//! ## Feed contracts (semicolon-delimited; headers case-insensitive,
//! order-independent)
//!
//! NBIM book-of-record:
//!
//! | Column                                | Maps to              |
//! |---------------------------------------|----------------------|
//! | `COAC_EVENT_KEY`                      | `event_key`          |
//! | `ISIN`                                | `isin`               |
//! | `BANK_ACCOUNT`                        | `bank_account`       |
//! | `GROSS_AMOUNT_QUOTATION`              | `gross_amount`       |
//! | `NET_AMOUNT_QUOTATION`                | `net_amount`         |
//! | `WTHTAX_RATE`                         | `tax_rate`           |
//! | `AVG_FX_RATE_QUOTATION_TO_PORTFOLIO`  | `fx_rate`            |
//! | `QUOTATION_CURRENCY` (optional)       | `quotation_currency` |
//! | `SETTLEMENT_CURRENCY` (optional)      | `settlement_currency`|
//!
//! Custody feed: `COAC_EVENT_KEY`, `ISIN`, `BANK_ACCOUNT` (some feeds send
//! `BANK_ACCOUNTS`; both accepted), `GROSS_AMOUNT`, `NET_AMOUNT_QC`,
//! `TAX_RATE`, `FX_RATE`, and optional `CURRENCIES` / `SETTLED_CURRENCY`.
//!
//! A missing required column is fatal. A numeric cell that fails to parse
//! degrades to `None`, never to zero, so downstream tolerance rules see
//! "value missing" rather than "value is zero".

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use dvr_schemas::LegRecord;

/// Errors produced by feed ingestion.
#[derive(Debug)]
pub enum IngestError {
    /// An I/O or CSV-library error.
    Io(String),
    /// The header row is missing a required column.
    MissingHeader(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "csv io error: {msg}"),
            IngestError::MissingHeader(col) => {
                write!(f, "csv missing required header column: '{col}'")
            }
        }
    }
}

impl std::error::Error for IngestError {}

/// Column bindings for one feed shape. `aliases` lists acceptable header
/// spellings in preference order.
struct FeedShape {
    event_key: &'static [&'static str],
    isin: &'static [&'static str],
    bank_account: &'static [&'static str],
    gross_amount: &'static [&'static str],
    net_amount: &'static [&'static str],
    tax_rate: &'static [&'static str],
    fx_rate: &'static [&'static str],
    quotation_currency: &'static [&'static str],
    settlement_currency: &'static [&'static str],
}

const NBIM_SHAPE: FeedShape = FeedShape {
    event_key: &["COAC_EVENT_KEY"],
    isin: &["ISIN"],
    bank_account: &["BANK_ACCOUNT"],
    gross_amount: &["GROSS_AMOUNT_QUOTATION"],
    net_amount: &["NET_AMOUNT_QUOTATION"],
    tax_rate: &["WTHTAX_RATE"],
    fx_rate: &["AVG_FX_RATE_QUOTATION_TO_PORTFOLIO"],
    quotation_currency: &["QUOTATION_CURRENCY"],
    settlement_currency: &["SETTLEMENT_CURRENCY"],
};

const CUSTODY_SHAPE: FeedShape = FeedShape {
    event_key: &["COAC_EVENT_KEY"],
    isin: &["ISIN"],
    bank_account: &["BANK_ACCOUNT", "BANK_ACCOUNTS"],
    gross_amount: &["GROSS_AMOUNT"],
    net_amount: &["NET_AMOUNT_QC"],
    tax_rate: &["TAX_RATE"],
    fx_rate: &["FX_RATE"],
    quotation_currency: &["CURRENCIES"],
    settlement_currency: &["SETTLED_CURRENCY"],
};

/// Resolved header indices for one parsed file.
struct ColumnIndex {
    event_key: usize,
    isin: usize,
    bank_account: usize,
    gross_amount: usize,
    net_amount: usize,
    tax_rate: usize,
    fx_rate: usize,
    quotation_currency: Option<usize>,
    settlement_currency: Option<usize>,
}

fn find_column(
    headers: &HashMap<String, usize>,
    aliases: &[&str],
) -> Option<usize> {
    aliases
        .iter()
        .find_map(|a| headers.get(&a.to_ascii_uppercase()).copied())
}

fn require_column(
    headers: &HashMap<String, usize>,
    aliases: &[&str],
) -> Result<usize, IngestError> {
    find_column(headers, aliases)
        .ok_or_else(|| IngestError::MissingHeader(aliases[0].to_string()))
}

impl ColumnIndex {
    fn resolve(
        headers: &csv::StringRecord,
        shape: &FeedShape,
    ) -> Result<Self, IngestError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_uppercase(), i))
            .collect();

        Ok(Self {
            event_key: require_column(&map, shape.event_key)?,
            isin: require_column(&map, shape.isin)?,
            bank_account: require_column(&map, shape.bank_account)?,
            gross_amount: require_column(&map, shape.gross_amount)?,
            net_amount: require_column(&map, shape.net_amount)?,
            tax_rate: require_column(&map, shape.tax_rate)?,
            fx_rate: require_column(&map, shape.fx_rate)?,
            quotation_currency: find_column(&map, shape.quotation_currency),
            settlement_currency: find_column(&map, shape.settlement_currency),
        })
    }
}

fn cell<'r>(record: &'r csv::StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

/// Parse a numeric cell. Empty or malformed cells degrade to `None`.
fn numeric_cell(record: &csv::StringRecord, idx: usize, field: &str, row: usize) -> Option<f64> {
    let raw = cell(record, idx);
    if raw.is_empty() {
        return None;
    }
    // `str::parse::<f64>` accepts "NaN" and "inf"; those carry no usable
    // amount either, so only finite values survive.
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!(row, field, raw, "numeric cell failed to parse; treating as absent");
            None
        }
    }
}

fn optional_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let raw = cell(record, idx?);
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_ascii_uppercase())
    }
}

fn load_feed<R: Read>(reader: R, shape: &FeedShape) -> Result<Vec<LegRecord>, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| IngestError::Io(e.to_string()))?
        .clone();
    let cols = ColumnIndex::resolve(&headers, shape)?;

    let mut legs = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| IngestError::Io(e.to_string()))?;
        let row = i + 2; // 1-based, after header

        let mut leg = LegRecord::new(
            cell(&record, cols.event_key),
            cell(&record, cols.isin).to_ascii_uppercase(),
            cell(&record, cols.bank_account),
        );
        leg.gross_amount = numeric_cell(&record, cols.gross_amount, "gross_amount", row);
        leg.net_amount = numeric_cell(&record, cols.net_amount, "net_amount", row);
        leg.tax_rate = numeric_cell(&record, cols.tax_rate, "tax_rate", row);
        leg.fx_rate = numeric_cell(&record, cols.fx_rate, "fx_rate", row);
        leg.quotation_currency = optional_cell(&record, cols.quotation_currency);
        leg.settlement_currency = optional_cell(&record, cols.settlement_currency);
        legs.push(leg);
    }

    Ok(legs)
}

/// Load the NBIM book-of-record feed from a file.
pub fn load_nbim_csv(path: impl AsRef<Path>) -> Result<Vec<LegRecord>, IngestError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| IngestError::Io(e.to_string()))?;
    load_feed(file, &NBIM_SHAPE)
}

/// Load the NBIM book-of-record feed from any reader (tests, in-memory).
pub fn load_nbim_reader<R: Read>(reader: R) -> Result<Vec<LegRecord>, IngestError> {
    load_feed(reader, &NBIM_SHAPE)
}

/// Load the custodian feed from a file.
pub fn load_custody_csv(path: impl AsRef<Path>) -> Result<Vec<LegRecord>, IngestError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| IngestError::Io(e.to_string()))?;
    load_feed(file, &CUSTODY_SHAPE)
}

/// Load the custodian feed from any reader.
pub fn load_custody_reader<R: Read>(reader: R) -> Result<Vec<LegRecord>, IngestError> {
    load_feed(reader, &CUSTODY_SHAPE)
}

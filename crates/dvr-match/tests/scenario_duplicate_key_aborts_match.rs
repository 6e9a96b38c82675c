use dvr_match::{match_legs, MatchError};
use dvr_schemas::{LegRecord, Side};

#[test]
fn scenario_duplicate_custody_key_aborts_match() {
    let nbim = vec![LegRecord::new("E1", "US1", "1")];
    let custody = vec![
        LegRecord::new("E1", "US1", "1"),
        // same composite key after normalization
        LegRecord::new("E1", "us1", " 1 "),
    ];

    let err = match_legs(&nbim, &custody).unwrap_err();
    match err {
        MatchError::DuplicateKey { side, key } => {
            assert_eq!(side, Side::Custody);
            assert_eq!(key.isin, "US1");
        }
    }
}

//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 2    | Usage error (bad args, unknown output format)       |
//! | 3    | An upload could not be parsed                       |
//! | 4    | A required column is missing after renaming         |
//! | 5    | Join / derive failure (duplicates, bad values)      |
//! | 6    | Config file or preset is invalid                    |
//! | 7    | A role has no input file                            |
//! | 8    | The output file could not be written                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for`

use concilia_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, undetectable file role, unsupported output extension.
pub const EXIT_USAGE: u8 = 2;

/// An upload is neither delimited text nor a readable spreadsheet.
pub const EXIT_PARSE: u8 = 3;

/// A canonical column is absent after renaming (or a filter column is absent).
pub const EXIT_MISSING_COLUMN: u8 = 4;

/// Join or derive stage failed: duplicate keys, unparseable values,
/// empty or non-matching joins.
pub const EXIT_PROCESSING: u8 = 5;

/// Config TOML failed to parse or validate, or the preset name is unknown.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// No file was supplied (or readable) for a role.
pub const EXIT_MISSING_INPUT: u8 = 7;

/// The reconciled table could not be written (permissions, full disk).
pub const EXIT_OUTPUT: u8 = 8;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Parse { .. } => EXIT_PARSE,
        ReconError::MissingInput(_) => EXIT_MISSING_INPUT,
        ReconError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        ReconError::Processing(_) => EXIT_PROCESSING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concilia_recon::{ProcessingError, Role};

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_USAGE,
            EXIT_PARSE,
            EXIT_MISSING_COLUMN,
            EXIT_PROCESSING,
            EXIT_INVALID_CONFIG,
            EXIT_MISSING_INPUT,
            EXIT_OUTPUT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_codes() {
        assert_eq!(exit_code_for(&ReconError::MissingInput(Role::Prices)), EXIT_MISSING_INPUT);
        assert_eq!(
            exit_code_for(&ReconError::MissingColumn { role: Role::Orders, column: "sku".into() }),
            EXIT_MISSING_COLUMN
        );
        assert_eq!(
            exit_code_for(&ReconError::Processing(ProcessingError::Other("x".into()))),
            EXIT_PROCESSING
        );
        assert_eq!(exit_code_for(&ReconError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
    }
}

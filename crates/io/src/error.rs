use concilia_recon::ReconError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
    /// Spreadsheet reader failure (calamine).
    #[error("spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("xlsx export: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("no header row")]
    NoHeader,
    #[error("neither delimited text nor a spreadsheet ({0})")]
    UnknownFormat(String),
}

impl FileError {
    /// Attach the upload name, producing the engine's parse error.
    pub fn into_parse_error(self, file: &str) -> ReconError {
        ReconError::Parse {
            file: file.to_string(),
            message: self.to_string(),
        }
    }
}

//! Error types for the engagement analysis pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required input file does not exist.
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    /// A column the run depends on is absent from the table.
    #[error("required column '{column}' not found")]
    MissingColumn { column: String },

    /// The target population has no rows, so no threshold can be computed.
    #[error("no rows available to define the target on '{metric}'")]
    EmptyPopulation { metric: &'static str },

    /// Every candidate in the weight grid had an undefined correlation.
    #[error("no weight candidate produced a defined correlation")]
    NoDefinedCorrelation,

    /// Invalid scheme or grid definition.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_names_the_column() {
        let err = Error::MissingColumn {
            column: "Scheme_Baseline".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Scheme_Baseline"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn missing_input_shows_path() {
        let err = Error::MissingInput {
            path: PathBuf::from("data/intermediate/clean_data.csv"),
        };
        assert!(err.to_string().contains("clean_data.csv"));
    }

    #[test]
    fn io_errors_convert() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("denied"));
    }
}

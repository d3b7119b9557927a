use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read '{path}': {source}")]
    Load { path: String, source: csv::Error },

    #[error("required column '{column}' missing in {path}")]
    MissingColumn { path: String, column: String },

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("schema check failed at stage '{stage}', column '{column}': {detail}")]
    Schema {
        stage: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("blocking check '{name}' failed: {description}")]
    CheckFailed {
        name: &'static str,
        description: String,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, ReportError>;

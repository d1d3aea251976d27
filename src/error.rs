use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Everything that can abort a conversion. None of these are recovered from
/// inside the pipeline; they propagate to whoever started the transaction.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Row shape does not match the declared delimiter/column layout.
    #[error(
        "line {line}: expected {expected} columns but found {found} using delimiter {delimiter}"
    )]
    Parse {
        line: usize,
        delimiter: String,
        expected: usize,
        found: usize,
    },

    #[error("{path}: no data rows left after removing header and blank lines")]
    EmptyData { path: PathBuf },

    /// A token could not be read as the type its column declares.
    #[error("line {line}, column {column}: {message}")]
    Data {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("unknown value type '{type_name}' declared for '{target}'")]
    UnknownType { target: String, type_name: String },

    #[error("attribute '{name}' value '{value}' is not a valid {type_name}")]
    InvalidAttributeValue {
        name: String,
        value: String,
        type_name: &'static str,
    },

    /// Checked before any file is touched.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("netCDF error writing {path}: {source}")]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io { path: path.into(), source }
    }

    pub(crate) fn netcdf(path: impl Into<PathBuf>, source: netcdf::Error) -> Self {
        ConvertError::NetCdf { path: path.into(), source }
    }
}

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// Coarse classification every [`Error`] maps onto.
///
/// Callers branch on the kind (retry, surface to an operator, treat as
/// missing data) instead of matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Conflict,
    Internal,
    RateLimit,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::RateLimit => "rate_limit",
        };
        f.write_str(name)
    }
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Backtest run failures.
#[derive(Error, Debug, Clone)]
pub enum BacktestError {
    #[error(
        "no historical data for sports {sports:?} leagues {leagues:?} between {from} and {to}"
    )]
    NoData {
        sports: Vec<String>,
        leagues: Vec<String>,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("invalid backtest config: {0}")]
    InvalidConfig(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_)
            | Self::Json(_)
            | Self::Url(_)
            | Self::Parse(_)
            | Self::Validation(_) => {
                ErrorKind::Validation
            }
            Self::Backtest(BacktestError::NoData { .. }) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Backtest(BacktestError::InvalidConfig(_)) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::RateLimited(_) => ErrorKind::RateLimit,
            Self::WebSocket(_)
            | Self::Io(_)
            | Self::Connection(_)
            | Self::Database(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Structured key/value context for logs and operator output.
    #[must_use]
    pub fn details(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Backtest(BacktestError::NoData {
                sports,
                leagues,
                from,
                to,
            }) => vec![
                ("sports", sports.join(",")),
                ("leagues", leagues.join(",")),
                ("from", from.to_string()),
                ("to", to.to_string()),
            ],
            Self::Config(ConfigError::MissingField { field }) => {
                vec![("field", (*field).to_string())]
            }
            Self::Config(ConfigError::InvalidValue { field, reason }) => {
                vec![("field", (*field).to_string()), ("reason", reason.clone())]
            }
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Error::NotFound("record".to_string()),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => Error::Conflict(info.message().to_string()),
            other => Error::Database(other.to_string()),
        }
    }
}

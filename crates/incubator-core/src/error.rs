use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncubatorError {
    #[error("not initialized: run 'incubator init'")]
    NotInitialized,

    #[error("invalid setpoint: {0}")]
    InvalidSetpoint(String),

    #[error("malformed date '{0}': expected YYYY-MM-DD")]
    MalformedDate(String),

    #[error("invalid sensor batch: {0}")]
    InvalidSensorBatch(String),

    #[error("cycle started on {start_date} is still running; cannot restart on {requested}")]
    CycleInProgress {
        start_date: NaiveDate,
        requested: NaiveDate,
    },

    #[error("database error: {0}")]
    Db(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IncubatorError>;

use thiserror::Error;

/// Validation failures raised by the session runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("index out of range: exercise {exercise}, set {set:?}")]
    InvalidIndex { exercise: usize, set: Option<usize> },
    #[error("set {set} of exercise {exercise} is already completed")]
    AlreadyCompleted { exercise: usize, set: usize },
    #[error("set {requested} is not the current set ({current}) of exercise {exercise}")]
    NotCurrentSet {
        exercise: usize,
        requested: usize,
        current: usize,
    },
    #[error("session has not been started")]
    NotStarted,
    #[error("session has already been finalized")]
    SessionFinalized,
    #[error("session is completed; sets can no longer be changed")]
    SessionCompleted,
    #[error("template has no exercises or an exercise without planned sets")]
    EmptyTemplate,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("I/O error reading templates: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse template {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error accessing session store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write export: {0}")]
    Export(#[from] csv::Error),
    #[error("session not found: ID {0}")]
    NotFound(i64),
    #[error("stored timestamp is not valid RFC3339: {0}")]
    BadTimestamp(String),
}

/// Any failure surfaced by the library
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

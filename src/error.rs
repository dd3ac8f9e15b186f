use thiserror::Error;

/// Error taxonomy for the aggregation pipeline.
///
/// `Conflict` doubles as the dedup signal: the ingestion engine swallows it
/// on post inserts, while command handlers report it to the user.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed feed: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Translate a sqlx error into the taxonomy, naming the entity the
    /// query was about.
    pub fn from_sqlx(entity: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound(entity),
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(entity),
            _ => Error::Storage(err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

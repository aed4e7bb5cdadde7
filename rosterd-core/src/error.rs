use thiserror::Error;

pub type Result<T> = std::result::Result<T, RosterError>;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry store error: {0}")]
    Store(String),

    #[error("Malformed member row '{identity}': {message}")]
    MalformedRow { identity: String, message: String },

    #[error("Failed to persist slot assignments: {0}")]
    AssignmentPersist(String),

    #[error("Publisher '{publisher}' failed: {message}")]
    Publisher { publisher: String, message: String },
}

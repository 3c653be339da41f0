//! Errors for the shared data model

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Value is well-formed but unusable (e.g. an empty allow-list)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Value could not be parsed (e.g. a blank device address)
    #[error("Parse error: {0}")]
    Parse(String),
}

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid target identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid scope name: {0}")]
    InvalidScope(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

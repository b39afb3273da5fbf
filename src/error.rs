use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("invitation already resolved")]
    InvitationResolved,

    #[error("company has no member role")]
    MissingMemberRole,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    Business(String),
}

pub type Result<T> = std::result::Result<T, Error>;

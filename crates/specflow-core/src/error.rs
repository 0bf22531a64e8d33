use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecflowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("specification not found: {0}")]
    SpecNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already finished: {0}")]
    TaskFinished(String),

    #[error("invalid OpenSpec bundle: missing {}", missing.join(", "))]
    InvalidBundle { missing: Vec<String> },

    #[error("bundle too large: {0}")]
    BundleTooLarge(String),

    #[error("unreadable archive: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<zip::result::ZipError> for SpecflowError {
    fn from(err: zip::result::ZipError) -> Self {
        SpecflowError::Archive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SpecflowError>;

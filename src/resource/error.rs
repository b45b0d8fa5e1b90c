use thiserror::Error;

/// Failure to produce a resource value.
///
/// `Status` and `Redirect` let a resolver steer the fragment endpoint's
/// response; inside an action they count as ordinary failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("no resource registered for key `{0}`")]
    NotFound(String),

    #[error("{message}")]
    Status { code: u16, message: String },

    #[error("redirect to `{to}`")]
    Redirect { to: String },

    #[error("{0}")]
    Failed(String),
}

impl ResourceError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    pub fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect { to: to.into() }
    }
}

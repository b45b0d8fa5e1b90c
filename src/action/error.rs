use thiserror::Error;

use crate::resource::ResourceError;
use crate::view::RenderError;

/// The request body could not be decoded into the action's payload type.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("malformed JSON body: {0}")]
    Json(#[source] serde_json::Error),

    #[error("form fields do not match the payload: {0}")]
    Form(#[source] serde_json::Error),

    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),
}

/// Failure of an action handler or of one of its escape hatches.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{message}")]
    Status { code: u16, message: String },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// HTTP status this error answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Binding(_) => 400,
            Self::NotFound(_) => 404,
            Self::Status { code, .. } => *code,
            Self::Resource(ResourceError::NotFound(_)) => 404,
            Self::Resource(ResourceError::Status { code, .. }) => *code,
            Self::Resource(_) | Self::Render(_) | Self::Other(_) => 500,
        }
    }

    /// Body text safe to show the client; server errors stay generic.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            500..=599 => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type LoopResult<T> = Result<T, LoopError>;

#[derive(thiserror::Error, Debug)]
pub enum LoopError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("suggestion error: {0}")]
    Suggestion(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LoopError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn suggestion(msg: impl Into<String>) -> Self {
        Self::Suggestion(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for LoopError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// The one error type every public operation returns.
///
/// The variant records where the fault came from; `Display` is always the
/// original fault message, unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedwrapError {
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Serialization(String),

    #[error("{0}")]
    Config(String),
}

impl RedwrapError {
    pub fn transport(message: impl Into<String>) -> Self {
        RedwrapError::Transport(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        RedwrapError::Serialization(message.into())
    }

    /// The human-readable message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            RedwrapError::Transport(m) | RedwrapError::Serialization(m) | RedwrapError::Config(m) => m,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RedwrapError::Transport(_))
    }
}

impl From<redis::RedisError> for RedwrapError {
    fn from(err: redis::RedisError) -> Self {
        RedwrapError::Transport(err.to_string())
    }
}

impl serde::ser::Error for RedwrapError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        RedwrapError::Serialization(msg.to_string())
    }
}

impl From<serde_json::Error> for RedwrapError {
    fn from(err: serde_json::Error) -> Self {
        RedwrapError::Serialization(err.to_string())
    }
}

pub type RedwrapResult<T> = Result<T, RedwrapError>;

//! Error types for the Vivica session core

use thiserror::Error;

/// Result type alias for Vivica operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in a Vivica session
///
/// Every variant is recoverable: failures surface through the session
/// controller's Error state and auto-return to Listening.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No API credential configured
    #[error("missing API credential")]
    MissingCredential,

    /// Speech recognition error reported by the host capability
    #[error("speech recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis error reported by the host capability
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// Completion call exceeded its deadline
    #[error("completion request timed out")]
    Timeout,

    /// Completion API rejected the credential
    #[error("unauthorized: check your API key")]
    Unauthorized,

    /// Completion API throttled the request
    #[error("rate limited: please slow down")]
    RateLimited,

    /// Any other non-success completion API response
    #[error("API error: {status}")]
    Api {
        /// HTTP status code of the failed response
        status: u16,
    },

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The friendly sentence the assistant speaks when this failure reaches
    /// the user.
    #[must_use]
    pub const fn spoken_reply(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Your API key looks invalid. Please check settings.",
            Self::RateLimited => "I am being rate limited. Let's wait a moment.",
            Self::Timeout => "The request timed out. Please try again.",
            Self::MissingCredential => "Please configure your OpenRouter API key in settings.",
            _ => "Sorry, I encountered an error processing your request.",
        }
    }
}

use std::{error::Error, fmt};
use thiserror::Error as ThisError;

#[derive(Debug)]
pub enum SourceError {
    Http(Box<dyn Error + Send + Sync + 'static>),
    Status { code: u16, body: String },
    Api { code: i64, message: String },
    Auth(String),
    Decode(String),
    Signing(String),
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use SourceError::*;
        match self {
            Http(e) => Some(e.as_ref() as &dyn Error),
            _ => None,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SourceError::*;
        match self {
            Http(e) => write!(f, "HttpError: {}", e),
            Status { code, body } => write!(f, "unexpected status {}: {}", code, body),
            Api { code, message } => write!(f, "ApiError {}: {}", code, message),
            Auth(s) => write!(f, "AuthError: {}", s),
            Decode(s) => write!(f, "DecodeError: {}", s),
            Signing(s) => write!(f, "SigningError: {}", s),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        SourceError::Http(Box::new(error))
    }
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("boolean value expected, got {0:?}")]
    InvalidBool(String),
}

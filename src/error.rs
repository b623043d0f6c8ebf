use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AppError {
    /// Request-level failure reported by the model server.
    ApiError {
        status: u16,
        message: String,
    },
    ConfigError(String),
    InvalidArgument(String),
    PathNotFound(PathBuf),
    IsADirectory(PathBuf),
    HistoryFormat(String),
    NotADirectory(PathBuf),
    NetworkError(reqwest::Error),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AppError::PathNotFound(path) => write!(f, "{} does not exist!", path.display()),
            AppError::IsADirectory(path) => {
                write!(f, "{} should be a file!", path.display())
            }
            AppError::HistoryFormat(msg) => write!(f, "Bad chat history format: {}", msg),
            AppError::NotADirectory(path) => {
                write!(f, "{} should be a directory, not a file!", path.display())
            }
            AppError::NetworkError(e) => write!(f, "Network error: {}", e),
            AppError::IoError(e) => write!(f, "IO error: {}", e),
            AppError::JsonError(e) => write!(f, "JSON error: {}", e),
            AppError::YamlError(e) => write!(f, "YAML error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::NetworkError(e) => Some(e),
            AppError::IoError(e) => Some(e),
            AppError::JsonError(e) => Some(e),
            AppError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::YamlError(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JaxonError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Directory scan error: {0}")]
    WalkDirError(#[from] walkdir::Error),

    #[error("Pattern error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    /// 註冊階段的錯誤 (訊息已翻譯)
    #[error("{message}")]
    SetupError { message: String },

    /// 請求處理階段的錯誤 (訊息已翻譯)
    #[error("{message}")]
    RequestError { message: String },

    #[error("Class not found: {class}")]
    ClassNotFound { class: String },

    #[error("Source file not found: {}", path.display())]
    SourceFileNotFound { path: PathBuf },

    #[error("Method not found: {class}::{method}")]
    MethodNotFound { class: String, method: String },

    #[error("Function not found: {name}")]
    FunctionNotFound { name: String },

    #[error("Unable to create an instance of {class}: {source}")]
    InstantiationError {
        class: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Call to {target} failed: {source}")]
    InvocationError {
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Resolution,
    Invocation,
    System,
}

impl JaxonError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            JaxonError::ConfigError { .. }
            | JaxonError::ConfigValidationError { .. }
            | JaxonError::InvalidConfigValueError { .. }
            | JaxonError::MissingConfigError { .. }
            | JaxonError::SetupError { .. } => ErrorCategory::Configuration,
            JaxonError::RequestError { .. }
            | JaxonError::ClassNotFound { .. }
            | JaxonError::SourceFileNotFound { .. }
            | JaxonError::MethodNotFound { .. }
            | JaxonError::FunctionNotFound { .. } => ErrorCategory::Resolution,
            JaxonError::InstantiationError { .. } | JaxonError::InvocationError { .. } => {
                ErrorCategory::Invocation
            }
            JaxonError::IoError(_)
            | JaxonError::SerializationError(_)
            | JaxonError::WalkDirError(_)
            | JaxonError::RegexError(_) => ErrorCategory::System,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Resolution => format!("Unable to resolve the request target: {}", self),
            ErrorCategory::Invocation => "The requested call could not be completed".to_string(),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        JaxonError::SetupError {
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        JaxonError::RequestError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JaxonError>;

//! Error types and handling for the `CarbonTrip` service

use thiserror::Error;

/// Main error type for the `CarbonTrip` service
#[derive(Error, Debug)]
pub enum CarbonTripError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Remote service communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Identity provider errors, carrying a human-readable message
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Unknown session, option or resource
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl CarbonTripError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CarbonTripError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            CarbonTripError::Api { .. } => {
                "Unable to connect to external services. Please try again.".to_string()
            }
            CarbonTripError::Validation { message } => message.clone(),
            CarbonTripError::Authentication { message } => message.clone(),
            CarbonTripError::NotFound { message } => message.clone(),
            CarbonTripError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            CarbonTripError::General { message } => message.clone(),
        }
    }
}

impl From<reqwest::Error> for CarbonTripError {
    fn from(err: reqwest::Error) -> Self {
        CarbonTripError::api(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for CarbonTripError {
    fn from(err: reqwest_middleware::Error) -> Self {
        CarbonTripError::api(err.to_string())
    }
}

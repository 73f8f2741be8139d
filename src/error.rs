//! Error taxonomy shared by the content core and the backend clients

use thiserror::Error;

/// Which managed service a remote failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Auth,
    Store,
    Storage,
    Mail,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Service::Auth => "auth",
            Service::Store => "store",
            Service::Storage => "storage",
            Service::Mail => "mail",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SiteError {
    /// Missing or malformed user input. Raised before anything reaches the backend.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{service} request failed: {message}")]
    Remote { service: Service, message: String },

    /// Authenticated, but without an admin role record.
    #[error("access denied: {message}")]
    Authorization { message: String },
}

impl SiteError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SiteError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        SiteError::NotFound { what: what.into() }
    }

    pub fn remote(service: Service, message: impl Into<String>) -> Self {
        SiteError::Remote {
            service,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        SiteError::Authorization {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SiteError::NotFound { .. })
    }
}

impl From<reqwest::Error> for SiteError {
    fn from(err: reqwest::Error) -> Self {
        let service = match err.url().map(|u| u.path()) {
            Some(path) if path.starts_with("/auth/") => Service::Auth,
            Some(path) if path.starts_with("/storage/") => Service::Storage,
            Some(path) if path.starts_with("/rest/") => Service::Store,
            _ => Service::Mail,
        };
        SiteError::remote(service, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;

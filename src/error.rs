use thiserror::Error;

/// Malformed record data, caught before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures surfaced by the library store. Persistence failures leave the
/// in-memory store untouched; the message names the attempted action rather
/// than echoing transport details.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Network or non-2xx response while reading from the backend.
    #[error("failed to load {what}: {detail}")]
    Fetch { what: &'static str, detail: String },

    /// Network or non-2xx response while writing to the backend.
    #[error("failed to {action}: {detail}")]
    Persistence { action: &'static str, detail: String },

    /// The operation targeted a record absent from the in-memory store.
    #[error("no record with ISBN {0} in your library")]
    NotFound(String),
}

impl StoreError {
    pub fn fetch(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Fetch {
            what,
            detail: detail.into(),
        }
    }

    pub fn persistence(action: &'static str, detail: impl Into<String>) -> Self {
        Self::Persistence {
            action,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// Stream read failure; triggers the non-streaming fallback once before
    /// anything is shown to the user.
    #[error("chat stream interrupted: {0}")]
    StreamTransport(String),

    #[error("chat request failed: {0}")]
    Request(String),
}

/// Login/registration failures, mapped from the backend's status codes so the
/// UI never shows raw transport text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("please enter a username")]
    MissingUsername,
    #[error("wrong password")]
    WrongPassword,
    #[error("the username does not exist")]
    UnknownUsername,
    #[error("that username is already taken")]
    UsernameTaken,
    #[error("{action} failed: {detail}")]
    Other { action: &'static str, detail: String },
}

impl AuthError {
    pub fn from_login_status(status: u16) -> Self {
        match status {
            400 => AuthError::MissingUsername,
            401 => AuthError::WrongPassword,
            404 => AuthError::UnknownUsername,
            _ => AuthError::Other {
                action: "login",
                detail: format!("server returned status {status}"),
            },
        }
    }

    pub fn from_register_status(status: u16) -> Self {
        match status {
            409 => AuthError::UsernameTaken,
            _ => AuthError::Other {
                action: "registration",
                detail: format!("server returned status {status}"),
            },
        }
    }
}

use docgen_types::api::REGISTRATION_UNAVAILABLE;
use docgen_types::schema::FieldViolation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    /// Refused locally; no request was sent.
    #[error("{0}")]
    SelfAction(&'static str),
    #[error("{}", describe(.0))]
    Validation(Vec<FieldViolation>),
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },
    #[error("session storage failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("{}", REGISTRATION_UNAVAILABLE)]
    RegistrationUnavailable,
    #[error("Admin access required")]
    NotAdmin,
    #[error("Not logged in")]
    NotSignedIn,
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    /// Classify a non-2xx response by status code.
    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            401 => ClientError::Unauthorized(detail),
            403 => ClientError::Forbidden(detail),
            _ => ClientError::Server { status, detail },
        }
    }

    /// The single status line shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport(_) => "Network error. Please check your connection.".into(),
            ClientError::Unauthorized(_) => "Your session has expired. Please log in again.".into(),
            ClientError::Validation(v) => format!("Please fix the form: {}", describe(v)),
            ClientError::Server { detail, .. } => format!("Error: {}", detail),
            other => other.to_string(),
        }
    }

    /// The server no longer accepts this session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

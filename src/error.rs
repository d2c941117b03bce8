use thiserror::Error;

/// Everything a user action can fail with.
///
/// None of these are fatal: each is turned into a toast at the action that
/// triggered it and the UI stays navigable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Network error or server not reachable.")]
    NetworkUnavailable,
    #[error("{}", request_failed_message(.status, .message))]
    RequestFailed { status: u16, message: Option<String> },
    #[error("Poll not found")]
    NotFound,
    #[error("{}", .0.as_deref().unwrap_or("Login failed"))]
    AuthFailed(Option<String>),
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
    #[error("Invalid API address: {0}")]
    InvalidApiBase(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Rejections decided locally, before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Poll question cannot be empty.")]
    EmptyQuestion,
    #[error("Please provide between 2 and 5 options (got {0}).")]
    OptionCount(usize),
    #[error("Please select an option.")]
    NoOptionSelected,
    #[error("Option {index} does not exist on this poll ({len} options).")]
    InvalidOption { index: usize, len: usize },
    #[error("You have already voted on this poll.")]
    AlreadyVoted,
    #[error("Please enter both username and password.")]
    MissingCredentials,
}

impl Error {
    /// Informational outcomes are shown as a neutral toast instead of an error one.
    pub fn is_informational(&self) -> bool {
        matches!(self, Error::Validation(ValidationError::AlreadyVoted))
    }
}

fn request_failed_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("Request failed with status {status}"),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

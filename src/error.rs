use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid issue pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Failed to update Redmine issue. Details: status code = {status}, response = {response}, errno = {errno}, error = {error}."
    )]
    UpdateRejected {
        status: u16,
        response: String,
        errno: &'static str,
        error: String,
    },
}

pub type Result<T> = std::result::Result<T, NotifyError>;

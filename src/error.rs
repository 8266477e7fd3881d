use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("SLACK_TOKEN environment variable not set")]
    MissingToken,

    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("invalid duration: {0} days")]
    InvalidDuration(u32),

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("invalid message timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

use chrono::{Local, NaiveDate};

pub mod cli;
pub mod commands;
pub mod diagnostic;
pub mod error;
pub mod expand;
pub mod history;
pub mod message;
pub mod orchestrator;
pub mod organize;
pub mod resolver;
pub mod settings;
pub mod slack;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use diagnostic::{Diagnostic, Partial, Stage};
pub use error::{AppError, Result};
pub use message::{FetchWindow, Message, Timestamp};
pub use orchestrator::{ChannelReport, FetchOptions, RunReport, render_summary, run};
pub use organize::{Thread, Threads, organize};
pub use slack::{ConversationCategory, ConversationsApi, SlackConversationsApi};

pub const TOKEN_ENV_VAR: &str = "SLACK_TOKEN";

pub fn load_token() -> Result<String> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(AppError::MissingToken),
    }
}

pub fn default_end_date() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| AppError::InvalidDate(s.to_string()))
}

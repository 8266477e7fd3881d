use std::fmt;

use tracing::debug;

use crate::error::AppError;
use crate::slack::ConversationCategory;

/// Which step of a channel's pipeline produced a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    ListConversations(ConversationCategory),
    Resolve,
    History,
    Replies { thread_ts: String },
    ChannelTask,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ListConversations(category) => write!(f, "listing {} conversations", category),
            Stage::Resolve => f.write_str("resolving channel"),
            Stage::History => f.write_str("fetching history"),
            Stage::Replies { thread_ts } => write!(f, "fetching replies of thread {}", thread_ts),
            Stage::ChannelTask => f.write_str("processing channel"),
        }
    }
}

/// A non-fatal error, kept next to whatever partial result was still produced.
#[derive(Debug)]
pub struct Diagnostic {
    pub channel: String,
    pub stage: Stage,
    pub error: AppError,
}

impl Diagnostic {
    pub fn new(channel: impl Into<String>, stage: Stage, error: AppError) -> Self {
        let diagnostic = Self {
            channel: channel.into(),
            stage,
            error,
        };
        debug!(
            channel = %diagnostic.channel,
            stage = %diagnostic.stage,
            error = %diagnostic.error,
            "non-fatal error"
        );
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {} in channel {}: {}", self.stage, self.channel, self.error)
    }
}

/// A value plus the diagnostics collected while producing it.
#[derive(Debug)]
pub struct Partial<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Partial<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }
}

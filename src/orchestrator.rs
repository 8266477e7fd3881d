use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::diagnostic::{Diagnostic, Partial, Stage};
use crate::error::{AppError, Result};
use crate::expand::expand_threads;
use crate::history::fetch_history;
use crate::message::{FetchWindow, Message, Timestamp};
use crate::organize::{Threads, organize};
use crate::resolver::resolve_channel;
use crate::settings::FetchSettings;
use crate::slack::{ConversationCategory, ConversationsApi};

/// Knobs for one run, usually taken from `FetchSettings`.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub categories: Vec<ConversationCategory>,
    /// Cap on concurrently running channel pipelines, and separately on
    /// concurrently running thread reply fetches
    pub max_concurrency: usize,
    pub list_page_size: u16,
    pub history_page_size: u16,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchSettings::default())
    }
}

impl From<&FetchSettings> for FetchOptions {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            categories: settings.categories.clone(),
            max_concurrency: settings.max_concurrency,
            list_page_size: settings.list_page_size,
            history_page_size: settings.history_page_size,
        }
    }
}

/// Outcome of one requested channel.
#[derive(Debug)]
pub struct ChannelReport {
    pub name: String,
    pub channel_id: Option<String>,
    /// `Err` only when the channel's task itself died; API errors along the
    /// way end up in `diagnostics` with whatever was fetched kept here.
    pub outcome: std::result::Result<Vec<Message>, AppError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ChannelReport {
    pub fn messages(&self) -> &[Message] {
        self.outcome.as_deref().unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub window: FetchWindow,
    /// In the order the channel names were requested
    pub channels: Vec<ChannelReport>,
}

impl RunReport {
    pub fn total_messages(&self) -> usize {
        self.channels.iter().map(|c| c.messages().len()).sum()
    }

    /// All fetched messages across channels, grouped into threads.
    pub fn overview(&self) -> Result<Threads> {
        organize(
            self.channels
                .iter()
                .flat_map(|c| c.messages().iter().cloned()),
        )
    }
}

/// Resolve, fetch and expand every channel in `channel_names` concurrently.
///
/// Each channel runs as its own task and fails on its own; the report always
/// has one entry per distinct requested name.
pub async fn run<A: ConversationsApi>(
    api: Arc<A>,
    channel_names: &[String],
    window: FetchWindow,
    options: &FetchOptions,
) -> RunReport {
    let mut seen = HashSet::new();
    let names: Vec<String> = channel_names
        .iter()
        .filter(|name| seen.insert((*name).clone()))
        .cloned()
        .collect();

    let max_concurrency = options.max_concurrency.max(1);
    let channel_limiter = Arc::new(Semaphore::new(max_concurrency));
    let reply_limiter = Arc::new(Semaphore::new(max_concurrency));

    let mut join_set = JoinSet::new();
    let mut index_of_task = HashMap::new();

    for (index, name) in names.iter().enumerate() {
        let api = Arc::clone(&api);
        let channel_limiter = Arc::clone(&channel_limiter);
        let reply_limiter = Arc::clone(&reply_limiter);
        let options = options.clone();
        let name = name.clone();

        let handle = join_set.spawn(async move {
            let report = match channel_limiter.acquire_owned().await {
                Ok(_permit) => fetch_channel(api, name, window, &options, reply_limiter).await,
                Err(e) => ChannelReport {
                    outcome: Err(AppError::TaskFailed(e.to_string())),
                    name,
                    channel_id: None,
                    diagnostics: Vec::new(),
                },
            };
            (index, report)
        });
        index_of_task.insert(handle.id(), index);
    }

    let mut reports: Vec<Option<ChannelReport>> = names.iter().map(|_| None).collect();

    while let Some(joined) = join_set.join_next().await {
        let (index, report) = match joined {
            Ok(done) => done,
            Err(e) => {
                let Some(index) = index_of_task.get(&e.id()).copied() else {
                    continue;
                };
                let name = names.get(index).cloned().unwrap_or_default();
                let diagnostic = Diagnostic::new(
                    &name,
                    Stage::ChannelTask,
                    AppError::TaskFailed(e.to_string()),
                );
                let report = ChannelReport {
                    name,
                    channel_id: None,
                    outcome: Err(AppError::TaskFailed(e.to_string())),
                    diagnostics: vec![diagnostic],
                };
                (index, report)
            }
        };

        if let Some(slot) = reports.get_mut(index) {
            *slot = Some(report);
        }
    }

    RunReport {
        window,
        channels: reports.into_iter().flatten().collect(),
    }
}

/// Resolve -> history -> thread expansion for a single channel.
pub async fn fetch_channel<A: ConversationsApi>(
    api: Arc<A>,
    name: String,
    window: FetchWindow,
    options: &FetchOptions,
    reply_limiter: Arc<Semaphore>,
) -> ChannelReport {
    let (channel_id, mut diagnostics) = resolve_channel(
        api.as_ref(),
        &name,
        &options.categories,
        options.list_page_size,
    )
    .await
    .into_parts();

    let Some(channel_id) = channel_id else {
        return ChannelReport {
            name,
            channel_id: None,
            outcome: Ok(Vec::new()),
            diagnostics,
        };
    };

    let (history, history_diagnostics) = fetch_history(
        api.as_ref(),
        &name,
        &channel_id,
        &window,
        options.history_page_size,
    )
    .await
    .into_parts();
    diagnostics.extend(history_diagnostics);

    let Partial {
        value: messages,
        diagnostics: thread_diagnostics,
    } = expand_threads(api, &name, &channel_id, history, reply_limiter).await;
    diagnostics.extend(thread_diagnostics);

    info!(channel = %name, %channel_id, messages = messages.len(), "channel fetched");

    ChannelReport {
        name,
        channel_id: Some(channel_id),
        outcome: Ok(messages),
        diagnostics,
    }
}

/// Per channel breakdown: message count, then one line per thread with its
/// start time, size and first message.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();

    for channel in &report.channels {
        let messages = match &channel.outcome {
            Ok(messages) => messages,
            Err(e) => {
                let _ = writeln!(out, "#{}: failed: {}", channel.name, e);
                continue;
            }
        };

        let _ = writeln!(out, "#{}: {} messages", channel.name, messages.len());

        match organize(messages.iter().cloned()) {
            Ok(threads) => {
                debug!(channel = %channel.name, threads = threads.len(), "organized");
                for thread in &threads {
                    let first = thread.first().map(Message::text_or_empty).unwrap_or("");
                    let _ = writeln!(
                        out,
                        "  {}  {} messages  {}",
                        format_start(thread.start()),
                        thread.len(),
                        first_line(first)
                    );
                }
            }
            Err(e) => {
                let _ = writeln!(out, "  cannot organize threads: {}", e);
            }
        }
    }

    out
}

pub fn format_start(start: Timestamp) -> String {
    start
        .to_local()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| start.to_slack_ts())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

//! In-memory `ConversationsApi` with scripted pages for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::message::{FetchWindow, Message};
use crate::slack::{ConversationCategory, ConversationEntry, ConversationsApi, Page};
use crate::{AppError, Result};

/// Scripted page: its items, or the error message the call fails with.
type Scripted<T> = std::result::Result<Vec<T>, String>;

#[derive(Default)]
pub struct StubApi {
    lists: HashMap<ConversationCategory, Vec<Scripted<ConversationEntry>>>,
    histories: HashMap<String, Vec<Scripted<Message>>>,
    replies: HashMap<(String, String), Vec<Scripted<Message>>>,
    reply_delay: Option<Duration>,
    panicking_histories: HashSet<String>,
    calls: Mutex<Vec<String>>,
    windows: Mutex<Vec<FetchWindow>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_page(
        mut self,
        category: ConversationCategory,
        page: Scripted<ConversationEntry>,
    ) -> Self {
        self.lists.entry(category).or_default().push(page);
        self
    }

    pub fn with_history_page(mut self, channel_id: &str, page: Scripted<Message>) -> Self {
        self.histories
            .entry(channel_id.to_string())
            .or_default()
            .push(page);
        self
    }

    pub fn with_replies_page(
        mut self,
        channel_id: &str,
        thread_ts: &str,
        page: Scripted<Message>,
    ) -> Self {
        self.replies
            .entry((channel_id.to_string(), thread_ts.to_string()))
            .or_default()
            .push(page);
        self
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    /// Make the history call for `channel_id` panic instead of returning.
    pub fn with_history_panic(mut self, channel_id: &str) -> Self {
        self.panicking_histories.insert(channel_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn windows(&self) -> Vec<FetchWindow> {
        self.windows.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn page_at<T: Clone>(
    pages: Option<&Vec<Scripted<T>>>,
    cursor: Option<String>,
) -> Result<Page<T>> {
    let index = cursor.map_or(0, |c| c.parse::<usize>().unwrap());
    let Some(pages) = pages else {
        return Ok(Page::last(Vec::new()));
    };

    match pages.get(index) {
        Some(Ok(items)) => {
            let has_more = index + 1 < pages.len();
            Ok(Page {
                items: items.clone(),
                has_more,
                next_cursor: has_more.then(|| (index + 1).to_string()),
            })
        }
        Some(Err(e)) => Err(AppError::SlackApi(e.clone())),
        None => Ok(Page::last(Vec::new())),
    }
}

impl ConversationsApi for StubApi {
    async fn list_conversations(
        &self,
        category: ConversationCategory,
        cursor: Option<String>,
        _limit: u16,
    ) -> Result<Page<ConversationEntry>> {
        self.record(format!("list:{}:{}", category, cursor.as_deref().unwrap_or("0")));
        page_at(self.lists.get(&category), cursor)
    }

    async fn history(
        &self,
        channel_id: &str,
        window: &FetchWindow,
        cursor: Option<String>,
        _limit: u16,
    ) -> Result<Page<Message>> {
        self.record(format!("history:{}:{}", channel_id, cursor.as_deref().unwrap_or("0")));
        self.windows.lock().unwrap().push(*window);
        if self.panicking_histories.contains(channel_id) {
            panic!("scripted history panic for {}", channel_id);
        }
        page_at(self.histories.get(channel_id), cursor)
    }

    async fn replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        cursor: Option<String>,
    ) -> Result<Page<Message>> {
        self.record(format!(
            "replies:{}:{}:{}",
            channel_id,
            thread_ts,
            cursor.as_deref().unwrap_or("0")
        ));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = (channel_id.to_string(), thread_ts.to_string());
        match self.replies.get(&key) {
            Some(pages) => page_at(Some(pages), cursor),
            None => Err(AppError::SlackApi("thread_not_found".to_string())),
        }
    }
}

pub fn entry(id: &str, name: &str) -> ConversationEntry {
    ConversationEntry {
        id: id.to_string(),
        name: Some(name.to_string()),
        user: None,
    }
}

pub fn msg(ts: &str, text: &str) -> Message {
    Message::new(ts, text)
}

pub fn root(ts: &str, text: &str, reply_count: u64) -> Message {
    let mut message = Message::new(ts, text);
    message.thread_ts = Some(ts.to_string());
    message.reply_count = Some(reply_count);
    message
}

pub fn reply(ts: &str, thread_ts: &str, text: &str) -> Message {
    let mut message = Message::new(ts, text);
    message.thread_ts = Some(thread_ts.to_string());
    message
}

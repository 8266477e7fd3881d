use std::collections::BTreeMap;

use crate::error::Result;
use crate::message::{Message, Timestamp};

/// Messages sharing one thread key, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    key: String,
    start: Timestamp,
    messages: Vec<Message>,
}

impl Thread {
    /// The thread root timestamp as found on the messages.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// A thread nobody replied to.
    pub fn is_standalone(&self) -> bool {
        self.messages.len() == 1
    }
}

/// Threads ordered by the numeric value of their key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Threads {
    threads: Vec<Thread>,
}

impl Threads {
    pub fn iter(&self) -> std::slice::Iter<'_, Thread> {
        self.threads.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.key == key)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn message_count(&self) -> usize {
        self.threads.iter().map(Thread::len).sum()
    }
}

impl IntoIterator for Threads {
    type Item = Thread;
    type IntoIter = std::vec::IntoIter<Thread>;

    fn into_iter(self) -> Self::IntoIter {
        self.threads.into_iter()
    }
}

impl<'a> IntoIterator for &'a Threads {
    type Item = &'a Thread;
    type IntoIter = std::slice::Iter<'a, Thread>;

    fn into_iter(self) -> Self::IntoIter {
        self.threads.iter()
    }
}

/// Group messages by thread key (`thread_ts`, else `ts`).
///
/// Each thread is sorted by the numeric value of `ts`, keeping input order for
/// equal timestamps, and threads come out in ascending key order. Keys that are
/// numerically equal but spelled differently stay separate threads, ordered by
/// their text. Any key or `ts` that is not a Slack timestamp fails the whole
/// call with `AppError::InvalidTimestamp`.
pub fn organize<I>(messages: I) -> Result<Threads>
where
    I: IntoIterator<Item = Message>,
{
    let mut grouped: BTreeMap<(Timestamp, String), Vec<(Timestamp, Message)>> = BTreeMap::new();

    for message in messages {
        let key = message.thread_key().to_string();
        let start: Timestamp = key.parse()?;
        let ts: Timestamp = message.ts.parse()?;
        grouped.entry((start, key)).or_default().push((ts, message));
    }

    let threads = grouped
        .into_iter()
        .map(|((start, key), mut entries)| {
            entries.sort_by_key(|(ts, _)| *ts);
            Thread {
                key,
                start,
                messages: entries.into_iter().map(|(_, message)| message).collect(),
            }
        })
        .collect();

    Ok(Threads { threads })
}

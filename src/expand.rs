use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::diagnostic::{Diagnostic, Partial, Stage};
use crate::error::AppError;
use crate::message::Message;
use crate::slack::ConversationsApi;

/// Fetch the replies of every thread root in `messages` and append them.
///
/// One task is spawned per thread, gated by `limiter`. A thread whose replies
/// cannot be fetched contributes whatever it read before failing and a
/// diagnostic; it never fails its siblings or the channel. The order of the
/// appended replies is unspecified.
pub async fn expand_threads<A: ConversationsApi>(
    api: Arc<A>,
    channel_name: &str,
    channel_id: &str,
    messages: Vec<Message>,
    limiter: Arc<Semaphore>,
) -> Partial<Vec<Message>> {
    let mut join_set = JoinSet::new();
    let mut thread_of_task = HashMap::new();

    for thread_ts in messages.iter().filter_map(Message::expandable_thread) {
        let api = Arc::clone(&api);
        let limiter = Arc::clone(&limiter);
        let channel_name = channel_name.to_string();
        let channel_id = channel_id.to_string();
        let task_thread_ts = thread_ts.to_string();

        let handle = join_set.spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let mut result = Partial::new(Vec::new());
                    result.push(Diagnostic::new(
                        &channel_name,
                        Stage::Replies {
                            thread_ts: task_thread_ts,
                        },
                        AppError::TaskFailed(e.to_string()),
                    ));
                    return result;
                }
            };
            fetch_replies(api.as_ref(), &channel_name, &channel_id, &task_thread_ts).await
        });
        thread_of_task.insert(handle.id(), thread_ts.to_string());
    }

    let mut result = Partial::new(messages);
    let threads = thread_of_task.len();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(replies) => {
                let (replies, diagnostics) = replies.into_parts();
                result.value.extend(replies);
                result.diagnostics.extend(diagnostics);
            }
            Err(e) => {
                let thread_ts = thread_of_task.remove(&e.id()).unwrap_or_default();
                result.push(Diagnostic::new(
                    channel_name,
                    Stage::Replies { thread_ts },
                    AppError::TaskFailed(e.to_string()),
                ));
            }
        }
    }

    debug!(channel_name, threads, messages = result.value.len(), "threads expanded");
    result
}

/// Fetch all replies of one thread, without the thread root.
///
/// The root comes back as the first element of the first page and is dropped
/// there; later pages may repeat it, so any message carrying the root's own
/// `ts` is dropped as well.
pub async fn fetch_replies<A: ConversationsApi>(
    api: &A,
    channel_name: &str,
    channel_id: &str,
    thread_ts: &str,
) -> Partial<Vec<Message>> {
    let mut result = Partial::new(Vec::new());
    let mut cursor: Option<String> = None;
    let mut first_page = true;

    loop {
        match api.replies(channel_id, thread_ts, cursor.take()).await {
            Ok(page) => {
                let next = page.next().map(str::to_string);
                let skip = usize::from(first_page);
                first_page = false;

                result.value.extend(
                    page.items
                        .into_iter()
                        .skip(skip)
                        .filter(|message| message.ts != thread_ts),
                );

                match next {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            Err(e) => {
                result.push(Diagnostic::new(
                    channel_name,
                    Stage::Replies {
                        thread_ts: thread_ts.to_string(),
                    },
                    e,
                ));
                break;
            }
        }
    }

    result
}

use tracing::debug;

use crate::diagnostic::{Diagnostic, Partial, Stage};
use crate::message::{FetchWindow, Message};
use crate::slack::ConversationsApi;

/// Fetch every history page of a channel inside `window`.
///
/// Messages are kept in the order Slack returns them (newest first). A failed
/// page ends pagination; whatever was read before it is still returned.
pub async fn fetch_history<A: ConversationsApi>(
    api: &A,
    channel_name: &str,
    channel_id: &str,
    window: &FetchWindow,
    page_size: u16,
) -> Partial<Vec<Message>> {
    let mut result = Partial::new(Vec::new());
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        match api.history(channel_id, window, cursor.take(), page_size).await {
            Ok(page) => {
                pages += 1;
                let next = page.next().map(str::to_string);
                result.value.extend(page.items);

                match next {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            Err(e) => {
                result.push(Diagnostic::new(channel_name, Stage::History, e));
                break;
            }
        }
    }

    debug!(channel_name, pages, messages = result.value.len(), "history fetched");
    result
}

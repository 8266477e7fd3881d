use tracing::debug;

use crate::diagnostic::{Diagnostic, Partial, Stage};
use crate::error::AppError;
use crate::slack::{ConversationCategory, ConversationsApi};

/// Look up the id of the conversation called `name`.
///
/// Categories are searched in the given order and the first match wins. A
/// failed listing call is recorded and the search moves on to the next
/// category. `None` means no category had a match.
pub async fn resolve_channel<A: ConversationsApi>(
    api: &A,
    name: &str,
    categories: &[ConversationCategory],
    page_size: u16,
) -> Partial<Option<String>> {
    let mut result = Partial::new(None);

    for &category in categories {
        let mut cursor: Option<String> = None;

        loop {
            let page = match api.list_conversations(category, cursor.take(), page_size).await {
                Ok(page) => page,
                Err(e) => {
                    result.push(Diagnostic::new(name, Stage::ListConversations(category), e));
                    break;
                }
            };

            if let Some(entry) = page.items.iter().find(|entry| entry.matches(name)) {
                debug!(name, %category, id = %entry.id, "resolved channel");
                result.value = Some(entry.id.clone());
                return result;
            }

            match page.next() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }
    }

    result.push(Diagnostic::new(
        name,
        Stage::Resolve,
        AppError::ChannelNotFound(name.to_string()),
    ));
    result
}

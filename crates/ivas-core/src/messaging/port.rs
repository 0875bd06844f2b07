use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound messenger port.
///
/// Handlers and the group broadcast go through this so the Telegram client
/// can be throttled or faked.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Largest text message, in bytes, the backend accepts.
    fn max_message_len(&self) -> usize;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    /// Upload `bytes` as a file named `file_name`.
    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MessageRef>;
}

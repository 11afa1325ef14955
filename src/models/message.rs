use crate::error::AppError;
use crate::models::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Opaque reference returned by the external upload service. The ledger never
/// validates the URL beyond presence; media type drives client rendering only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub media_type: String,
    pub file_name: String,
}

/// Tagged message payload. Exactly the fields relevant to each variant, so an
/// empty message can never enter the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text { body: String },
    Attachment { attachment: AttachmentRef },
    TextAndAttachment { body: String, attachment: AttachmentRef },
}

impl MessageContent {
    /// Builds the variant from optional parts. Whitespace-only bodies count as
    /// absent; at least one of body or attachment must remain.
    pub fn from_parts(
        body: Option<String>,
        attachment: Option<AttachmentRef>,
    ) -> Result<Self, AppError> {
        let body = body.filter(|b| !b.trim().is_empty());
        match (body, attachment) {
            (Some(body), Some(attachment)) => Ok(MessageContent::TextAndAttachment {
                body,
                attachment,
            }),
            (Some(body), None) => Ok(MessageContent::Text { body }),
            (None, Some(attachment)) => Ok(MessageContent::Attachment { attachment }),
            (None, None) => Err(AppError::InvalidArgument(
                "message requires a body or an attachment".into(),
            )),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            MessageContent::Text { body } | MessageContent::TextAndAttachment { body, .. } => {
                Some(body)
            }
            MessageContent::Attachment { .. } => None,
        }
    }

    pub fn attachment(&self) -> Option<&AttachmentRef> {
        match self {
            MessageContent::Attachment { attachment }
            | MessageContent::TextAndAttachment { attachment, .. } => Some(attachment),
            MessageContent::Text { .. } => None,
        }
    }

    /// Replaces the body, keeping any attachment. Attachments are immutable.
    pub fn with_body(&self, body: String) -> Self {
        match self {
            MessageContent::Text { .. } => MessageContent::Text { body },
            MessageContent::Attachment { attachment }
            | MessageContent::TextAndAttachment { attachment, .. } => {
                MessageContent::TextAndAttachment {
                    body,
                    attachment: attachment.clone(),
                }
            }
        }
    }
}

/// Frozen quote captured at reply time. Copied, not linked: later edits or
/// deletes of the original do not change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    pub sender_name: String,
    pub preview: String,
}

impl ReplySnapshot {
    pub const ATTACHMENT_PLACEHOLDER: &'static str = "[attachment]";

    pub fn capture(sender_name: String, original: &MessageContent, preview_chars: usize) -> Self {
        let source = original
            .body()
            .unwrap_or(Self::ATTACHMENT_PLACEHOLDER);
        let mut preview: String = source.chars().take(preview_chars).collect();
        if preview.chars().count() < source.chars().count() {
            preview.push('…');
        }
        ReplySnapshot {
            sender_name,
            preview,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: Uuid,
    #[serde(flatten)]
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplySnapshot>,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    /// Participants who observed this specific message (1:1 double-check receipts).
    pub read_by: BTreeSet<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> AttachmentRef {
        AttachmentRef {
            url: "attachment://42/receipt.pdf".into(),
            media_type: "application/pdf".into(),
            file_name: "receipt.pdf".into(),
        }
    }

    #[test]
    fn rejects_empty_message() {
        assert!(matches!(
            MessageContent::from_parts(None, None),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            MessageContent::from_parts(Some("   ".into()), None),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn accepts_attachment_only() {
        let content = MessageContent::from_parts(None, Some(attachment())).unwrap();
        assert!(content.body().is_none());
        assert!(content.attachment().is_some());
    }

    #[test]
    fn edit_keeps_attachment() {
        let content = MessageContent::from_parts(Some("before".into()), Some(attachment()))
            .unwrap()
            .with_body("after".into());
        assert_eq!(content.body(), Some("after"));
        assert_eq!(content.attachment(), Some(&attachment()));
    }

    #[test]
    fn reply_preview_truncates_and_substitutes_placeholder() {
        let long = MessageContent::Text {
            body: "x".repeat(200),
        };
        let snap = ReplySnapshot::capture("Amina".into(), &long, 120);
        assert_eq!(snap.preview.chars().count(), 121); // 120 chars + ellipsis
        assert!(snap.preview.ends_with('…'));

        let file_only = MessageContent::Attachment {
            attachment: attachment(),
        };
        let snap = ReplySnapshot::capture("Amina".into(), &file_only, 120);
        assert_eq!(snap.preview, ReplySnapshot::ATTACHMENT_PLACEHOLDER);
    }
}

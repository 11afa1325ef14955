pub mod broadcast;
pub mod conversation;
pub mod message;
pub mod participant;

pub use broadcast::Broadcast;
pub use conversation::{direct_conversation_id, Conversation, ConversationId, ConversationKind};
pub use message::{AttachmentRef, Message, MessageContent, ReplySnapshot};
pub use participant::{Participant, Role};

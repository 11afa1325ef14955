pub mod conversation_service;
pub mod fanout;
pub mod message_service;
pub mod read_tracker;
pub mod upload;

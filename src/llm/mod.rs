pub mod chat_stream;
pub mod embeddings;
pub mod moderation;
pub mod web_search;

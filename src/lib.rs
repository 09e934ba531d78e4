//! # vendor-chat
//!
//! A Rust web service backing a conversational vendor-discovery assistant
//! for a wedding-planning app. A chat endpoint classifies each message,
//! answers vendor searches directly from a vector database, and hands
//! everything else to a streaming language model with a web-search tool.
//!
//! ## Architecture
//!
//! One request through the chat endpoint:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │  POST /api/chat  │
//!                  └────────┬─────────┘
//!                           │ normalize body ({messages} or {message})
//!                           ▼
//!                  ┌──────────────────┐
//!                  │    Moderation    │ flagged → denial stream, stop
//!                  │ (failure: log +  │
//!                  │  continue)       │
//!                  └────────┬─────────┘
//!                           │
//!                           ▼
//!                  ┌──────────────────┐
//!                  │ Intent keywords  │
//!                  └───┬──────────┬───┘
//!              vendor  │          │  general chat
//!                      ▼          ▼
//!          ┌───────────────┐  ┌───────────────────┐
//!          │ Vector search │  │ LLM streaming     │
//!          │ → normalize   │  │ + web_search tool │
//!          │ → format list │  │ (bounded steps)   │
//!          └───────┬───────┘  └────────┬──────────┘
//!                  │                   │
//!                  └─────────┬─────────┘
//!                            ▼
//!              SSE: start / text-start / text-delta*
//!                   / text-end / finish
//! ```
//!
//! Separate request paths aggregate a vendor profile (core row plus images,
//! offers and reviews fetched concurrently) and persist lightweight
//! conversation sessions.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, LLM, vector DB, and database
//! - [`models`] - Shared data types: chat messages, vendor rows, profiles, sessions
//! - [`error`] - Request error taxonomy mapped to JSON error responses
//! - [`intent`] - Keyword-based vendor-search intent classifier
//! - [`vendors`] - Search-result normalization and vendor list formatting
//! - [`search`] - Vector-database search collaborator
//! - [`llm`] - Model streaming, moderation, embeddings, and the web-search tool
//! - [`db`] - SQLite access: vendor profile aggregation and session store
//! - [`api`] - Axum HTTP handlers and the application router
//! - [`state`] - Shared application state holding config, clients, and collaborators

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod intent;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
pub mod vendors;

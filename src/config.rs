use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration (chat, embeddings, moderation)
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// SQLite database URL; vendor and session endpoints need this
    pub database_url: Option<String>,
    /// How many candidates to request from the vector database
    pub vendor_top_k: usize,
    /// Maximum vendors rendered in a chat listing
    pub vendor_list_limit: usize,
    /// Maximum concurrent model streams
    pub max_concurrent_chats: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for an OpenAI-compatible API
    pub base_url: String,
    /// Model name for chat streaming
    pub chat_model: String,
    /// Model name for query embeddings
    pub embedding_model: String,
    /// Model name for moderation checks
    pub moderation_model: String,
    /// API key; moderation is only enabled when this is set
    pub api_key: Option<String>,
    /// Upper bound on tool-call rounds in one chat stream
    pub max_tool_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Base URL of the vendor vector index. If None, vendor mode degrades
    /// to an apology message.
    pub base_url: Option<String>,
    /// API key sent as the Api-Key header
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            vector_db: VectorDbConfig::default(),
            database_url: None,
            vendor_top_k: 8,
            vendor_list_limit: 8,
            max_concurrent_chats: 3,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            moderation_model: "omni-moderation-latest".to_string(),
            api_key: None,
            max_tool_steps: 10,
        }
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("VENDOR_CHAT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(model) = std::env::var("LLM_MODERATION_MODEL") {
            config.llm.moderation_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("LLM_MAX_TOOL_STEPS") {
            if let Ok(v) = val.parse() {
                config.llm.max_tool_steps = v;
            }
        }
        if let Ok(url) = std::env::var("VECTOR_DB_URL") {
            config.vector_db.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("VECTOR_DB_API_KEY") {
            config.vector_db.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("VENDOR_TOP_K") {
            if let Ok(v) = val.parse() {
                config.vendor_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("VENDOR_LIST_LIMIT") {
            if let Ok(v) = val.parse() {
                config.vendor_list_limit = v;
            }
        }
        if let Ok(val) = std::env::var("VENDOR_CHAT_MAX_CONCURRENT") {
            if let Ok(v) = val.parse::<usize>() {
                config.max_concurrent_chats = v.max(1);
            }
        }

        config
    }
}

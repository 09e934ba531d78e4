use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::llm::chat_stream::{ChatModel, OpenAiChatModel};
use crate::llm::moderation::{ModerationCheck, OpenAiModeration};
use crate::llm::web_search::WebSearchTool;
use crate::search::vector::{VectorDbClient, VendorSearch};

/// Shared application state.
///
/// Collaborators are constructed once at startup and carried as trait
/// objects. An absent collaborator means the matching feature surfaces a
/// configuration problem at its call site instead of probing environment
/// variables per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub db: Option<DbPool>,
    pub search: Option<Arc<dyn VendorSearch>>,
    pub moderation: Option<Arc<dyn ModerationCheck>>,
    pub model: Arc<dyn ChatModel>,
    pub chat_semaphore: Arc<Semaphore>,
}

impl AppState {
    /// Build state with real collaborators from config.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let db = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::run_migrations(&pool).await?;
                Some(pool)
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set; vendor and session endpoints will report a configuration error"
                );
                None
            }
        };

        let search: Option<Arc<dyn VendorSearch>> =
            config.vector_db.base_url.clone().map(|base_url| {
                Arc::new(VectorDbClient::new(
                    http_client.clone(),
                    config.llm.clone(),
                    base_url,
                    config.vector_db.api_key.clone(),
                )) as Arc<dyn VendorSearch>
            });
        if search.is_none() {
            tracing::warn!("VECTOR_DB_URL not set; vendor mode will apologize instead of searching");
        }

        let moderation: Option<Arc<dyn ModerationCheck>> = config.llm.api_key.as_ref().map(|_| {
            Arc::new(OpenAiModeration::new(http_client.clone(), config.llm.clone()))
                as Arc<dyn ModerationCheck>
        });

        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(
            http_client.clone(),
            config.llm.clone(),
            Some(WebSearchTool::new(http_client.clone())),
        ));

        let permits = config.max_concurrent_chats.max(1);
        Ok(Self {
            config,
            http_client,
            db,
            search,
            moderation,
            model,
            chat_semaphore: Arc::new(Semaphore::new(permits)),
        })
    }

    /// Assemble state from explicit collaborators. Tests use this to swap
    /// in mocks without any network configuration.
    pub fn with_collaborators(
        config: Config,
        db: Option<DbPool>,
        search: Option<Arc<dyn VendorSearch>>,
        moderation: Option<Arc<dyn ModerationCheck>>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let permits = config.max_concurrent_chats.max(1);
        Self {
            config,
            http_client: reqwest::Client::new(),
            db,
            search,
            moderation,
            model,
            chat_semaphore: Arc::new(Semaphore::new(permits)),
        }
    }
}

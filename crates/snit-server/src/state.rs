//! Shared application state.

use std::sync::Arc;

use snit_chat::{HttpLanguageModel, LLMConfig, LanguageModel};
use snit_core::SnitConfig;
use snit_infer::Embedder;
use snit_resolve::{KnowledgeRetriever, VectorIndex};
use snit_runtime::{HttpTicketService, PipelineSettings, Router, TicketService};

use crate::history::HistoryClient;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: SnitConfig,
    pub router: Router,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub llm: Arc<dyn LanguageModel>,
    pub tickets: Arc<dyn TicketService>,
    /// Present only when a backend is configured.
    pub history: Option<HistoryClient>,
    pub llm_provider: Option<String>,
}

impl AppState {
    /// Wire collaborators that were already constructed.
    pub fn new(
        config: SnitConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModel>,
        tickets: Arc<dyn TicketService>,
        history: Option<HistoryClient>,
    ) -> Self {
        let retriever = KnowledgeRetriever::new(embedder.clone(), index.clone());
        let router = Router::new(
            retriever,
            llm.clone(),
            tickets.clone(),
            PipelineSettings::from(&config),
        );
        Self {
            config,
            router,
            embedder,
            index,
            llm,
            tickets,
            history,
            llm_provider: None,
        }
    }

    /// Build the HTTP-backed collaborators from configuration.
    pub fn from_config(
        config: SnitConfig,
        client: reqwest::Client,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> anyhow::Result<Self> {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        let llm = HttpLanguageModel::new(client.clone(), &llm_config);
        let llm_provider = llm
            .provider()
            .map(|p| format!("{} ({})", p, llm.model().unwrap_or_default()));

        let tickets = HttpTicketService::new(client.clone(), config.backend_url.as_deref())?;
        let history = config
            .backend_url
            .as_deref()
            .map(|url| HistoryClient::new(client, url))
            .transpose()?;

        let mut state = Self::new(
            config,
            embedder,
            index,
            Arc::new(llm),
            Arc::new(tickets),
            history,
        );
        state.llm_provider = llm_provider;
        Ok(state)
    }
}

//! End-to-end web search run: conversation → query → results → pages →
//! passages → ranked context.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use webcontext_embedding::{EmbeddingRanker, EmbeddingRegistry, SimilarityRanker};
use webcontext_fetch::{DnsLocalCheck, HttpPageFetcher, LocalAddressCheck, PageFetcher};
use webcontext_search::{SearchProvider, UnconfiguredProvider, create_provider};
use webcontext_shared::{
    AppConfig, Message, RagSettings, Result, WebContextError, WebSearchConfig, WebSearchRun,
    WebSearchUpdate,
};

use crate::aggregate::aggregate_context;
use crate::fetch::fetch_pages;
use crate::filter::{direct_links, filter_results};
use crate::generate::{ChatQueryGenerator, QueryGenerator};
use crate::notify::UpdateSink;
use crate::query::build_search_query;
use crate::segment::segment_pages;
use crate::select::select_passages;

/// Input for one run.
#[derive(Debug, Clone, Default)]
pub struct WebSearchRequest {
    /// Conversation so far; the last message is the prompt.
    pub messages: Vec<Message>,
    /// Embedding model selected by the conversation.
    pub embedding_model: Option<String>,
    /// Assistant-level retrieval settings.
    pub rag: Option<RagSettings>,
}

impl WebSearchRequest {
    /// A single-message request.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            ..Default::default()
        }
    }
}

/// The retrieval pipeline and its collaborators.
pub struct WebSearchPipeline {
    config: WebSearchConfig,
    provider: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    local_check: Arc<dyn LocalAddressCheck>,
    ranker: Arc<dyn SimilarityRanker>,
    models: EmbeddingRegistry,
    generator: Option<Arc<dyn QueryGenerator>>,
}

impl WebSearchPipeline {
    pub fn new(
        config: WebSearchConfig,
        provider: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        local_check: Arc<dyn LocalAddressCheck>,
        ranker: Arc<dyn SimilarityRanker>,
        models: EmbeddingRegistry,
    ) -> Self {
        Self {
            config,
            provider,
            fetcher,
            local_check,
            ranker,
            models,
            generator: None,
        }
    }

    /// Generate search queries from the conversation instead of using the
    /// latest message verbatim.
    pub fn with_query_generator(mut self, generator: Arc<dyn QueryGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Wire the HTTP-backed collaborators described by the app config.
    pub fn from_app_config(app: &AppConfig) -> Result<Self> {
        // A broken [search] section only matters once a run actually searches
        let provider: Arc<dyn SearchProvider> = match create_provider(&app.search) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(provider = %app.search.provider, error = %e, "search provider unavailable");
                Arc::new(UnconfiguredProvider::new(app.search.provider, e.to_string()))
            }
        };
        let fetcher = Arc::new(HttpPageFetcher::new(&app.fetch)?);
        let models = EmbeddingRegistry::from_config(&app.embedding_models)?;

        let pipeline = Self::new(
            WebSearchConfig::from(app),
            provider,
            fetcher,
            Arc::new(DnsLocalCheck),
            Arc::new(EmbeddingRanker),
            models,
        );

        if app.query_generation.enabled {
            let generator = ChatQueryGenerator::from_config(&app.query_generation)?;
            return Ok(pipeline.with_query_generator(Arc::new(generator)));
        }
        Ok(pipeline)
    }

    pub fn config(&self) -> &WebSearchConfig {
        &self.config
    }

    /// Run a web search.
    ///
    /// Never fails: a run-level error is reported to `sink` as an
    /// "An error occurred" event, recorded on [`WebSearchRun::error`], and
    /// the partial run is returned.
    #[instrument(skip_all, fields(provider = %self.provider.name(), messages = request.messages.len()))]
    pub async fn run(&self, request: &WebSearchRequest, sink: &dyn UpdateSink) -> WebSearchRun {
        let start = Instant::now();
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let mut run = WebSearchRun::new(prompt, self.provider.name());

        info!(run_id = %run.id, "starting web search");

        match self.execute(request, &mut run, sink).await {
            Ok(()) => {
                info!(
                    run_id = %run.id,
                    results = run.results.len(),
                    sources = run.context_sources.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "web search complete"
                );
            }
            Err(e) => {
                warn!(run_id = %run.id, error = %e, fatal = e.is_run_fatal(), "web search failed");
                let message = e.to_string();
                sink.notify(WebSearchUpdate::error("An error occurred", vec![message.clone()]));
                run.error = Some(message);
                run.touch();
            }
        }

        run
    }

    async fn execute(
        &self,
        request: &WebSearchRequest,
        run: &mut WebSearchRun,
        sink: &dyn UpdateSink,
    ) -> Result<()> {
        if request.messages.is_empty() {
            return Err(WebContextError::validation("conversation has no messages"));
        }

        let rag = request.rag.as_ref();

        // --- Candidates: direct links or search ---
        let raw = match rag.filter(|r| !r.allowed_links.is_empty()) {
            Some(rag) => {
                sink.notify(WebSearchUpdate::update("Using links specified in Assistant"));
                direct_links(
                    &rag.allowed_links,
                    self.config.enable_local_fetch,
                    self.local_check.as_ref(),
                )
                .await
            }
            None => {
                let query_text = match &self.generator {
                    Some(generator) => generator.generate(&request.messages).await?,
                    None => run.prompt.clone(),
                };
                sink.notify(WebSearchUpdate::update_with(
                    format!("Searching {}", self.provider.name()),
                    vec![query_text.clone()],
                ));

                let allowed_domains = rag.map(|r| r.allowed_domains.as_slice()).unwrap_or_default();
                if !allowed_domains.is_empty() {
                    sink.notify(WebSearchUpdate::update("Filtering on specified domains"));
                }

                run.search_query = build_search_query(
                    allowed_domains,
                    &self.config.allow_list,
                    &self.config.block_list,
                    &query_text,
                );
                run.touch();
                info!(query = %run.search_query, "searching");

                self.provider.search(&run.search_query).await?.organic_results
            }
        };

        // --- Filter ---
        run.results = filter_results(raw, &self.config.block_list, self.config.max_results);
        run.touch();

        let model = self.models.resolve(request.embedding_model.as_deref())?;

        if run.results.is_empty() {
            return Err(WebContextError::NoResults);
        }

        // --- Fetch ---
        sink.notify(WebSearchUpdate::update("Browsing results"));
        let pages = fetch_pages(
            &run.results,
            self.fetcher.as_ref(),
            sink,
            self.config.max_pages,
        )
        .await;
        run.touch();

        // --- Segment ---
        let passages = segment_pages(
            &pages,
            model.chunk_char_length,
            self.config.max_passages_per_page,
        );
        if passages.is_empty() {
            return Err(WebContextError::NoExtractableText { pages: pages.len() });
        }

        // --- Select + aggregate ---
        sink.notify(WebSearchUpdate::update("Extracting relevant information"));
        let selected = select_passages(
            self.ranker.as_ref(),
            model,
            &run.prompt,
            &passages,
            self.config.top_k,
        )
        .await?;

        run.context_sources = aggregate_context(&selected, &passages, &pages);
        run.touch();

        sink.notify(WebSearchUpdate::Sources {
            sources: run.context_sources.clone(),
        });

        Ok(())
    }
}

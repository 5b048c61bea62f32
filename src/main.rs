mod api;
mod chatbot;
mod config;
mod db;
mod error;
mod keywords;
mod llm;
mod sentiment;
mod storage;
mod store;
mod suggestions;
mod tagger;
mod trends;
mod uploads;

use anyhow::Context;
use axum::Router;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::chatbot::ReviewChatbot;
use crate::config::AppConfig;
use crate::keywords::{KeywordConfig, KeywordExtractor};
use crate::llm::{OpenRouterClient, TextGenerator};
use crate::storage::S3Storage;
use crate::store::PgStore;
use crate::suggestions::{SuggestionSettings, SuggestionSynthesizer};
use crate::trends::TrendAggregator;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::root,
        api::health,
        api::submit_review,
        api::get_reviews,
        api::sentiment,
        api::keyword_trends,
        api::suggestions,
        api::chatbot_reviews,
        uploads::upload_csv,
        uploads::list_uploaded_files,
        uploads::delete_file
    ),
    components(
        schemas(
            api::MessageResponse,
            api::HealthResponse,
            api::SubmitReviewForm,
            api::SubmitReviewResponse,
            api::ReviewsResponse,
            api::SuggestionsResponse,
            chatbot::ChatRequest,
            chatbot::ChatResponse,
            llm::ChatMessage,
            store::Review,
            sentiment::SentimentLabel,
            trends::SentimentCounts,
            trends::LabeledReview,
            trends::SentimentSummary,
            trends::TrendEntry,
            trends::KeywordTrends,
            uploads::UploadResponse,
            uploads::FileListing,
            uploads::FilesResponse,
            uploads::DeleteResponse
        )
    ),
    tags(
        (name = "system", description = "Liveness"),
        (name = "reviews", description = "Review submission and listing"),
        (name = "analytics", description = "Sentiment, keyword trends and suggestions"),
        (name = "files", description = "CSV upload management")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    db::init_db(&pool).await.context("Failed to initialize schema")?;
    let store = Arc::new(PgStore::new(pool));

    let keyword_config = KeywordConfig::load(config.keyword_config_path.as_deref())?;
    let extractor = Arc::new(KeywordExtractor::new(keyword_config));

    let llm_client = OpenRouterClient::new(&config.llm)?;
    if !llm_client.has_credentials() {
        warn!("OPENROUTER_API_KEY not set, suggestions will use the local summary");
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(llm_client);

    let settings = SuggestionSettings {
        sample_size: config.suggestion_sample_size,
        max_output_tokens: config.llm.max_tokens,
        timeout: config.llm.timeout,
        ..SuggestionSettings::default()
    };

    let state = Arc::new(api::AppState {
        reviews: store.clone(),
        files: store,
        objects: Arc::new(S3Storage::from_config(&config.storage).await),
        trends: TrendAggregator::new(extractor, config.trend_limits),
        synthesizer: SuggestionSynthesizer::new(generator.clone(), settings),
        chatbot: ReviewChatbot::new(generator, config.llm.max_tokens, config.llm.timeout),
        store_timeout: config.store_timeout,
        max_upload_bytes: config.max_upload_bytes,
    });

    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api::build_router(state, &config.cors_origins));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

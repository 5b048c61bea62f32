//! HTTP surface: shared state, review and analytics handlers, router assembly.

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::chatbot::{ChatRequest, ChatResponse, ReviewChatbot, CONTEXT_REVIEWS};
use crate::error::AppError;
use crate::storage::ObjectStore;
use crate::store::{FileStore, Review, ReviewStore};
use crate::suggestions::SuggestionSynthesizer;
use crate::trends::{sentiment_summary, KeywordTrends, SentimentSummary, TrendAggregator};
use crate::uploads;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub struct AppState {
    pub reviews: Arc<dyn ReviewStore>,
    pub files: Arc<dyn FileStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub trends: TrendAggregator,
    pub synthesizer: SuggestionSynthesizer,
    pub chatbot: ReviewChatbot,
    pub store_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Reads reviews for an analytics endpoint. `None` means the store failed
    /// or took too long; callers degrade instead of erroring.
    async fn recent_reviews(&self, limit: Option<i64>) -> Option<Vec<Review>> {
        match tokio::time::timeout(self.store_timeout, self.reviews.list_reviews(limit)).await {
            Ok(Ok(reviews)) => Some(reviews),
            Ok(Err(e)) => {
                warn!(error = %e, "Review store unavailable, serving degraded analytics");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.store_timeout, "Review store timed out, serving degraded analytics");
                None
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewForm {
    pub review_text: String,
    pub rating: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitReviewResponse {
    pub status: String,
    pub message: String,
    pub review: Review,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewsResponse {
    pub status: String,
    pub data: Vec<Review>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestionQuery {
    pub business_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "Service banner", body = MessageResponse))
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Review insights API is running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Liveness and database reachability", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = tokio::time::timeout(state.store_timeout, state.reviews.ping())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "ok".to_string(),
        database,
    })
}

#[utoipa::path(
    post,
    path = "/submit-review",
    tag = "reviews",
    request_body(content = SubmitReviewForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Review stored", body = SubmitReviewResponse),
        (status = 400, description = "Rating outside 1-5")
    )
)]
pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitReviewForm>,
) -> Result<Json<SubmitReviewResponse>, AppError> {
    if !(1..=5).contains(&form.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".to_string()));
    }

    let review = tokio::time::timeout(
        state.store_timeout,
        state.reviews.insert_review(&form.review_text, form.rating),
    )
    .await
    .map_err(|_| anyhow::anyhow!("review store timed out after {:?}", state.store_timeout))??;

    info!(review_id = review.id, rating = review.rating, "📝 Review submitted");

    Ok(Json(SubmitReviewResponse {
        status: "success".to_string(),
        message: "Review submitted successfully".to_string(),
        review,
    }))
}

#[utoipa::path(
    get,
    path = "/get-reviews",
    tag = "reviews",
    responses((status = 200, description = "All reviews, newest first", body = ReviewsResponse))
)]
pub async fn get_reviews(State(state): State<Arc<AppState>>) -> Result<Json<ReviewsResponse>, AppError> {
    let data = tokio::time::timeout(state.store_timeout, state.reviews.list_reviews(None))
        .await
        .map_err(|_| anyhow::anyhow!("review store timed out after {:?}", state.store_timeout))??;

    Ok(Json(ReviewsResponse {
        status: "success".to_string(),
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/sentiment",
    tag = "analytics",
    responses((status = 200, description = "Per-review labels and totals", body = SentimentSummary))
)]
pub async fn sentiment(State(state): State<Arc<AppState>>) -> Json<SentimentSummary> {
    let Some(reviews) = state.recent_reviews(None).await else {
        return Json(SentimentSummary::default());
    };
    let summary = sentiment_summary(&reviews);
    info!(
        total = summary.total,
        positive = summary.counts.positive,
        neutral = summary.counts.neutral,
        negative = summary.counts.negative,
        "📊 Sentiment summary computed"
    );
    Json(summary)
}

#[utoipa::path(
    get,
    path = "/keyword-trends",
    tag = "analytics",
    responses((status = 200, description = "Top keywords per sentiment", body = KeywordTrends))
)]
pub async fn keyword_trends(State(state): State<Arc<AppState>>) -> Json<KeywordTrends> {
    let Some(reviews) = state.recent_reviews(None).await else {
        return Json(KeywordTrends::default());
    };
    let trends = state.trends.aggregate(&reviews);
    info!(
        reviews = trends.total_reviews,
        keywords = trends.total_keywords_analyzed,
        unique = trends.unique_keywords,
        "🔑 Keyword trends computed"
    );
    Json(trends)
}

#[utoipa::path(
    get,
    path = "/suggestions",
    tag = "analytics",
    params(SuggestionQuery),
    responses((status = 200, description = "Business suggestions", body = SuggestionsResponse))
)]
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestionQuery>,
) -> Json<SuggestionsResponse> {
    let limit = state.synthesizer.sample_size() as i64;
    let reviews = state.recent_reviews(Some(limit)).await.unwrap_or_default();
    let suggestions = state
        .synthesizer
        .synthesize(&reviews, query.business_name.as_deref())
        .await;
    Json(SuggestionsResponse { suggestions })
}

#[utoipa::path(
    post,
    path = "/chatbot/reviews",
    tag = "analytics",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer", body = ChatResponse),
        (status = 400, description = "Empty question")
    )
)]
pub async fn chatbot_reviews(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(AppError::BadRequest("Question is required".to_string()));
    }
    let reviews = state.recent_reviews(Some(CONTEXT_REVIEWS)).await;
    Ok(Json(state.chatbot.answer(reviews.as_deref(), &request).await))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/submit-review", post(submit_review))
        .route("/get-reviews", get(get_reviews))
        .route("/sentiment", get(sentiment))
        .route("/keyword-trends", get(keyword_trends))
        .route("/suggestions", get(suggestions))
        .route("/chatbot/reviews", post(chatbot_reviews))
        .route("/upload-csv", post(uploads::upload_csv).layer(upload_limit))
        .route("/uploaded-files", get(uploads::list_uploaded_files))
        .route("/delete-file/:file_id", delete(uploads::delete_file))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

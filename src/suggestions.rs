//! Natural-language business suggestions from recent reviews.
//!
//! The external model is expected to be unavailable some of the time. Every
//! failure ends in [`fallback_summary`], so [`SuggestionSynthesizer::synthesize`]
//! always returns usable prose.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::llm::{ChatMessage, GenerationRequest, LlmError, TextGenerator};
use crate::store::Review;

pub const NO_REVIEWS_MESSAGE: &str = "No reviews found yet.";

const SYSTEM_PROMPT: &str = "You are an assistant that analyzes customer reviews for small businesses.";

#[derive(Debug, Clone, Copy)]
pub struct SuggestionSettings {
    pub sample_size: usize,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            sample_size: 10,
            max_output_tokens: 400,
            temperature: 0.6,
            timeout: Duration::from_secs(25),
        }
    }
}

pub struct SuggestionSynthesizer {
    generator: Arc<dyn TextGenerator>,
    settings: SuggestionSettings,
}

impl SuggestionSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: SuggestionSettings) -> Self {
        Self { generator, settings }
    }

    pub fn sample_size(&self) -> usize {
        self.settings.sample_size
    }

    pub async fn synthesize(&self, reviews: &[Review], business_name: Option<&str>) -> String {
        let sample = most_recent(reviews, self.settings.sample_size);
        if sample.is_empty() {
            return NO_REVIEWS_MESSAGE.to_string();
        }

        let request = GenerationRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            messages: vec![ChatMessage::user(build_prompt(&sample, business_name))],
            max_output_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
            timeout: self.settings.timeout,
        };

        // The client has its own timeout; this one also covers body reads
        // and any generator that ignores the request timeout.
        let outcome = tokio::time::timeout(self.settings.timeout, self.generator.generate(request))
            .await
            .unwrap_or(Err(LlmError::Timeout(self.settings.timeout)));

        match outcome {
            Ok(text) if !text.trim().is_empty() => {
                info!(reviews = sample.len(), "💡 Suggestions generated by model");
                text.trim().to_string()
            }
            Ok(_) => {
                warn!("Model returned blank suggestions, using local summary");
                fallback_summary(&sample)
            }
            Err(e) => {
                warn!(error = %e, "Suggestion generation failed, using local summary");
                fallback_summary(&sample)
            }
        }
    }
}

/// Newest first by `created_at`, ties broken by id.
fn most_recent(reviews: &[Review], n: usize) -> Vec<&Review> {
    let mut sorted: Vec<&Review> = reviews.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    sorted.truncate(n);
    sorted
}

fn build_prompt(reviews: &[&Review], business_name: Option<&str>) -> String {
    let business = business_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("this business");

    let listing = reviews
        .iter()
        .map(|r| format!("- {} (Rating: {}/5)", r.review_text.trim(), r.rating))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert consultant for {business}. Based on the following {count} customer reviews, summarize:\n\n\
         1. Positive Feedback Trends\n\
         2. Areas for Improvement\n\
         3. Actionable Recommendations\n\n\
         Reviews:\n{listing}\n\n\
         Provide your suggestions clearly and concisely.",
        count = reviews.len(),
    )
}

/// Deterministic summary built only from rating statistics.
pub fn fallback_summary(reviews: &[&Review]) -> String {
    if reviews.is_empty() {
        return NO_REVIEWS_MESSAGE.to_string();
    }

    let count = reviews.len();
    let sum: i64 = reviews.iter().map(|r| r.rating as i64).sum();
    let average = sum as f64 / count as f64;
    let high = reviews.iter().filter(|r| r.rating >= 4).count();
    let low = reviews.iter().filter(|r| r.rating <= 2).count();

    let mut summary = format!(
        "Based on the {count} most recent reviews, the average rating is {average:.1}/5 \
         ({high} rated 4-5 stars, {low} rated 1-2 stars)."
    );

    let framing = if average >= 4.0 {
        " Customers are largely satisfied. Keep doing what is working and encourage happy \
          customers to leave reviews."
    } else if average <= 2.5 {
        " Satisfaction is low. Review the recent complaints closely and address the most \
          frequent issues first."
    } else {
        " Feedback is mixed. Look at what the higher-rated visits have in common and make \
          that experience consistent."
    };
    summary.push_str(framing);

    if low > 0 && average >= 4.0 {
        summary.push_str(&format!(" Follow up on the {low} low-rated review(s) to catch emerging problems."));
    }

    summary
}

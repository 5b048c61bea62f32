//! Review-collection analytics: sentiment summary and ranked keyword trends.
//!
//! Both are recomputed from scratch on every request and are pure functions
//! of the input reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::keywords::KeywordExtractor;
use crate::sentiment::{classify, SentimentLabel};
use crate::store::Review;

/// Per-label tallies. Used both for review counts and keyword breakdowns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    fn bump(&mut self, label: SentimentLabel, by: usize) {
        match label {
            SentimentLabel::Positive => self.positive += by,
            SentimentLabel::Neutral => self.neutral += by,
            SentimentLabel::Negative => self.negative += by,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LabeledReview {
    pub id: i64,
    pub review_text: String,
    pub rating: i32,
    pub sentiment: SentimentLabel,
    pub compound: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SentimentSummary {
    pub counts: SentimentCounts,
    pub labeled_reviews: Vec<LabeledReview>,
    pub total: usize,
}

pub fn sentiment_summary(reviews: &[Review]) -> SentimentSummary {
    let mut counts = SentimentCounts::default();
    let labeled_reviews: Vec<LabeledReview> = reviews
        .iter()
        .map(|review| {
            let result = classify(&review.review_text, review.rating);
            counts.bump(result.label, 1);
            LabeledReview {
                id: review.id,
                review_text: review.review_text.clone(),
                rating: review.rating,
                sentiment: result.label,
                compound: result.compound,
                created_at: review.created_at,
            }
        })
        .collect();

    SentimentSummary {
        total: counts.total(),
        counts,
        labeled_reviews,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendEntry {
    pub keyword: String,
    pub count: usize,
    /// Share of reviews in the run, one decimal place.
    pub percentage: f64,
    pub sentiment_breakdown: SentimentCounts,
    pub dominant_sentiment: SentimentLabel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KeywordTrends {
    pub keywords: Vec<TrendEntry>,
    pub total_keywords_analyzed: usize,
    pub unique_keywords: usize,
    pub total_reviews: usize,
}

/// How many keywords to keep from each sentiment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendLimits {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl Default for TrendLimits {
    fn default() -> Self {
        Self {
            positive: 3,
            neutral: 3,
            negative: 2,
        }
    }
}

impl TrendLimits {
    fn for_label(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }
}

/// Keyword frequencies in first-seen order.
#[derive(Default)]
struct Bucket {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
    occurrences: usize,
}

impl Bucket {
    fn add(&mut self, keyword: &str) {
        self.occurrences += 1;
        match self.index.get(keyword) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(keyword.to_string(), self.entries.len());
                self.entries.push((keyword.to_string(), 1));
            }
        }
    }

    /// Highest counts first; equal counts keep insertion order.
    fn top(&self, k: usize) -> Vec<(String, usize)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

pub struct TrendAggregator {
    extractor: Arc<KeywordExtractor>,
    limits: TrendLimits,
}

impl TrendAggregator {
    pub fn new(extractor: Arc<KeywordExtractor>, limits: TrendLimits) -> Self {
        Self { extractor, limits }
    }

    pub fn aggregate(&self, reviews: &[Review]) -> KeywordTrends {
        let total_reviews = reviews.len();
        if total_reviews == 0 {
            return KeywordTrends::default();
        }

        let mut buckets: HashMap<SentimentLabel, Bucket> = HashMap::new();
        for review in reviews {
            let label = classify(&review.review_text, review.rating).label;
            let bucket = buckets.entry(label).or_default();
            for keyword in self.extractor.extract(&review.review_text) {
                bucket.add(&keyword);
            }
        }

        let mut keywords = Vec::new();
        let mut unique: HashSet<&str> = HashSet::new();
        let mut total_keywords_analyzed = 0;

        for label in SentimentLabel::ALL {
            let Some(bucket) = buckets.get(&label) else {
                continue;
            };
            total_keywords_analyzed += bucket.occurrences;
            unique.extend(bucket.entries.iter().map(|(k, _)| k.as_str()));

            for (keyword, count) in bucket.top(self.limits.for_label(label)) {
                let mut sentiment_breakdown = SentimentCounts::default();
                sentiment_breakdown.bump(label, count);
                keywords.push(TrendEntry {
                    keyword,
                    count,
                    percentage: percentage(count, total_reviews),
                    sentiment_breakdown,
                    dominant_sentiment: label,
                });
            }
        }

        KeywordTrends {
            keywords,
            total_keywords_analyzed,
            unique_keywords: unique.len(),
            total_reviews,
        }
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordConfig;
    use crate::store::memory::review;

    fn aggregator() -> TrendAggregator {
        let extractor = KeywordExtractor::new(KeywordConfig::builtin().unwrap());
        TrendAggregator::new(Arc::new(extractor), TrendLimits::default())
    }

    fn scenario() -> Vec<Review> {
        vec![
            review(1, "great coffee, friendly staff", 5),
            review(2, "coffee was cold and the staff was rude", 2),
            review(3, "fine, nothing special", 3),
        ]
    }

    fn keywords_for(trends: &KeywordTrends, label: SentimentLabel) -> Vec<&str> {
        trends
            .keywords
            .iter()
            .filter(|e| e.dominant_sentiment == label)
            .map(|e| e.keyword.as_str())
            .collect()
    }

    #[test]
    fn test_sentiment_summary_scenario() {
        let summary = sentiment_summary(&scenario());
        assert_eq!(
            summary.counts,
            SentimentCounts { positive: 1, neutral: 1, negative: 1 }
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.labeled_reviews[1].sentiment, SentimentLabel::Negative);
    }

    #[test]
    fn test_empty_input() {
        let trends = aggregator().aggregate(&[]);
        assert!(trends.keywords.is_empty());
        assert_eq!(trends.total_reviews, 0);
        assert_eq!(trends.total_keywords_analyzed, 0);

        let summary = sentiment_summary(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.counts.total(), 0);
    }

    #[test]
    fn test_keywords_attributed_to_review_sentiment() {
        let trends = aggregator().aggregate(&scenario());

        let positive = keywords_for(&trends, SentimentLabel::Positive);
        assert_eq!(positive, vec!["friendly_staff", "great_coffee", "friendly"]);

        let negative = keywords_for(&trends, SentimentLabel::Negative);
        assert_eq!(negative, vec!["cold", "rude"]);

        let neutral = keywords_for(&trends, SentimentLabel::Neutral);
        assert_eq!(neutral, vec!["fine", "special"]);

        assert_eq!(trends.total_reviews, 3);
        assert_eq!(trends.total_keywords_analyzed, 5 + 3 + 2);
        // "staff" appears in two buckets but counts once
        assert_eq!(trends.unique_keywords, 9);
    }

    #[test]
    fn test_breakdown_sums_to_count_and_percentage() {
        let reviews = vec![
            review(1, "Friendly staff and delicious cake", 5),
            review(2, "So friendly, delicious muffins", 4),
            review(3, "Delicious as always", 5),
        ];
        let trends = aggregator().aggregate(&reviews);

        let top = &trends.keywords[0];
        assert_eq!(top.keyword, "delicious");
        assert_eq!(top.count, 3);
        assert_eq!(top.percentage, 100.0);

        let friendly = trends.keywords.iter().find(|e| e.keyword == "friendly").unwrap();
        assert_eq!(friendly.count, 2);
        assert_eq!(friendly.percentage, 66.7);

        for entry in &trends.keywords {
            assert_eq!(entry.sentiment_breakdown.total(), entry.count);
        }
    }

    #[test]
    fn test_limits_are_respected() {
        let reviews: Vec<Review> = (1..=6)
            .map(|i| review(i, "Terrible, rude, dirty, cold and slow", 1))
            .collect();
        let trends = aggregator().aggregate(&reviews);
        assert_eq!(trends.keywords.len(), 2);

        let wide = TrendAggregator::new(
            Arc::new(KeywordExtractor::new(KeywordConfig::builtin().unwrap())),
            TrendLimits { positive: 0, neutral: 0, negative: 4 },
        );
        assert_eq!(wide.aggregate(&reviews).keywords.len(), 4);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let aggregator = aggregator();
        let reviews = scenario();
        let first = serde_json::to_string(&aggregator.aggregate(&reviews)).unwrap();
        let second = serde_json::to_string(&aggregator.aggregate(&reviews)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
    }
}

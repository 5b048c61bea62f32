//! Lexicon-based sentiment scoring for review text.
//!
//! The scorer follows the valence-aware approach popularised by VADER: every
//! known word carries a valence, nearby boosters and negations adjust it,
//! "but" shifts weight to the clause that follows, and emphatic punctuation
//! pushes the total further from zero. The summed valence is squashed into a
//! compound score in `[-1, 1]`.
//!
//! [`classify`] then combines that compound score with the star rating, which
//! is the stronger of the two signals.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

const BOOST_INCR: f64 = 0.293;
const BOOST_DECR: f64 = -0.293;
const CAPS_INCR: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const NORMALIZE_ALPHA: f64 = 15.0;

/// Compound score at or beyond which text counts as polarised.
pub const POLARITY_THRESHOLD: f64 = 0.05;

/// Word valences in the VADER lexicon layout: `token<TAB>mean` with any
/// further columns ignored, so the upstream `vader_lexicon.txt` loads as is.
const BUILTIN_LEXICON: &str = include_str!("../config/sentiment_lexicon.txt");

static VALENCE: Lazy<HashMap<String, f64>> = Lazy::new(|| parse_lexicon(BUILTIN_LEXICON));

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let incr = [
        "absolutely", "amazingly", "awfully", "completely", "considerably", "decidedly",
        "deeply", "dreadfully", "enormous", "enormously", "entirely", "especially",
        "exceptionally", "extremely", "fabulously", "fully", "greatly", "hella", "highly",
        "horribly", "hugely", "incredibly", "intensely", "major", "majorly", "more", "most",
        "particularly", "purely", "quite", "really", "remarkably", "so", "substantially",
        "super", "terribly", "thoroughly", "total", "totally", "tremendous", "tremendously",
        "truly", "uber", "unbelievably", "unusually", "utter", "utterly", "very",
    ];
    let decr = [
        "almost", "barely", "hardly", "kinda", "less", "little", "marginal", "marginally",
        "occasional", "occasionally", "partly", "scarce", "scarcely", "slight", "slightly",
        "somewhat", "sorta",
    ];
    incr.iter()
        .map(|w| (*w, BOOST_INCR))
        .chain(decr.iter().map(|w| (*w, BOOST_DECR)))
        .collect()
});

static NEGATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "not", "no", "never", "none", "nope", "nor", "neither", "nothing", "nowhere",
        "nobody", "cannot", "cant", "dont", "didnt", "doesnt", "isnt", "wasnt", "werent",
        "arent", "aint", "wont", "wouldnt", "couldnt", "shouldnt", "hasnt", "havent",
        "hadnt", "without", "rarely", "seldom", "despite",
    ]
    .into_iter()
    .collect()
});

/// Sentiment bucket attached to a review at analysis time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: SentimentLabel,
    pub compound: f64,
}

/// Labels a review from its text and star rating.
///
/// Either signal alone can make a review negative; a positive label needs
/// both positive wording and a rating of 4 or 5.
pub fn classify(text: &str, rating: i32) -> Classification {
    let rating = clamp_rating(rating);
    let compound = polarity(text);

    let label = if compound <= -POLARITY_THRESHOLD || rating <= 2 {
        SentimentLabel::Negative
    } else if compound >= POLARITY_THRESHOLD && rating >= 4 {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    };

    Classification { label, compound }
}

pub fn clamp_rating(rating: i32) -> i32 {
    if !(1..=5).contains(&rating) {
        tracing::debug!(rating, "Rating outside 1-5, clamping");
    }
    rating.clamp(1, 5)
}

/// Compound polarity in `[-1, 1]`. Empty or sentiment-free text scores 0.0.
pub fn polarity(text: &str) -> f64 {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 0.0;
    }

    let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let caps_differential = has_caps_differential(&tokens);

    let mut valences: Vec<f64> = Vec::with_capacity(tokens.len());
    for (i, word) in lowered.iter().enumerate() {
        // "kind of" hedges, it is not praise.
        let hedge = word == "kind" && lowered.get(i + 1).is_some_and(|next| next == "of");
        if hedge || BOOSTERS.contains_key(word.as_str()) {
            valences.push(0.0);
            continue;
        }
        let Some(&base) = VALENCE.get(word.as_str()) else {
            valences.push(0.0);
            continue;
        };

        let mut valence = base;
        if caps_differential && is_all_caps(&tokens[i]) {
            valence += CAPS_INCR * valence.signum();
        }

        let mut negated = false;
        for distance in 1..=3 {
            if i < distance {
                break;
            }
            let prev = lowered[i - distance].as_str();
            if !VALENCE.contains_key(prev) {
                let decay = match distance {
                    1 => 1.0,
                    2 => 0.95,
                    _ => 0.9,
                };
                valence += booster_scalar(prev, &tokens[i - distance], valence, caps_differential) * decay;
            }
            if is_negation(prev) {
                negated = true;
            }
        }
        if negated {
            valence *= NEGATION_SCALAR;
        }

        valences.push(valence);
    }

    apply_but_weighting(&lowered, &mut valences);

    let mut sum: f64 = valences.iter().sum();
    if sum != 0.0 {
        let emphasis = punctuation_emphasis(text);
        sum += emphasis * sum.signum();
    }

    normalize(sum)
}

fn parse_lexicon(raw: &str) -> HashMap<String, f64> {
    raw.lines()
        .filter_map(|line| {
            let mut columns = line.split('\t');
            let token = columns.next()?.trim();
            if token.is_empty() || token.starts_with('#') {
                return None;
            }
            let valence = columns.next()?.trim().parse::<f64>().ok()?;
            Some((token.to_lowercase(), valence))
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.replace('\u{2019}', "'")
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_string()
        })
        .filter(|t| t.chars().count() > 1 || t.chars().any(|c| c.is_alphabetic()))
        .collect()
}

fn is_all_caps(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic())
        && token.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
}

/// Shouting only counts as emphasis when the rest of the text is not shouted.
fn has_caps_differential(tokens: &[String]) -> bool {
    let caps = tokens.iter().filter(|t| is_all_caps(t)).count();
    caps > 0 && caps < tokens.len()
}

fn booster_scalar(word: &str, original: &str, valence: f64, caps_differential: bool) -> f64 {
    let Some(&scalar) = BOOSTERS.get(word) else {
        return 0.0;
    };
    let mut scalar = if valence < 0.0 { -scalar } else { scalar };
    if caps_differential && is_all_caps(original) {
        scalar += CAPS_INCR * valence.signum();
    }
    scalar
}

fn is_negation(word: &str) -> bool {
    let stripped: String = word.chars().filter(|c| *c != '\'').collect();
    NEGATIONS.contains(stripped.as_str()) || word.ends_with("n't")
}

fn apply_but_weighting(words: &[String], valences: &mut [f64]) {
    let Some(pivot) = words.iter().position(|w| w == "but") else {
        return;
    };
    for (i, v) in valences.iter_mut().enumerate() {
        if i < pivot {
            *v *= 0.5;
        } else if i > pivot {
            *v *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64 * 0.292;
    let questions = match text.matches('?').count() {
        0 | 1 => 0.0,
        n if n <= 3 => n as f64 * 0.18,
        _ => 0.96,
    };
    exclamations + questions
}

fn normalize(score: f64) -> f64 {
    let norm = score / (score * score + NORMALIZE_ALPHA).sqrt();
    norm.clamp(-1.0, 1.0)
}

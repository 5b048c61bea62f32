//! Part-of-speech tagging for the keyword extractor's lexical scan.
//!
//! Only the adjective/noun distinction matters downstream, so the default
//! tagger is a small rule-based one: closed word classes, a list of common
//! adjectives and verbs, then suffix rules, falling back to noun.

use once_cell::sync::Lazy;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    Noun,
    Adjective,
    Verb,
    Adverb,
    /// Determiners, pronouns, prepositions, conjunctions, auxiliaries, numerals.
    Function,
}

impl PosTag {
    pub fn is_content(&self) -> bool {
        matches!(self, PosTag::Noun | PosTag::Adjective)
    }
}

pub trait PosTagger: Send + Sync {
    /// Tags lowercase tokens; the output has the same length as the input.
    fn tag(&self, tokens: &[&str]) -> Vec<PosTag>;
}

static FUNCTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        // determiners & quantifiers
        "a", "an", "the", "this", "that", "these", "those", "each", "every", "some", "any",
        "all", "both", "either", "neither", "another", "other", "several", "many", "much",
        "more", "most", "few", "less", "least", "enough", "such", "no",
        // pronouns
        "i", "me", "my", "mine", "we", "us", "our", "ours", "you", "your", "yours", "he",
        "him", "his", "she", "her", "hers", "it", "its", "they", "them", "their", "theirs",
        "something", "nothing", "anything", "everything", "someone", "anyone", "everyone",
        "nobody", "somebody", "everybody", "what", "which", "who", "whom", "whose",
        // prepositions & conjunctions
        "of", "at", "by", "for", "with", "about", "into", "through", "during", "before",
        "after", "above", "below", "to", "from", "in", "on", "off", "over", "under", "and",
        "but", "or", "nor", "yet", "because", "although", "though", "while", "if", "unless",
        "than", "as", "like", "since", "until", "upon", "within", "without", "across",
        // auxiliaries & modals
        "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
        "does", "did", "will", "would", "shall", "should", "can", "could", "may", "might",
        "must",
        // numerals
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "first", "second", "third",
    ]
    .into_iter()
    .collect()
});

static ADJECTIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "good", "great", "bad", "nice", "fine", "best", "better", "worse", "worst", "new",
        "old", "hot", "cold", "warm", "cool", "fresh", "stale", "sweet", "sour", "bitter",
        "strong", "weak", "rich", "smooth", "creamy", "tasty", "yummy", "delicious",
        "awful", "terrible", "horrible", "amazing", "awesome", "perfect", "lovely",
        "friendly", "unfriendly", "rude", "kind", "polite", "cozy", "comfy", "quiet",
        "noisy", "loud", "busy", "clean", "dirty", "messy", "tidy", "cheap", "pricey",
        "expensive", "overpriced", "fast", "quick", "slow", "long", "short", "cute",
        "pretty", "ugly", "happy", "sad", "angry", "easy", "hard", "soft", "dry", "wet",
        "special", "normal", "casual", "local", "typical", "real", "total", "usual",
        "original", "decent", "solid", "average", "mediocre", "excellent", "fantastic",
        "wonderful", "superb", "brilliant", "pleasant", "bland", "burnt", "lukewarm",
        "spotless", "chaotic", "crowded", "empty", "full", "open", "closed", "late",
        "early", "free", "ok", "okay", "meh", "ready", "wrong", "right", "same",
        "different", "huge", "tiny", "attentive", "welcoming", "relaxing", "charming",
        "disappointing", "disappointed", "satisfied", "impressed", "boring",
    ]
    .into_iter()
    .collect()
});

static VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "get", "got", "go", "went", "gone", "come", "came", "make", "made", "take", "took",
        "give", "gave", "say", "said", "see", "saw", "seen", "know", "knew", "think",
        "thought", "want", "need", "try", "tried", "ask", "asked", "pay", "paid", "buy",
        "bought", "eat", "ate", "drink", "drank", "feel", "felt", "seem", "seemed", "find",
        "found", "leave", "left", "sit", "sat", "serve", "served", "bring", "brought",
        "forget", "forgot", "tell", "told", "keep", "kept", "let", "put", "love", "loved",
        "like", "liked", "hate", "hated", "enjoy", "enjoyed", "recommend", "recommended",
        "visit", "visited", "return", "returned", "stay", "stayed", "waited", "ordered",
        "tasted", "smelled", "looked", "arrived", "became", "become",
    ]
    .into_iter()
    .collect()
});

static ADVERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "always", "never", "ever", "again", "still", "even", "often", "sometimes", "soon",
        "already", "almost", "quite", "rather", "too", "very", "so", "just", "also", "here",
        "there", "now", "then", "today", "maybe", "perhaps", "well", "instead", "anyway",
        "definitely", "not",
    ]
    .into_iter()
    .collect()
});

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "ous", "ful", "ive", "able", "ible", "ical", "ial", "less", "ish",
];

const DETERMINERS: &[&str] = &["a", "an", "the", "my", "our", "your", "their", "this", "that"];

/// Default tagger: word lists first, then suffix heuristics, noun otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleTagger;

impl RuleTagger {
    fn tag_word(word: &str, prev: Option<&str>) -> PosTag {
        if FUNCTION_WORDS.contains(word) {
            return PosTag::Function;
        }
        if ADJECTIVES.contains(word) {
            return PosTag::Adjective;
        }
        let after_determiner = prev.is_some_and(|p| DETERMINERS.contains(&p));
        if VERBS.contains(word) {
            // "the love", "a visit"
            return if after_determiner { PosTag::Noun } else { PosTag::Verb };
        }
        if ADVERBS.contains(word) || word.ends_with("ly") {
            return PosTag::Adverb;
        }
        if ADJECTIVE_SUFFIXES.iter().any(|s| word.len() > s.len() + 2 && word.ends_with(s)) {
            return PosTag::Adjective;
        }
        if (word.ends_with("ing") || word.ends_with("ed")) && word.len() > 4 {
            return if after_determiner { PosTag::Noun } else { PosTag::Verb };
        }
        PosTag::Noun
    }
}

impl PosTagger for RuleTagger {
    fn tag(&self, tokens: &[&str]) -> Vec<PosTag> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let prev = i.checked_sub(1).map(|p| tokens[p]);
                Self::tag_word(word, prev)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<PosTag> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        RuleTagger.tag(&tokens)
    }

    #[test]
    fn test_tags_simple_sentence() {
        assert_eq!(
            tags("the coffee was cold"),
            vec![PosTag::Function, PosTag::Noun, PosTag::Function, PosTag::Adjective]
        );
    }

    #[test]
    fn test_suffix_rules() {
        assert_eq!(tags("gorgeous")[0], PosTag::Adjective);
        assert_eq!(tags("quickly")[0], PosTag::Adverb);
        assert_eq!(tags("friendly")[0], PosTag::Adjective);
        assert_eq!(tags("atmosphere")[0], PosTag::Noun);
    }

    #[test]
    fn test_participles_depend_on_context() {
        assert_eq!(tags("we were waiting")[2], PosTag::Verb);
        assert_eq!(tags("the seating")[1], PosTag::Noun);
    }

    #[test]
    fn test_output_matches_input_length() {
        assert!(RuleTagger.tag(&[]).is_empty());
        assert_eq!(tags("a b c d").len(), 4);
    }
}

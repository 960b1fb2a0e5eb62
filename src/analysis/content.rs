//! Content feature extraction
//!
//! Pure per-cast signal detection (questions, CTAs, sentiment, media) and
//! batch-level correlation of those signals with engagement.

use std::collections::HashMap;

use crate::models::{Cast, CastContentFeatures, FeatureCorrelation, Sentiment};

/// Call-to-action words and phrases that encourage engagement
const CTA_PATTERNS: &[&str] = &[
    "thoughts",
    "what do you think",
    "agree",
    "disagree",
    "lmk",
    "let me know",
    "your take",
    "weigh in",
    "curious",
    "wondering",
    "drop a",
    "share your",
    "tell me",
    "anyone else",
    "who else",
    "am i the only",
    "hot take",
    "unpopular opinion",
    "change my mind",
    "prove me wrong",
    "reply",
    "comment",
    "discuss",
];

// Simple sentiment word lists, including platform slang
const POSITIVE_WORDS: &[&str] = &[
    "amazing", "awesome", "great", "love", "excited", "happy", "fantastic",
    "wonderful", "excellent", "brilliant", "incredible", "perfect", "best",
    "beautiful", "gorgeous", "superb", "outstanding", "magnificent", "delightful",
    "thrilled", "grateful", "blessed", "pumped", "stoked", "hyped", "bullish",
    "based", "legendary", "goated", "fire", "lit", "sick", "dope",
];

const NEGATIVE_WORDS: &[&str] = &[
    "terrible", "awful", "horrible", "hate", "sad", "angry", "frustrated",
    "disappointed", "worst", "bad", "ugly", "disgusting", "annoying", "boring",
    "stupid", "dumb", "ridiculous", "pathetic", "useless", "broken", "failed",
    "bearish", "rugpull", "scam", "trash", "garbage", "cringe", "mid",
];

const QUESTION_STARTERS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "which", "whose", "whom",
    "is", "are", "do", "does", "did", "can", "could", "would", "will", "should",
];

const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "mp4", "webm", "mov"];

/// True if the text contains a question mark or a question word on a word
/// boundary anywhere in the text.
pub fn has_question(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }

    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .any(|word| {
            let lower = word.to_lowercase();
            QUESTION_STARTERS.contains(&lower.as_str())
        })
}

/// All CTA phrases matched in the text, not just a boolean
pub fn detect_ctas(text: &str) -> Vec<String> {
    let lower_text = text.to_lowercase();

    CTA_PATTERNS
        .iter()
        .filter(|cta| lower_text.contains(*cta))
        .map(|cta| (*cta).to_string())
        .collect()
}

/// Naive lexicon sentiment: count positive and negative word hits and take
/// the sign of the difference. Ties resolve to neutral.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let lower_text = text.to_lowercase();

    let mut positive_count = 0i32;
    let mut negative_count = 0i32;

    for word in lower_text.split_whitespace() {
        let clean: String = word.chars().filter(|c| c.is_ascii_alphabetic()).collect();

        if POSITIVE_WORDS.contains(&clean.as_str()) {
            positive_count += 1;
        }
        if NEGATIVE_WORDS.contains(&clean.as_str()) {
            negative_count += 1;
        }
    }

    match (positive_count - negative_count).signum() {
        1 => Sentiment::Positive,
        -1 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// Whitespace-split word count, empty tokens excluded
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn is_media_url(url: &str) -> bool {
    if url.contains("image") || url.contains("video") {
        return true;
    }
    MEDIA_EXTENSIONS.iter().any(|ext| {
        url.split('?').next().is_some_and(|base| {
            base.rsplit('.').next().is_some_and(|tail| tail == *ext)
        })
    })
}

/// True if any embed URL looks like an image or video
pub fn has_media(cast: &Cast) -> bool {
    cast.embeds.iter().any(|embed| {
        embed.url.as_deref().is_some_and(|url| {
            let url = url.to_lowercase();
            is_media_url(&url) || url.contains("imgur") || url.contains("giphy")
        })
    })
}

/// True if any embed URL is a non-media external link
pub fn has_links(cast: &Cast) -> bool {
    cast.embeds.iter().any(|embed| {
        embed.url.as_deref().is_some_and(|url| {
            let url = url.to_lowercase();
            !is_media_url(&url)
        })
    })
}

/// Extract all content features for a cast
pub fn extract_content_features(cast: &Cast) -> CastContentFeatures {
    let cta_words = detect_ctas(&cast.text);

    CastContentFeatures {
        cast_hash: cast.hash.clone(),
        has_question: has_question(&cast.text),
        has_cta: !cta_words.is_empty(),
        cta_words,
        sentiment: analyze_sentiment(&cast.text),
        word_count: word_count(&cast.text),
        has_media: has_media(cast),
        has_mentions: !cast.mentions.is_empty(),
        has_links: has_links(cast),
    }
}

/// Batch extract content features keyed by cast hash
pub fn extract_batch_content_features(casts: &[Cast]) -> HashMap<String, CastContentFeatures> {
    casts
        .iter()
        .map(|cast| (cast.hash.clone(), extract_content_features(cast)))
        .collect()
}

fn avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percent_lift(with: f64, without: f64) -> f64 {
    // Empty or zero complement group yields 0% lift, not an error
    if without > 0.0 {
        (with - without) / without * 100.0
    } else {
        0.0
    }
}

/// Correlate content features with engagement across the whole corpus:
/// percentage lift for question/CTA/media presence, plus average word
/// counts for the top and bottom 20% of casts by engagement.
pub fn analyze_feature_correlation(
    features_map: &HashMap<String, CastContentFeatures>,
    engagement_scores: &HashMap<String, f64>,
) -> FeatureCorrelation {
    let mut with_question = Vec::new();
    let mut without_question = Vec::new();
    let mut with_cta = Vec::new();
    let mut without_cta = Vec::new();
    let mut with_media = Vec::new();
    let mut without_media = Vec::new();

    for (hash, features) in features_map {
        let score = engagement_scores.get(hash).copied().unwrap_or(0.0);

        if features.has_question {
            with_question.push(score);
        } else {
            without_question.push(score);
        }
        if features.has_cta {
            with_cta.push(score);
        } else {
            without_cta.push(score);
        }
        if features.has_media {
            with_media.push(score);
        } else {
            without_media.push(score);
        }
    }

    // Word counts for the top/bottom 20% by engagement
    let mut sorted_scores: Vec<(&String, f64)> = engagement_scores
        .iter()
        .map(|(hash, score)| (hash, *score))
        .collect();
    sorted_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let slice_len = (sorted_scores.len() as f64 * 0.2).ceil() as usize;

    let word_counts = |hashes: &[(&String, f64)]| -> Vec<f64> {
        hashes
            .iter()
            .filter_map(|(hash, _)| features_map.get(*hash))
            .map(|f| f.word_count as f64)
            .filter(|&w| w > 0.0)
            .collect()
    };

    let top_word_counts = word_counts(&sorted_scores[..slice_len.min(sorted_scores.len())]);
    let bottom_word_counts =
        word_counts(&sorted_scores[sorted_scores.len().saturating_sub(slice_len)..]);

    FeatureCorrelation {
        question_impact: percent_lift(avg(&with_question), avg(&without_question)),
        cta_impact: percent_lift(avg(&with_cta), avg(&without_cta)),
        media_impact: percent_lift(avg(&with_media), avg(&without_media)),
        avg_word_count_top: avg(&top_word_counts),
        avg_word_count_bottom: avg(&bottom_word_counts),
    }
}

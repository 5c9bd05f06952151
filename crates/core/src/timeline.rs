use crate::model::Prediction;
use crate::sentiment::{classify, Sentiment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scores this close to zero stay neutral so near-silent signals do not
/// flap between positive and negative.
pub const DOMINANCE_DEAD_ZONE: f64 = 0.1;

const TOP_EMOTIONS_KEPT: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BucketEmotion {
    pub label: String,
    pub probability: f64,
    pub sentiment: Sentiment,
}

/// One fixed-width slice of the input timeline. Created once per analysis
/// run and never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineBucket {
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
    pub emotions: Vec<BucketEmotion>,
    pub dominant_sentiment: Sentiment,
    pub sentiment_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the caller's chunking produced for one bucket slot.
#[derive(Clone, Debug)]
pub enum BucketSource {
    Scored(Prediction),
    Missing(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SentimentBreakdown {
    pub positive_percentage: f64,
    pub neutral_percentage: f64,
    pub negative_percentage: f64,
    pub dominant: String,
    pub average_sentiment_score: f64,
    pub positive_buckets: usize,
    pub neutral_buckets: usize,
    pub negative_buckets: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionSummaryEntry {
    pub label: String,
    pub count: usize,
    pub average_probability: f64,
    pub total_probability: f64,
    pub sentiment: Sentiment,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SentimentPoint {
    pub timestamp: f64,
    pub sentiment: Sentiment,
    pub score: f64,
}

/// Read-only roll-up over a bucket timeline. Recomputed fully on each
/// request, never persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Aggregation {
    pub total_duration: f64,
    pub total_buckets: usize,
    pub overall_sentiment: SentimentBreakdown,
    pub top_emotions: Vec<EmotionSummaryEntry>,
    pub total_unique_emotions: usize,
    pub sentiment_series: Vec<SentimentPoint>,
}

/// Dead-zone sign classification; both boundaries fall to neutral.
pub fn dominant_for_score(sentiment_score: f64) -> Sentiment {
    if sentiment_score > DOMINANCE_DEAD_ZONE {
        Sentiment::Positive
    } else if sentiment_score < -DOMINANCE_DEAD_ZONE {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Build one bucket from its prediction (top-3 emotions weighted by
/// probability) or from a failure reason.
pub fn build_bucket(start_s: f64, end_s: f64, source: BucketSource) -> TimelineBucket {
    match source {
        BucketSource::Scored(prediction) => {
            let mut emotions = Vec::with_capacity(prediction.top_3_emotions.len());
            let mut sentiment_score = 0.0;
            for e in &prediction.top_3_emotions {
                let sentiment = classify(&e.label);
                sentiment_score += f64::from(sentiment.value()) * e.probability;
                emotions.push(BucketEmotion {
                    label: e.label.clone(),
                    probability: e.probability,
                    sentiment,
                });
            }
            TimelineBucket {
                start_s,
                end_s,
                duration_s: end_s - start_s,
                emotions,
                dominant_sentiment: dominant_for_score(sentiment_score),
                sentiment_score,
                error: None,
            }
        }
        BucketSource::Missing(reason) => TimelineBucket {
            start_s,
            end_s,
            duration_s: end_s - start_s,
            emotions: Vec::new(),
            dominant_sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            error: Some(reason),
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

/// Roll a bucket timeline up into percentages, the overall dominant
/// sentiment (strict maximum, every tie goes to neutral), a top-10 emotion
/// histogram ranked by average probability, and the per-bucket score series.
pub fn aggregate(timeline: &[TimelineBucket], total_duration: f64) -> Aggregation {
    if timeline.is_empty() {
        return Aggregation {
            total_duration,
            total_buckets: 0,
            overall_sentiment: SentimentBreakdown {
                positive_percentage: 0.0,
                neutral_percentage: 0.0,
                negative_percentage: 0.0,
                dominant: Sentiment::Neutral.name().to_owned(),
                average_sentiment_score: 0.0,
                positive_buckets: 0,
                neutral_buckets: 0,
                negative_buckets: 0,
            },
            top_emotions: Vec::new(),
            total_unique_emotions: 0,
            sentiment_series: Vec::new(),
        };
    }

    let total_buckets = timeline.len();
    let positive_buckets = timeline
        .iter()
        .filter(|b| b.dominant_sentiment == Sentiment::Positive)
        .count();
    let negative_buckets = timeline
        .iter()
        .filter(|b| b.dominant_sentiment == Sentiment::Negative)
        .count();
    let neutral_buckets = total_buckets - positive_buckets - negative_buckets;

    let pct = |count: usize| count as f64 / total_buckets as f64 * 100.0;
    let positive_pct = pct(positive_buckets);
    let neutral_pct = pct(neutral_buckets);
    let negative_pct = pct(negative_buckets);

    let dominant = if positive_pct > negative_pct && positive_pct > neutral_pct {
        Sentiment::Positive
    } else if negative_pct > positive_pct && negative_pct > neutral_pct {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    let mut counts: HashMap<&str, (usize, f64)> = HashMap::new();
    for bucket in timeline {
        for emotion in &bucket.emotions {
            let entry = counts.entry(emotion.label.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += emotion.probability;
        }
    }
    let total_unique_emotions = counts.len();
    let mut top_emotions: Vec<EmotionSummaryEntry> = counts
        .into_iter()
        .map(|(label, (count, total_probability))| EmotionSummaryEntry {
            average_probability: total_probability / count as f64,
            total_probability,
            count,
            sentiment: classify(label),
            label: label.to_owned(),
        })
        .collect();
    top_emotions.sort_by(|a, b| {
        b.average_probability
            .total_cmp(&a.average_probability)
            .then_with(|| a.label.cmp(&b.label))
    });
    top_emotions.truncate(TOP_EMOTIONS_KEPT);

    let score_sum: f64 = timeline.iter().map(|b| b.sentiment_score).sum();
    let average_sentiment_score = round3(score_sum / total_buckets as f64);

    let sentiment_series = timeline
        .iter()
        .map(|b| SentimentPoint {
            timestamp: b.start_s,
            sentiment: b.dominant_sentiment,
            score: b.sentiment_score,
        })
        .collect();

    Aggregation {
        total_duration,
        total_buckets,
        overall_sentiment: SentimentBreakdown {
            positive_percentage: round2(positive_pct),
            neutral_percentage: round2(neutral_pct),
            negative_percentage: round2(negative_pct),
            dominant: dominant.name().to_owned(),
            average_sentiment_score,
            positive_buckets,
            neutral_buckets,
            negative_buckets,
        },
        top_emotions,
        total_unique_emotions,
        sentiment_series,
    }
}

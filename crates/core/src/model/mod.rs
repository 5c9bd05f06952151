mod hume;

use crate::store::SegmentRef;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use hume::HumeExpressionModel;

/// One (label, probability) pair as reported by the expression model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionScore {
    pub label: String,
    pub probability: f64,
}

/// Span in seconds on the original, unchunked timeline. For text input the
/// fields hold character positions instead. Both ends are `None` only when
/// the model reported no offsets at all.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeRange {
    pub begin: Option<f64>,
    pub end: Option<f64>,
}

impl TimeRange {
    /// Shift both ends by `offset_s`, leaving absent ends absent.
    pub fn shifted(self, offset_s: f64) -> Self {
        Self {
            begin: self.begin.map(|b| b + offset_s),
            end: self.end.map(|e| e + offset_s),
        }
    }
}

/// One scored unit: a whole short clip, a chunk of a longer clip, or a text
/// span. Emotions are sorted by probability descending (stable, so model
/// order breaks ties) and the first three are mirrored into
/// `top_3_emotions`. Immutable once built apart from the chunk provenance
/// the analyzer attaches.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub time: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub emotions: Vec<EmotionScore>,
    pub top_3_emotions: Vec<EmotionScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

impl Prediction {
    pub fn from_scores(time: TimeRange, mut emotions: Vec<EmotionScore>) -> Self {
        emotions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        let top_3_emotions = emotions.iter().take(3).cloned().collect();
        Self {
            time,
            text: None,
            emotions,
            top_3_emotions,
            chunk_index: None,
        }
    }
}

/// Everything one model call reports. Zero predictions plus a warning is how
/// the model says "nothing usable in this segment".
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelOutput {
    pub predictions: Vec<Prediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("segment read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("expression api error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("expression api rejected request: {0}")]
    Rejected(String),

    #[error("invalid expression api response: {0}")]
    InvalidResponse(String),
}

/// The external expression-measurement boundary. One call per segment, no
/// implicit retry; the caller bounds segment duration.
pub trait ExpressionModel: Send + Sync {
    fn score_segment(&self, segment: SegmentRef) -> BoxFuture<'_, Result<ModelOutput, ModelError>>;

    fn score_text(&self, text: String) -> BoxFuture<'_, Result<ModelOutput, ModelError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(label: &str, probability: f64) -> EmotionScore {
        EmotionScore {
            label: label.to_owned(),
            probability,
        }
    }

    #[test]
    fn from_scores_sorts_descending_and_takes_top_three() {
        let p = Prediction::from_scores(
            TimeRange::default(),
            vec![
                score("Calmness", 0.2),
                score("Joy", 0.9),
                score("Interest", 0.5),
                score("Boredom", 0.1),
            ],
        );
        let order: Vec<&str> = p.emotions.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(order, vec!["Joy", "Interest", "Calmness", "Boredom"]);
        assert_eq!(p.top_3_emotions.len(), 3);
        assert_eq!(p.top_3_emotions[0].label, "Joy");
        assert_eq!(p.top_3_emotions[2].label, "Calmness");
    }

    #[test]
    fn from_scores_tie_break_is_stable() {
        let p = Prediction::from_scores(
            TimeRange::default(),
            vec![score("First", 0.5), score("Second", 0.5), score("Third", 0.5)],
        );
        let order: Vec<&str> = p.emotions.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(order, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn fewer_than_three_emotions_is_fine() {
        let p = Prediction::from_scores(TimeRange::default(), vec![score("Joy", 0.4)]);
        assert_eq!(p.top_3_emotions.len(), 1);
    }

    #[test]
    fn shifted_moves_present_ends_only() {
        let t = TimeRange {
            begin: Some(0.2),
            end: None,
        };
        let shifted = t.shifted(9.0);
        assert_eq!(shifted.begin, Some(9.2));
        assert_eq!(shifted.end, None);

        let absent = TimeRange::default().shifted(3.0);
        assert_eq!(absent, TimeRange::default());
    }

    #[test]
    fn shifted_keeps_zero_offsets() {
        // An offset of exactly 0.0 is a real offset and must shift.
        let t = TimeRange {
            begin: Some(0.0),
            end: Some(0.8),
        };
        let shifted = t.shifted(9.0);
        assert_eq!(shifted.begin, Some(9.0));
        assert_eq!(shifted.end, Some(9.8));
    }
}

use crate::model::{Prediction, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TriggeredEmotion {
    pub label: String,
    pub probability: f64,
    pub time: TimeRange,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TriggerReport {
    pub triggered: bool,
    pub emotions: Vec<TriggeredEmotion>,
    pub total_triggers: usize,
}

/// Collect the emotions that should raise an alert.
///
/// An absent or empty filter map means alert on anything detected: every
/// (label, probability) pair across every prediction's full emotion list is
/// included. A non-empty map selects by label membership only. The threshold
/// value a label maps to rides along for downstream consumers and is never
/// compared against the probability here; client configs depend on that
/// literal contract.
pub fn evaluate(
    predictions: &[Prediction],
    filters: Option<&HashMap<String, f64>>,
) -> TriggerReport {
    let include_all = filters.is_none_or(|f| f.is_empty());

    let mut emotions = Vec::new();
    for prediction in predictions {
        for emotion in &prediction.emotions {
            let included = include_all
                || filters.is_some_and(|f| f.contains_key(&emotion.label));
            if included {
                emotions.push(TriggeredEmotion {
                    label: emotion.label.clone(),
                    probability: emotion.probability,
                    time: prediction.time,
                });
            }
        }
    }

    TriggerReport {
        triggered: !emotions.is_empty(),
        total_triggers: emotions.len(),
        emotions,
    }
}

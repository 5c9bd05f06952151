use crate::model::EmotionScore;
use crate::sentiment::{classify, Sentiment};
use crate::util::RecentLog;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const INITIAL_RIZZ_SCORE: f64 = 75.0;
pub const RECENT_NOTIFICATION_CAPACITY: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationRecord {
    pub timestamp: String,
    pub user_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
struct State {
    total_requests: u64,
    successful_analyses: u64,
    failed_analyses: u64,
    last_request_time: Option<String>,
    last_user_id: Option<String>,
    recent_emotions: Vec<String>,
    emotion_counts: HashMap<String, u64>,
    rizz_score: f64,
    recent_notifications: RecentLog<NotificationRecord>,
}

impl State {
    fn new() -> Self {
        Self {
            total_requests: 0,
            successful_analyses: 0,
            failed_analyses: 0,
            last_request_time: None,
            last_user_id: None,
            recent_emotions: Vec::new(),
            emotion_counts: HashMap::new(),
            rizz_score: INITIAL_RIZZ_SCORE,
            recent_notifications: RecentLog::new(RECENT_NOTIFICATION_CAPACITY),
        }
    }
}

/// Owned view of the analytics state at some serialization point.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub successful_analyses: u64,
    pub failed_analyses: u64,
    pub last_request_time: Option<String>,
    pub last_user_id: Option<String>,
    pub recent_emotions: Vec<String>,
    pub emotion_counts: HashMap<String, u64>,
    pub rizz_score: f64,
    pub recent_notifications: Vec<NotificationRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryEmotion {
    pub label: String,
    pub probability: f64,
    pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionSummary {
    pub summary: String,
    pub emotions: Vec<SummaryEmotion>,
    pub total_detections: u64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("no emotion data available")]
    NoData,
}

/// The one piece of state shared by every request task and the background
/// loops. Cloning the handle shares the same state; every operation takes
/// the single lock for its whole read-modify-write, so concurrent updates
/// never interleave mid-transition.
#[derive(Clone)]
pub struct Analytics {
    state: Arc<Mutex<State>>,
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    pub async fn increment_request(&self, user_id: &str) {
        let mut state = self.state.lock().await;
        state.total_requests += 1;
        state.last_request_time = Some(Utc::now().format(TIMESTAMP_FORMAT).to_string());
        state.last_user_id = Some(user_id.to_owned());
    }

    /// Record a successful analysis: bump the counter, replace the display
    /// list, grow the histogram, and move the rizz score, all in one
    /// critical section.
    pub async fn record_success(&self, top_emotions: &[EmotionScore]) {
        let mut state = self.state.lock().await;
        state.successful_analyses += 1;
        if top_emotions.is_empty() {
            return;
        }

        state.recent_emotions = top_emotions
            .iter()
            .map(|e| format!("{} ({:.2})", e.label, e.probability))
            .collect();
        for emotion in top_emotions {
            *state.emotion_counts.entry(emotion.label.clone()).or_insert(0) += 1;
        }
        state.rizz_score = adjusted_score(state.rizz_score, top_emotions);
        tracing::debug!(rizz_score = state.rizz_score, "rizz score updated");
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.failed_analyses += 1;
    }

    /// Apply the emotion adjustments to the score without recording an
    /// analysis. Returns the new score.
    pub async fn update_score(&self, emotions: &[EmotionScore]) -> f64 {
        let mut state = self.state.lock().await;
        state.rizz_score = adjusted_score(state.rizz_score, emotions);
        state.rizz_score
    }

    pub async fn add_notification(&self, user_id: &str, message: &str) {
        let mut state = self.state.lock().await;
        state.recent_notifications.push(NotificationRecord {
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            user_id: user_id.to_owned(),
            message: message.to_owned(),
        });
    }

    /// Restore every field to its initial value.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = State::new();
    }

    pub async fn rizz_score(&self) -> f64 {
        self.state.lock().await.rizz_score
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.lock().await;
        StatsSnapshot {
            total_requests: state.total_requests,
            successful_analyses: state.successful_analyses,
            failed_analyses: state.failed_analyses,
            last_request_time: state.last_request_time.clone(),
            last_user_id: state.last_user_id.clone(),
            recent_emotions: state.recent_emotions.clone(),
            emotion_counts: state.emotion_counts.clone(),
            rizz_score: state.rizz_score,
            recent_notifications: state.recent_notifications.iter().cloned().collect(),
        }
    }

    /// Share-of-count summary of the five most frequent emotions.
    pub async fn emotion_summary(&self) -> Result<EmotionSummary, SummaryError> {
        let state = self.state.lock().await;
        if state.emotion_counts.is_empty() {
            return Err(SummaryError::NoData);
        }

        let total_detections: u64 = state.emotion_counts.values().sum();
        let mut ranked: Vec<(&String, &u64)> = state.emotion_counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut parts = Vec::new();
        let mut emotions = Vec::new();
        for (label, &count) in ranked.into_iter().take(5) {
            let percentage = count as f64 / total_detections as f64 * 100.0;
            parts.push(format!("{label} ({percentage:.1}%)"));
            emotions.push(SummaryEmotion {
                label: label.clone(),
                probability: percentage / 100.0,
                count,
            });
        }

        Ok(EmotionSummary {
            summary: format!("Top emotions detected: {}", parts.join(", ")),
            emotions,
            total_detections,
        })
    }
}

fn adjusted_score(score: f64, emotions: &[EmotionScore]) -> f64 {
    let mut adjustment = 0.0;
    for emotion in emotions {
        match classify(&emotion.label) {
            // Scaled by intensity; a full-probability emotion moves the
            // score by ten points.
            Sentiment::Positive => adjustment += emotion.probability * 10.0,
            Sentiment::Negative => adjustment -= emotion.probability * 10.0,
            Sentiment::Neutral => {}
        }
    }
    (score + adjustment).clamp(0.0, 100.0)
}

/// Band the score into a display label. Both boundaries belong to neutral.
pub fn rizz_status(score: f64) -> Sentiment {
    if score > 80.0 {
        Sentiment::Positive
    } else if score < 40.0 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
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

    #[tokio::test]
    async fn one_full_positive_emotion_adds_ten() {
        let analytics = Analytics::new();
        let new_score = analytics.update_score(&[score("Joy", 1.0)]).await;
        assert!((new_score - 85.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn score_clamps_at_zero() {
        let analytics = Analytics::new();
        // Walk the score down to 5, then push one more full negative.
        for _ in 0..7 {
            analytics.update_score(&[score("Anger", 1.0)]).await;
        }
        assert!((analytics.rizz_score().await - 5.0).abs() < 1e-9);
        let clamped = analytics.update_score(&[score("Anger", 1.0)]).await;
        assert_eq!(clamped, 0.0);
    }

    #[tokio::test]
    async fn score_clamps_at_one_hundred() {
        let analytics = Analytics::new();
        for _ in 0..4 {
            analytics.update_score(&[score("Joy", 1.0)]).await;
        }
        assert_eq!(analytics.rizz_score().await, 100.0);
    }

    #[tokio::test]
    async fn neutral_emotions_leave_the_score_alone() {
        let analytics = Analytics::new();
        let unchanged = analytics
            .update_score(&[score("Calmness", 0.99), score("Concentration", 0.8)])
            .await;
        assert!((unchanged - INITIAL_RIZZ_SCORE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn record_success_updates_everything_at_once() {
        let analytics = Analytics::new();
        analytics
            .record_success(&[score("Joy", 0.85), score("Anger", 0.2), score("Calmness", 0.5)])
            .await;

        let stats = analytics.snapshot().await;
        assert_eq!(stats.successful_analyses, 1);
        assert_eq!(
            stats.recent_emotions,
            vec!["Joy (0.85)", "Anger (0.20)", "Calmness (0.50)"]
        );
        assert_eq!(stats.emotion_counts.get("Joy"), Some(&1));
        assert_eq!(stats.emotion_counts.get("Calmness"), Some(&1));
        // 75 + 8.5 - 2 = 81.5
        assert!((stats.rizz_score - 81.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn record_success_with_no_emotions_only_counts() {
        let analytics = Analytics::new();
        analytics.record_success(&[]).await;
        let stats = analytics.snapshot().await;
        assert_eq!(stats.successful_analyses, 1);
        assert!(stats.recent_emotions.is_empty());
        assert_eq!(stats.rizz_score, INITIAL_RIZZ_SCORE);
    }

    #[tokio::test]
    async fn record_failure_touches_only_its_counter() {
        let analytics = Analytics::new();
        analytics.record_failure().await;
        let stats = analytics.snapshot().await;
        assert_eq!(stats.failed_analyses, 1);
        assert_eq!(stats.successful_analyses, 0);
        assert_eq!(stats.rizz_score, INITIAL_RIZZ_SCORE);
    }

    #[tokio::test]
    async fn increment_request_tracks_last_user() {
        let analytics = Analytics::new();
        analytics.increment_request("user-1").await;
        analytics.increment_request("user-2").await;
        let stats = analytics.snapshot().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.last_user_id.as_deref(), Some("user-2"));
        assert!(stats.last_request_time.unwrap().ends_with("UTC"));
    }

    #[tokio::test]
    async fn notifications_stay_bounded_and_newest_first() {
        let analytics = Analytics::new();
        for i in 0..15 {
            analytics
                .add_notification("user", &format!("message {i}"))
                .await;
        }
        let stats = analytics.snapshot().await;
        assert_eq!(stats.recent_notifications.len(), 10);
        assert_eq!(stats.recent_notifications[0].message, "message 14");
        assert_eq!(stats.recent_notifications[9].message, "message 5");
    }

    #[tokio::test]
    async fn reset_matches_a_fresh_instance() {
        let analytics = Analytics::new();
        analytics.increment_request("user").await;
        analytics.record_success(&[score("Joy", 0.9)]).await;
        analytics.record_failure().await;
        analytics.add_notification("user", "hello").await;

        analytics.reset().await;

        let fresh = Analytics::new();
        assert_eq!(analytics.snapshot().await, fresh.snapshot().await);
        assert_eq!(analytics.rizz_score().await, INITIAL_RIZZ_SCORE);
    }

    #[tokio::test]
    async fn emotion_summary_ranks_top_five_by_count() {
        let analytics = Analytics::new();
        for _ in 0..3 {
            analytics.record_success(&[score("Joy", 0.9)]).await;
        }
        analytics
            .record_success(&[
                score("Anger", 0.5),
                score("Fear", 0.4),
                score("Calmness", 0.3),
            ])
            .await;
        analytics
            .record_success(&[score("Anger", 0.6), score("Boredom", 0.2), score("Doubt", 0.1)])
            .await;

        let summary = analytics.emotion_summary().await.unwrap();
        assert_eq!(summary.total_detections, 9);
        assert_eq!(summary.emotions.len(), 5);
        assert_eq!(summary.emotions[0].label, "Joy");
        assert_eq!(summary.emotions[0].count, 3);
        assert_eq!(summary.emotions[1].label, "Anger");
        assert!(summary.summary.starts_with("Top emotions detected: Joy"));
    }

    #[tokio::test]
    async fn emotion_summary_without_data_errors() {
        let analytics = Analytics::new();
        assert_eq!(
            analytics.emotion_summary().await,
            Err(SummaryError::NoData)
        );
    }

    #[tokio::test]
    async fn concurrent_updates_lose_nothing() {
        let analytics = Analytics::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let a = analytics.clone();
            handles.push(tokio::spawn(async move {
                a.increment_request("user").await;
                a.record_success(&[score("Calmness", 0.5)]).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let stats = analytics.snapshot().await;
        assert_eq!(stats.total_requests, 32);
        assert_eq!(stats.successful_analyses, 32);
        assert_eq!(stats.emotion_counts.get("Calmness"), Some(&32));
    }

    #[test]
    fn status_bands_include_boundaries_in_neutral() {
        assert_eq!(rizz_status(80.0), Sentiment::Neutral);
        assert_eq!(rizz_status(40.0), Sentiment::Neutral);
        assert_eq!(rizz_status(80.1), Sentiment::Positive);
        assert_eq!(rizz_status(39.9), Sentiment::Negative);
        assert_eq!(rizz_status(100.0), Sentiment::Positive);
        assert_eq!(rizz_status(0.0), Sentiment::Negative);
    }
}

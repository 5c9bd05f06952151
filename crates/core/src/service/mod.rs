use crate::analytics::{rizz_status, Analytics};
use crate::analyze::{Analysis, ChunkAnalyzer};
use crate::audio::AudioClip;
use crate::config::{AlertPolicy, BucketDuration};
use crate::model::{EmotionScore, ExpressionModel};
use crate::notify::{rizz_message, Notifier};
use crate::segment::plan_windows;
use crate::store::SegmentStore;
use crate::timeline::{aggregate, build_bucket, Aggregation, BucketSource, TimelineBucket};
use crate::triggers::{evaluate, TriggerReport};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

/// Per-request overrides for the audio flow. Anything left unset falls back
/// to the configured alert policy.
#[derive(Clone, Debug, Default)]
pub struct AudioOptions {
    pub notify_override: Option<bool>,
    pub filters_override: Option<HashMap<String, f64>>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AudioReport {
    pub user_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub notification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<TriggerReport>,
    pub rizz_score: f64,
    pub rizz_status: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TextReport {
    pub user_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TimelineReport {
    pub user_id: String,
    pub total_duration: f64,
    pub bucket_duration: u64,
    pub total_buckets: usize,
    pub timeline: Vec<TimelineBucket>,
    pub aggregation: Aggregation,
}

/// Ties one request's path together: analyze, feed the shared analytics,
/// evaluate triggers, and hand alerts to the notifier. This is the only
/// component that mutates [`Analytics`].
pub struct EmotionService<M, S, N> {
    analyzer: ChunkAnalyzer<M, S>,
    notifier: N,
    analytics: Analytics,
    alert: AlertPolicy,
}

impl<M, S, N> EmotionService<M, S, N>
where
    M: ExpressionModel,
    S: SegmentStore,
    N: Notifier,
{
    pub fn new(
        analyzer: ChunkAnalyzer<M, S>,
        notifier: N,
        analytics: Analytics,
        alert: AlertPolicy,
    ) -> Self {
        Self {
            analyzer,
            notifier,
            analytics,
            alert,
        }
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    fn file_stem(user_id: &str) -> String {
        format!("{user_id}_{}", Utc::now().format("%Y%m%d_%H%M%S_%6f"))
    }

    pub async fn handle_audio(
        &self,
        user_id: &str,
        clip: &AudioClip,
        opts: AudioOptions,
    ) -> AudioReport {
        self.analytics.increment_request(user_id).await;
        let stem = Self::file_stem(user_id);

        match self.analyzer.analyze_clip(clip, &stem).await {
            Ok(analysis) => {
                if let Some(first) = analysis
                    .predictions
                    .iter()
                    .find(|p| !p.top_3_emotions.is_empty())
                {
                    self.analytics.record_success(&first.top_3_emotions).await;
                }

                let mut notification_sent = false;
                let mut triggers = None;
                let should_notify = opts
                    .notify_override
                    .unwrap_or(self.alert.notification_enabled);
                if should_notify {
                    let filters = opts
                        .filters_override
                        .as_ref()
                        .unwrap_or(&self.alert.emotion_thresholds);
                    let report = evaluate(&analysis.predictions, Some(filters));
                    if report.triggered {
                        let score = self.analytics.rizz_score().await;
                        let names: Vec<String> = report
                            .emotions
                            .iter()
                            .take(3)
                            .map(|e| e.label.clone())
                            .collect();
                        let message = rizz_message(score, &names);
                        match self.notifier.send(user_id.to_owned(), message.clone()).await {
                            Ok(()) => {
                                self.analytics.add_notification(user_id, &message).await;
                                notification_sent = true;
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "notification delivery failed");
                            }
                        }
                    }
                    triggers = Some(report);
                }

                let score = self.analytics.rizz_score().await;
                AudioReport {
                    user_id: user_id.to_owned(),
                    success: true,
                    analysis: Some(analysis),
                    error: None,
                    notification_sent,
                    triggers,
                    rizz_score: score,
                    rizz_status: rizz_status(score).name().to_owned(),
                }
            }
            Err(e) => {
                self.analytics.record_failure().await;
                tracing::warn!(error = %e, "audio analysis failed");
                let score = self.analytics.rizz_score().await;
                AudioReport {
                    user_id: user_id.to_owned(),
                    success: false,
                    analysis: None,
                    error: Some(e.to_string()),
                    notification_sent: false,
                    triggers: None,
                    rizz_score: score,
                    rizz_status: rizz_status(score).name().to_owned(),
                }
            }
        }
    }

    pub async fn handle_text(&self, user_id: &str, text: String) -> TextReport {
        self.analytics.increment_request(user_id).await;

        match self.analyzer.analyze_text(text).await {
            Ok(analysis) if analysis.total_predictions > 0 => {
                if let Some(first) = analysis
                    .predictions
                    .iter()
                    .find(|p| !p.top_3_emotions.is_empty())
                {
                    self.analytics.record_success(&first.top_3_emotions).await;
                }
                TextReport {
                    user_id: user_id.to_owned(),
                    success: true,
                    analysis: Some(analysis),
                    error: None,
                }
            }
            Ok(_) => {
                self.analytics.record_failure().await;
                TextReport {
                    user_id: user_id.to_owned(),
                    success: false,
                    analysis: None,
                    error: Some("no emotions detected in text".to_owned()),
                }
            }
            Err(e) => {
                self.analytics.record_failure().await;
                tracing::warn!(error = %e, "text analysis failed");
                TextReport {
                    user_id: user_id.to_owned(),
                    success: false,
                    analysis: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Slice the clip at the caller's bucket width and score each slice.
    /// A slice longer than the model limit is sub-chunked by the analyzer;
    /// the bucket keeps the first prediction either way. Failed buckets stay
    /// in the timeline carrying their reason.
    pub async fn handle_timeline(
        &self,
        user_id: &str,
        clip: &AudioClip,
        bucket_duration: BucketDuration,
    ) -> TimelineReport {
        self.analytics.increment_request(user_id).await;
        let stem = Self::file_stem(user_id);

        let total_duration_ms = clip.duration_ms();
        let total_duration = total_duration_ms as f64 / 1_000.0;
        let windows = plan_windows(total_duration_ms, bucket_duration.as_millis());

        let mut timeline = Vec::with_capacity(windows.len());
        for window in &windows {
            let slice = clip.slice_ms(window.start_ms, window.end_ms);
            let name = format!("{stem}_bucket{}", window.index);
            let source = match self.analyzer.analyze_clip(&slice, &name).await {
                Ok(analysis) => match analysis.predictions.into_iter().next() {
                    Some(prediction) => BucketSource::Scored(prediction),
                    None => BucketSource::Missing("no emotions detected".to_owned()),
                },
                Err(e) => {
                    tracing::warn!(bucket = window.index, error = %e, "bucket analysis failed");
                    BucketSource::Missing(e.to_string())
                }
            };
            timeline.push(build_bucket(
                window.start_seconds(),
                window.end_seconds(),
                source,
            ));
        }

        let aggregation = aggregate(&timeline, total_duration);

        let top: Vec<EmotionScore> = aggregation
            .top_emotions
            .iter()
            .take(3)
            .map(|e| EmotionScore {
                label: e.label.clone(),
                probability: e.average_probability,
            })
            .collect();
        if !top.is_empty() {
            self.analytics.record_success(&top).await;
        }

        TimelineReport {
            user_id: user_id.to_owned(),
            total_duration,
            bucket_duration: bucket_duration.seconds(),
            total_buckets: timeline.len(),
            timeline,
            aggregation,
        }
    }
}

use crate::analytics::Analytics;
use crate::notify::Notifier;
use crate::store::{FsSegmentStore, StoreError};
use std::time::Duration;

/// One pass of the audio-file sweep.
pub async fn cleanup_tick(store: &FsSegmentStore, max_age: Duration) -> Result<usize, StoreError> {
    let deleted = store.cleanup_old_files(max_age).await?;
    if deleted > 0 {
        tracing::info!(deleted, "removed expired audio segments");
    }
    Ok(deleted)
}

/// Process-lifetime sweep loop. A failed pass is logged and the loop keeps
/// going; it must never terminate on its own.
pub async fn run_cleanup_loop(store: FsSegmentStore, interval: Duration, max_age: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        if let Err(e) = cleanup_tick(&store, max_age).await {
            tracing::warn!(error = %e, "audio cleanup iteration failed");
        }
    }
}

/// Outcome of one summary pass, kept observable for tests and logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryTick {
    Recorded,
    NoActiveUser,
    NoEmotionData,
    Failed(String),
}

/// One pass of the periodic emotion summary: take the last active user's
/// accumulated emotion counts and push them to the notifier as a memory.
pub async fn summary_tick<N: Notifier>(analytics: &Analytics, notifier: &N) -> SummaryTick {
    let snapshot = analytics.snapshot().await;
    let Some(user_id) = snapshot.last_user_id else {
        return SummaryTick::NoActiveUser;
    };

    let summary = match analytics.emotion_summary().await {
        Ok(summary) => summary,
        Err(_) => return SummaryTick::NoEmotionData,
    };

    match notifier
        .create_summary_record(user_id, summary.summary, summary.emotions)
        .await
    {
        Ok(()) => SummaryTick::Recorded,
        Err(e) => SummaryTick::Failed(e.to_string()),
    }
}

/// Process-lifetime summary loop; like the sweep, it logs and continues on
/// every outcome.
pub async fn run_summary_loop<N: Notifier>(analytics: Analytics, notifier: N, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        match summary_tick(&analytics, &notifier).await {
            SummaryTick::Recorded => tracing::info!("periodic emotion summary recorded"),
            SummaryTick::NoActiveUser => tracing::debug!("no active user for emotion summary"),
            SummaryTick::NoEmotionData => tracing::debug!("no emotion data for summary"),
            SummaryTick::Failed(error) => {
                tracing::warn!(%error, "emotion summary delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::SummaryEmotion;
    use crate::model::EmotionScore;
    use crate::notify::NotifyError;
    use crate::store::SegmentStore;
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;

    #[derive(Clone, Default)]
    struct MemoryNotifier {
        fail: bool,
        recorded: Arc<Mutex<Vec<(String, String, usize)>>>,
    }

    impl Notifier for MemoryNotifier {
        fn send(
            &self,
            _user_id: String,
            _message: String,
        ) -> BoxFuture<'_, Result<(), NotifyError>> {
            async { Ok(()) }.boxed()
        }

        fn create_summary_record(
            &self,
            user_id: String,
            text: String,
            emotions: Vec<SummaryEmotion>,
        ) -> BoxFuture<'_, Result<(), NotifyError>> {
            let fail = self.fail;
            if !fail {
                self.recorded
                    .lock()
                    .unwrap()
                    .push((user_id, text, emotions.len()));
            }
            async move {
                if fail {
                    Err(NotifyError::Api {
                        status: 500,
                        body: "backend down".to_owned(),
                    })
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }

    fn joy(probability: f64) -> EmotionScore {
        EmotionScore {
            label: "Joy".to_owned(),
            probability,
        }
    }

    #[tokio::test]
    async fn summary_tick_skips_without_a_user() {
        let analytics = Analytics::new();
        let notifier = MemoryNotifier::default();
        assert_eq!(
            summary_tick(&analytics, &notifier).await,
            SummaryTick::NoActiveUser
        );
    }

    #[tokio::test]
    async fn summary_tick_skips_without_emotion_data() {
        let analytics = Analytics::new();
        analytics.increment_request("user").await;
        let notifier = MemoryNotifier::default();
        assert_eq!(
            summary_tick(&analytics, &notifier).await,
            SummaryTick::NoEmotionData
        );
    }

    #[tokio::test]
    async fn summary_tick_records_for_the_last_user() {
        let analytics = Analytics::new();
        analytics.increment_request("user-a").await;
        analytics.record_success(&[joy(0.9)]).await;
        analytics.increment_request("user-b").await;

        let notifier = MemoryNotifier::default();
        assert_eq!(
            summary_tick(&analytics, &notifier).await,
            SummaryTick::Recorded
        );

        let recorded = notifier.recorded.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "user-b");
        assert!(recorded[0].1.starts_with("Top emotions detected:"));
        assert_eq!(recorded[0].2, 1);
    }

    #[tokio::test]
    async fn summary_tick_reports_delivery_failure() {
        let analytics = Analytics::new();
        analytics.increment_request("user").await;
        analytics.record_success(&[joy(0.9)]).await;

        let notifier = MemoryNotifier {
            fail: true,
            recorded: Arc::default(),
        };
        match summary_tick(&analytics, &notifier).await {
            SummaryTick::Failed(error) => assert!(error.contains("500")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cleanup_tick_reports_deleted_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSegmentStore::new(dir.path());
        store
            .write("old.wav".to_owned(), Bytes::from_static(b"x"))
            .await
            .unwrap();
        let path = dir.path().join("old.wav");
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(600))
            .unwrap();
        drop(file);

        let deleted = cleanup_tick(&store, Duration::from_secs(300)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(!path.exists());
    }
}

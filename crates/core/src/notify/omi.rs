use crate::analytics::SummaryEmotion;
use crate::notify::{Notifier, NotifyError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Omi integrations client. Credentials are optional so a deployment
/// without them still analyzes; sends then fail fast with `Unconfigured`.
#[derive(Clone)]
pub struct OmiNotifier {
    client: Client,
    app_id: Option<String>,
    api_key: Option<String>,
    base_url: String,
}

impl OmiNotifier {
    pub fn new(app_id: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            app_id,
            api_key,
            base_url: "https://api.omi.me".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.api_key.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str), NotifyError> {
        match (&self.app_id, &self.api_key) {
            (Some(app_id), Some(api_key)) => Ok((app_id, api_key)),
            _ => Err(NotifyError::Unconfigured),
        }
    }

    async fn check(response: reqwest::Response) -> Result<(), NotifyError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_owned());
        Err(NotifyError::Api { status, body })
    }
}

#[derive(Serialize)]
struct MemoryRequest {
    memories: Vec<MemoryEntry>,
    text: String,
    text_source: String,
    text_source_spec: String,
}

#[derive(Serialize)]
struct MemoryEntry {
    content: String,
    tags: Vec<String>,
}

impl Notifier for OmiNotifier {
    fn send(&self, user_id: String, message: String) -> BoxFuture<'_, Result<(), NotifyError>> {
        let this = self.clone();
        async move {
            let (app_id, api_key) = this.credentials()?;

            // The notification endpoint takes its payload in the query
            // string with an empty body.
            let url = format!(
                "{}/v2/integrations/{}/notification?uid={}&message={}",
                this.base_url,
                app_id,
                urlencoding::encode(&user_id),
                urlencoding::encode(&message),
            );
            let response = this
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .header("Content-Type", "application/json")
                .header("Content-Length", "0")
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;

            Self::check(response).await?;
            tracing::info!(%user_id, "notification delivered");
            Ok(())
        }
        .boxed()
    }

    fn create_summary_record(
        &self,
        user_id: String,
        text: String,
        emotions: Vec<SummaryEmotion>,
    ) -> BoxFuture<'_, Result<(), NotifyError>> {
        let this = self.clone();
        async move {
            let (app_id, api_key) = this.credentials()?;

            let display: Vec<String> = emotions
                .iter()
                .take(3)
                .map(|e| format!("{} ({:.2})", e.label, e.probability))
                .collect();
            let lead_tag = emotions
                .first()
                .map(|e| e.label.to_lowercase())
                .unwrap_or_else(|| "emotion".to_owned());

            let request = MemoryRequest {
                memories: vec![MemoryEntry {
                    content: format!("Emotion detected: {}", display.join(", ")),
                    tags: vec!["emotion".to_owned(), "audio_analysis".to_owned(), lead_tag],
                }],
                text,
                text_source: "other".to_owned(),
                text_source_spec: "emotion_ai_analysis".to_owned(),
            };

            let url = format!(
                "{}/v2/integrations/{}/user/memories?uid={}",
                this.base_url,
                app_id,
                urlencoding::encode(&user_id),
            );
            let response = this
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&request)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;

            Self::check(response).await?;
            tracing::info!(%user_id, "summary record created");
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_send_fails_fast() {
        let notifier = OmiNotifier::new(None, None);
        assert!(!notifier.is_configured());
        let err = notifier
            .send("user".to_owned(), "hello".to_owned())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Unconfigured));
    }

    #[tokio::test]
    async fn partially_configured_is_still_unconfigured() {
        let notifier = OmiNotifier::new(Some("app".to_owned()), None);
        assert!(!notifier.is_configured());
        let err = notifier
            .create_summary_record("user".to_owned(), "text".to_owned(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Unconfigured));
    }

    #[test]
    fn configured_with_both_credentials() {
        let notifier = OmiNotifier::new(Some("app".to_owned()), Some("key".to_owned()));
        assert!(notifier.is_configured());
    }
}

use crate::model::{EmotionScore, ExpressionModel, ModelError, ModelOutput, Prediction, TimeRange};
use crate::store::SegmentRef;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Hume AI expression-measurement client.
///
/// Speech prosody scores stored audio segments, the language model scores
/// text. Each call is a single shot; retry policy belongs to the caller.
#[derive(Clone)]
pub struct HumeExpressionModel {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HumeExpressionModel {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.hume.ai".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Serialize)]
struct LanguageRequest {
    text: String,
}

#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    prosody: Option<ModelPredictions>,
    #[serde(default)]
    language: Option<ModelPredictions>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ModelPredictions {
    #[serde(default)]
    predictions: Vec<RawPrediction>,
    #[serde(default)]
    warning: Option<String>,
}

#[derive(Deserialize)]
struct RawPrediction {
    #[serde(default)]
    time: Option<RawSpan>,
    #[serde(default)]
    position: Option<RawSpan>,
    #[serde(default)]
    text: Option<String>,
    emotions: Vec<RawEmotion>,
}

#[derive(Clone, Copy, Deserialize)]
struct RawSpan {
    #[serde(default)]
    begin: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

#[derive(Deserialize)]
struct RawEmotion {
    name: String,
    score: f64,
}

fn convert(predictions: ModelPredictions) -> ModelOutput {
    let warning = predictions.warning;
    let predictions = predictions
        .predictions
        .into_iter()
        .map(|raw| {
            let span = raw.time.or(raw.position);
            let time = TimeRange {
                begin: span.and_then(|s| s.begin),
                end: span.and_then(|s| s.end),
            };
            let emotions = raw
                .emotions
                .into_iter()
                .map(|e| EmotionScore {
                    label: e.name,
                    probability: e.score,
                })
                .collect();
            let mut prediction = Prediction::from_scores(time, emotions);
            prediction.text = raw.text;
            prediction
        })
        .collect();
    ModelOutput {
        predictions,
        warning,
    }
}

impl HumeExpressionModel {
    async fn check(response: reqwest::Response) -> Result<StreamResponse, ModelError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_owned());
            return Err(ModelError::Api { status, body });
        }
        let parsed: StreamResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("failed to parse JSON: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(ModelError::Rejected(error));
        }
        Ok(parsed)
    }
}

impl ExpressionModel for HumeExpressionModel {
    fn score_segment(&self, segment: SegmentRef) -> BoxFuture<'_, Result<ModelOutput, ModelError>> {
        let this = self.clone();
        async move {
            let wav = tokio::fs::read(segment.path()).await?;

            let url = format!("{}/v0/stream/models/prosody", this.base_url);
            let response = this
                .client
                .post(&url)
                .header("X-Hume-Api-Key", &this.api_key)
                .header("Content-Type", "audio/wav")
                .body(wav)
                .send()
                .await?;

            let parsed = Self::check(response).await?;
            let prosody = parsed.prosody.ok_or_else(|| {
                ModelError::InvalidResponse("no prosody predictions in response".to_owned())
            })?;
            Ok(convert(prosody))
        }
        .boxed()
    }

    fn score_text(&self, text: String) -> BoxFuture<'_, Result<ModelOutput, ModelError>> {
        let this = self.clone();
        async move {
            let url = format!("{}/v0/stream/models/language", this.base_url);
            let response = this
                .client
                .post(&url)
                .header("X-Hume-Api-Key", &this.api_key)
                .json(&LanguageRequest { text })
                .send()
                .await?;

            let parsed = Self::check(response).await?;
            let language = parsed.language.ok_or_else(|| {
                ModelError::InvalidResponse("no language predictions in response".to_owned())
            })?;
            Ok(convert(language))
        }
        .boxed()
    }
}

use crate::audio::{AudioClip, AudioError};
use crate::config::ChunkLimits;
use crate::model::{ExpressionModel, ModelError, Prediction};
use crate::segment::plan_windows;
use crate::store::{SegmentStore, StoreError};
use serde::Serialize;

/// Merged result of scoring one audio or text unit.
///
/// Predictions are ordered by ascending window index and, within a window,
/// by model order. Each prediction's time range sits on the original
/// unchunked timeline.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Analysis {
    pub predictions: Vec<Prediction>,
    pub total_predictions: usize,
    pub total_duration_seconds: f64,
    pub chunked: bool,
    pub num_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("no speech detected in audio{}", .warning.as_ref().map(|w| format!(" ({w})")).unwrap_or_default())]
    NoSpeech { warning: Option<String> },

    #[error("all {num_chunks} chunks failed to analyze")]
    AllChunksFailed {
        num_chunks: usize,
        total_duration_seconds: f64,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Drives the expression model over a clip of any length.
///
/// Clips within the model's hard duration limit go out as a single call;
/// longer clips are planned into safety-margined windows, scored window by
/// window in order, and merged back onto the global timeline.
pub struct ChunkAnalyzer<M, S> {
    model: M,
    store: S,
    limits: ChunkLimits,
}

impl<M: ExpressionModel, S: SegmentStore> ChunkAnalyzer<M, S> {
    pub fn new(model: M, store: S, limits: ChunkLimits) -> Self {
        Self {
            model,
            store,
            limits,
        }
    }

    pub async fn analyze_clip(
        &self,
        clip: &AudioClip,
        name_stem: &str,
    ) -> Result<Analysis, AnalyzeError> {
        let duration_ms = clip.duration_ms();
        let total_duration_seconds = duration_ms as f64 / 1_000.0;

        if duration_ms <= self.limits.hard_limit_ms() {
            tracing::debug!(duration_ms, "clip fits a single model call");
            let (predictions, warning) =
                self.score_clip(clip, &format!("{name_stem}.wav")).await?;
            return Ok(Analysis {
                total_predictions: predictions.len(),
                predictions,
                total_duration_seconds,
                chunked: false,
                num_chunks: 1,
                warning,
            });
        }

        let windows = plan_windows(duration_ms, self.limits.max_window_ms());
        let num_chunks = windows.len();
        tracing::info!(duration_ms, num_chunks, "clip exceeds model limit, chunking");

        let mut merged: Vec<Prediction> = Vec::new();
        for window in &windows {
            let chunk = clip.slice_ms(window.start_ms, window.end_ms);
            let name = format!("{name_stem}.chunk{}.wav", window.index);
            match self.score_clip(&chunk, &name).await {
                Ok((predictions, _warning)) => {
                    let offset_s = window.start_seconds();
                    merged.extend(predictions.into_iter().map(|mut p| {
                        p.time = p.time.shifted(offset_s);
                        p.chunk_index = Some(window.index);
                        p
                    }));
                }
                Err(e) => {
                    tracing::warn!(chunk = window.index, error = %e, "chunk analysis failed, skipping");
                }
            }
        }

        if merged.is_empty() {
            return Err(AnalyzeError::AllChunksFailed {
                num_chunks,
                total_duration_seconds,
            });
        }
        Ok(Analysis {
            total_predictions: merged.len(),
            predictions: merged,
            total_duration_seconds,
            chunked: true,
            num_chunks,
            warning: None,
        })
    }

    pub async fn analyze_text(&self, text: String) -> Result<Analysis, AnalyzeError> {
        let output = self.model.score_text(text).await?;
        Ok(Analysis {
            total_predictions: output.predictions.len(),
            predictions: output.predictions,
            total_duration_seconds: 0.0,
            chunked: false,
            num_chunks: 1,
            warning: output.warning,
        })
    }

    /// Write one segment, score it, and delete it again. The delete runs
    /// before the scoring outcome is inspected, so transient files never
    /// outlive the call regardless of how scoring went.
    async fn score_clip(
        &self,
        clip: &AudioClip,
        name: &str,
    ) -> Result<(Vec<Prediction>, Option<String>), AnalyzeError> {
        let wav = clip.to_wav_bytes()?;
        let segment = self.store.write(name.to_owned(), wav).await?;
        let scored = self.model.score_segment(segment.clone()).await;
        if let Err(e) = self.store.delete(segment).await {
            tracing::warn!(error = %e, "could not delete transient segment");
        }

        let output = scored?;
        if output.predictions.is_empty() {
            return Err(AnalyzeError::NoSpeech {
                warning: output.warning,
            });
        }
        Ok((output.predictions, output.warning))
    }
}

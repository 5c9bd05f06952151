#![deny(warnings)]

use anyhow::Context;
use clap::{ArgGroup, Parser};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vibecheck_core::analytics::Analytics;
use vibecheck_core::analyze::ChunkAnalyzer;
use vibecheck_core::audio::AudioClip;
use vibecheck_core::config::{
    resolve_api_key, resolve_optional_string, AlertPolicy, AppConfig, BucketDuration, ChunkLimits,
    ConfigError, OmiConfig, StdEnv, DEFAULT_AUDIO_DIR, DEFAULT_BUCKET_SECONDS,
    DEFAULT_CLEANUP_AGE_SECS, DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_SUMMARY_INTERVAL_SECS,
    ENV_HUME_API_KEY, ENV_OMI_API_KEY, ENV_OMI_APP_ID,
};
use vibecheck_core::model::HumeExpressionModel;
use vibecheck_core::notify::OmiNotifier;
use vibecheck_core::service::{AudioOptions, EmotionService};
use vibecheck_core::store::FsSegmentStore;
use vibecheck_core::tasks::cleanup_tick;

#[derive(Parser, Debug)]
#[command(name = "vibecheck")]
#[command(about = "Emotion analytics for short audio and text utterances")]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(false)
        .args(["audio", "text"])
))]
struct Args {
    /// WAV file to analyze (16-bit PCM)
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Text to analyze instead of audio
    #[arg(long)]
    text: Option<String>,

    #[arg(long, default_value = "local")]
    user_id: String,

    /// Produce a bucketed sentiment timeline instead of a single report
    #[arg(long, default_value_t = false)]
    timeline: bool,

    /// Timeline bucket width in seconds (5 to 10)
    #[arg(long, default_value_t = DEFAULT_BUCKET_SECONDS)]
    bucket_seconds: u64,

    #[arg(long, env = ENV_HUME_API_KEY)]
    hume_api_key: Option<String>,

    #[arg(long, env = ENV_OMI_APP_ID)]
    omi_app_id: Option<String>,

    #[arg(long, env = ENV_OMI_API_KEY)]
    omi_api_key: Option<String>,

    /// Force notifications on even when the alert policy disables them
    #[arg(long, default_value_t = false)]
    notify: bool,

    /// JSON map of emotion name to threshold, e.g. {"Anger":0.7}
    #[arg(long)]
    emotion_filters: Option<String>,

    #[arg(long, default_value = DEFAULT_AUDIO_DIR)]
    audio_dir: PathBuf,

    #[arg(long, default_value = "emotion_config.json")]
    alert_config: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        max_window_ms = cfg.chunk.max_window_ms(),
        notifier_configured = cfg.omi.is_configured(),
        "config loaded"
    );

    run(args, cfg).await
}

async fn run(args: Args, cfg: AppConfig) -> anyhow::Result<()> {
    let model = HumeExpressionModel::new(cfg.hume_api_key.expose().to_owned());
    let store = FsSegmentStore::new(cfg.audio_dir.clone());
    let notifier = OmiNotifier::new(
        cfg.omi.app_id.clone(),
        cfg.omi.api_key.as_ref().map(|k| k.expose().to_owned()),
    );
    let analytics = Analytics::new();
    let analyzer = ChunkAnalyzer::new(model, store.clone(), cfg.chunk);
    let service = EmotionService::new(analyzer, notifier, analytics.clone(), cfg.alert.clone());

    let filters_override = args
        .emotion_filters
        .as_deref()
        .map(parse_filters)
        .transpose()?;

    if let Some(text) = args.text {
        let report = service.handle_text(&args.user_id, text).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(path) = args.audio {
        let clip = read_wav(&path)?;
        tracing::info!(
            path = %path.display(),
            duration_ms = clip.duration_ms(),
            sample_rate_hz = clip.sample_rate_hz,
            "clip loaded"
        );

        if args.timeline {
            let bucket = BucketDuration::new(args.bucket_seconds)?;
            let report = service.handle_timeline(&args.user_id, &clip, bucket).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            let opts = AudioOptions {
                notify_override: args.notify.then_some(true),
                filters_override,
            };
            let report = service.handle_audio(&args.user_id, &clip, opts).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        // One-shot runs sweep on the way out instead of looping forever.
        if let Err(e) = cleanup_tick(&store, cfg.cleanup_age).await {
            tracing::warn!(error = %e, "final segment sweep failed");
        }
    }

    let stats = analytics.snapshot().await;
    tracing::info!(
        total_requests = stats.total_requests,
        successful = stats.successful_analyses,
        failed = stats.failed_analyses,
        rizz_score = stats.rizz_score,
        "session stats"
    );

    Ok(())
}

fn parse_filters(raw: &str) -> anyhow::Result<HashMap<String, f64>> {
    serde_json::from_str(raw).context("invalid --emotion-filters JSON")
}

fn read_wav(path: &Path) -> anyhow::Result<AudioClip> {
    let raw =
        std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    AudioClip::from_wav_bytes(&raw).context("could not decode WAV input")
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(
    args: &Args,
    env: &impl vibecheck_core::config::Env,
) -> anyhow::Result<AppConfig> {
    let hume_api_key = resolve_api_key(args.hume_api_key.clone(), ENV_HUME_API_KEY, env)?
        .ok_or(ConfigError::MissingModelKey)?;

    let omi = OmiConfig {
        app_id: resolve_optional_string(args.omi_app_id.clone(), ENV_OMI_APP_ID, env),
        api_key: resolve_api_key(args.omi_api_key.clone(), ENV_OMI_API_KEY, env)?,
    };

    let alert = AlertPolicy::load(&args.alert_config, env);

    Ok(AppConfig {
        hume_api_key,
        omi,
        chunk: ChunkLimits::default(),
        audio_dir: args.audio_dir.clone(),
        alert,
        cleanup_age: Duration::from_secs(DEFAULT_CLEANUP_AGE_SECS),
        cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        summary_interval: Duration::from_secs(DEFAULT_SUMMARY_INTERVAL_SECS),
    })
}

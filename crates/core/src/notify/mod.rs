mod omi;

use crate::analytics::SummaryEmotion;
use futures::future::BoxFuture;
use rand::seq::IndexedRandom;

pub use omi::OmiNotifier;

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("notifier credentials not configured")]
    Unconfigured,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notifier api error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Outbound user-messaging boundary. Best effort with a bounded wait; a
/// failed delivery is an outcome to report, never something to retry or to
/// fail the analysis over.
pub trait Notifier: Send + Sync {
    fn send(&self, user_id: String, message: String) -> BoxFuture<'_, Result<(), NotifyError>>;

    fn create_summary_record(
        &self,
        user_id: String,
        text: String,
        emotions: Vec<SummaryEmotion>,
    ) -> BoxFuture<'_, Result<(), NotifyError>>;
}

const LOW_RIZZ_MESSAGES: &[&str] = &[
    "Level up!",
    "Time to bounce back!",
    "Keep your head up!",
    "You got this!",
    "Comeback mode!",
];

const MID_RIZZ_MESSAGES: &[&str] = &[
    "Stay balanced!",
    "Keep going!",
    "Stay steady!",
    "Keep vibing!",
    "Stay cool!",
];

const HIGH_RIZZ_MESSAGES: &[&str] = &[
    "Killing it!",
    "You're on fire!",
    "Peak vibes!",
    "Keep it up!",
    "Boss mode!",
];

/// Format the alert message: current score, a band-matched encouragement,
/// and the emotions that tripped the trigger.
pub fn rizz_message(score: f64, emotions: &[String]) -> String {
    let pool = if score < 40.0 {
        LOW_RIZZ_MESSAGES
    } else if score <= 80.0 {
        MID_RIZZ_MESSAGES
    } else {
        HIGH_RIZZ_MESSAGES
    };
    let pick = pool
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("Keep going!");
    format!("Rizz: {score:.0}% | {pick} | {}", emotions.join(", "))
}

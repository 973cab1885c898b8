//! Presentation seam
//!
//! The engine never talks to a window or terminal directly. Everything it wants
//! to show or ask goes through an [`InstallerUi`]; the presentation layer picks
//! an implementation (or writes its own).

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::catalog::PackDefinition;
use crate::downloader::{DownloadProgress, ProgressCallback};

/// Collaborator that shows status and answers questions for the engine
///
/// Methods may be called from worker tasks; implementations marshal to their
/// own thread as needed.
#[async_trait]
pub trait InstallerUi: Send + Sync {
    /// One line describing the current step
    fn report_status(&self, _text: &str) {}

    /// Bytes done of `total`, with an ETA in seconds once a rate is known
    fn report_progress(&self, _current: u64, _total: u64, _eta_secs: Option<f64>) {}

    /// Yes/no question; `false` means the step is skipped
    async fn confirm(&self, prompt: &str) -> bool;

    /// Offer a replacement icon when the pack's icon could not be fetched
    async fn select_icon_fallback(&self, _pack: &PackDefinition) -> Option<String> {
        None
    }
}

/// Extension trait to turn a UI into a download progress callback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl IntoProgressCallback for Arc<dyn InstallerUi> {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |progress: DownloadProgress| {
            self.report_progress(progress.downloaded, progress.total, progress.eta_secs);
        })
    }
}

/// Silent UI for headless use
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUi {
    decline: bool,
}

impl NullUi {
    /// Answers every question with yes
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every question with no
    pub fn declining() -> Self {
        Self { decline: true }
    }
}

#[async_trait]
impl InstallerUi for NullUi {
    async fn confirm(&self, prompt: &str) -> bool {
        debug!("Auto-answering '{}' with {}", prompt, !self.decline);
        !self.decline
    }
}

/// Terminal UI: status goes to the log, questions to stdin
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleUi {
    assume_yes: bool,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never prompt; accept every question
    pub fn assume_yes() -> Self {
        Self { assume_yes: true }
    }
}

#[async_trait]
impl InstallerUi for ConsoleUi {
    fn report_status(&self, text: &str) {
        info!("{}", text);
    }

    fn report_progress(&self, current: u64, total: u64, eta_secs: Option<f64>) {
        let percent = if total > 0 { current as f64 / total as f64 * 100.0 } else { 0.0 };
        match eta_secs {
            Some(eta) => debug!(
                "{:.1}% ({} / {} bytes, ~{:.0}s left)",
                percent, current, total, eta
            ),
            None => debug!("{:.1}% ({} / {} bytes)", percent, current, total),
        }
    }

    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            info!("{} [y/N] y", prompt);
            return true;
        }

        print!("{} [y/N] ", prompt);
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Everything a [`ChannelUi`] forwards to the presentation side
#[derive(Debug)]
pub enum UiEvent {
    Status(String),
    Progress {
        current: u64,
        total: u64,
        eta_secs: Option<f64>,
    },
    Confirm {
        prompt: String,
        reply: oneshot::Sender<bool>,
    },
    IconFallback {
        pack_name: String,
        reply: oneshot::Sender<Option<String>>,
    },
}

/// Forwards UI calls from a worker task over a channel
///
/// Questions carry a `oneshot` reply. A dropped reply (or a closed receiver)
/// counts as "no" for confirmations and "none" for icon fallbacks.
#[derive(Debug, Clone)]
pub struct ChannelUi {
    events: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelUi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }
}

#[async_trait]
impl InstallerUi for ChannelUi {
    fn report_status(&self, text: &str) {
        let _ = self.events.send(UiEvent::Status(text.to_string()));
    }

    fn report_progress(&self, current: u64, total: u64, eta_secs: Option<f64>) {
        let _ = self.events.send(UiEvent::Progress {
            current,
            total,
            eta_secs,
        });
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let event = UiEvent::Confirm {
            prompt: prompt.to_string(),
            reply,
        };
        if self.events.send(event).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }

    async fn select_icon_fallback(&self, pack: &PackDefinition) -> Option<String> {
        let (reply, answer) = oneshot::channel();
        let event = UiEvent::IconFallback {
            pack_name: pack.profile_name.clone(),
            reply,
        };
        self.events.send(event).ok()?;
        answer.await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_ui_round_trips_confirmation() {
        let (ui, mut events) = ChannelUi::new();

        let asker = tokio::spawn(async move {
            ui.report_status("Checking loader for Alpha...");
            ui.confirm("Update 'Alpha'?").await
        });

        match events.recv().await.unwrap() {
            UiEvent::Status(text) => assert_eq!(text, "Checking loader for Alpha..."),
            other => panic!("Expected status, got {:?}", other),
        }
        match events.recv().await.unwrap() {
            UiEvent::Confirm { prompt, reply } => {
                assert_eq!(prompt, "Update 'Alpha'?");
                reply.send(true).unwrap();
            }
            other => panic!("Expected confirm, got {:?}", other),
        }
        assert!(asker.await.unwrap());
    }

    #[tokio::test]
    async fn test_channel_ui_dropped_reply_declines() {
        let (ui, mut events) = ChannelUi::new();
        let asker = tokio::spawn(async move { ui.confirm("Update?").await });

        // Presentation side goes away without answering
        drop(events.recv().await.unwrap());
        assert!(!asker.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_channel_declines() {
        let (ui, events) = ChannelUi::new();
        drop(events);
        assert!(!ui.confirm("Update?").await);
    }

    #[tokio::test]
    async fn test_null_ui_answers() {
        assert!(NullUi::new().confirm("Update?").await);
        assert!(!NullUi::declining().confirm("Update?").await);
    }

    #[test]
    fn test_progress_callback_forwards_to_ui() {
        let (ui, mut events) = ChannelUi::new();
        let ui: Arc<dyn InstallerUi> = Arc::new(ui);
        let callback = ui.into_callback();

        callback(DownloadProgress {
            downloaded: 10,
            total: 40,
            eta_secs: Some(1.5),
        });

        match events.try_recv().unwrap() {
            UiEvent::Progress { current, total, eta_secs } => {
                assert_eq!((current, total, eta_secs), (10, 40, Some(1.5)));
            }
            other => panic!("Expected progress, got {:?}", other),
        }
    }
}

//! Transfer progress bar
//!
//! [`TransferProgress`] renders one indicatif bar per transfer. It is fed by
//! the orchestrator through [`TransferObserver`].

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::app::{ArtifactFile, TransferObserver};
use crate::constants::progress;

/// Progress bar for file transfers
pub struct TransferProgress {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl TransferProgress {
    /// Bar drawn on stderr
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// Bar that tracks progress but never draws
    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    fn style() -> ProgressStyle {
        match ProgressStyle::default_bar().template(progress::TRANSFER_TEMPLATE) {
            Ok(style) => style.progress_chars(progress::PROGRESS_CHARS),
            Err(e) => {
                debug!("Progress bar template error: {}", e);
                ProgressStyle::default_bar()
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }

    /// Bytes reported for the current transfer
    pub fn position(&self) -> u64 {
        let mut position = 0;
        self.with_bar(|bar| position = bar.position());
        position
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferObserver for TransferProgress {
    fn started(&self, file: &ArtifactFile) {
        let bar = if self.hidden {
            ProgressBar::with_draw_target(Some(file.size), ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new(file.size)
        };
        bar.set_style(Self::style());
        bar.set_message(file.name.clone());

        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn advanced(&self, bytes: u64) {
        self.with_bar(|bar| bar.inc(bytes));
    }

    fn finished(&self, success: bool) {
        self.with_bar(|bar| {
            if success {
                bar.finish();
            } else {
                bar.abandon();
            }
        });
    }
}

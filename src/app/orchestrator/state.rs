//! Pipeline states and transition tracking

use std::fmt;

use tracing::{debug, warn};

use crate::errors::{AppError, ErrorKind};

/// Stage of a single download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    ResolvingVersion,
    SelectingFile,
    CheckingCache,
    CheckingEula,
    CheckingDiskSpace,
    Transferring,
    Verifying,
    Committing,
    Done,
    Failed { kind: ErrorKind },
}

impl DownloadState {
    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadState::Done | DownloadState::Failed { .. })
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadState::ResolvingVersion => write!(f, "resolving version"),
            DownloadState::SelectingFile => write!(f, "selecting file"),
            DownloadState::CheckingCache => write!(f, "checking cache"),
            DownloadState::CheckingEula => write!(f, "checking EULA"),
            DownloadState::CheckingDiskSpace => write!(f, "checking disk space"),
            DownloadState::Transferring => write!(f, "transferring"),
            DownloadState::Verifying => write!(f, "verifying"),
            DownloadState::Committing => write!(f, "committing"),
            DownloadState::Done => write!(f, "done"),
            DownloadState::Failed { kind } => write!(f, "failed ({})", kind),
        }
    }
}

/// Records the states a request passed through
#[derive(Debug, Default)]
pub struct StateTracker {
    history: Vec<DownloadState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `state`
    pub fn enter(&mut self, state: DownloadState) {
        match self.history.last() {
            Some(previous) => debug!("Download state: {} -> {}", previous, state),
            None => debug!("Download state: {}", state),
        }
        self.history.push(state);
    }

    /// Move to `Failed` for `error`
    pub fn fail(&mut self, error: &AppError) {
        let state = DownloadState::Failed { kind: error.kind() };
        warn!(
            "Download failed while {}: {}",
            self.current()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "starting".to_string()),
            error
        );
        self.history.push(state);
    }

    pub fn current(&self) -> Option<&DownloadState> {
        self.history.last()
    }

    pub fn history(&self) -> &[DownloadState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<DownloadState> {
        self.history
    }
}

//! Transfer side channels: progress reporting and cancellation
//!
//! [`ProgressWriter`] wraps the temp-file writer handed to the catalog client.
//! It counts bytes, forwards them to an optional [`TransferObserver`], and
//! fails the next write once cancellation has been requested.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;
use tokio::sync::watch;

use crate::app::models::ArtifactFile;
use crate::constants::files;

/// Receives transfer progress; purely informational
pub trait TransferObserver: Send + Sync {
    /// A transfer of `file` is starting
    fn started(&self, file: &ArtifactFile);

    /// `bytes` more bytes were written
    fn advanced(&self, bytes: u64);

    /// The transfer ended, successfully or not
    fn finished(&self, success: bool);
}

/// Whether cancellation has been requested on `signal`
pub fn is_cancelled(signal: Option<&watch::Receiver<bool>>) -> bool {
    signal.map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Temp path for a target: the full file name with `.tmp` appended
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    target.with_file_name(name)
}

/// Writer that reports progress and honours cancellation
pub struct ProgressWriter<W> {
    inner: W,
    written: u64,
    observer: Option<Arc<dyn TransferObserver>>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<W> ProgressWriter<W> {
    pub fn new(
        inner: W,
        observer: Option<Arc<dyn TransferObserver>>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Self {
        Self {
            inner,
            written: 0,
            observer,
            cancel,
        }
    }

    /// Bytes accepted by the inner writer so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if is_cancelled(this.cancel.as_ref()) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Other,
                "transfer cancelled",
            )));
        }

        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            this.written += *n as u64;
            if let Some(observer) = &this.observer {
                observer.advanced(*n as u64);
            }
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

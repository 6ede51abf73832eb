//! Streaming of file bodies into a caller supplied sink
//!
//! The body is copied chunk by chunk so multi-gigabyte artifacts never sit in
//! memory. Where the bytes land (temp file, progress wrapper) is the caller's
//! business.

use futures::StreamExt;
use reqwest::Response;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::errors::CatalogResult;

/// Copy a response body into `sink`, returning the byte count
pub async fn stream_to_sink(
    response: Response,
    sink: &mut (dyn AsyncWrite + Unpin + Send),
) -> CatalogResult<u64> {
    let expected = response.content_length();
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    sink.flush().await?;

    debug!(
        "Streamed {} bytes (content-length {:?})",
        written, expected
    );
    Ok(written)
}

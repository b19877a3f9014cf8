//! Response body for thumbnail bytes.
//!
//! [`ServedBody`] hands the image to the transport in fixed-size frames and
//! counts every frame in the bytes-served metric. If the connection goes away
//! hyper drops the body early: a body dropped before its first frame is a
//! plain client disconnect and is ignored, a body dropped part way through is
//! logged with the number of bytes that made it out.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use tracing::warn;

use crate::blob::ContentRef;
use crate::metrics::Metrics;

/// Size of each data frame.
const FRAME_SIZE: usize = 64 * 1024;

pub struct ServedBody {
    remaining: Bytes,
    expected: usize,
    sent: usize,
    source: ContentRef,
    metrics: Arc<dyn Metrics>,
}

impl ServedBody {
    pub fn new(data: Bytes, source: ContentRef, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            expected: data.len(),
            remaining: data,
            sent: 0,
            source,
            metrics,
        }
    }

    /// Bytes handed to the transport so far.
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl Body for ServedBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        if self.remaining.is_empty() {
            return Poll::Ready(None);
        }
        let n = self.remaining.len().min(FRAME_SIZE);
        let chunk = self.remaining.split_to(n);
        self.sent += n;
        self.metrics.add_bytes_served(n as u64);
        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.remaining.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining.len() as u64)
    }
}

impl Drop for ServedBody {
    fn drop(&mut self) {
        if self.sent == 0 || self.sent == self.expected {
            return;
        }
        warn!(
            source = %self.source,
            sent = self.sent,
            expected = self.expected,
            "error serving thumbnail: sent {}, expected size of {}",
            self.sent,
            self.expected
        );
    }
}

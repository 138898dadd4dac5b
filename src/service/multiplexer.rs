use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use parking_lot::RwLock;
use tokio::sync::oneshot;

use super::pending::{Completion, PendingTable};
use super::protocol::{DecodeRequest, DecodeResponse, DecodedWithConfig, RequestId};
use super::Err;

/// Resolves once the response for request [`id`](Self::id) has been routed back.
///
/// If the service goes away before that, the handle resolves to
/// [`Err::WorkerUnavailable`].
#[derive(Debug)]
#[must_use = "a decode handle does nothing unless awaited"]
pub struct DecodeHandle<T> {
    id: RequestId,
    receiver: oneshot::Receiver<Result<T, Err>>,
}

impl<T> DecodeHandle<T> {
    #[inline]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Blocks the current thread until the request completes.
    /// Must not be called from within an async runtime.
    pub fn blocking_wait(self) -> Result<T, Err> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(Err::WorkerUnavailable))
    }
}

impl<T> Future for DecodeHandle<T> {
    type Output = Result<T, Err>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Err::WorkerUnavailable)))
    }
}

/// Correlates requests sent to the workers with the responses coming back.
#[derive(Debug)]
pub(crate) struct Multiplexer {
    next_id: AtomicU64,
    pending: PendingTable,
    requests: RwLock<Option<Sender<DecodeRequest>>>,
    timeout: Option<Duration>,
}

impl Multiplexer {
    pub(crate) fn new(requests: Sender<DecodeRequest>, timeout: Option<Duration>) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: PendingTable::default(),
            requests: RwLock::new(Some(requests)),
            timeout,
        }
    }

    fn submit<T>(
        &self,
        input: Vec<u8>,
        buffer_length: Option<usize>,
        with_config: bool,
        completion: fn(oneshot::Sender<Result<T, Err>>) -> Completion,
    ) -> DecodeHandle<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = oneshot::channel();
        let deadline = self.timeout.map(|t| Instant::now() + t);

        // The entry must exist before the request can be answered.
        self.pending.insert(id, completion(tx), deadline);

        let request = DecodeRequest { id, input, buffer_length, with_config };
        let sent = match self.requests.read().as_ref() {
            Some(requests) => requests.send(request).is_ok(),
            None => false,
        };
        if sent {
            tracing::trace!(id, with_config, "submitted decode request");
        } else {
            tracing::warn!(id, "decode workers are gone, rejecting request");
            if let Some(completion) = self.pending.take(id) {
                completion.reject(Err::WorkerUnavailable);
            }
        }

        DecodeHandle { id, receiver }
    }

    /// submits a request that resolves to the packed buffer alone.
    pub(crate) fn submit_buffer(&self, input: Vec<u8>, buffer_length: usize) -> DecodeHandle<Vec<u8>> {
        self.submit(input, Some(buffer_length), false, Completion::Buffer)
    }

    /// submits a request that resolves to the packed buffer and its layout.
    pub(crate) fn submit_with_config(&self, input: Vec<u8>) -> DecodeHandle<DecodedWithConfig> {
        self.submit(input, None, true, Completion::WithConfig)
    }

    /// Routes a response to its caller. Responses for unknown ids (already completed,
    /// cancelled, timed out, or never issued) are dropped; returns whether it matched.
    pub(crate) fn on_response(&self, response: DecodeResponse) -> bool {
        let DecodeResponse { id, result } = response;
        let Some(completion) = self.pending.take(id) else {
            tracing::debug!(id, "dropping response for unknown request");
            return false;
        };
        match result {
            Ok(decoded) => {
                tracing::trace!(id, bytes = decoded.buffer.len(), "request resolved");
                completion.resolve(decoded);
            }
            Err(err) => {
                tracing::debug!(id, error = %err, "request rejected");
                completion.reject(Err::Decode(err));
            }
        }
        true
    }

    /// rejects a pending request with [`Err::Cancelled`]; returns whether it was pending.
    pub(crate) fn cancel(&self, id: RequestId) -> bool {
        match self.pending.take(id) {
            Some(completion) => {
                tracing::debug!(id, "request cancelled");
                completion.reject(Err::Cancelled);
                true
            }
            None => false,
        }
    }

    /// rejects every request whose deadline passed with [`Err::TimedOut`].
    pub(crate) fn sweep_expired(&self, now: Instant) -> usize {
        let expired = self.pending.take_expired(now);
        let count = expired.len();
        for (id, completion) in expired {
            tracing::debug!(id, "request timed out");
            completion.reject(Err::TimedOut);
        }
        count
    }

    /// rejects every pending request with `err`.
    pub(crate) fn fail_all(&self, err: Err) -> usize {
        let drained = self.pending.drain();
        let count = drained.len();
        for (_, completion) in drained {
            completion.reject(err.clone());
        }
        count
    }

    /// stops accepting requests; workers exit once the queue is drained.
    pub(crate) fn close(&self) {
        self.requests.write().take();
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

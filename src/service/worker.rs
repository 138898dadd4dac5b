use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::decode::{self, decode_and_pack};
use crate::engine::DecoderEngine;
use crate::pack::ScalarPolicy;

use super::multiplexer::Multiplexer;
use super::protocol::{DecodeRequest, DecodeResponse, Decoded};
use super::Err;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn handle<E: DecoderEngine>(engine: &E, request: DecodeRequest, policy: ScalarPolicy) -> Result<DecodeResponse, decode::Err> {
    let DecodeRequest { id, input, buffer_length, with_config } = request;
    let packed = panic::catch_unwind(AssertUnwindSafe(|| {
        decode_and_pack(engine, input, buffer_length, policy)
    }))
    .map_err(|payload| decode::Err::EnginePanicked(panic_message(payload.as_ref())))?;

    let result = packed.map(|packed| Decoded {
        buffer: packed.bytes,
        config: with_config.then_some(packed.layout),
    });
    Ok(DecodeResponse { id, result })
}

/// builds an engine, turning a panicking factory into `None`.
fn build_engine<E, F>(index: usize, make_engine: &F) -> Option<E>
    where F: Fn() -> E
{
    match panic::catch_unwind(AssertUnwindSafe(make_engine)) {
        Ok(engine) => Some(engine),
        Err(payload) => {
            tracing::error!(worker = index, error = %panic_message(payload.as_ref()), "failed to build decoder engine");
            None
        }
    }
}

/// Serves requests until the request channel is closed and drained, or the
/// response channel is gone. An engine that panicked is replaced after its
/// response is sent; the worker stops if no replacement can be built.
pub(crate) fn run_worker<E, F>(
    index: usize,
    make_engine: Arc<F>,
    requests: Receiver<DecodeRequest>,
    responses: Sender<DecodeResponse>,
    policy: ScalarPolicy,
) where
    E: DecoderEngine,
    F: Fn() -> E,
{
    let Some(mut engine) = build_engine(index, make_engine.as_ref()) else {
        return;
    };
    tracing::debug!(worker = index, "decode worker started");

    for request in requests.iter() {
        let id = request.id;
        let (response, panicked) = match handle(&engine, request, policy) {
            Ok(response) => (response, false),
            Err(err) => {
                tracing::error!(worker = index, id, error = %err, "decoder engine panicked");
                (DecodeResponse { id, result: Err(err) }, true)
            }
        };
        if responses.send(response).is_err() {
            tracing::debug!(worker = index, "response channel closed");
            break;
        }
        if panicked {
            match build_engine(index, make_engine.as_ref()) {
                Some(rebuilt) => engine = rebuilt,
                None => break,
            }
        }
    }

    tracing::debug!(worker = index, "decode worker stopped");
}

/// Delivers worker responses to the multiplexer and expires overdue requests.
/// Once every worker is gone, whatever is still pending fails with
/// [`Err::WorkerUnavailable`].
pub(crate) fn run_router(mux: Arc<Multiplexer>, responses: Receiver<DecodeResponse>, sweep_interval: Duration) {
    loop {
        match responses.recv_timeout(sweep_interval) {
            Ok(response) => {
                mux.on_response(response);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let expired = mux.sweep_expired(Instant::now());
        if expired > 0 {
            tracing::warn!(expired, "decode requests timed out");
        }
    }

    mux.close();
    let failed = mux.fail_all(Err::WorkerUnavailable);
    if failed > 0 {
        tracing::warn!(failed, "decode workers stopped with requests in flight");
    }
}

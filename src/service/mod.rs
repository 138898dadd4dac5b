//! Decoding as a service: callers submit compressed meshes from any thread and await
//! packed buffers, while a pool of worker threads owns the decoder engines.
//!
//! ```text
//!  caller ──submit──▶ Multiplexer ──DecodeRequest──▶ worker 0..n (engine)
//!     ▲                   │ pending                        │
//!     └──DecodeHandle─────┘◀────── router ◀──DecodeResponse┘
//! ```

mod multiplexer;
mod pending;
pub mod protocol;
mod worker;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::shared::ConfigType;
use crate::decode;
use crate::engine::DecoderEngine;
use crate::pack::ScalarPolicy;

use multiplexer::Multiplexer;
pub use multiplexer::DecodeHandle;
pub use protocol::{DecodedWithConfig, RequestId};

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Request was cancelled")]
    Cancelled,
    #[error("{0}")]
    Decode(#[from] decode::Err),
    #[error("Invalid service configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to spawn service thread: {0}")]
    SpawnFailed(String),
    #[error("Request timed out")]
    TimedOut,
    #[error("Decode worker is unavailable")]
    WorkerUnavailable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default = "default_config")]
pub struct Config {
    pub worker_count: usize,
    /// requests still pending after this long are rejected with [`Err::TimedOut`].
    pub request_timeout_ms: Option<u64>,
    pub sweep_interval_ms: u64,
    pub scalar_policy: ScalarPolicy,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self {
            worker_count: 1,
            request_timeout_ms: None,
            sweep_interval_ms: 100,
            scalar_policy: ScalarPolicy::Skip,
        }
    }
}

fn default_config() -> Config {
    <Config as ConfigType>::default()
}

impl Config {
    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, Err> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| Err::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Err> {
        if self.worker_count == 0 {
            return Err(Err::InvalidConfig("worker_count must be at least 1".to_owned()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(Err::InvalidConfig("sweep_interval_ms must be at least 1".to_owned()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Owns the worker pool and the router thread. Dropping the service closes the
/// request channel, lets the workers finish what is queued and joins every thread.
#[derive(Debug)]
pub struct DecodeService {
    mux: Arc<Multiplexer>,
    workers: Vec<JoinHandle<()>>,
    router: Option<JoinHandle<()>>,
}

impl DecodeService {
    /// Starts `cfg.worker_count` workers, each building its own engine with `make_engine`.
    pub fn spawn<E, F>(cfg: Config, make_engine: F) -> Result<Self, Err>
        where E: DecoderEngine + 'static,
              F: Fn() -> E + Send + Sync + 'static,
    {
        cfg.validate()?;

        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (response_tx, response_rx) = crossbeam_channel::unbounded();
        let mut service = Self {
            mux: Arc::new(Multiplexer::new(request_tx, cfg.request_timeout())),
            workers: Vec::with_capacity(cfg.worker_count),
            router: None,
        };

        let make_engine = Arc::new(make_engine);
        for index in 0..cfg.worker_count {
            let make_engine = make_engine.clone();
            let requests = request_rx.clone();
            let responses = response_tx.clone();
            let policy = cfg.scalar_policy;
            let worker = thread::Builder::new()
                .name(format!("draco-worker-{index}"))
                .spawn(move || worker::run_worker(index, make_engine, requests, responses, policy))
                .map_err(|e| Err::SpawnFailed(e.to_string()))?;
            service.workers.push(worker);
        }
        drop(response_tx);
        drop(request_rx);

        let mux = service.mux.clone();
        let sweep_interval = cfg.sweep_interval();
        let router = thread::Builder::new()
            .name("draco-router".to_owned())
            .spawn(move || worker::run_router(mux, response_rx, sweep_interval))
            .map_err(|e| Err::SpawnFailed(e.to_string()))?;
        service.router = Some(router);

        tracing::info!(workers = cfg.worker_count, timeout_ms = cfg.request_timeout_ms, "decode service started");
        Ok(service)
    }

    /// Decodes `input` into a buffer of at most `buffer_length` bytes.
    pub fn decode_mesh(&self, input: Vec<u8>, buffer_length: usize) -> DecodeHandle<Vec<u8>> {
        self.mux.submit_buffer(input, buffer_length)
    }

    /// Decodes `input` into an exactly sized buffer and returns its layout alongside.
    pub fn decode_mesh_with_config(&self, input: Vec<u8>) -> DecodeHandle<DecodedWithConfig> {
        self.mux.submit_with_config(input)
    }

    /// Rejects the request with [`Err::Cancelled`] if it is still pending.
    /// The worker may still decode it; its response is then dropped.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.mux.cancel(id)
    }

    pub fn pending_count(&self) -> usize {
        self.mux.pending_count()
    }

    /// Stops accepting requests, waits for queued ones and joins every thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.mux.close();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("decode worker thread panicked");
            }
        }
        if let Some(router) = self.router.take() {
            if router.join().is_err() {
                tracing::error!("router thread panicked");
            }
        }
        // no-op once the router has exited; covers a partially spawned service.
        self.mux.fail_all(Err::WorkerUnavailable);
        tracing::info!("decode service stopped");
    }
}

impl Drop for DecodeService {
    fn drop(&mut self) {
        if self.router.is_some() || !self.workers.is_empty() {
            self.stop();
        }
    }
}

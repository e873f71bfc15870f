//! Chunk build workers
//!
//! The streamer hands build requests to a [`ChunkWorker`] and polls for
//! results on the frame loop. Workers never touch the store: results come
//! back as plain data and are folded in by the caller, which also decides
//! whether a late result is still wanted.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::mpsc;

use crate::core::{Error, Result};
use crate::streaming::coord::ChunkCoord;
use crate::terrain::generator::ChunkGenerator;
use crate::terrain::geometry::ChunkGeometry;

/// A batch of chunks to build with one generator
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub coords: Vec<ChunkCoord>,
    /// Generator for the equation set the request was made under
    pub generator: ChunkGenerator,
    /// Equation-set generation the request belongs to
    pub epoch: u64,
}

/// How a single build ended
#[derive(Debug)]
pub enum BuildOutcome {
    Built(ChunkGeometry),
    /// The build panicked; the message is whatever the panic carried
    Failed(String),
}

/// One finished chunk
#[derive(Debug)]
pub struct BuildResult {
    pub coord: ChunkCoord,
    pub epoch: u64,
    pub outcome: BuildOutcome,
}

/// Something that builds chunks and reports back later
pub trait ChunkWorker: Send {
    /// Queue a batch; never blocks on the builds themselves
    fn dispatch(&mut self, request: BuildRequest);

    /// Collect every result that has arrived since the last poll
    fn poll(&mut self) -> Vec<BuildResult>;

    /// Chunks dispatched but not yet returned by `poll`
    fn in_flight(&self) -> usize;
}

/// Build one chunk, turning a panic into [`BuildOutcome::Failed`]
pub fn build_guarded(generator: &ChunkGenerator, coord: ChunkCoord) -> BuildOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| generator.build(coord))) {
        Ok(geometry) => BuildOutcome::Built(geometry),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            BuildOutcome::Failed(message)
        }
    }
}

/// Builds every request on the calling thread during `dispatch`
///
/// Results are still only handed out by `poll`, so the streamer sees the
/// same asynchronous contract as with a thread pool.
#[derive(Debug, Default)]
pub struct InlineWorker {
    ready: VecDeque<BuildResult>,
}

impl InlineWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkWorker for InlineWorker {
    fn dispatch(&mut self, request: BuildRequest) {
        for coord in request.coords {
            let outcome = build_guarded(&request.generator, coord);
            self.ready.push_back(BuildResult {
                coord,
                epoch: request.epoch,
                outcome,
            });
        }
    }

    fn poll(&mut self) -> Vec<BuildResult> {
        self.ready.drain(..).collect()
    }

    fn in_flight(&self) -> usize {
        self.ready.len()
    }
}

/// Builds chunks on a rayon thread pool
///
/// Each chunk is its own task, so results can arrive in any order.
pub struct ThreadedWorker {
    pool: ThreadPool,
    result_tx: mpsc::UnboundedSender<BuildResult>,
    result_rx: mpsc::UnboundedReceiver<BuildResult>,
    in_flight: usize,
}

impl ThreadedWorker {
    /// Create a worker with `threads` build threads
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("chunk-builder-{index}"))
            .build()
            .map_err(|e| Error::Worker(format!("failed to create chunk build pool: {e}")))?;
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        log::info!("Chunk builder pool started with {} threads", pool.current_num_threads());

        Ok(Self {
            pool,
            result_tx,
            result_rx,
            in_flight: 0,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ChunkWorker for ThreadedWorker {
    fn dispatch(&mut self, request: BuildRequest) {
        let epoch = request.epoch;
        for coord in request.coords {
            let generator = request.generator.clone();
            let tx = self.result_tx.clone();
            self.in_flight += 1;
            self.pool.spawn(move || {
                let outcome = build_guarded(&generator, coord);
                // The receiver only goes away with the worker itself
                let _ = tx.send(BuildResult {
                    coord,
                    epoch,
                    outcome,
                });
            });
        }
    }

    fn poll(&mut self) -> Vec<BuildResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        self.in_flight = self.in_flight.saturating_sub(results.len());
        results
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Worker matching the configured thread count; 0 builds inline
pub fn worker_for(threads: usize) -> Result<Box<dyn ChunkWorker>> {
    if threads == 0 {
        Ok(Box::new(InlineWorker::new()))
    } else {
        Ok(Box::new(ThreadedWorker::new(threads)?))
    }
}

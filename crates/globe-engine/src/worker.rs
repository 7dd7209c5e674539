//! Off-thread tile work: byte fetches, decodes and mesh synthesis.
//!
//! Jobs go to a pool of named worker threads over a bounded channel and come
//! back through a result channel drained once per frame on the render thread.
//! Every submitted job produces exactly one [`JobResult`], even when it was
//! cancelled, so queue accounting stays exact. The inline mode runs each job
//! during `submit` instead, for deterministic tests and single-threaded tools.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use globe_codec::{DecodeError, DecodedTile, decode_tile};
use globe_geo::{TileExtent, TileKey};
use globe_mesh::{MeshParams, SurfaceData, TileMesh, synthesize, virtual_surface};

use crate::node::{NodeId, SurfaceSource};
use crate::{FetchError, FetchService};

/// Grid and synthesis parameters for one mesh job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshSpec {
    pub params: MeshParams,
    pub virtual_lon_segments: u32,
    pub virtual_lat_segments: u32,
    pub virtual_altitude_m: f64,
}

/// What a job does.
#[derive(Clone, Debug)]
pub enum JobKind {
    Fetch { path: String },
    Decode { bytes: Arc<[u8]> },
    Mesh {
        surface: SurfaceSource,
        extent: TileExtent,
        spec: MeshSpec,
    },
}

/// Which engine queue a job was dispatched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobQueue {
    Load,
    Parse,
}

impl JobKind {
    #[must_use]
    pub fn queue(&self) -> JobQueue {
        match self {
            JobKind::Fetch { .. } => JobQueue::Load,
            JobKind::Decode { .. } | JobKind::Mesh { .. } => JobQueue::Parse,
        }
    }
}

/// A unit of work for one node.
#[derive(Clone, Debug)]
pub struct TileJob {
    pub key: TileKey,
    pub node: NodeId,
    pub kind: JobKind,
}

/// What a job produced.
#[derive(Debug)]
pub enum JobOutput {
    Fetched(Result<Vec<u8>, FetchError>),
    Decoded(Result<Arc<DecodedTile>, DecodeError>),
    Meshed(Arc<TileMesh>),
    Cancelled,
}

/// A finished job.
#[derive(Debug)]
pub struct JobResult {
    pub key: TileKey,
    pub node: NodeId,
    pub queue: JobQueue,
    pub output: JobOutput,
    /// Execution time in microseconds (for profiling).
    pub elapsed_us: u64,
}

struct PendingJob {
    job: TileJob,
    cancelled: Arc<AtomicBool>,
}

enum Mode {
    Inline {
        fetcher: Arc<dyn FetchService>,
        completed: VecDeque<JobResult>,
    },
    Pool {
        task_sender: Sender<PendingJob>,
        result_receiver: Receiver<JobResult>,
        /// Cancellation flag per node with a job in flight.
        active: Arc<DashMap<NodeId, Arc<AtomicBool>>>,
    },
}

/// Executes tile jobs.
pub struct TileWorkers {
    mode: Mode,
    /// Submitted jobs whose results have not been drained.
    in_flight: Arc<AtomicU64>,
    threads: usize,
}

impl TileWorkers {
    /// Spawn `thread_count` workers accepting up to `queue_capacity` queued jobs.
    pub fn spawn(
        thread_count: usize,
        queue_capacity: usize,
        fetcher: Arc<dyn FetchService>,
    ) -> Self {
        let thread_count = thread_count.max(1);
        let capacity = queue_capacity.max(1);
        let (task_sender, task_receiver) = bounded::<PendingJob>(capacity);
        let (result_sender, result_receiver) = bounded::<JobResult>(capacity * 2);

        for i in 0..thread_count {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let fetcher = Arc::clone(&fetcher);

            std::thread::Builder::new()
                .name(format!("tile-worker-{i}"))
                .spawn(move || {
                    while let Ok(pending) = receiver.recv() {
                        let result = if pending.cancelled.load(Ordering::Relaxed) {
                            cancelled(&pending.job)
                        } else {
                            execute(&pending.job, fetcher.as_ref())
                        };
                        if sender.send(result).is_err() {
                            break;
                        }
                    }
                })
                .expect("Failed to spawn tile worker thread");
        }

        tracing::info!(threads = thread_count, capacity, "tile workers started");
        Self {
            mode: Mode::Pool {
                task_sender,
                result_receiver,
                active: Arc::new(DashMap::new()),
            },
            in_flight: Arc::new(AtomicU64::new(0)),
            threads: thread_count,
        }
    }

    /// Pool sized from a configured thread count; 0 picks CPUs minus one.
    pub fn with_threads(configured: usize, queue_capacity: usize, fetcher: Arc<dyn FetchService>) -> Self {
        let threads = if configured == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            configured
        };
        Self::spawn(threads, queue_capacity, fetcher)
    }

    /// Run every job synchronously inside `submit`.
    pub fn inline(fetcher: Arc<dyn FetchService>) -> Self {
        Self {
            mode: Mode::Inline {
                fetcher,
                completed: VecDeque::new(),
            },
            in_flight: Arc::new(AtomicU64::new(0)),
            threads: 0,
        }
    }

    /// Worker thread count; 0 in inline mode.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Submit a job. Returns it back if the pool's queue is full.
    #[allow(clippy::result_large_err)]
    pub fn submit(&mut self, job: TileJob) -> Result<(), TileJob> {
        match &mut self.mode {
            Mode::Inline { fetcher, completed } => {
                completed.push_back(execute(&job, fetcher.as_ref()));
            }
            Mode::Pool {
                task_sender,
                active,
                ..
            } => {
                let cancelled = Arc::new(AtomicBool::new(false));
                active.insert(job.node, Arc::clone(&cancelled));
                if let Err(e) = task_sender.try_send(PendingJob { job, cancelled }) {
                    let pending = e.into_inner();
                    active.remove(&pending.job.node);
                    return Err(pending.job);
                }
            }
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Ask the pool to skip a node's queued job. Work already running
    /// completes; its result is still delivered.
    pub fn cancel(&self, node: NodeId) {
        if let Mode::Pool { active, .. } = &self.mode
            && let Some((_, cancelled)) = active.remove(&node)
        {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Drain all finished jobs. Call once per frame on the render thread.
    pub fn drain_results(&mut self) -> Vec<JobResult> {
        let results: Vec<JobResult> = match &mut self.mode {
            Mode::Inline { completed, .. } => completed.drain(..).collect(),
            Mode::Pool {
                result_receiver,
                active,
                ..
            } => {
                let mut results = Vec::new();
                while let Ok(result) = result_receiver.try_recv() {
                    active.remove(&result.node);
                    results.push(result);
                }
                results
            }
        };
        self.in_flight
            .fetch_sub(results.len() as u64, Ordering::Relaxed);
        results
    }

    /// Jobs submitted and not yet drained.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

fn cancelled(job: &TileJob) -> JobResult {
    JobResult {
        key: job.key,
        node: job.node,
        queue: job.kind.queue(),
        output: JobOutput::Cancelled,
        elapsed_us: 0,
    }
}

/// Run one job on the calling thread.
pub fn execute(job: &TileJob, fetcher: &dyn FetchService) -> JobResult {
    let start = Instant::now();
    let output = match &job.kind {
        JobKind::Fetch { path } => JobOutput::Fetched(fetcher.request_bytes(path)),
        JobKind::Decode { bytes } => JobOutput::Decoded(decode_tile(bytes).map(Arc::new)),
        JobKind::Mesh {
            surface,
            extent,
            spec,
        } => JobOutput::Meshed(Arc::new(build_mesh(surface, extent, spec))),
    };
    JobResult {
        key: job.key,
        node: job.node,
        queue: job.kind.queue(),
        output,
        elapsed_us: start.elapsed().as_micros() as u64,
    }
}

/// Synthesize the mesh for a decoded or virtual surface.
#[must_use]
pub fn build_mesh(surface: &SurfaceSource, extent: &TileExtent, spec: &MeshSpec) -> TileMesh {
    let data = match surface {
        SurfaceSource::Elevation(tile) => SurfaceData::from_decoded(tile, &extent.geographic),
        SurfaceSource::Virtual => virtual_surface(
            &extent.geographic,
            spec.virtual_lon_segments,
            spec.virtual_lat_segments,
            spec.virtual_altitude_m,
            None,
        ),
    };
    synthesize(&data, &extent.geographic, &spec.params)
}

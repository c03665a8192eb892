//! Asynchronous patch tessellation on a worker pool.
//!
//! The tree submits [`BuildRequest`]s and collects [`CompletedBuild`]s once
//! per tick via [`poll`](BuildScheduler::poll). Neither call blocks. Jobs are
//! never cancelled: a build for a patch destroyed in the meantime still
//! completes, and the caller discards it because its id no longer resolves.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::DVec3;
use hashbrown::HashMap;
use trisphere_mesh::{PatchMesh, Resolution, tessellate};
use trisphere_terrain::{NoiseField, PlanetConfig};

use crate::arena::PatchId;
use crate::error::LodError;

/// Where tessellation jobs run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerMode {
    /// A pool of the given number of OS threads (at least one is spawned).
    Threaded(usize),
    /// Jobs queue up and run on the polling thread during the next
    /// [`poll`](BuildScheduler::poll). Deterministic, one tick of latency.
    Deferred,
}

impl WorkerMode {
    /// A thread pool sized to leave headroom for the tick and render threads.
    pub fn automatic() -> Self {
        let cpus = num_cpus::get().max(2);
        WorkerMode::Threaded((cpus - 2).max(1))
    }
}

impl Default for WorkerMode {
    fn default() -> Self {
        Self::automatic()
    }
}

/// What to tessellate.
#[derive(Clone, Copy, Debug)]
pub struct BuildRequest {
    /// The patch the geometry belongs to.
    pub patch: PatchId,
    /// Unit-sphere corner directions, captured at submission.
    pub corners: [DVec3; 3],
    /// Vertices per patch edge.
    pub resolution: Resolution,
    /// Quadtree level, used for octave scaling.
    pub level: u32,
}

/// Receipt for a scheduled build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildHandle {
    pub patch: PatchId,
    pub job: u64,
}

/// Bookkeeping for one in-flight job. Dropped when its result is polled.
#[derive(Clone, Copy, Debug)]
pub struct PendingBuild {
    pub patch: PatchId,
    pub corners: [DVec3; 3],
    pub resolution: Resolution,
    pub level: u32,
    pub job: u64,
}

/// A finished build, handed back by [`BuildScheduler::poll`].
#[derive(Debug)]
pub struct CompletedBuild {
    /// The patch the build was requested for. May no longer be live.
    pub patch: PatchId,
    /// Sequence number from the matching [`BuildHandle`].
    pub job: u64,
    /// The tessellated geometry, owned by the receiver from here on.
    pub mesh: PatchMesh,
    /// Tessellation time in microseconds (for profiling).
    pub build_time_us: u64,
}

enum Backend {
    Threaded {
        job_sender: Option<Sender<PendingBuild>>,
        workers: Vec<JoinHandle<()>>,
    },
    Deferred {
        queue: Vec<PendingBuild>,
    },
}

/// Runs [`tessellate`] jobs off the tick thread and tracks what is in flight.
pub struct BuildScheduler {
    planet: Arc<PlanetConfig>,
    noise: Arc<NoiseField>,
    backend: Backend,
    result_receiver: Receiver<CompletedBuild>,
    /// Kept so the deferred backend can reuse the same result path.
    result_sender: Sender<CompletedBuild>,
    pending: HashMap<PatchId, PendingBuild>,
    next_job: u64,
}

impl BuildScheduler {
    /// Create a scheduler. In threaded mode the workers start immediately.
    pub fn new(
        planet: Arc<PlanetConfig>,
        noise: Arc<NoiseField>,
        mode: WorkerMode,
    ) -> Result<Self, LodError> {
        let (result_sender, result_receiver) = unbounded::<CompletedBuild>();

        let backend = match mode {
            WorkerMode::Deferred => Backend::Deferred { queue: Vec::new() },
            WorkerMode::Threaded(threads) => {
                let (job_sender, job_receiver) = unbounded::<PendingBuild>();
                let threads = threads.max(1);
                let mut workers = Vec::with_capacity(threads);

                for i in 0..threads {
                    let receiver = job_receiver.clone();
                    let sender = result_sender.clone();
                    let planet = Arc::clone(&planet);
                    let noise = Arc::clone(&noise);

                    let handle = std::thread::Builder::new()
                        .name(format!("patch-build-{i}"))
                        .spawn(move || {
                            while let Ok(job) = receiver.recv() {
                                if sender.send(run_job(&job, &planet, &noise)).is_err() {
                                    break;
                                }
                            }
                        })
                        .map_err(LodError::WorkerSpawn)?;
                    workers.push(handle);
                }

                Backend::Threaded {
                    job_sender: Some(job_sender),
                    workers,
                }
            }
        };

        Ok(Self {
            planet,
            noise,
            backend,
            result_receiver,
            result_sender,
            pending: HashMap::new(),
            next_job: 0,
        })
    }

    /// Queue a build. Never blocks.
    ///
    /// Fails with [`LodError::AlreadyPending`] if the patch has a build in
    /// flight, and with [`LodError::SchedulerClosed`] after [`shutdown`](Self::shutdown).
    pub fn schedule(&mut self, request: BuildRequest) -> Result<BuildHandle, LodError> {
        if self.pending.contains_key(&request.patch) {
            return Err(LodError::AlreadyPending(request.patch));
        }

        let job = PendingBuild {
            patch: request.patch,
            corners: request.corners,
            resolution: request.resolution,
            level: request.level,
            job: self.next_job,
        };

        match &mut self.backend {
            Backend::Threaded { job_sender, .. } => {
                let sender = job_sender.as_ref().ok_or(LodError::SchedulerClosed)?;
                sender.send(job).map_err(|_| LodError::SchedulerClosed)?;
            }
            Backend::Deferred { queue } => queue.push(job),
        }

        self.next_job += 1;
        self.pending.insert(request.patch, job);
        Ok(BuildHandle {
            patch: request.patch,
            job: job.job,
        })
    }

    /// Collect every build finished since the last poll. Never blocks.
    ///
    /// In deferred mode the queued jobs are run here first.
    pub fn poll(&mut self) -> Vec<CompletedBuild> {
        if let Backend::Deferred { queue } = &mut self.backend {
            for job in queue.drain(..) {
                let _ = self
                    .result_sender
                    .send(run_job(&job, &self.planet, &self.noise));
            }
        }

        let mut results = Vec::new();
        while let Ok(done) = self.result_receiver.try_recv() {
            self.pending.remove(&done.patch);
            results.push(done);
        }
        results
    }

    /// Returns `true` if `patch` has a build in flight.
    pub fn is_pending(&self, patch: PatchId) -> bool {
        self.pending.contains_key(&patch)
    }

    /// The in-flight record for `patch`, if any.
    pub fn pending(&self, patch: PatchId) -> Option<&PendingBuild> {
        self.pending.get(&patch)
    }

    /// Number of builds queued or executing.
    pub fn in_flight_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of worker threads (0 in deferred mode).
    pub fn worker_count(&self) -> usize {
        match &self.backend {
            Backend::Threaded { workers, .. } => workers.len(),
            Backend::Deferred { .. } => 0,
        }
    }

    /// Stop accepting builds and join the workers.
    ///
    /// Jobs already queued are still run by the workers before they exit;
    /// their results remain available to [`poll`](Self::poll).
    pub fn shutdown(&mut self) {
        if let Backend::Threaded {
            job_sender,
            workers,
        } = &mut self.backend
        {
            job_sender.take();
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for BuildScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job(job: &PendingBuild, planet: &PlanetConfig, noise: &NoiseField) -> CompletedBuild {
    let start = Instant::now();
    let mesh = tessellate(job.corners, job.resolution, job.level, planet, noise);
    CompletedBuild {
        patch: job.patch,
        job: job.job,
        mesh,
        build_time_us: start.elapsed().as_micros() as u64,
    }
}

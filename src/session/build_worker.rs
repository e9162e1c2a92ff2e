use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::mpsc;
use std::thread;

use futures::executor::block_on;
use log::warn;

use crate::catalog::CompositeBuilder;
use crate::parts::PartNode;
use crate::store::EntitySeed;

const BUILD_WORKER_QUEUE_DEPTH: usize = 16;

/// A queued composite build, tagged with the store generation captured at
/// request time so stale results can be discarded after a clear.
#[derive(Debug)]
pub struct BuildJob {
    pub seed: EntitySeed,
    pub builder: CompositeBuilder,
    pub generation: u64,
}

/// A finished build, successful or not, carrying its seed back.
#[derive(Debug)]
pub struct BuildOutcome {
    pub seed: EntitySeed,
    pub result: anyhow::Result<PartNode>,
    pub generation: u64,
}

/// Small thread pool resolving composite builders off the session thread.
/// Jobs are distributed round-robin; results return through one shared
/// channel and are collected without blocking.
pub struct BuildWorker {
    senders: Vec<mpsc::SyncSender<BuildJob>>,
    next_sender: AtomicUsize,
    rx: mpsc::Receiver<BuildOutcome>,
}

impl BuildWorker {
    pub fn new() -> Option<Self> {
        let worker_count =
            thread::available_parallelism().map(|n| n.get().clamp(2, 4)).unwrap_or(2);
        let (result_tx, result_rx) = mpsc::channel();
        let mut senders = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (tx, rx) = mpsc::sync_channel(BUILD_WORKER_QUEUE_DEPTH);
            let thread_result_tx = result_tx.clone();
            let name = format!("model-build-{index}");
            if thread::Builder::new()
                .name(name)
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let outcome = run_build_job(job);
                        if thread_result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                })
                .is_err()
            {
                warn!("[build] failed to spawn model build worker");
                return None;
            }
            senders.push(tx);
        }
        Some(Self { senders, next_sender: AtomicUsize::new(0), rx: result_rx })
    }

    /// Hands a job to the least recently used worker. Gives the job back
    /// when every queue is full, so the caller can run it inline instead.
    pub fn submit(&self, job: BuildJob) -> Result<(), BuildJob> {
        if self.senders.is_empty() {
            return Err(job);
        }
        let len = self.senders.len();
        let mut job = job;
        let start = self.next_sender.fetch_add(1, AtomicOrdering::Relaxed) % len;
        for offset in 0..len {
            let idx = (start + offset) % len;
            match self.senders[idx].try_send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::TrySendError::Full(returned))
                | Err(mpsc::TrySendError::Disconnected(returned)) => {
                    job = returned;
                }
            }
        }
        Err(job)
    }

    /// Collects every finished build without blocking.
    pub fn drain(&self) -> Vec<BuildOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Blocks for the next finished build. None once every worker is gone.
    pub fn recv(&self) -> Option<BuildOutcome> {
        self.rx.recv().ok()
    }
}

pub(crate) fn run_build_job(job: BuildJob) -> BuildOutcome {
    let BuildJob { seed, builder, generation } = job;
    let result = block_on(builder.build(seed.original.clone()));
    BuildOutcome { seed, result, generation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::{MaterialSpec, PartShape};
    use glam::DVec3;
    use serde_json::{json, Map};

    fn chair_seed() -> EntitySeed {
        EntitySeed {
            kind_id: "chair".to_string(),
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            properties: Map::new(),
            original: json!({ "type": "chair" }),
        }
    }

    #[test]
    fn jobs_come_back_with_their_generation() {
        let worker = BuildWorker::new().unwrap();
        let builder = CompositeBuilder::blocking(|_| {
            Ok(PartNode::mesh(
                PartShape::Box { width: 1.0, height: 1.0, depth: 1.0 },
                MaterialSpec::standard(0x123456),
            ))
        });
        assert!(worker.submit(BuildJob { seed: chair_seed(), builder, generation: 3 }).is_ok());
        let outcome = worker.recv().unwrap();
        assert_eq!(outcome.generation, 3);
        assert_eq!(outcome.seed.kind_id, "chair");
        assert!(outcome.result.is_ok());
    }

    #[test]
    fn builder_errors_come_back_as_outcomes() {
        let worker = BuildWorker::new().unwrap();
        let builder = CompositeBuilder::blocking(|_| Err(anyhow::anyhow!("no geometry")));
        assert!(worker.submit(BuildJob { seed: chair_seed(), builder, generation: 0 }).is_ok());
        let outcome = worker.recv().unwrap();
        assert!(outcome.result.is_err());
    }
}

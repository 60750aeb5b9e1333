//! Fixed-size worker pool.
//!
//! ```text
//!             file queue                      result queue
//! publisher ──────────────▶ worker 0..W ──────────────────▶ collector
//!     │      terminate × W      │        exit signal × W        ▲
//!     └────────────────────────▶└───────────────────────────────┘
//! ```
//!
//! The publisher puts every file on the bounded file queue, then one
//! termination token per worker. A worker blocks on either queue. Once it has
//! seen a token it drains whatever is still queued before exiting, so no
//! buffered file is lost when termination races with remaining work. Because
//! tokens are only sent after the last file, the drain sees every file that
//! has not been taken yet.
//!
//! The collector (the caller's thread) blocks on either a result or an exit
//! signal and, once every worker has exited, drains the result queue.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::num::NonZeroUsize;
use std::thread;
use tracing::{debug, trace};

use super::processor::FileProcessor;
use crate::cache::FileData;
use crate::errors::{SearchError, SearchResult};
use crate::results::FileResult;

/// Runs a [`FileProcessor`] over a file set on `worker_count` threads
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    worker_count: NonZeroUsize,
    buffering: NonZeroUsize,
}

impl WorkerPool {
    pub fn new(worker_count: NonZeroUsize, buffering: NonZeroUsize) -> Self {
        Self {
            worker_count,
            buffering,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count.get()
    }

    /// Capacity of both the file queue and the result queue
    pub fn queue_capacity(&self) -> usize {
        self.buffering.get().saturating_mul(self.worker_count.get())
    }

    /// Processes every file and hands each non-empty result, or per-file error,
    /// to `collect` on the calling thread. Returns once all workers have exited
    /// and the result queue is empty.
    pub fn run<F>(
        &self,
        files: &[FileData],
        processor: &FileProcessor,
        mut collect: F,
    ) -> SearchResult<()>
    where
        F: FnMut(SearchResult<FileResult>),
    {
        let workers = self.worker_count();
        let capacity = self.queue_capacity();
        debug!(
            "Starting {} workers over {} files (queue capacity {})",
            workers,
            files.len(),
            capacity
        );

        thread::scope(|scope| {
            let (file_tx, file_rx) = bounded::<&FileData>(capacity);
            let (result_tx, result_rx) = bounded::<SearchResult<FileResult>>(capacity);
            let (terminate_tx, terminate_rx) = bounded::<()>(workers);
            let (exit_tx, exit_rx) = bounded::<usize>(workers);

            let publisher = scope.spawn(move || publish(files, file_tx, terminate_tx, workers));

            let mut handles = Vec::with_capacity(workers);
            for id in 0..workers {
                let worker = Worker {
                    id,
                    files: file_rx.clone(),
                    terminate: terminate_rx.clone(),
                    results: result_tx.clone(),
                };
                let exit = ExitSignal {
                    id,
                    exited: exit_tx.clone(),
                };
                let handle = thread::Builder::new()
                    .name(format!("search-worker-{}", id))
                    .spawn_scoped(scope, move || worker.run(processor, exit))?;
                handles.push(handle);
            }

            // Only workers hold these now, so disconnection tracks worker exits
            drop(file_rx);
            drop(terminate_rx);
            drop(result_tx);
            drop(exit_tx);

            let mut exited = 0;
            while exited < workers {
                select! {
                    recv(result_rx) -> msg => match msg {
                        Ok(outcome) => collect(outcome),
                        Err(_) => break,
                    },
                    recv(exit_rx) -> msg => match msg {
                        Ok(id) => {
                            trace!("Worker {} exited", id);
                            exited += 1;
                        }
                        Err(_) => break,
                    },
                }
            }

            // Results published just before the last exit signals
            for outcome in result_rx.try_iter() {
                collect(outcome);
            }

            let mut panicked = None;
            for (id, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    panicked.get_or_insert(id);
                }
            }
            let published = publisher.join().unwrap_or(0);
            debug!("Published {} files", published);

            match panicked {
                Some(id) => Err(SearchError::WorkerPanicked(id)),
                None => Ok(()),
            }
        })
    }
}

/// Enqueues every file, then one termination token per worker
fn publish<'a>(
    files: &'a [FileData],
    file_tx: Sender<&'a FileData>,
    terminate_tx: Sender<()>,
    workers: usize,
) -> usize {
    let mut published = 0;
    for file in files {
        if file_tx.send(file).is_err() {
            // Every worker is gone
            return published;
        }
        published += 1;
    }
    for _ in 0..workers {
        if terminate_tx.send(()).is_err() {
            break;
        }
    }
    published
}

struct Worker<'a> {
    id: usize,
    files: Receiver<&'a FileData>,
    terminate: Receiver<()>,
    results: Sender<SearchResult<FileResult>>,
}

impl Worker<'_> {
    fn run(self, processor: &FileProcessor, _exit: ExitSignal) {
        let mut processed = 0usize;

        loop {
            select! {
                recv(self.files) -> msg => match msg {
                    Ok(file) => {
                        processed += 1;
                        if !self.process(processor, file) {
                            return;
                        }
                    }
                    // Publisher finished and the queue is empty
                    Err(_) => break,
                },
                recv(self.terminate) -> _ => break,
            }
        }

        for file in self.files.try_iter() {
            processed += 1;
            if !self.process(processor, file) {
                return;
            }
        }

        trace!("Worker {} done after {} files", self.id, processed);
    }

    /// Returns false once nobody is collecting results
    fn process(&self, processor: &FileProcessor, file: &FileData) -> bool {
        let outcome = match processor.process_file(file) {
            Ok(result) if result.matches.is_empty() => return true,
            outcome => outcome,
        };
        self.results.send(outcome).is_ok()
    }
}

/// Signals the collector when a worker stops, including by unwinding
struct ExitSignal {
    id: usize,
    exited: Sender<usize>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.exited.send(self.id);
    }
}

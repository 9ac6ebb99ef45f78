//! Bounded worker pool for bulk runs.
//!
//! A [`WorkScope`] starts a fixed number of tokio tasks that pull boxed jobs off
//! a channel of capacity one, so submission blocks until a worker is free. Each
//! job records its own outcome in the scope's accumulators. A job that fails
//! with a fatal error cancels the scope's token; sibling jobs see that token on
//! their next API call and fail fast.

use crate::error::{ApiError, BulkOutcome, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Side-channel notified as a bulk run progresses. Never affects control flow.
pub trait ProgressObserver: Send + Sync {
    fn start(&self, description: &str, total: usize);
    fn advance(&self, completed: usize);
    fn finish(&self);
}

/// Observer that ignores everything
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn start(&self, _description: &str, _total: usize) {}
    fn advance(&self, _completed: usize) {}
    fn finish(&self) {}
}

/// One bulk run: worker pool, cancellation scope and result accumulators.
pub struct WorkScope<T> {
    token: CancellationToken,
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    outputs: Arc<Mutex<Vec<T>>>,
    errors: Arc<Mutex<Vec<ApiError>>>,
    progress: Arc<dyn ProgressObserver>,
}

impl<T: Send + 'static> WorkScope<T> {
    /// Start `workers` workers in a scope derived from `parent`.
    ///
    /// Cancelling `parent` cancels the scope; cancelling the scope leaves `parent` alone.
    pub fn start(
        parent: &CancellationToken,
        workers: usize,
        total: usize,
        description: &str,
        progress: Arc<dyn ProgressObserver>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(1);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        // Lock only while waiting for the next job
                        let job = receiver.lock().await.recv().await;
                        match job {
                            Some(job) => job.await,
                            None => break,
                        }
                    }
                })
            })
            .collect();

        log::debug!("{}: {} jobs", description, total);
        progress.start(description, total);

        Self {
            token: parent.child_token(),
            sender: Some(sender),
            workers,
            outputs: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            progress,
        }
    }

    /// The scope's cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Queue one job, waiting until a worker accepts it.
    ///
    /// The job receives its own handle on the scope token to pass to API calls.
    pub async fn submit<F, Fut>(&self, job: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let Some(sender) = &self.sender else {
            return;
        };

        let token = self.token.clone();
        let outputs = Arc::clone(&self.outputs);
        let errors = Arc::clone(&self.errors);
        let progress = Arc::clone(&self.progress);
        let fut = job(token.clone());

        let wrapped: Job = Box::pin(async move {
            match fut.await {
                Ok(output) => outputs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(output),
                Err(e) => {
                    if e.is_fatal() {
                        token.cancel();
                    }
                    errors
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(e);
                }
            }
            progress.advance(1);
        });

        if sender.send(wrapped).await.is_err() {
            log::error!("Job dropped: no workers left to run it");
        }
    }

    /// Close submission, wait for every in-flight job, and hand back the outcome.
    pub async fn finish(mut self) -> BulkOutcome<T> {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                log::error!("Worker task failed: {}", e);
            }
        }
        self.progress.finish();
        self.token.cancel();

        let succeeded = std::mem::take(
            &mut *self
                .outputs
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let failures = std::mem::take(
            &mut *self
                .errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        BulkOutcome::new(succeeded, failures)
    }
}

/// Run `f` once per item through a fresh scope and collect the outcome.
pub async fn for_each<I, T, F, Fut>(
    parent: &CancellationToken,
    workers: usize,
    description: &str,
    progress: Arc<dyn ProgressObserver>,
    items: impl IntoIterator<Item = I, IntoIter: ExactSizeIterator>,
    f: F,
) -> BulkOutcome<T>
where
    T: Send + 'static,
    F: Fn(I, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let items = items.into_iter();
    let scope = WorkScope::start(parent, workers, items.len(), description, progress);
    for item in items {
        scope.submit(|token| f(item, token)).await;
    }
    scope.finish().await
}

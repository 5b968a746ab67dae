use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use crate::errors::{AppError, Result};
use crate::utils::generate_download_id;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Completion handle for a submitted job.
pub struct JobHandle<T> {
    pub id: String,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> JobHandle<T> {
    /// The job's output, or `AppError::Worker` if it panicked or was dropped.
    pub async fn wait(self) -> Result<T> {
        self.receiver
            .await
            .map_err(|_| AppError::Worker(format!("job {} was dropped before completing", self.id)))?
    }
}

/// Fixed set of tokio workers draining a bounded job queue.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let active = Arc::new(AtomicUsize::new(0));

        let handles = (0..workers)
            .map(|index| {
                let receiver = receiver.clone();
                let active = active.clone();
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        let Some(job) = job else { break };
                        active.fetch_add(1, Ordering::SeqCst);
                        job.await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                    log::debug!("🧵 [WORKER] Worker {} stopped", index);
                })
            })
            .collect();

        log::info!("🧵 [WORKER] Started {} workers, queue capacity {}", workers, queue_capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            active,
        }
    }

    fn wrap<F, T>(id: String, future: F) -> (Job, oneshot::Receiver<Result<T>>)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let result = AssertUnwindSafe(future).catch_unwind().await.map_err(|_| {
                log::error!("❌ [WORKER] Job {} panicked", id);
                AppError::Worker(format!("job {} panicked", id))
            });
            let _ = tx.send(result);
        });
        (job, rx)
    }

    async fn sender(&self) -> Result<mpsc::Sender<Job>> {
        self.sender
            .lock()
            .await
            .clone()
            .ok_or_else(|| AppError::Worker("worker pool is shut down".to_string()))
    }

    /// Queues `future`, waiting for queue space if necessary.
    pub async fn submit<F, T>(&self, future: F) -> Result<JobHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = generate_download_id();
        let (job, receiver) = Self::wrap(id.clone(), future);
        self.sender()
            .await?
            .send(job)
            .await
            .map_err(|_| AppError::Worker("worker pool is shut down".to_string()))?;
        Ok(JobHandle { id, receiver })
    }

    /// Queues `future` or fails with `AppError::QueueFull` immediately.
    pub async fn try_submit<F, T>(&self, future: F) -> Result<JobHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = generate_download_id();
        let (job, receiver) = Self::wrap(id.clone(), future);
        self.sender().await?.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AppError::Worker("worker pool is shut down".to_string()),
        })?;
        Ok(JobHandle { id, receiver })
    }

    /// Jobs currently executing.
    pub fn active_jobs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops accepting jobs, lets queued ones finish and joins the workers.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                log::warn!("⚠️ [WORKER] Worker ended abnormally: {}", e);
            }
        }
        log::info!("🧵 [WORKER] Pool shut down");
    }
}

//! Best-effort, detached fan-out of new leads to notification sinks.
//!
//! The request path only ever calls [`NotificationDispatcher::dispatch`],
//! which enqueues and returns immediately. A background loop drains the
//! bounded queue, running at most `workers` deliveries at once. Each
//! delivery sends to every configured sink in its own task; sink errors and
//! panics are logged and dropped. Nothing is retried.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::NotifyError;
use crate::notification_models::NotificationPayload;

/// An external system that receives new-lead notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Unconfigured sinks are skipped without any network call.
    fn is_configured(&self) -> bool;

    async fn send(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Maximum deliveries in flight.
    pub workers: usize,
    /// Payloads waiting beyond this are dropped.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
        }
    }
}

/// Outcome of one delivery, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Cheap, cloneable handle used by request handlers.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<NotificationPayload>,
}

/// Owns the background loop. Join it on shutdown to let in-flight
/// deliveries finish.
pub struct DispatchWorker {
    handle: JoinHandle<()>,
}

impl DispatchWorker {
    /// Waits until every dispatcher handle is dropped and all queued and
    /// in-flight deliveries have run.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("Notification worker terminated abnormally: {}", e);
        }
    }
}

impl NotificationDispatcher {
    /// Spawns the background loop on the current tokio runtime.
    pub fn start(
        sinks: Vec<Arc<dyn NotificationSink>>,
        config: DispatchConfig,
    ) -> (Self, DispatchWorker) {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        for sink in &sinks {
            if sink.is_configured() {
                tracing::info!("✓ Notification sink enabled: {}", sink.name());
            } else {
                tracing::info!("Notification sink not configured, skipping: {}", sink.name());
            }
        }

        let handle = tokio::spawn(run_worker(rx, Arc::from(sinks), workers));
        (Self { tx }, DispatchWorker { handle })
    }

    /// Queues a payload for delivery without waiting for it.
    ///
    /// Returns `false` when the payload was dropped because the queue is
    /// full or shut down. Never fails the caller.
    pub fn dispatch(&self, payload: NotificationPayload) -> bool {
        match self.tx.try_send(payload) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(payload)) => {
                tracing::warn!(
                    "Notification queue full, dropping notification for lead {}",
                    payload.id
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(payload)) => {
                tracing::warn!(
                    "Notification dispatcher stopped, dropping notification for lead {}",
                    payload.id
                );
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<NotificationPayload>,
    sinks: Arc<[Arc<dyn NotificationSink>]>,
    workers: usize,
) {
    let semaphore = Arc::new(Semaphore::new(workers));

    while let Some(payload) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let sinks = sinks.clone();
        let span = tracing::info_span!("notify", lead_id = payload.id, dispatch_id = %Uuid::new_v4());

        tokio::spawn(
            async move {
                let report = deliver(&sinks, payload).await;
                tracing::info!(
                    "Notification finished: {} attempted, {} delivered, {} failed, {} skipped",
                    report.attempted,
                    report.delivered,
                    report.failed,
                    report.skipped
                );
                drop(permit);
            }
            .instrument(span),
        );
    }

    // Queue closed: wait for in-flight deliveries
    let _ = semaphore.acquire_many(workers as u32).await;
    tracing::debug!("Notification worker stopped");
}

/// Sends one payload to every configured sink concurrently.
///
/// Each sink runs in its own task, so a failing or panicking sink cannot
/// affect the others.
pub async fn deliver(
    sinks: &[Arc<dyn NotificationSink>],
    payload: NotificationPayload,
) -> DeliveryReport {
    let payload = Arc::new(payload);
    let mut report = DeliveryReport::default();
    let mut tasks = JoinSet::new();

    for sink in sinks {
        if !sink.is_configured() {
            report.skipped += 1;
            continue;
        }

        report.attempted += 1;
        let sink = sink.clone();
        let payload = payload.clone();
        tasks.spawn(
            async move {
                let name = sink.name();
                match sink.send(&payload).await {
                    Ok(()) => {
                        tracing::info!("✓ Lead {} sent to {}", payload.id, name);
                        true
                    }
                    Err(e) => {
                        tracing::warn!("⚠️  {} notification for lead {} failed: {}", name, payload.id, e);
                        false
                    }
                }
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => report.delivered += 1,
            Ok(false) => report.failed += 1,
            Err(e) => {
                tracing::error!("Notification sink task panicked: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use parley_types::events::AccountEvent;

use crate::error::Error;
use crate::pipeline::MutationPipeline;

const EVENT_BUFFER: usize = 256;
const CLEANUP_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Queue the account service publishes lifecycle events on.
///
/// Bounded but lossless: a publisher waits for room instead of dropping events when
/// the listener falls behind. There is exactly one consumer, attached through
/// [`take_receiver`](Self::take_receiver).
pub struct AccountEvents {
    tx: mpsc::Sender<AccountEvent>,
    rx: Mutex<Option<mpsc::Receiver<AccountEvent>>>,
}

impl AccountEvents {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// The consuming end of the queue. Only the first call gets it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<AccountEvent>> {
        match self.rx.lock() {
            Ok(mut rx) => rx.take(),
            Err(e) => {
                warn!("Account event receiver unavailable: {}", e);
                None
            }
        }
    }

    /// Queue an event, waiting while the queue is full. Returns `false` when no listener
    /// holds the receiving end, in which case the event was not queued.
    pub async fn publish(&self, event: AccountEvent) -> bool {
        if !self.has_listener() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    fn has_listener(&self) -> bool {
        let taken = self.rx.lock().map(|rx| rx.is_none()).unwrap_or(false);
        taken && !self.tx.is_closed()
    }
}

impl Default for AccountEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs account cleanup for every queued event until the queue closes.
pub async fn run_account_listener(mut rx: mpsc::Receiver<AccountEvent>, pipeline: Arc<MutationPipeline>) {
    while let Some(event) = rx.recv().await {
        match event {
            AccountEvent::Deleted { .. } => clean_up(&pipeline, event.user_id()).await,
        }
    }
    info!("Account event queue closed, listener stopping");
}

/// Store failures are retried with a growing delay; cleanup is safe to repeat.
async fn clean_up(pipeline: &Arc<MutationPipeline>, user_id: Uuid) {
    for attempt in 1..=CLEANUP_ATTEMPTS {
        let pipeline = pipeline.clone();
        match tokio::task::spawn_blocking(move || pipeline.delete_account(user_id)).await {
            Ok(Ok(report)) => {
                info!(%user_id, ?report, "Account cleanup finished");
                return;
            }
            Ok(Err(e @ (Error::Conflict(_) | Error::StoreUnavailable(_)))) if attempt < CLEANUP_ATTEMPTS => {
                warn!("Account cleanup for {} failed (attempt {}): {}", user_id, attempt, e);
                tokio::time::sleep(RETRY_DELAY * attempt).await;
            }
            Ok(Err(e)) => {
                error!("Account cleanup for {} gave up: {}", user_id, e);
                return;
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                return;
            }
        }
    }
}

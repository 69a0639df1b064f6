//! Bounded intake queue between source adapters and the dispatcher.

use std::sync::Arc;

use alert_core::AggregateAlert;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::EngineError;
use crate::telemetry;

/// Create an intake queue. Capacity is clamped to at least one.
pub fn intake(capacity: usize) -> (AlertIntake, IntakeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (AlertIntake { tx }, IntakeReceiver { rx })
}

/// Producer handle. Cheap to clone, one per source adapter.
#[derive(Debug, Clone)]
pub struct AlertIntake {
    tx: mpsc::Sender<Arc<AggregateAlert>>,
}

impl AlertIntake {
    /// Submit a candidate aggregate, waiting while the queue is full.
    pub async fn submit(&self, alert: AggregateAlert) -> Result<(), EngineError> {
        self.submit_shared(Arc::new(alert)).await
    }

    /// Submit an already shared candidate.
    pub async fn submit_shared(&self, alert: Arc<AggregateAlert>) -> Result<(), EngineError> {
        let regions = alert.region_count();
        let id = alert.id();
        self.tx
            .send(alert)
            .await
            .map_err(|_| EngineError::IntakeClosed)?;

        telemetry::record_submitted(regions);
        debug!(alert = id, regions, "Submitted alert");
        Ok(())
    }

    /// Whether the dispatcher side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the dispatcher.
#[derive(Debug)]
pub struct IntakeReceiver {
    rx: mpsc::Receiver<Arc<AggregateAlert>>,
}

impl IntakeReceiver {
    /// Next submitted candidate, or `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<Arc<AggregateAlert>> {
        self.rx.recv().await
    }

    /// Stop accepting submissions. Queued candidates can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

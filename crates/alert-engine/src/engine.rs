//! Wiring of table, publisher, dispatcher and sweeper.

use std::sync::Arc;

use alert_core::{Presenter, Transport};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::EngineConfig;
use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::intake::{intake, AlertIntake};
use crate::publisher::Publisher;
use crate::sweeper::Sweeper;
use crate::table::CorrelationTable;

/// The assembled engine, before its tasks are started.
pub struct AlertEngine {
    config: EngineConfig,
    table: Arc<CorrelationTable>,
    publisher: Publisher,
}

impl AlertEngine {
    /// Build an engine. Fails when the configuration is unusable.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let table = Arc::new(CorrelationTable::new(config.novel_evidence));
        let publisher = Publisher::new(transport, presenter, &config);
        Ok(Self {
            config,
            table,
            publisher,
        })
    }

    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// A dispatcher sharing this engine's table.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.table),
            self.publisher.clone(),
            self.config.max_regions_per_post,
        )
    }

    /// A sweeper sharing this engine's table.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            Arc::clone(&self.table),
            self.publisher.clone(),
            self.config.sweep_interval,
        )
    }

    /// Spawn the dispatcher and sweeper.
    ///
    /// Cancelling `cancel` stops both tasks; [`RunningEngine::shutdown`]
    /// drains the queue first.
    pub fn start(self, cancel: CancellationToken) -> RunningEngine {
        let (intake, receiver) = intake(self.config.intake_capacity);

        let dispatcher = self.dispatcher();
        let dispatcher_cancel = cancel.clone();
        let dispatcher = tokio::spawn(async move {
            dispatcher
                .run_with_shutdown(receiver, dispatcher_cancel.cancelled_owned())
                .await
        });
        let sweeper = self.sweeper().spawn(cancel.clone());

        info!(
            destinations = self.config.destinations.len(),
            max_regions_per_post = self.config.max_regions_per_post,
            "Alert engine started"
        );

        RunningEngine {
            intake,
            table: self.table,
            dispatcher,
            sweeper,
            cancel,
        }
    }
}

/// Handles to a started engine.
pub struct RunningEngine {
    intake: AlertIntake,
    table: Arc<CorrelationTable>,
    dispatcher: JoinHandle<Result<(), EngineError>>,
    sweeper: JoinHandle<()>,
    cancel: CancellationToken,
}

impl RunningEngine {
    /// A producer handle for source adapters.
    pub fn intake(&self) -> AlertIntake {
        self.intake.clone()
    }

    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// Stop accepting alerts, let the dispatcher drain the queue, then stop
    /// the sweeper.
    ///
    /// The dispatcher only drains once every cloned intake handle is dropped.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        drop(self.intake);
        let dispatched = self.dispatcher.await;
        self.cancel.cancel();
        self.sweeper.await?;
        info!("Alert engine stopped");
        dispatched?
    }
}

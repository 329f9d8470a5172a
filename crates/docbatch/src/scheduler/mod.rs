//! Serial scheduler: one thread owns the queue and runs one operation at a
//! time. Everything else talks to it through a [`BatchHandle`].

mod actor;
pub mod command;
pub mod handle;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::bounded;
use log::{debug, error, info};

use crate::broadcast::{BatchProgressBroadcaster, StatusBoard};
use crate::config::{validate_config, BatchConfig};
use crate::error::{Result, SchedulerError};
use crate::executor::Executor;
use crate::services::{DocumentTransformService, FileRegistry};
use crate::storage::OutputStorage;

use actor::{Scheduler, SchedulerState};

pub use command::DrainSummary;
pub use handle::BatchHandle;

pub struct BatchScheduler {
    handle: BatchHandle,
    thread: Option<JoinHandle<()>>,
}

impl BatchScheduler {
    /// Validates `config` and spawns the scheduler thread.
    pub fn start(
        config: &BatchConfig,
        transform: Arc<dyn DocumentTransformService>,
        registry: Arc<dyn FileRegistry>,
    ) -> Result<Self> {
        validate_config(config)?;

        let (command_sender, command_receiver) = bounded(config.command_capacity);
        let board = StatusBoard::new();
        let events = BatchProgressBroadcaster::new(config.event_capacity);

        let mut executor = Executor::new(transform, registry);
        if let Some(dir) = &config.output_directory {
            executor = executor.with_storage(OutputStorage::new(dir));
        }
        let state = SchedulerState::new(board.clone(), events.clone(), config.retain_finished);

        let thread = thread::Builder::new()
            .name("docbatch-scheduler".to_string())
            .spawn(move || Scheduler::new(executor, state).run(command_receiver))
            .map_err(|e| SchedulerError::SpawnFailed(e.to_string()))?;

        info!(
            "Batch scheduler started (max_retries={}, retain_finished={})",
            config.max_retries, config.retain_finished
        );

        Ok(Self {
            handle: BatchHandle::new(command_sender, board, events, config.max_retries),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> BatchHandle {
        self.handle.clone()
    }

    /// Stops the thread once the operation in flight, if any, has finished
    /// and waits for it.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // A closed channel means the thread is already gone.
        let _ = self.handle.request_shutdown();

        match thread.join() {
            Ok(()) => {
                info!("Batch scheduler stopped");
                Ok(())
            }
            Err(e) => {
                error!("Scheduler thread panicked: {:?}", e);
                Err(SchedulerError::WorkerPanicked.into())
            }
        }
    }
}

impl Drop for BatchScheduler {
    fn drop(&mut self) {
        if self.thread.is_some() {
            debug!("Stopping scheduler on drop");
            let _ = self.stop();
        }
    }
}

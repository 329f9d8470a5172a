//! Test harness for running the scheduler against scripted collaborators.
//!
//! - `ScriptedTransform` fails, panics or blocks on chosen file ids
//! - `SwitchableRegistry` can be taken offline mid-test
//! - `TestHarness` owns a running scheduler plus temp output directory

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tempfile::TempDir;

use docbatch::operation::MergeOptions;
use docbatch::{
    BatchConfig, BatchHandle, BatchScheduler, DocumentTransformService, FileHandle, FileRegistry,
    InMemoryFileRegistry, OperationParams, RegistryError, TransformError, TransformOutput,
};

pub const GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocks one transform call until released.
pub struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl Gate {
    /// Waits until the gated transform has started.
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(GATE_TIMEOUT)
            .expect("gated transform was never called");
    }

    pub fn release(&self) {
        self.release.send(()).expect("gated transform is gone");
    }
}

/// Transform service whose behavior per file id is set by the test.
#[derive(Default)]
pub struct ScriptedTransform {
    failures: Mutex<HashMap<String, String>>,
    panics: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, (Sender<()>, Receiver<()>)>>,
    merge_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransform {
    pub fn fail(&self, file_id: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(file_id.to_string(), message.to_string());
    }

    pub fn heal(&self, file_id: &str) {
        self.failures.lock().unwrap().remove(file_id);
    }

    pub fn panic_on(&self, file_id: &str) {
        self.panics.lock().unwrap().insert(file_id.to_string());
    }

    pub fn fail_merge(&self, message: &str) {
        *self.merge_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Blocks the next transform of `file_id` until the gate is released.
    pub fn gate(&self, file_id: &str) -> Gate {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        self.gates
            .lock()
            .unwrap()
            .insert(file_id.to_string(), (entered_tx, release_rx));
        Gate {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// File ids in the order they were transformed.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl DocumentTransformService for ScriptedTransform {
    fn transform(
        &self,
        file: &FileHandle,
        params: &OperationParams,
    ) -> Result<TransformOutput, TransformError> {
        self.calls.lock().unwrap().push(file.id.clone());

        let gate = self.gates.lock().unwrap().remove(&file.id);
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.recv_timeout(GATE_TIMEOUT);
        }

        if self.panics.lock().unwrap().contains(&file.id) {
            panic!("transform of {} crashed", file.id);
        }
        if let Some(message) = self.failures.lock().unwrap().get(&file.id) {
            return Err(TransformError::Failed(message.clone()));
        }

        match params {
            OperationParams::Split(_) => Ok(TransformOutput::parts(vec![
                b"%PDF-part-1".to_vec(),
                b"%PDF-part-2".to_vec(),
            ])),
            _ => Ok(TransformOutput::single(
                format!("%PDF {}", file.name).into_bytes(),
            )),
        }
    }

    fn merge_all(
        &self,
        files: &[FileHandle],
        _options: &MergeOptions,
    ) -> Result<TransformOutput, TransformError> {
        if let Some(message) = self.merge_failure.lock().unwrap().clone() {
            return Err(TransformError::Failed(message));
        }
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        Ok(TransformOutput::single(names.join("+").into_bytes()))
    }
}

/// In-memory registry that can be switched to `Unavailable`.
#[derive(Default)]
pub struct SwitchableRegistry {
    inner: InMemoryFileRegistry,
    offline: AtomicBool,
}

impl SwitchableRegistry {
    pub fn register(&self, file_id: &str) {
        self.inner
            .insert(FileHandle::new(file_id, &format!("{}.pdf", file_id), 1024));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl FileRegistry for SwitchableRegistry {
    fn resolve(&self, file_id: &str) -> Result<FileHandle, RegistryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("registry offline".to_string()));
        }
        self.inner.resolve(file_id)
    }
}

/// Running scheduler wired to scripted collaborators.
pub struct TestHarness {
    temp_dir: TempDir,
    pub transform: Arc<ScriptedTransform>,
    pub registry: Arc<SwitchableRegistry>,
    scheduler: Option<BatchScheduler>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(BatchConfig::default())
    }

    pub fn with_config(config: BatchConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let transform = Arc::new(ScriptedTransform::default());
        let registry = Arc::new(SwitchableRegistry::default());

        let scheduler = BatchScheduler::start(&config, transform.clone(), registry.clone())
            .expect("Failed to start scheduler");

        Self {
            temp_dir,
            transform,
            registry,
            scheduler: Some(scheduler),
        }
    }

    /// Harness whose outputs are written under its temp directory.
    pub fn with_storage() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("output");
        let config = BatchConfig::default().with_output_directory(&output_dir);

        let mut harness = Self::with_config(config);
        harness.temp_dir = temp_dir;
        harness
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("output")
    }

    pub fn register(&self, file_ids: &[&str]) {
        for id in file_ids {
            self.registry.register(id);
        }
    }

    pub fn handle(&self) -> BatchHandle {
        self.scheduler
            .as_ref()
            .expect("scheduler already shut down")
            .handle()
    }

    pub fn shutdown(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().expect("Failed to shut down scheduler");
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

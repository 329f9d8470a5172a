//! Builders for operations and configs used across integration tests.

#![allow(dead_code)]

use std::path::Path;

use docbatch::operation::{ExportFormatType, ExportOptions, MergeOptions, SplitOptions, WatermarkOptions};
use docbatch::{
    create_batch_export, create_batch_merge, create_batch_split, create_batch_watermark,
    BatchConfig, BatchOperation,
};

pub fn watermark(files: &[&str]) -> BatchOperation {
    create_batch_watermark(files.iter().copied(), WatermarkOptions::text("CONFIDENTIAL", 0.4))
        .expect("valid watermark operation")
}

pub fn export_pdf(files: &[&str]) -> BatchOperation {
    create_batch_export(files.iter().copied(), ExportOptions::new(ExportFormatType::Pdf))
        .expect("valid export operation")
}

pub fn split_every_page(files: &[&str]) -> BatchOperation {
    create_batch_split(files.iter().copied(), SplitOptions::every_pages(1))
        .expect("valid split operation")
}

pub fn merge(files: &[&str]) -> BatchOperation {
    create_batch_merge(files.iter().copied(), MergeOptions::default())
        .expect("valid merge operation")
}

/// Builder for creating `BatchConfig` instances.
pub struct ConfigBuilder {
    config: BatchConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BatchConfig::default(),
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn retain_finished(mut self, retain: bool) -> Self {
        self.config.retain_finished = retain;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn output_directory(mut self, dir: &Path) -> Self {
        self.config.output_directory = Some(dir.to_path_buf());
        self
    }

    pub fn build(self) -> BatchConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

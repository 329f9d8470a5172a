//! Shared test utilities for docbatch integration tests.

pub mod builders;
pub mod harness;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use harness::{Gate, ScriptedTransform, SwitchableRegistry, TestHarness};

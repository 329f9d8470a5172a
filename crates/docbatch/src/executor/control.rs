use crate::operation::BatchOperation;

/// How an [`crate::executor::Executor`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every unit ran and the completion rule was applied.
    Finished,
    /// The operation left `processing` at a checkpoint (paused or
    /// cancelled). Remaining units were not started.
    Interrupted,
}

/// Hook the executor calls between units.
///
/// The implementation may change the operation's state; the executor stops
/// as soon as the state is no longer `processing`.
pub trait ExecutionControl {
    fn checkpoint(&mut self, operation: &mut BatchOperation);
}

/// Control that never interrupts and publishes nothing. Used in tests.
pub struct NoopControl;

impl ExecutionControl for NoopControl {
    fn checkpoint(&mut self, _operation: &mut BatchOperation) {}
}

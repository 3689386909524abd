//! Operator trait: wraps a computation as pipeline-runnable work.

use crate::core::Payload;
use crate::errors::NodeExecutionError;
use std::fmt;

/// How an operator consumes a lazily chunked upstream output.
///
/// Declared up front on the operator; the node never inspects the shape of
/// a computation's return value at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Apply the computation to each chunk, then merge the partial results
    /// into one aggregate output.
    MapCollapse,
    /// Concatenate all chunks into one aggregate input, then apply the
    /// computation once.
    Materialize,
}

/// Trait for computation collaborators runnable as pipeline nodes.
///
/// An operator is a pure computation over materialized inputs; chunked
/// upstream handling and caching are the node's concern.
pub trait Operator: Send + Sync {
    /// Stable descriptive label, used for logging and as the cache
    /// subdirectory name. Tags must be unique within a pipeline.
    fn tag(&self) -> &str;

    /// Parameters folded into the node's cache fingerprint.
    fn params(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Declares how lazily chunked inputs are consumed.
    fn stream_mode(&self) -> StreamMode {
        StreamMode::MapCollapse
    }

    /// Executes the computation over materialized inputs, one per upstream
    /// dependency in chaining order.
    fn process(&self, inputs: Vec<Payload>) -> Result<Payload, NodeExecutionError>;
}

/// A closure-backed operator.
pub struct FnOperator<F>
where
    F: Fn(Vec<Payload>) -> Result<Payload, NodeExecutionError> + Send + Sync,
{
    tag: String,
    stream_mode: StreamMode,
    func: F,
}

impl<F> FnOperator<F>
where
    F: Fn(Vec<Payload>) -> Result<Payload, NodeExecutionError> + Send + Sync,
{
    /// Creates a new closure-backed operator.
    pub fn new(tag: impl Into<String>, func: F) -> Self {
        Self {
            tag: tag.into(),
            stream_mode: StreamMode::MapCollapse,
            func,
        }
    }

    /// Overrides the stream mode declaration.
    #[must_use]
    pub fn with_stream_mode(mut self, mode: StreamMode) -> Self {
        self.stream_mode = mode;
        self
    }
}

impl<F> fmt::Debug for FnOperator<F>
where
    F: Fn(Vec<Payload>) -> Result<Payload, NodeExecutionError> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperator").field("tag", &self.tag).finish()
    }
}

impl<F> Operator for FnOperator<F>
where
    F: Fn(Vec<Payload>) -> Result<Payload, NodeExecutionError> + Send + Sync,
{
    fn tag(&self) -> &str {
        &self.tag
    }

    fn stream_mode(&self) -> StreamMode {
        self.stream_mode
    }

    fn process(&self, inputs: Vec<Payload>) -> Result<Payload, NodeExecutionError> {
        (self.func)(inputs)
    }
}

//! Error types for the spikeflow framework.
//!
//! Cache misses are not represented here: an unreadable or missing artifact
//! is recovered locally by recomputing, never surfaced to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for spikeflow operations.
#[derive(Debug, Error)]
pub enum SpikeflowError {
    /// Chaining would create a dependency cycle.
    #[error("{0}")]
    Cycle(#[from] CycleError),

    /// A node's computation failed.
    #[error("{0}")]
    NodeExecution(#[from] NodeExecutionError),

    /// The save path or a cache directory is unusable.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Artifact serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when chaining two nodes would make the graph cyclic.
///
/// Raised at graph-construction time; the chain call that triggered it
/// leaves the graph unmodified.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", path.join(" -> "))]
pub struct CycleError {
    /// The node tags forming the cycle, closing edge included.
    pub path: Vec<String>,
}

impl CycleError {
    /// Creates a new cycle error from the offending dependency path.
    #[must_use]
    pub fn new(path: Vec<String>) -> Self {
        Self { path }
    }
}

/// Error raised when a node's computation fails.
///
/// Propagates unmodified through the executor, aborting the remaining run.
#[derive(Debug, Clone, Error)]
#[error("Node '{node}' failed: {message}")]
pub struct NodeExecutionError {
    /// Tag of the failing node.
    pub node: String,
    /// What went wrong.
    pub message: String,
}

impl NodeExecutionError {
    /// Creates a new node execution error.
    #[must_use]
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Error raised when a save path or cache directory cannot be used.
#[derive(Debug, Clone, Error)]
#[error("Configuration error for '{}': {message}", path.display())]
pub struct ConfigurationError {
    /// The offending path.
    pub path: PathBuf,
    /// Why the path is unusable.
    pub message: String,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display() {
        let err = CycleError::new(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_node_execution_error_display() {
        let err = NodeExecutionError::new("detect", "bad input");
        assert_eq!(err.to_string(), "Node 'detect' failed: bad input");
    }

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::new("/tmp/x", "not writable");
        assert!(err.to_string().contains("/tmp/x"));
        assert!(err.to_string().contains("not writable"));
    }

    #[test]
    fn test_error_conversion() {
        let err: SpikeflowError = NodeExecutionError::new("n", "m").into();
        assert!(matches!(err, SpikeflowError::NodeExecution(_)));
    }
}
